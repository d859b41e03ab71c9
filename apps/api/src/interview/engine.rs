//! Interview orchestration engine: one `next_question` call per turn.
//!
//! Control flow per request: load turn state, score the answer (if any), fold
//! the summary, select the next question, write the state back, and emit
//! audit events along the way. Client errors reject before any state
//! mutation reaches the store.

use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::audit::AuditSink;
use crate::bank::{PoolType, QuestionBank};
use crate::classifiers::{SignalClassifier, SignalReading};
use crate::errors::AppError;
use crate::interview::scoring::{
    self, average_last, compute_fit, dimension_breakdown, DimensionBreakdown, FitConfidence,
    FitTrend,
};
use crate::interview::selection::{self, DecisionMode, SelectedQuestion};
use crate::interview::summary::{fold_answer, AnswerSignals, CandidateSummary};
use crate::interview::turn_state::TurnState;
use crate::store::{PersistedSession, SessionStore};

// ────────────────────────────────────────────────────────────────────────────
// Response payload
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionPayload {
    pub id: String,
    pub text: String,
    pub dimension: Option<String>,
    pub priority_matched: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Progress {
    pub question_count: u32,
    pub current_dimension: Option<String>,
    pub last1_average: f64,
    pub last3_average: f64,
    pub last5_average: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitBreakdown {
    pub confidence: FitConfidence,
    pub answered_count: usize,
    pub dimensions: Vec<DimensionBreakdown>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NextQuestionResponse {
    pub question: Option<QuestionPayload>,
    pub decision: DecisionMode,
    pub fit_score: Option<u32>,
    pub fit_trend: Option<FitTrend>,
    pub progress: Progress,
    pub fit_breakdown: FitBreakdown,
    pub candidate_summary: CandidateSummary,
    pub session_complete: bool,
}

// ────────────────────────────────────────────────────────────────────────────
// Engine
// ────────────────────────────────────────────────────────────────────────────

pub struct InterviewEngine {
    bank: Arc<QuestionBank>,
    store: Arc<dyn SessionStore>,
    audit: Arc<dyn AuditSink>,
    tone: Arc<dyn SignalClassifier>,
    affect: Arc<dyn SignalClassifier>,
    delivery_enabled: bool,
}

impl InterviewEngine {
    pub fn new(
        bank: Arc<QuestionBank>,
        store: Arc<dyn SessionStore>,
        audit: Arc<dyn AuditSink>,
        tone: Arc<dyn SignalClassifier>,
        affect: Arc<dyn SignalClassifier>,
        delivery_enabled: bool,
    ) -> Self {
        Self {
            bank,
            store,
            audit,
            tone,
            affect,
            delivery_enabled,
        }
    }

    /// Runs one turn: record the answer if one is due, then serve the next
    /// question or mark the session complete.
    pub async fn next_question(
        &self,
        session_id: Uuid,
        answer: Option<&str>,
        probe_priorities: &[String],
    ) -> Result<NextQuestionResponse, AppError> {
        let persisted = self.store.load(session_id).await?.unwrap_or_default();
        let mut state = TurnState::from_value(&persisted.turn_state);
        let mut summary = CandidateSummary::from_value(&persisted.summary);

        let answer = answer.map(str::trim).filter(|a| !a.is_empty());
        let had_outstanding = state.has_outstanding_question();

        // Client errors: no state mutation, immediate rejection.
        if answer.is_some() && !had_outstanding {
            return Err(AppError::Validation(
                "No outstanding question to answer".to_string(),
            ));
        }
        if answer.is_none() && had_outstanding {
            return Err(AppError::Validation(
                "An answer to the outstanding question is required".to_string(),
            ));
        }

        if let Some(answer_text) = answer {
            summary = self
                .record_answer(session_id, &mut state, summary, answer_text)
                .await;
        }

        let mode = selection::decision_mode(state.question_count, state.answered_count());
        let selected = match mode {
            DecisionMode::Opening => {
                selection::select_opening(&self.bank, &state.asked_question_ids, probe_priorities)?
            }
            _ => selection::select_probe(
                &self.bank,
                &state.asked_question_ids,
                probe_priorities,
                PoolType::Probe,
            ),
        };

        let (question, decision) = match selected {
            Some(selected) => {
                state.record_served(&selected.id, &selected.text);
                self.audit_question_served(session_id, &selected, mode).await;
                (
                    Some(QuestionPayload {
                        id: selected.id,
                        text: selected.text,
                        dimension: selected.dimension,
                        priority_matched: selected.priority_matched,
                    }),
                    mode,
                )
            }
            None => {
                state.clear_outstanding();
                if had_outstanding {
                    info!("Session {session_id} complete after {} questions", state.question_count);
                    self.audit
                        .record(
                            session_id,
                            "session_completed",
                            json!({
                                "question_count": state.question_count,
                                "answered_count": state.answered_count(),
                            }),
                        )
                        .await;
                }
                (None, DecisionMode::Complete)
            }
        };

        let session_complete = decision == DecisionMode::Complete;
        let fit = compute_fit(&state.scores);
        let response = NextQuestionResponse {
            question,
            decision,
            fit_score: fit.fit_score,
            fit_trend: fit.trend,
            progress: Progress {
                question_count: state.question_count,
                current_dimension: state.current_dimension.clone(),
                last1_average: average_last(&state.scores, 1),
                last3_average: average_last(&state.scores, 3),
                last5_average: average_last(&state.scores, 5),
            },
            fit_breakdown: FitBreakdown {
                confidence: scoring::fit_confidence(&state.scores),
                answered_count: state.answered_count(),
                dimensions: dimension_breakdown(&state, &self.bank),
            },
            candidate_summary: summary.clone(),
            session_complete,
        };

        self.persist(session_id, &state, &summary).await?;

        Ok(response)
    }

    async fn record_answer(
        &self,
        session_id: Uuid,
        state: &mut TurnState,
        summary: CandidateSummary,
        answer_text: &str,
    ) -> CandidateSummary {
        let answered_question = state
            .current_question_id
            .clone()
            .unwrap_or_default();
        let question_text = state.current_question_text.clone().unwrap_or_default();

        let score = scoring::score_answer(answer_text);
        state.record_answer(answer_text, score);

        let tone: SignalReading = self.tone.classify(answer_text).await;
        let affect: SignalReading = self.affect.classify(answer_text).await;

        let summary = fold_answer(
            summary,
            &AnswerSignals {
                answer: answer_text,
                question: &question_text,
                tone: &tone,
                affect: &affect,
                last3_average: average_last(&state.scores, 3),
                delivery_enabled: self.delivery_enabled,
            },
        );

        self.audit
            .record(
                session_id,
                "answer_recorded",
                json!({
                    "question_id": answered_question,
                    "score": score,
                    "answered_count": state.answered_count(),
                    "tone": tone.label,
                    "affect": affect.label,
                }),
            )
            .await;

        summary
    }

    async fn audit_question_served(
        &self,
        session_id: Uuid,
        selected: &SelectedQuestion,
        mode: DecisionMode,
    ) {
        self.audit
            .record(
                session_id,
                "question_served",
                json!({
                    "question_id": selected.id,
                    "decision": mode,
                    "dimension": selected.dimension,
                    "priority_matched": selected.priority_matched,
                }),
            )
            .await;
    }

    async fn persist(
        &self,
        session_id: Uuid,
        state: &TurnState,
        summary: &CandidateSummary,
    ) -> Result<(), AppError> {
        // Turn state write-back is essential; its serialization errors
        // escalate. The summary degrades to an empty object instead.
        let turn_state =
            serde_json::to_value(state).context("Failed to serialize turn state")?;
        let summary_value = serde_json::to_value(summary).unwrap_or_else(|e| {
            warn!("Failed to serialize candidate summary, persisting empty: {e}");
            json!({})
        });
        self.store
            .save(
                session_id,
                &PersistedSession {
                    turn_state,
                    summary: summary_value,
                },
            )
            .await
    }
}
