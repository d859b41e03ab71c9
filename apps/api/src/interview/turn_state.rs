//! Typed per-session turn state, persisted as an opaque JSON blob and
//! rewritten every turn. Malformed persisted state collapses to
//! `TurnState::empty()` rather than erroring.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::bank;

/// Bumped when the persisted shape changes incompatibly. Older or unreadable
/// blobs are treated as "no prior state".
pub const SCHEMA_VERSION: u32 = 1;

const LAST3_CAP: usize = 3;
const LAST5_CAP: usize = 5;

/// One question-serve-then-answer cycle. The last entry may have
/// `answer = None` while a question is outstanding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QaTurn {
    pub question_id: String,
    pub question_text: String,
    pub answer: Option<String>,
}

/// Rolling raw-answer buffers used by downstream heuristics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnswerBuffers {
    pub last1: Option<String>,
    pub last3: Vec<String>,
    pub last5: Vec<String>,
}

impl AnswerBuffers {
    fn push(&mut self, answer: &str) {
        self.last1 = Some(answer.to_string());
        push_capped(&mut self.last3, answer, LAST3_CAP);
        push_capped(&mut self.last5, answer, LAST5_CAP);
    }
}

fn push_capped(buffer: &mut Vec<String>, answer: &str, cap: usize) {
    buffer.push(answer.to_string());
    while buffer.len() > cap {
        buffer.remove(0);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnState {
    pub schema_version: u32,
    /// Append-only ordered q/a pairs.
    pub qa_history: Vec<QaTurn>,
    /// Every ID ever served; exclusion only, insertion order irrelevant.
    pub asked_question_ids: HashSet<String>,
    /// One score per answered turn, insertion-ordered, never pruned.
    pub scores: Vec<f64>,
    pub buffers: AnswerBuffers,
    pub current_question_id: Option<String>,
    pub current_question_text: Option<String>,
    /// Dimension key of the last served non-intro question; `None` during
    /// the intro phase.
    pub current_dimension: Option<String>,
    /// Monotonically non-decreasing; always >= qa_history length.
    pub question_count: u32,
}

impl TurnState {
    pub fn empty() -> Self {
        TurnState {
            schema_version: SCHEMA_VERSION,
            qa_history: Vec::new(),
            asked_question_ids: HashSet::new(),
            scores: Vec::new(),
            buffers: AnswerBuffers::default(),
            current_question_id: None,
            current_question_text: None,
            current_dimension: None,
            question_count: 0,
        }
    }

    /// Parses a persisted blob, collapsing any failure to the empty state.
    pub fn from_value(value: &Value) -> Self {
        if value.is_null() {
            return Self::empty();
        }
        match serde_json::from_value::<TurnState>(value.clone()) {
            Ok(state) if state.schema_version == SCHEMA_VERSION => state,
            Ok(state) => {
                warn!(
                    "Discarding turn state with schema version {} (expected {SCHEMA_VERSION})",
                    state.schema_version
                );
                Self::empty()
            }
            Err(e) => {
                warn!("Malformed persisted turn state, resetting: {e}");
                Self::empty()
            }
        }
    }

    pub fn answered_count(&self) -> usize {
        self.scores.len()
    }

    pub fn has_outstanding_question(&self) -> bool {
        self.current_question_id.is_some()
    }

    /// Records the answer to the outstanding question: fills the trailing
    /// history entry, appends the score, and rolls the buffers forward.
    pub fn record_answer(&mut self, answer: &str, score: f64) {
        if let Some(turn) = self.qa_history.last_mut() {
            turn.answer = Some(answer.to_string());
        }
        self.scores.push(score);
        self.buffers.push(answer);
    }

    /// Post-selection bookkeeping for a freshly served question.
    pub fn record_served(&mut self, question_id: &str, question_text: &str) {
        self.qa_history.push(QaTurn {
            question_id: question_id.to_string(),
            question_text: question_text.to_string(),
            answer: None,
        });
        self.asked_question_ids.insert(question_id.to_string());
        self.question_count += 1;
        self.current_question_id = Some(question_id.to_string());
        self.current_question_text = Some(question_text.to_string());
        self.current_dimension = bank::dimension_of(question_id).map(str::to_string);
    }

    /// Marks the session complete: no outstanding question remains.
    pub fn clear_outstanding(&mut self) {
        self.current_question_id = None;
        self.current_question_text = None;
    }
}
