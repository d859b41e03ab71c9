//! Axum route handlers for the Interview API.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::interview::engine::NextQuestionResponse;
use crate::interview::summary::CandidateSummary;
use crate::interview::turn_state::{QaTurn, TurnState};
use crate::state::AppState;

#[derive(Debug, Deserialize, Default)]
pub struct NextQuestionRequest {
    /// Answer to the outstanding question. Omitted on the first call.
    pub answer: Option<String>,
    /// Ordered dimension keys from the CV-profile collaborator.
    #[serde(default)]
    pub probe_priorities: Vec<String>,
}

/// POST /api/v1/interviews/:session_id/next
///
/// Runs one turn: records the answer if one is due, then returns the next
/// question or the completion payload.
pub async fn handle_next_question(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<NextQuestionRequest>,
) -> Result<Json<NextQuestionResponse>, AppError> {
    let response = state
        .engine
        .next_question(
            session_id,
            request.answer.as_deref(),
            &request.probe_priorities,
        )
        .await?;
    Ok(Json(response))
}

/// GET /api/v1/interviews/:session_id/summary
///
/// Current persisted candidate summary; empty for unknown or unreadable
/// sessions.
pub async fn handle_get_summary(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<CandidateSummary>, AppError> {
    let persisted = state.store.load(session_id).await?.unwrap_or_default();
    Ok(Json(CandidateSummary::from_value(&persisted.summary)))
}

/// GET /api/v1/interviews/:session_id/transcript
///
/// Ordered question/answer history for the session.
pub async fn handle_get_transcript(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<Vec<QaTurn>>, AppError> {
    let persisted = state
        .store
        .load(session_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Session {session_id} not found")))?;
    Ok(Json(TurnState::from_value(&persisted.turn_state).qa_history))
}
