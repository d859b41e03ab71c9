use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::interview::engine::InterviewEngine;
use crate::store::SessionStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Pool retained for future read-model endpoints; the engine holds its
    /// own store/audit handles.
    #[allow(dead_code)]
    pub db: PgPool,
    #[allow(dead_code)]
    pub config: Config,
    /// The per-turn orchestration engine. Holds the cached question bank and
    /// the classifier/audit/store collaborators behind trait objects.
    pub engine: Arc<InterviewEngine>,
    /// Session store, also used directly by the read-only summary and
    /// transcript endpoints.
    pub store: Arc<dyn SessionStore>,
}
