#![allow(dead_code)]

//! Session store: the persistence seam for per-session engine state.
//!
//! The engine reads and rewrites one opaque blob per session each turn.
//! `PgSessionStore` upserts a jsonb row (last-write-wins; the design assumes
//! at most one in-flight call per session). `InMemorySessionStore` backs the
//! engine tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;

/// The persisted blob: turn state plus the derived candidate summary, both
/// kept as raw JSON so schema drift degrades to an empty state instead of a
/// hard error (the engine collapses unparseable values).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersistedSession {
    pub turn_state: Value,
    pub summary: Value,
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, session_id: Uuid) -> Result<Option<PersistedSession>, AppError>;
    async fn save(&self, session_id: Uuid, session: &PersistedSession) -> Result<(), AppError>;
}

// ────────────────────────────────────────────────────────────────────────────
// PostgreSQL store
// ────────────────────────────────────────────────────────────────────────────

pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn load(&self, session_id: Uuid) -> Result<Option<PersistedSession>, AppError> {
        let row: Option<(Value, Value)> = sqlx::query_as(
            "SELECT turn_state, summary FROM interview_sessions WHERE session_id = $1",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(turn_state, summary)| PersistedSession {
            turn_state,
            summary,
        }))
    }

    async fn save(&self, session_id: Uuid, session: &PersistedSession) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO interview_sessions (session_id, turn_state, summary, updated_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (session_id)
            DO UPDATE SET turn_state = $2, summary = $3, updated_at = NOW()
            "#,
        )
        .bind(session_id)
        .bind(&session.turn_state)
        .bind(&session.summary)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory store (tests)
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<Uuid, PersistedSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, session_id: Uuid) -> Result<Option<PersistedSession>, AppError> {
        Ok(self
            .sessions
            .lock()
            .expect("session map poisoned")
            .get(&session_id)
            .cloned())
    }

    async fn save(&self, session_id: Uuid, session: &PersistedSession) -> Result<(), AppError> {
        self.sessions
            .lock()
            .expect("session map poisoned")
            .insert(session_id, session.clone());
        Ok(())
    }
}
