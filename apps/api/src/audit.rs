#![allow(dead_code)]

//! Audit event sink: append-only record of every decision and state change.
//!
//! Fire-and-forget from the engine's perspective. Write failures are logged
//! and swallowed; no read path feeds back into orchestration decisions.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, session_id: Uuid, event_type: &str, payload: Value);
}

// ────────────────────────────────────────────────────────────────────────────
// PostgreSQL sink
// ────────────────────────────────────────────────────────────────────────────

pub struct PgAuditSink {
    pool: PgPool,
}

impl PgAuditSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditSink for PgAuditSink {
    async fn record(&self, session_id: Uuid, event_type: &str, payload: Value) {
        let result = sqlx::query(
            r#"
            INSERT INTO interview_audit_events (id, session_id, event_type, payload, created_at)
            VALUES ($1, $2, $3, $4, NOW())
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(session_id)
        .bind(event_type)
        .bind(&payload)
        .execute(&self.pool)
        .await;

        // Session flow continues regardless of audit availability.
        if let Err(e) = result {
            warn!("Audit write failed for session {session_id} ({event_type}): {e}");
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Recording sink (tests)
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingAuditSink {
    pub events: std::sync::Mutex<Vec<(Uuid, String, Value)>>,
}

impl RecordingAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn event_types(&self) -> Vec<String> {
        self.events
            .lock()
            .expect("audit log poisoned")
            .iter()
            .map(|(_, event_type, _)| event_type.clone())
            .collect()
    }
}

#[async_trait]
impl AuditSink for RecordingAuditSink {
    async fn record(&self, session_id: Uuid, event_type: &str, payload: Value) {
        self.events
            .lock()
            .expect("audit log poisoned")
            .push((session_id, event_type.to_string(), payload));
    }
}
