mod audit;
mod bank;
mod classifiers;
mod config;
mod db;
mod errors;
mod interview;
mod routes;
mod state;
mod store;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::audit::PgAuditSink;
use crate::classifiers::{LexicalAffectClassifier, LexicalToneClassifier};
use crate::config::Config;
use crate::db::create_pool;
use crate::interview::engine::InterviewEngine;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::PgSessionStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (panics on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Parley API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let pool = create_pool(&config.database_url, config.db_max_connections).await?;

    // Load the question bank once; absence or an empty intro pool is fatal
    let question_bank = bank::load_shared(&config.question_bank_path)
        .await
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    // Wire the engine: Postgres-backed store and audit sink, lexical
    // tone/affect classifiers
    let store: Arc<dyn store::SessionStore> = Arc::new(PgSessionStore::new(pool.clone()));
    let engine = Arc::new(InterviewEngine::new(
        question_bank,
        store.clone(),
        Arc::new(PgAuditSink::new(pool.clone())),
        Arc::new(LexicalToneClassifier),
        Arc::new(LexicalAffectClassifier),
        config.enable_delivery_score,
    ));
    info!(
        "Interview engine initialized (delivery score: {})",
        config.enable_delivery_score
    );

    // Build app state
    let state = AppState {
        db: pool,
        config: config.clone(),
        engine,
        store,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
