//! Question bank: the static catalog of competency dimensions and their
//! opening/probe/challenge pools, plus the ungrouped intro pool.
//!
//! Question identity is derived, never stored: `dimension:pool:index` for
//! dimension questions, `INTRO_0001`-style for intro questions. That keeps
//! IDs stable across reloads, which makes pool ordering part of the bank
//! document's public contract: reordering a pool silently changes what every
//! persisted `asked_question_ids` entry means. Edit banks by appending.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::info;

use crate::errors::AppError;

/// Prefix for IDs synthesized from the ungrouped intro pool.
pub const INTRO_ID_PREFIX: &str = "INTRO_";

/// Which pool within a dimension a question belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolType {
    Opening,
    Probe,
    Challenge,
}

impl PoolType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PoolType::Opening => "opening",
            PoolType::Probe => "probe",
            PoolType::Challenge => "challenge",
        }
    }
}

/// The three question pools of a dimension.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuestionPools {
    #[serde(default)]
    pub opening: Vec<String>,
    #[serde(default)]
    pub probe: Vec<String>,
    #[serde(default)]
    pub challenge: Vec<String>,
}

impl QuestionPools {
    pub fn pool(&self, pool_type: PoolType) -> &[String] {
        match pool_type {
            PoolType::Opening => &self.opening,
            PoolType::Probe => &self.probe,
            PoolType::Challenge => &self.challenge,
        }
    }
}

/// A named competency category with its own question pools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dimension {
    pub key: String,
    pub name: String,
    #[serde(rename = "questions")]
    pub pools: QuestionPools,
}

/// The full, immutable question bank. Loaded once per process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionBank {
    pub dimensions: Vec<Dimension>,
    #[serde(default)]
    pub intro: Vec<String>,
}

impl QuestionBank {
    /// Parses a bank document and validates the startup invariants.
    /// An empty intro pool is a fatal configuration error: opening selection
    /// relies on it as the final fallback.
    pub fn from_json(raw: &str) -> Result<Self, AppError> {
        let bank: QuestionBank = serde_json::from_str(raw)
            .map_err(|e| AppError::Configuration(format!("Invalid question bank JSON: {e}")))?;
        bank.validate()?;
        Ok(bank)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.intro.is_empty() {
            return Err(AppError::Configuration(
                "Question bank must ship at least one intro question".to_string(),
            ));
        }
        for dim in &self.dimensions {
            if dim.key.is_empty() || dim.key.contains(':') {
                return Err(AppError::Configuration(format!(
                    "Invalid dimension key '{}': must be non-empty and colon-free",
                    dim.key
                )));
            }
        }
        Ok(())
    }

    pub fn dimension(&self, key: &str) -> Option<&Dimension> {
        self.dimensions.iter().find(|d| d.key == key)
    }

    /// Total number of derivable question IDs (intro included). A session is
    /// complete once `asked_question_ids` covers all of them.
    pub fn total_questions(&self) -> usize {
        self.intro.len()
            + self
                .dimensions
                .iter()
                .map(|d| d.pools.opening.len() + d.pools.probe.len() + d.pools.challenge.len())
                .sum::<usize>()
    }
}

/// Derived question identity: `dimensionKey:poolType:indexInPool`.
/// Pure and stable across calls and process restarts for a fixed bank.
pub fn derive_id(dimension_key: &str, pool_type: PoolType, index: usize) -> String {
    format!("{dimension_key}:{}:{index}", pool_type.as_str())
}

/// Derived intro identity: `INTRO_0001`, `INTRO_0002`, ... (1-based).
pub fn intro_id(index: usize) -> String {
    format!("{INTRO_ID_PREFIX}{:04}", index + 1)
}

pub fn is_intro_id(question_id: &str) -> bool {
    question_id.starts_with(INTRO_ID_PREFIX)
}

/// Dimension-key prefix of a derived ID; `None` for intro IDs.
pub fn dimension_of(question_id: &str) -> Option<&str> {
    if is_intro_id(question_id) {
        return None;
    }
    question_id.split(':').next().filter(|k| !k.is_empty())
}

// ────────────────────────────────────────────────────────────────────────────
// Process-wide cached load
// ────────────────────────────────────────────────────────────────────────────

static SHARED_BANK: OnceCell<Arc<QuestionBank>> = OnceCell::const_new();

/// Loads the question bank from disk, caching the result for the process
/// lifetime. Concurrent first calls collapse to a single read; subsequent
/// calls return the cached bank.
pub async fn load_shared(path: &str) -> Result<Arc<QuestionBank>, AppError> {
    let bank = SHARED_BANK
        .get_or_try_init(|| async { load_from_path(Path::new(path)).await.map(Arc::new) })
        .await?;
    Ok(Arc::clone(bank))
}

async fn load_from_path(path: &Path) -> Result<QuestionBank, AppError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read question bank at {}", path.display()))
        .map_err(|e| AppError::Configuration(format!("{e:#}")))?;
    let bank = QuestionBank::from_json(&raw)?;
    info!(
        "Question bank loaded: {} dimensions, {} intro questions, {} total questions",
        bank.dimensions.len(),
        bank.intro.len(),
        bank.total_questions()
    );
    Ok(bank)
}
