//! Tone and affect collaborators. The engine treats these as black boxes
//! returning a coarse label plus an intensity; the defaults here are lexical
//! keyword counters. A remote classifier can be swapped in behind the trait
//! (carried in `AppState` as `Arc<dyn SignalClassifier>`) without touching
//! the engine.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The shape every classifier returns: a coarse label, a short human-readable
/// reason, and an intensity in 0..=100.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalReading {
    pub label: String,
    pub reason_text: String,
    pub intensity: i64,
}

/// A collaborator that classifies one answer. Never retried on failure;
/// implementations must always return a reading.
#[async_trait]
pub trait SignalClassifier: Send + Sync {
    async fn classify(&self, answer: &str) -> SignalReading;
}

// ────────────────────────────────────────────────────────────────────────────
// Lexical tone classifier
// ────────────────────────────────────────────────────────────────────────────

const POSITIVE_CUES: &[&str] = &[
    "enjoy", "excited", "proud", "great", "love", "confident", "opportunity", "thrilled",
];

const NEGATIVE_CUES: &[&str] = &[
    "frustrated",
    "hate",
    "worried",
    "unfortunately",
    "blame",
    "failed",
    "stressful",
    "annoyed",
];

/// Keyword-counting tone classifier. Labels: POSITIVE / NEUTRAL / NEGATIVE.
pub struct LexicalToneClassifier;

#[async_trait]
impl SignalClassifier for LexicalToneClassifier {
    async fn classify(&self, answer: &str) -> SignalReading {
        let lower = answer.to_lowercase();
        let positive = POSITIVE_CUES.iter().filter(|c| lower.contains(*c)).count();
        let negative = NEGATIVE_CUES.iter().filter(|c| lower.contains(*c)).count();

        let (label, hits) = if negative > positive {
            ("NEGATIVE", negative)
        } else if positive > negative {
            ("POSITIVE", positive)
        } else {
            ("NEUTRAL", positive)
        };

        SignalReading {
            label: label.to_string(),
            reason_text: format!("{hits} tone cue(s) matched"),
            intensity: (hits as i64 * 25).min(100),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Lexical affect (energy) classifier
// ────────────────────────────────────────────────────────────────────────────

/// Energy classifier from answer shape: length and emphasis.
/// Labels: HIGH / MEDIUM / LOW.
pub struct LexicalAffectClassifier;

#[async_trait]
impl SignalClassifier for LexicalAffectClassifier {
    async fn classify(&self, answer: &str) -> SignalReading {
        let words = answer.split_whitespace().count();
        let emphatic = answer.contains('!');

        let (label, intensity) = if words >= 60 || emphatic {
            ("HIGH", 80)
        } else if words >= 20 {
            ("MEDIUM", 50)
        } else {
            ("LOW", 20)
        };

        SignalReading {
            label: label.to_string(),
            reason_text: format!("{words} words, emphatic: {emphatic}"),
            intensity,
        }
    }
}
