//! Candidate summary aggregator: folds each new answer into a capped,
//! deduplicated rolling summary of strengths, growth areas, and behavioural
//! signals, then regenerates the narrative from scratch.
//!
//! Pure function of (previous summary, answer, tone, affect, flags). Never
//! rolls back or diffs against history beyond what the summary itself holds.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::classifiers::SignalReading;

const MAX_STRENGTHS: usize = 5;
const MAX_GROWTH_AREAS: usize = 5;
const MAX_SIGNALS: usize = 8;
const MAX_EVIDENCE: usize = 3;
const MAX_NARRATIVE_SENTENCES: usize = 6;

const BREVITY_WORD_THRESHOLD: usize = 20;
const UNIQUENESS_THRESHOLD: f64 = 0.55;

const ANSWER_SHORT_LIMIT: usize = 180;
const ANSWER_SHORT_TRUNCATED: usize = 177;

const STRENGTH_METRICS: &str = "Measures impact with metrics";
const STRENGTH_OWNERSHIP: &str = "Takes ownership of outcomes";
const GROWTH_BREVITY: &str = "Needs more depth";
const GROWTH_SPECIFICITY: &str = "Low specificity";

const SIGNAL_METRICS: &str = "Evidence of metrics";
const SIGNAL_STAKEHOLDER: &str = "Stakeholder management";
const SIGNAL_BREVITY: &str = "Brevity";

/// Numbers followed by a percent sign, magnitude suffix, or time unit.
static METRIC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\d+(?:\.\d+)?\s*(?:%|percent|k\b|m\b|thousand|million|billion|years?|months?|weeks?|days?|hours?|minutes?|seconds?)",
    )
    .expect("metric regex is valid")
});

static OWNERSHIP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:own|owned|ownership|responsible|accountable)\b")
        .expect("ownership regex is valid")
});

const STAKEHOLDER_CUES: &[&str] = &["stakeholder", "partner", "collaborat", "team"];

// ────────────────────────────────────────────────────────────────────────────
// Data model
// ────────────────────────────────────────────────────────────────────────────

/// Coarse qualitative tier from the rolling 3-answer average.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Band {
    #[default]
    Foundational,
    Emerging,
    Solid,
    Strong,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalConfidence {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummarySignal {
    pub label: String,
    pub confidence: SignalConfidence,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub question: String,
    pub answer_short: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandidateSummary {
    pub strengths: Vec<String>,
    pub growth_areas: Vec<String>,
    pub signals: Vec<SummarySignal>,
    pub evidence_last3: Vec<EvidenceItem>,
    pub band: Band,
    pub narrative: String,
    pub answered_count: u32,
    pub delivery_score: Option<i64>,
}

impl CandidateSummary {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parses a persisted summary blob; malformed state is treated as
    /// "no prior summary", never an error.
    pub fn from_value(value: &Value) -> Self {
        if value.is_null() {
            return Self::empty();
        }
        serde_json::from_value(value.clone()).unwrap_or_else(|e| {
            warn!("Malformed persisted summary, resetting: {e}");
            Self::empty()
        })
    }
}

/// Band thresholds over the rolling 3-answer average (0-5 scale).
/// Non-positive averages are treated as 2.0.
pub fn band_for_average(average: f64) -> Band {
    let average = if average <= 0.0 { 2.0 } else { average };
    if average >= 4.2 {
        Band::Strong
    } else if average >= 3.2 {
        Band::Solid
    } else if average >= 2.2 {
        Band::Emerging
    } else {
        Band::Foundational
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Aggregation
// ────────────────────────────────────────────────────────────────────────────

/// Inputs for folding one answered turn into the summary.
pub struct AnswerSignals<'a> {
    pub answer: &'a str,
    pub question: &'a str,
    pub tone: &'a SignalReading,
    pub affect: &'a SignalReading,
    pub last3_average: f64,
    pub delivery_enabled: bool,
}

/// Folds a non-blank answer into the previous summary state. Extraction
/// rules are evaluated independently; any subset may fire per answer.
pub fn fold_answer(mut summary: CandidateSummary, ctx: &AnswerSignals<'_>) -> CandidateSummary {
    let lower = ctx.answer.to_lowercase();
    let word_count = ctx.answer.split_whitespace().count();

    if METRIC_RE.is_match(ctx.answer) {
        summary.strengths.push(STRENGTH_METRICS.to_string());
        summary.signals.push(SummarySignal {
            label: SIGNAL_METRICS.to_string(),
            confidence: SignalConfidence::High,
        });
    }

    if OWNERSHIP_RE.is_match(ctx.answer) {
        summary.strengths.push(STRENGTH_OWNERSHIP.to_string());
    }

    if STAKEHOLDER_CUES.iter().any(|cue| lower.contains(cue)) {
        summary.signals.push(SummarySignal {
            label: SIGNAL_STAKEHOLDER.to_string(),
            confidence: SignalConfidence::Medium,
        });
    }

    if word_count < BREVITY_WORD_THRESHOLD {
        summary.growth_areas.push(GROWTH_BREVITY.to_string());
        summary.signals.push(SummarySignal {
            label: SIGNAL_BREVITY.to_string(),
            confidence: SignalConfidence::Medium,
        });
    }

    if uniqueness_ratio(ctx.answer) < UNIQUENESS_THRESHOLD {
        summary.growth_areas.push(GROWTH_SPECIFICITY.to_string());
    }

    dedup_and_cap(&mut summary.strengths, MAX_STRENGTHS);
    dedup_and_cap(&mut summary.growth_areas, MAX_GROWTH_AREAS);
    dedup_and_cap_signals(&mut summary.signals, MAX_SIGNALS);

    summary.evidence_last3.push(EvidenceItem {
        question: ctx.question.to_string(),
        answer_short: truncate_answer(ctx.answer),
    });
    while summary.evidence_last3.len() > MAX_EVIDENCE {
        summary.evidence_last3.remove(0);
    }

    summary.band = band_for_average(ctx.last3_average);
    summary.answered_count += 1;
    summary.delivery_score = delivery_score(ctx.tone, ctx.affect, ctx.delivery_enabled);
    summary.narrative = build_narrative(&summary, &ctx.tone.label);

    summary
}

/// Unique tokens over total tokens, after stripping non-alphanumerics.
/// Returns 1.0 for answers with no tokens (never counted as low-specificity).
fn uniqueness_ratio(answer: &str) -> f64 {
    let tokens: Vec<String> = answer
        .split_whitespace()
        .map(|word| {
            word.chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
                .to_lowercase()
        })
        .filter(|token| !token.is_empty())
        .collect();
    if tokens.is_empty() {
        return 1.0;
    }
    let unique: std::collections::HashSet<&String> = tokens.iter().collect();
    unique.len() as f64 / tokens.len() as f64
}

fn truncate_answer(answer: &str) -> String {
    if answer.chars().count() > ANSWER_SHORT_LIMIT {
        let short: String = answer.chars().take(ANSWER_SHORT_TRUNCATED).collect();
        format!("{short}...")
    } else {
        answer.to_string()
    }
}

/// Dedup preserving first-seen order, then drop the oldest past the cap.
fn dedup_and_cap(items: &mut Vec<String>, cap: usize) {
    let mut seen = std::collections::HashSet::new();
    items.retain(|item| seen.insert(item.clone()));
    while items.len() > cap {
        items.remove(0);
    }
}

/// Signals are deduplicated by label.
fn dedup_and_cap_signals(signals: &mut Vec<SummarySignal>, cap: usize) {
    let mut seen = std::collections::HashSet::new();
    signals.retain(|signal| seen.insert(signal.label.clone()));
    while signals.len() > cap {
        signals.remove(0);
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Delivery score (feature-flagged)
// ────────────────────────────────────────────────────────────────────────────

/// `100 - penalty`, clamped at 0. Negative tone penalizes up to 40; other
/// tones a fifth of intensity. Low affect adds 30, medium adds 10.
/// `None` entirely when the feature is disabled.
pub fn delivery_score(
    tone: &SignalReading,
    affect: &SignalReading,
    enabled: bool,
) -> Option<i64> {
    if !enabled {
        return None;
    }
    let mut penalty = if tone.label == "NEGATIVE" {
        (tone.intensity / 2).min(40)
    } else {
        tone.intensity / 5
    };
    penalty += match affect.label.as_str() {
        "LOW" => 30,
        "MEDIUM" => 10,
        _ => 0,
    };
    Some((100 - penalty).max(0))
}

// ────────────────────────────────────────────────────────────────────────────
// Narrative
// ────────────────────────────────────────────────────────────────────────────

/// Five fixed-template sentences, regenerated in full each turn.
fn build_narrative(summary: &CandidateSummary, tone_label: &str) -> String {
    let band_sentence = match summary.band {
        Band::Strong => "The candidate is performing at a strong level across recent answers.",
        Band::Solid => "The candidate is performing at a solid level across recent answers.",
        Band::Emerging => "The candidate shows emerging capability with room to grow.",
        Band::Foundational => {
            "The candidate is at a foundational level and needs substantial development."
        }
    }
    .to_string();

    let strengths_sentence = if summary.strengths.is_empty() {
        "No distinct strengths have surfaced yet.".to_string()
    } else {
        format!("Notable strengths: {}.", summary.strengths.join(", "))
    };

    let growth_sentence = if summary.growth_areas.is_empty() {
        "No growth areas flagged so far.".to_string()
    } else {
        format!("Growth areas: {}.", summary.growth_areas.join(", "))
    };

    let signals_sentence = if summary.signals.is_empty() {
        "No behavioural signals recorded yet.".to_string()
    } else {
        let labels: Vec<&str> = summary.signals.iter().map(|s| s.label.as_str()).collect();
        format!("Signals observed: {}.", labels.join(", "))
    };

    let closing_sentence = match tone_label {
        "NEGATIVE" => "Recent answers carry a tense tone worth addressing.",
        "POSITIVE" => "Recent answers carry an upbeat, engaged tone.",
        _ => "Recent answers keep an even, neutral tone.",
    }
    .to_string();

    let sentences = truncate_sentences(vec![
        band_sentence,
        strengths_sentence,
        growth_sentence,
        signals_sentence,
        closing_sentence,
    ]);
    sentences.join(" ")
}

/// Safety net: fixed templates cannot exceed five sentences, but anything
/// past six is truncated rather than emitted.
fn truncate_sentences(mut sentences: Vec<String>) -> Vec<String> {
    sentences.truncate(MAX_NARRATIVE_SENTENCES);
    sentences
}

#[cfg(test)]
mod tests {
    use super::*;

    fn neutral_tone() -> SignalReading {
        SignalReading {
            label: "NEUTRAL".to_string(),
            reason_text: "test".to_string(),
            intensity: 0,
        }
    }

    fn reading(label: &str, intensity: i64) -> SignalReading {
        SignalReading {
            label: label.to_string(),
            reason_text: "test".to_string(),
            intensity,
        }
    }

    fn fold(summary: CandidateSummary, answer: &str) -> CandidateSummary {
        fold_answer(
            summary,
            &AnswerSignals {
                answer,
                question: "Tell me more.",
                tone: &neutral_tone(),
                affect: &reading("MEDIUM", 50),
                last3_average: 3.0,
                delivery_enabled: false,
            },
        )
    }

    #[test]
    fn test_metric_and_stakeholder_extraction() {
        // Contains "40%" (metric) and "team" (stakeholder); "led" is not an
        // ownership keyword.
        let summary = fold(
            CandidateSummary::empty(),
            "I led the migration and reduced latency by 40% for our team",
        );
        assert!(summary.strengths.contains(&STRENGTH_METRICS.to_string()));
        assert!(!summary.strengths.contains(&STRENGTH_OWNERSHIP.to_string()));
        assert!(summary.signals.contains(&SummarySignal {
            label: SIGNAL_METRICS.to_string(),
            confidence: SignalConfidence::High,
        }));
        assert!(summary.signals.contains(&SummarySignal {
            label: SIGNAL_STAKEHOLDER.to_string(),
            confidence: SignalConfidence::Medium,
        }));
    }

    #[test]
    fn test_ownership_keyword_matches_whole_words_only() {
        let hit = fold(CandidateSummary::empty(), "I owned the rollout end to end");
        assert!(hit.strengths.contains(&STRENGTH_OWNERSHIP.to_string()));

        // "known" and "download" must not trip the ownership rule
        let miss = fold(
            CandidateSummary::empty(),
            "It is known that the download was slow",
        );
        assert!(!miss.strengths.contains(&STRENGTH_OWNERSHIP.to_string()));
    }

    #[test]
    fn test_metric_pattern_matches_time_units() {
        let summary = fold(CandidateSummary::empty(), "Delivered the project in 3 months");
        assert!(summary.strengths.contains(&STRENGTH_METRICS.to_string()));
    }

    #[test]
    fn test_short_answer_flags_brevity_and_specificity() {
        // Under 20 words and highly repetitive
        let summary = fold(CandidateSummary::empty(), "yes yes yes yes yes");
        assert!(summary.growth_areas.contains(&GROWTH_BREVITY.to_string()));
        assert!(summary.growth_areas.contains(&GROWTH_SPECIFICITY.to_string()));
        assert!(summary.signals.iter().any(|s| s.label == SIGNAL_BREVITY));
    }

    #[test]
    fn test_repeated_short_answers_dedup_growth_areas() {
        let mut summary = CandidateSummary::empty();
        for _ in 0..3 {
            // 7 tokens, 3 unique: under both the brevity and uniqueness bars
            summary = fold(summary, "it was fine fine fine fine fine");
        }
        // Dedup keeps one of each despite three turns
        assert_eq!(
            summary.growth_areas,
            vec![GROWTH_BREVITY.to_string(), GROWTH_SPECIFICITY.to_string()]
        );
        assert!(summary.growth_areas.len() <= 5);
    }

    #[test]
    fn test_caps_drop_oldest_first() {
        let mut summary = CandidateSummary::empty();
        summary.strengths = (0..5).map(|i| format!("strength {i}")).collect();
        // New metric strength appended, then capped: "strength 0" evicted
        summary = fold(
            summary,
            "We cut costs by 30% while keeping quality steady for all users involved here today",
        );
        assert_eq!(summary.strengths.len(), 5);
        assert!(!summary.strengths.contains(&"strength 0".to_string()));
        assert_eq!(summary.strengths.last().unwrap(), STRENGTH_METRICS);
    }

    #[test]
    fn test_signals_capped_at_eight_fifo() {
        let mut summary = CandidateSummary::empty();
        summary.signals = (0..8)
            .map(|i| SummarySignal {
                label: format!("signal {i}"),
                confidence: SignalConfidence::Low,
            })
            .collect();
        // Long enough to dodge the brevity signal; only the metric fires
        let answer = "Over the last two quarters I reduced our deployment time \
                      by 40% through careful automation of the release pipeline \
                      and steady incremental cleanup";
        summary = fold(summary, answer);
        assert_eq!(summary.signals.len(), 8);
        assert!(!summary.signals.iter().any(|s| s.label == "signal 0"));
        assert_eq!(summary.signals.last().unwrap().label, SIGNAL_METRICS);

        // Re-folding the same answer dedups by label: no growth, no eviction
        summary = fold(summary, answer);
        assert_eq!(summary.signals.len(), 8);
        assert!(summary.signals.iter().any(|s| s.label == "signal 1"));
        let metric_count = summary
            .signals
            .iter()
            .filter(|s| s.label == SIGNAL_METRICS)
            .count();
        assert_eq!(metric_count, 1);
    }

    #[test]
    fn test_growth_areas_capped_at_five_fifo() {
        let mut summary = CandidateSummary::empty();
        summary.growth_areas = (0..5).map(|i| format!("growth {i}")).collect();
        // Fires both brevity and specificity: the two oldest entries go
        summary = fold(summary, "it was fine fine fine fine fine");
        assert_eq!(summary.growth_areas.len(), 5);
        assert!(!summary.growth_areas.contains(&"growth 0".to_string()));
        assert!(!summary.growth_areas.contains(&"growth 1".to_string()));
        assert_eq!(summary.growth_areas[3], GROWTH_BREVITY);
        assert_eq!(summary.growth_areas[4], GROWTH_SPECIFICITY);
    }

    #[test]
    fn test_evidence_capped_at_three_fifo() {
        let mut summary = CandidateSummary::empty();
        for i in 0..5 {
            summary = fold_answer(
                summary,
                &AnswerSignals {
                    answer: "a reasonably detailed answer about the work we did together",
                    question: &format!("Question {i}"),
                    tone: &neutral_tone(),
                    affect: &reading("MEDIUM", 50),
                    last3_average: 3.0,
                    delivery_enabled: false,
                },
            );
        }
        assert_eq!(summary.evidence_last3.len(), 3);
        assert_eq!(summary.evidence_last3[0].question, "Question 2");
        assert_eq!(summary.evidence_last3[2].question, "Question 4");
    }

    #[test]
    fn test_answer_short_truncated_past_180_chars() {
        let long = "x".repeat(200);
        let summary = fold(CandidateSummary::empty(), &long);
        let short = &summary.evidence_last3[0].answer_short;
        assert_eq!(short.chars().count(), 180); // 177 + "..."
        assert!(short.ends_with("..."));

        let exact = "y".repeat(180);
        let summary = fold(CandidateSummary::empty(), &exact);
        assert_eq!(summary.evidence_last3[0].answer_short, exact);
    }

    #[test]
    fn test_band_thresholds() {
        assert_eq!(band_for_average(4.2), Band::Strong);
        assert_eq!(band_for_average(4.19), Band::Solid);
        assert_eq!(band_for_average(3.2), Band::Solid);
        assert_eq!(band_for_average(2.2), Band::Emerging);
        assert_eq!(band_for_average(2.1), Band::Foundational);
    }

    #[test]
    fn test_band_non_positive_treated_as_two() {
        assert_eq!(band_for_average(0.0), Band::Foundational);
        assert_eq!(band_for_average(-1.0), Band::Foundational);
    }

    #[test]
    fn test_narrative_has_five_sentences_with_fallbacks() {
        let summary = fold(CandidateSummary::empty(), "short answer here here");
        // band + strengths-fallback + growth + signals + closing
        assert!(summary
            .narrative
            .contains("No distinct strengths have surfaced yet."));
        assert!(summary.narrative.contains("Growth areas:"));
        assert!(summary
            .narrative
            .contains("Recent answers keep an even, neutral tone."));
        assert!(summary.narrative.matches('.').count() >= 5);
    }

    #[test]
    fn test_narrative_regenerated_not_appended() {
        let first = fold(CandidateSummary::empty(), "short answer here here");
        let second = fold(first.clone(), "short answer here here");
        // Same inputs, same narrative: no accretion across turns
        assert_eq!(first.narrative, second.narrative);
    }

    #[test]
    fn test_sentence_guard_truncates_past_six() {
        let sentences: Vec<String> = (0..9).map(|i| format!("Sentence {i}.")).collect();
        assert_eq!(truncate_sentences(sentences).len(), 6);
    }

    #[test]
    fn test_delivery_score_disabled_is_none() {
        assert_eq!(
            delivery_score(&reading("NEGATIVE", 100), &reading("LOW", 20), false),
            None
        );
    }

    #[test]
    fn test_delivery_score_negative_tone_capped_at_40() {
        // intensity 100 / 2 = 50, capped to 40; affect HIGH adds nothing
        assert_eq!(
            delivery_score(&reading("NEGATIVE", 100), &reading("HIGH", 80), true),
            Some(60)
        );
    }

    #[test]
    fn test_delivery_score_other_tone_fifth_of_intensity() {
        // 50/5 = 10 tone penalty, +10 medium affect
        assert_eq!(
            delivery_score(&reading("POSITIVE", 50), &reading("MEDIUM", 50), true),
            Some(80)
        );
    }

    #[test]
    fn test_delivery_score_worst_case_stays_non_negative() {
        // 40 (negative, capped) + 30 (low affect) = 70 penalty
        assert_eq!(
            delivery_score(&reading("NEGATIVE", 100), &reading("LOW", 20), true),
            Some(30)
        );
    }

    #[test]
    fn test_from_value_malformed_is_empty_summary() {
        let summary = CandidateSummary::from_value(&serde_json::json!({"strengths": 42}));
        assert!(summary.strengths.is_empty());
        assert_eq!(summary.answered_count, 0);
    }

    #[test]
    fn test_answered_count_moves_forward() {
        let mut summary = CandidateSummary::empty();
        for _ in 0..4 {
            summary = fold(summary, "a perfectly ordinary answer with some details in it");
        }
        assert_eq!(summary.answered_count, 4);
    }
}
