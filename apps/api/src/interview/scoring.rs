//! Answer scoring and rolling fit computation.
//!
//! The raw score is deliberately length-based: a proxy for "did the candidate
//! elaborate", not for content quality. Fit stays uncomputed until three
//! answers exist, then tracks the rolling 3-answer average as a 0-100
//! percentage with a trend delta.

use serde::{Deserialize, Serialize};

use crate::bank::{self, QuestionBank};
use crate::interview::summary::{band_for_average, Band};
use crate::interview::turn_state::TurnState;

/// Words for a "full" answer; 20+ words scores the 5.0 ceiling.
const FULL_ANSWER_WORDS: f64 = 20.0;
const MAX_SCORE: f64 = 5.0;

const TREND_THRESHOLD: f64 = 0.5;
const HIGH_CONFIDENCE_MIN_ANSWERS: usize = 8;
const HIGH_CONFIDENCE_VARIANCE: f64 = 0.3;
const MEDIUM_CONFIDENCE_VARIANCE: f64 = 0.7;

/// Scores a raw answer into [0.0, 5.0]. Blank answers score 0.0.
pub fn score_answer(answer: &str) -> f64 {
    let words = answer.split_whitespace().count() as f64;
    ((words / FULL_ANSWER_WORDS) * MAX_SCORE).clamp(0.0, MAX_SCORE)
}

/// Mean of the last `min(n, len)` entries; 0.0 for an empty slice.
pub fn average_last(scores: &[f64], n: usize) -> f64 {
    if scores.is_empty() || n == 0 {
        return 0.0;
    }
    let window = &scores[scores.len().saturating_sub(n)..];
    window.iter().sum::<f64>() / window.len() as f64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitTrend {
    Improving,
    Declining,
    Flat,
}

/// Rolling fit over the score history. Undefined (all `None`) until three
/// answers have been recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitComputation {
    pub computed: bool,
    pub fit_score: Option<u32>,
    pub trend: Option<FitTrend>,
}

impl FitComputation {
    fn uncomputed() -> Self {
        FitComputation {
            computed: false,
            fit_score: None,
            trend: None,
        }
    }
}

pub fn compute_fit(scores: &[f64]) -> FitComputation {
    let answered = scores.len();
    if answered < 3 {
        return FitComputation::uncomputed();
    }

    let last1 = average_last(scores, 1);
    let last3 = average_last(scores, 3);
    let last5 = average_last(scores, 5);

    let fit_score = ((last3 / MAX_SCORE) * 100.0).clamp(0.0, 100.0).round() as u32;

    let delta = if answered >= 5 {
        last3 - last5
    } else {
        last1 - last3
    };

    let trend = if delta >= TREND_THRESHOLD {
        FitTrend::Improving
    } else if delta <= -TREND_THRESHOLD {
        FitTrend::Declining
    } else {
        FitTrend::Flat
    };

    FitComputation {
        computed: true,
        fit_score: Some(fit_score),
        trend: Some(trend),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FitConfidence {
    Low,
    Medium,
    High,
}

/// Confidence in the fit figure, from answer volume and window stability.
pub fn fit_confidence(scores: &[f64]) -> FitConfidence {
    let answered = scores.len();
    if answered < 3 {
        return FitConfidence::Low;
    }
    let variance = (average_last(scores, 3) - average_last(scores, 5)).abs();
    if answered >= HIGH_CONFIDENCE_MIN_ANSWERS && variance < HIGH_CONFIDENCE_VARIANCE {
        FitConfidence::High
    } else if variance < MEDIUM_CONFIDENCE_VARIANCE {
        FitConfidence::Medium
    } else {
        FitConfidence::Low
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Per-dimension breakdown
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionBreakdown {
    pub key: String,
    pub label: String,
    pub score_percent: u32,
    pub band: Band,
    pub insights: Vec<String>,
}

/// Groups answered turns by the derived ID's dimension prefix (intro turns
/// excluded) and reports each dimension's rolling figures in bank order.
pub fn dimension_breakdown(state: &TurnState, question_bank: &QuestionBank) -> Vec<DimensionBreakdown> {
    // Answered turns pair with scores positionally; both are insertion-ordered.
    let answered: Vec<(&str, f64)> = state
        .qa_history
        .iter()
        .filter(|turn| turn.answer.is_some())
        .zip(state.scores.iter())
        .map(|(turn, score)| (turn.question_id.as_str(), *score))
        .collect();

    question_bank
        .dimensions
        .iter()
        .filter_map(|dim| {
            let dim_scores: Vec<f64> = answered
                .iter()
                .filter(|(id, _)| bank::dimension_of(id) == Some(dim.key.as_str()))
                .map(|(_, score)| *score)
                .collect();
            if dim_scores.is_empty() {
                return None;
            }
            let average = dim_scores.iter().sum::<f64>() / dim_scores.len() as f64;
            Some(DimensionBreakdown {
                key: dim.key.clone(),
                label: dim.name.clone(),
                score_percent: ((average / MAX_SCORE) * 100.0).clamp(0.0, 100.0).round() as u32,
                band: band_for_average(average),
                insights: dimension_insights(&dim_scores, average),
            })
        })
        .collect()
}

fn dimension_insights(scores: &[f64], average: f64) -> Vec<String> {
    let mut insights = Vec::new();
    if scores.len() == 1 {
        insights.push("Single answer so far; treat as provisional".to_string());
    }
    if average >= 4.0 {
        insights.push("Consistently detailed answers".to_string());
    } else if average < 2.0 {
        insights.push("Answers in this area need more depth".to_string());
    }
    insights
}
