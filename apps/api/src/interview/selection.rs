//! Question selection: given the asked-ID set, the current decision mode, and
//! an optional dimension priority list, pick the next unseen question or
//! signal completion.
//!
//! Externally recorded decisions are only `opening`, `probe`, or `complete`.
//! The challenge pool is reached as a fallback inside probe selection; a
//! challenge current-mode searches only the challenge pools (no fallback).

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::bank::{self, Dimension, PoolType, QuestionBank};
use crate::errors::AppError;

/// Externally surfaced decision for a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionMode {
    Opening,
    Probe,
    Complete,
}

/// A freshly selected, not-yet-asked question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectedQuestion {
    pub id: String,
    pub text: String,
    /// Dimension key; `None` for intro questions.
    pub dimension: Option<String>,
    /// Whether the dimension appeared in the external priority list.
    /// Surfaced for audit; does not change ranking beyond ordering.
    pub priority_matched: bool,
}

/// The mode for a call: opening only on the very first turn of a session.
pub fn decision_mode(question_count: u32, answered_count: usize) -> DecisionMode {
    if question_count == 0 && answered_count == 0 {
        DecisionMode::Opening
    } else {
        DecisionMode::Probe
    }
}

/// Opening selection: prioritized dimensions' opening pools first, intro pool
/// as fallback. `Ok(None)` means every candidate has been asked and the
/// caller must treat the session as complete.
pub fn select_opening(
    question_bank: &QuestionBank,
    asked: &HashSet<String>,
    priorities: &[String],
) -> Result<Option<SelectedQuestion>, AppError> {
    for dim in priority_dimensions(question_bank, priorities) {
        for (index, text) in dim.pools.opening.iter().enumerate() {
            let id = bank::derive_id(&dim.key, PoolType::Opening, index);
            if !asked.contains(&id) {
                return Ok(Some(SelectedQuestion {
                    id,
                    text: text.clone(),
                    dimension: Some(dim.key.clone()),
                    priority_matched: true,
                }));
            }
        }
    }

    // The bank must always ship at least one intro question; load-time
    // validation enforces this, so an empty pool here is a broken bank.
    if question_bank.intro.is_empty() {
        return Err(AppError::Configuration(
            "Question bank intro pool is empty".to_string(),
        ));
    }

    for (index, text) in question_bank.intro.iter().enumerate() {
        let id = bank::intro_id(index);
        if !asked.contains(&id) {
            return Ok(Some(SelectedQuestion {
                id,
                text: text.clone(),
                dimension: None,
                priority_matched: false,
            }));
        }
    }

    Ok(None)
}

/// Probe/challenge selection: nested scan over a type search order and a
/// priority-first dimension order. `None` means the session is complete.
pub fn select_probe(
    question_bank: &QuestionBank,
    asked: &HashSet<String>,
    priorities: &[String],
    current_mode: PoolType,
) -> Option<SelectedQuestion> {
    let dimensions = ordered_dimensions(question_bank, priorities);
    let type_order = type_search_order(current_mode);

    for pool_type in type_order {
        for dim in &dimensions {
            for (index, text) in dim.pools.pool(pool_type).iter().enumerate() {
                let id = bank::derive_id(&dim.key, pool_type, index);
                if !asked.contains(&id) {
                    return Some(SelectedQuestion {
                        id,
                        text: text.clone(),
                        dimension: Some(dim.key.clone()),
                        priority_matched: priorities.iter().any(|p| p == &dim.key),
                    });
                }
            }
        }
    }

    None
}

/// `[current, probe, challenge, opening]` deduplicated, except a challenge
/// current-mode searches only challenge pools.
fn type_search_order(current_mode: PoolType) -> Vec<PoolType> {
    if current_mode == PoolType::Challenge {
        return vec![PoolType::Challenge];
    }
    let mut order = vec![current_mode];
    for pool_type in [PoolType::Probe, PoolType::Challenge, PoolType::Opening] {
        if !order.contains(&pool_type) {
            order.push(pool_type);
        }
    }
    order
}

/// Prioritized dimensions in listed order, deduplicated; unknown keys skipped.
fn priority_dimensions<'a>(
    question_bank: &'a QuestionBank,
    priorities: &[String],
) -> Vec<&'a Dimension> {
    let mut seen = HashSet::new();
    priorities
        .iter()
        .filter(|key| seen.insert(key.as_str().to_string()))
        .filter_map(|key| question_bank.dimension(key))
        .collect()
}

/// Priority-listed dimensions first, then the remaining dimensions in bank
/// order.
fn ordered_dimensions<'a>(
    question_bank: &'a QuestionBank,
    priorities: &[String],
) -> Vec<&'a Dimension> {
    let mut ordered = priority_dimensions(question_bank, priorities);
    for dim in &question_bank.dimensions {
        if !ordered.iter().any(|d| d.key == dim.key) {
            ordered.push(dim);
        }
    }
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture_bank() -> QuestionBank {
        QuestionBank::from_json(
            r#"{
                "dimensions": [
                    {"key": "leadership", "name": "Leadership", "questions": {
                        "opening": ["L-open-0", "L-open-1"],
                        "probe": ["L-probe-0"],
                        "challenge": ["L-chal-0"]
                    }},
                    {"key": "communication", "name": "Communication", "questions": {
                        "opening": ["C-open-0"],
                        "probe": ["C-probe-0"],
                        "challenge": []
                    }}
                ],
                "intro": ["Intro-0", "Intro-1"]
            }"#,
        )
        .unwrap()
    }

    fn asked(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_mode_opening_only_on_first_call() {
        assert_eq!(decision_mode(0, 0), DecisionMode::Opening);
        assert_eq!(decision_mode(1, 0), DecisionMode::Probe);
        assert_eq!(decision_mode(1, 1), DecisionMode::Probe);
    }

    #[test]
    fn test_opening_prefers_priority_dimension() {
        let question_bank = fixture_bank();
        let selected = select_opening(
            &question_bank,
            &HashSet::new(),
            &["communication".to_string()],
        )
        .unwrap()
        .unwrap();
        assert_eq!(selected.id, "communication:opening:0");
        assert!(selected.priority_matched);
        assert_eq!(selected.dimension.as_deref(), Some("communication"));
    }

    #[test]
    fn test_opening_falls_back_to_intro_without_priorities() {
        let question_bank = fixture_bank();
        let selected = select_opening(&question_bank, &HashSet::new(), &[])
            .unwrap()
            .unwrap();
        assert_eq!(selected.id, "INTRO_0001");
        assert_eq!(selected.dimension, None);
        assert!(!selected.priority_matched);
    }

    #[test]
    fn test_opening_skips_asked_and_exhausted_priorities() {
        let question_bank = fixture_bank();
        let asked = asked(&["leadership:opening:0", "leadership:opening:1"]);
        let selected = select_opening(&question_bank, &asked, &["leadership".to_string()])
            .unwrap()
            .unwrap();
        // Priority dimension exhausted; intro next
        assert_eq!(selected.id, "INTRO_0001");
    }

    #[test]
    fn test_opening_unknown_priority_key_skipped() {
        let question_bank = fixture_bank();
        let selected = select_opening(
            &question_bank,
            &HashSet::new(),
            &["nonexistent".to_string(), "leadership".to_string()],
        )
        .unwrap()
        .unwrap();
        assert_eq!(selected.id, "leadership:opening:0");
    }

    #[test]
    fn test_opening_exhausted_returns_none() {
        let question_bank = fixture_bank();
        let asked = asked(&["INTRO_0001", "INTRO_0002"]);
        let selected = select_opening(&question_bank, &asked, &[]).unwrap();
        assert!(selected.is_none());
    }

    #[test]
    fn test_probe_scans_probe_pools_in_dimension_order() {
        let question_bank = fixture_bank();
        let selected = select_probe(&question_bank, &HashSet::new(), &[], PoolType::Probe).unwrap();
        assert_eq!(selected.id, "leadership:probe:0");
        assert!(!selected.priority_matched);
    }

    #[test]
    fn test_probe_priority_dimension_first() {
        let question_bank = fixture_bank();
        let selected = select_probe(
            &question_bank,
            &HashSet::new(),
            &["communication".to_string()],
            PoolType::Probe,
        )
        .unwrap();
        assert_eq!(selected.id, "communication:probe:0");
        assert!(selected.priority_matched);
    }

    #[test]
    fn test_probe_duplicate_priorities_deduplicated() {
        let question_bank = fixture_bank();
        let priorities = vec![
            "communication".to_string(),
            "communication".to_string(),
            "leadership".to_string(),
        ];
        let asked = asked(&["communication:probe:0"]);
        let selected = select_probe(&question_bank, &asked, &priorities, PoolType::Probe).unwrap();
        assert_eq!(selected.id, "leadership:probe:0");
    }

    #[test]
    fn test_probe_falls_back_to_challenge_then_opening() {
        let question_bank = fixture_bank();
        let probes_spent = asked(&["leadership:probe:0", "communication:probe:0"]);
        let selected = select_probe(&question_bank, &probes_spent, &[], PoolType::Probe).unwrap();
        assert_eq!(selected.id, "leadership:challenge:0");

        let challenges_spent = asked(&[
            "leadership:probe:0",
            "communication:probe:0",
            "leadership:challenge:0",
        ]);
        let selected =
            select_probe(&question_bank, &challenges_spent, &[], PoolType::Probe).unwrap();
        assert_eq!(selected.id, "leadership:opening:0");
    }

    #[test]
    fn test_challenge_mode_has_no_fallback() {
        let question_bank = fixture_bank();
        let asked = asked(&["leadership:challenge:0"]);
        // All challenge questions asked; probe/opening pools still unseen
        let selected = select_probe(&question_bank, &asked, &[], PoolType::Challenge);
        assert!(selected.is_none());
    }

    #[test]
    fn test_probe_exhausted_bank_returns_none() {
        let question_bank = fixture_bank();
        let asked = asked(&[
            "leadership:opening:0",
            "leadership:opening:1",
            "leadership:probe:0",
            "leadership:challenge:0",
            "communication:opening:0",
            "communication:probe:0",
        ]);
        let selected = select_probe(&question_bank, &asked, &[], PoolType::Probe);
        assert!(selected.is_none());
    }

    #[test]
    fn test_selection_never_repeats_asked_ids() {
        let question_bank = fixture_bank();
        let mut asked: HashSet<String> = HashSet::new();
        let mut served = 0usize;
        while let Some(selected) =
            select_probe(&question_bank, &asked, &[], PoolType::Probe)
        {
            assert!(!asked.contains(&selected.id), "repeated {}", selected.id);
            asked.insert(selected.id);
            served += 1;
        }
        // Intro pool is untouched by probe selection
        assert_eq!(served, 6);
        assert_eq!(asked.len(), served);
    }

    #[test]
    fn test_type_search_order_dedup() {
        assert_eq!(
            type_search_order(PoolType::Probe),
            vec![PoolType::Probe, PoolType::Challenge, PoolType::Opening]
        );
        assert_eq!(
            type_search_order(PoolType::Opening),
            vec![
                PoolType::Opening,
                PoolType::Probe,
                PoolType::Challenge
            ]
        );
        assert_eq!(type_search_order(PoolType::Challenge), vec![PoolType::Challenge]);
    }
}
