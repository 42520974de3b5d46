//! Score extraction and normalization.
//!
//! The vendor's result tree varies by category and account configuration:
//! the numeric fields sit behind a category-specific wrapper path, the
//! reported scale may be 0–10 or 0–100 without any announcement in the
//! response, and fluency/integrity are not reliably populated for every
//! category. This module resolves all of that into one [`NormalizedScore`]
//! with every field on a 0–100 scale, backfilling derived values where the
//! vendor omits them so callers never see nulls.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::core::eval::messages::{Category, Language};
use crate::core::eval::response::RawEvaluationResult;

/// Normalized pronunciation sub-scores, each clamped to [0, 100].
///
/// `tone_score` is populated only for Mandarin evaluations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedScore {
    pub total_score: f64,
    pub accuracy_score: f64,
    pub fluency_score: f64,
    pub integrity_score: f64,
    pub phone_score: f64,
    pub tone_score: f64,
}

impl NormalizedScore {
    /// True when every field is zero, the soft-failure shape produced when
    /// no matching sub-tree exists. Callers should treat it as suspect
    /// rather than display a literal zero score.
    pub fn is_empty(&self) -> bool {
        self.total_score == 0.0
            && self.accuracy_score == 0.0
            && self.fluency_score == 0.0
            && self.integrity_score == 0.0
            && self.phone_score == 0.0
            && self.tone_score == 0.0
    }
}

/// Extract and normalize scores from a decoded vendor result.
///
/// A missing sub-tree is a soft failure: it returns the all-zero score and
/// logs, rather than erroring.
pub fn extract_scores(raw: &RawEvaluationResult, language: Language) -> NormalizedScore {
    let Some(subtree) = raw.category_subtree() else {
        warn!(
            category = raw.category.result_key(),
            "no matching sub-tree in vendor result, returning empty scores"
        );
        return NormalizedScore::default();
    };
    let node = score_node(subtree, raw.category);

    let total_raw = numeric_field(node, "total_score");
    let accuracy_raw = numeric_field(node, "accuracy_score");
    let fluency_raw = numeric_field(node, "fluency_score");
    let integrity_raw = numeric_field(node, "integrity_score");

    // The vendor's scale varies by account configuration and is not
    // announced in the response. A small positive total means 0-10. A total
    // of exactly 10 is treated as 10/10, matching historical behavior.
    let multiplier = if total_raw > 0.0 && total_raw <= 10.0 {
        10.0
    } else {
        1.0
    };

    let total = total_raw * multiplier;
    let accuracy = accuracy_raw * multiplier;
    let fluency = if fluency_raw > 0.0 {
        fluency_raw * multiplier
    } else {
        total * 0.95
    };
    let integrity = if integrity_raw > 0.0 {
        integrity_raw * multiplier
    } else {
        total
    };
    let tone = if language.has_tones() { total * 0.9 } else { 0.0 };

    debug!(
        total,
        accuracy,
        scale_multiplier = multiplier,
        "extracted vendor scores"
    );

    NormalizedScore {
        total_score: clamp(total),
        accuracy_score: clamp(accuracy),
        fluency_score: clamp(fluency),
        integrity_score: clamp(integrity),
        // No independent phoneme signal is available.
        phone_score: clamp(accuracy),
        tone_score: clamp(tone),
    }
}

/// Descend through the vendor's `rec_paper` wrapper to the node holding the
/// numeric fields. Each level is optional; a flatter result shape falls back
/// to the level above.
fn score_node<'a>(subtree: &'a Value, category: Category) -> &'a Value {
    let paper = subtree.get("rec_paper").unwrap_or(subtree);
    paper.get(category.result_key()).unwrap_or(paper)
}

/// Read a numeric field that may be serialized as a number or a string
/// attribute; missing or unparseable values default to 0.
fn numeric_field(node: &Value, key: &str) -> f64 {
    match node.get(key) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn clamp(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn word_result(fields: Value) -> RawEvaluationResult {
        RawEvaluationResult {
            category: Category::Word,
            tree: json!({ "read_word": { "rec_paper": { "read_word": fields } } }),
        }
    }

    #[test]
    fn ten_point_scale_is_rescaled() {
        let raw = word_result(json!({ "total_score": "8.5", "accuracy_score": "8.0" }));
        let scores = extract_scores(&raw, Language::En);
        assert_eq!(scores.total_score, 85.0);
        assert_eq!(scores.accuracy_score, 80.0);
        assert_eq!(scores.phone_score, 80.0);
    }

    #[test]
    fn hundred_point_scale_passes_through() {
        let raw = word_result(json!({ "total_score": 85.0, "accuracy_score": 82.0 }));
        let scores = extract_scores(&raw, Language::En);
        assert_eq!(scores.total_score, 85.0);
        assert_eq!(scores.accuracy_score, 82.0);
    }

    #[test]
    fn exactly_ten_is_treated_as_ten_of_ten() {
        let raw = word_result(json!({ "total_score": 10.0 }));
        let scores = extract_scores(&raw, Language::En);
        assert_eq!(scores.total_score, 100.0);
    }

    #[test]
    fn zero_total_yields_all_zero_without_panicking() {
        let raw = word_result(json!({ "total_score": 0, "accuracy_score": 0 }));
        let scores = extract_scores(&raw, Language::En);
        assert!(scores.is_empty());
    }

    #[test]
    fn missing_subtree_is_a_soft_empty_result() {
        let raw = RawEvaluationResult {
            category: Category::Chapter,
            tree: json!({ "FinalResult": { "ret": { "value": "0" } } }),
        };
        let scores = extract_scores(&raw, Language::En);
        assert!(scores.is_empty());
    }

    #[test]
    fn out_of_range_values_clamp_to_hundred() {
        let raw = word_result(json!({ "total_score": 150.0, "accuracy_score": 120.0 }));
        let scores = extract_scores(&raw, Language::En);
        assert_eq!(scores.total_score, 100.0);
        assert_eq!(scores.accuracy_score, 100.0);
        assert_eq!(scores.fluency_score, 100.0);
    }

    #[test]
    fn fluency_and_integrity_backfill_when_missing() {
        let raw = word_result(json!({ "total_score": 80.0, "accuracy_score": 75.0 }));
        let scores = extract_scores(&raw, Language::En);
        assert_eq!(scores.fluency_score, 76.0); // 80 * 0.95
        assert_eq!(scores.integrity_score, 80.0);
    }

    #[test]
    fn vendor_fluency_and_integrity_win_when_present() {
        let raw = word_result(json!({
            "total_score": "8.0",
            "accuracy_score": "7.5",
            "fluency_score": "6.0",
            "integrity_score": "9.0"
        }));
        let scores = extract_scores(&raw, Language::En);
        assert_eq!(scores.fluency_score, 60.0);
        assert_eq!(scores.integrity_score, 90.0);
    }

    #[test]
    fn tone_score_is_gated_on_language() {
        let raw = word_result(json!({ "total_score": 80.0 }));
        let en = extract_scores(&raw, Language::En);
        assert_eq!(en.tone_score, 0.0);

        let zh = extract_scores(&raw, Language::Zh);
        assert_eq!(zh.tone_score, 72.0); // 80 * 0.9
    }

    #[test]
    fn tone_score_clamps_after_derivation() {
        let raw = word_result(json!({ "total_score": 150.0 }));
        let zh = extract_scores(&raw, Language::Zh);
        // 150 * 0.9 = 135, clamped.
        assert_eq!(zh.tone_score, 100.0);
    }

    #[test]
    fn flat_result_shape_falls_back_to_subtree_fields() {
        let raw = RawEvaluationResult {
            category: Category::Sentence,
            tree: json!({ "read_sentence": { "total_score": "7.0", "accuracy_score": "6.5" } }),
        };
        let scores = extract_scores(&raw, Language::En);
        assert_eq!(scores.total_score, 70.0);
        assert_eq!(scores.accuracy_score, 65.0);
    }

    #[test]
    fn unparseable_values_default_to_zero() {
        let raw = word_result(json!({ "total_score": "n/a", "accuracy_score": null }));
        let scores = extract_scores(&raw, Language::En);
        assert!(scores.is_empty());
    }
}
