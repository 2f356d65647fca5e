//! Batch evaluation metrics
//!
//! RAGAS-style scoring over a batch of evaluation samples: faithfulness
//! and relevancy over every prediction, precision/recall/F1 over the
//! labeled subset. Samples without ground truth are excluded from
//! precision/recall and surfaced in the report diagnostics rather than
//! failing the batch.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use triagekit_core::{Classification, Error, Result};

use crate::sample::EvaluationSample;

/// Tokens too common to signal relevance on their own
const STOPWORDS: &[&str] = &[
    "that", "this", "with", "from", "have", "will", "your", "their", "about",
    "would", "could", "should", "there", "which", "been", "were", "they",
    "them", "than", "then", "when", "what", "some", "more", "very", "into",
];

/// Fixed bin edges for the confidence distribution
const BIN_LABELS: [&str; 5] = ["0.0-0.5", "0.5-0.7", "0.7-0.8", "0.8-0.9", "0.9-1.0"];

/// Aggregate quality metrics for one evaluated batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    /// Fraction of span-carrying predictions whose matched text occurs in
    /// the source text; fallbacks claim no span and are excluded
    pub faithfulness: f32,

    /// Fraction of predictions judged relevant to their sample
    pub relevancy: f32,

    /// Correct predictions over all predictions, labeled samples only
    pub precision: f32,

    /// Recovered ground-truth labels over all ground-truth labels
    pub recall: f32,

    /// Harmonic mean of precision and recall
    pub f1: f32,

    /// Samples in the batch
    pub samples: usize,

    /// Samples that contributed to precision/recall
    pub evaluated: usize,

    /// Samples excluded for missing ground truth
    pub excluded: usize,

    /// Total predictions across the batch
    pub predictions: usize,
}

/// Averaged reviewer feedback over the samples that carried any
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeedbackSummary {
    /// Mean quality score
    pub quality: f32,

    /// Mean relevance score
    pub relevance: f32,

    /// Samples the averages cover
    pub samples: usize,
}

/// Full output of one batch evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Aggregate metrics
    pub metrics: EvaluationMetrics,

    /// Prediction counts per confidence bin
    pub confidence_bins: BTreeMap<String, usize>,

    /// Averaged human feedback, when any sample carried it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub human_feedback: Option<FeedbackSummary>,

    /// Per-sample notes, e.g. samples excluded from precision/recall
    pub diagnostics: Vec<String>,
}

/// Scores batches of evaluation samples.
#[derive(Debug, Clone, Default)]
pub struct Evaluator;

impl Evaluator {
    /// Create an evaluator
    pub fn new() -> Self {
        Self
    }

    /// Evaluate a batch of samples.
    ///
    /// An empty batch is structurally invalid and rejected; a sample
    /// without ground truth is not — it still contributes to
    /// faithfulness and relevancy, and gets a diagnostics entry for its
    /// exclusion from precision/recall.
    pub fn evaluate_batch(&self, samples: &[EvaluationSample]) -> Result<EvaluationReport> {
        if samples.is_empty() {
            return Err(Error::evaluation("empty evaluation batch"));
        }

        let mut diagnostics = Vec::new();
        let mut bins: BTreeMap<String, usize> = BIN_LABELS
            .iter()
            .map(|label| (label.to_string(), 0))
            .collect();

        let mut predictions = 0usize;
        let mut grounded = 0usize;
        let mut faithful = 0usize;
        let mut relevant = 0usize;

        // Micro-averaged over labeled samples
        let mut labeled = 0usize;
        let mut correct_predictions = 0usize;
        let mut labeled_predictions = 0usize;
        let mut recovered_labels = 0usize;
        let mut total_labels = 0usize;

        let mut feedback_quality = 0.0f32;
        let mut feedback_relevance = 0.0f32;
        let mut feedback_samples = 0usize;

        for sample in samples {
            let response = sample.api_response.to_lowercase();
            predictions += sample.predicted.len();

            for prediction in &sample.predicted {
                *bins.entry(bin_label(prediction.score()).to_string()).or_insert(0) += 1;

                // Only predictions that claim a matched span can be
                // faithful or unfaithful; fallbacks claim nothing
                if !prediction.matched_text.is_empty() {
                    grounded += 1;
                    if response.contains(&prediction.matched_text.to_lowercase()) {
                        faithful += 1;
                    }
                }
                if is_relevant(sample, prediction) {
                    relevant += 1;
                }
            }

            if let Some(labels) = sample.ground_truth.as_ref().filter(|l| !l.is_empty()) {
                labeled += 1;
                labeled_predictions += sample.predicted.len();
                total_labels += labels.len();

                correct_predictions += sample
                    .predicted
                    .iter()
                    .filter(|p| labels.iter().any(|label| label_matches(label, p)))
                    .count();
                recovered_labels += labels
                    .iter()
                    .filter(|label| sample.predicted.iter().any(|p| label_matches(label, p)))
                    .count();
            } else {
                warn!(
                    company_id = %sample.company_id,
                    "sample has no ground truth, excluding from precision/recall"
                );
                diagnostics.push(format!(
                    "sample {}: no ground truth, excluded from precision/recall",
                    sample.company_id
                ));
            }

            if let Some(feedback) = &sample.human_feedback {
                feedback_quality += feedback.quality;
                feedback_relevance += feedback.relevance;
                feedback_samples += 1;
            }
        }

        let precision = ratio(correct_predictions, labeled_predictions);
        let recall = ratio(recovered_labels, total_labels);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        let metrics = EvaluationMetrics {
            faithfulness: ratio(faithful, grounded),
            relevancy: ratio(relevant, predictions),
            precision,
            recall,
            f1,
            samples: samples.len(),
            evaluated: labeled,
            excluded: samples.len() - labeled,
            predictions,
        };

        let human_feedback = (feedback_samples > 0).then(|| FeedbackSummary {
            quality: feedback_quality / feedback_samples as f32,
            relevance: feedback_relevance / feedback_samples as f32,
            samples: feedback_samples,
        });

        info!(
            samples = metrics.samples,
            evaluated = metrics.evaluated,
            excluded = metrics.excluded,
            f1 = metrics.f1,
            "evaluated batch"
        );

        Ok(EvaluationReport {
            metrics,
            confidence_bins: bins,
            human_feedback,
            diagnostics,
        })
    }
}

/// A ground-truth label matches a prediction by rule id or category name
fn label_matches(label: &str, prediction: &Classification) -> bool {
    label.eq_ignore_ascii_case(&prediction.rule_id)
        || label.eq_ignore_ascii_case(prediction.category.as_str())
}

/// Labeled samples judge relevance by ground-truth agreement; unlabeled
/// samples fall back to content-token overlap between the matched text
/// and the source text.
fn is_relevant(sample: &EvaluationSample, prediction: &Classification) -> bool {
    if let Some(labels) = sample.ground_truth.as_ref().filter(|l| !l.is_empty()) {
        return labels.iter().any(|label| label_matches(label, prediction));
    }

    let matched = content_tokens(&prediction.matched_text);
    if matched.is_empty() {
        return false;
    }
    let response = content_tokens(&sample.api_response);
    matched.iter().any(|token| response.contains(token))
}

fn content_tokens(text: &str) -> BTreeSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 3 && !STOPWORDS.contains(t))
        .map(str::to_string)
        .collect()
}

fn bin_label(score: f32) -> &'static str {
    if score < 0.5 {
        BIN_LABELS[0]
    } else if score < 0.7 {
        BIN_LABELS[1]
    } else if score < 0.8 {
        BIN_LABELS[2]
    } else if score < 0.9 {
        BIN_LABELS[3]
    } else {
        BIN_LABELS[4]
    }
}

fn ratio(numerator: usize, denominator: usize) -> f32 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f32 / denominator as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::HumanFeedback;
    use std::collections::BTreeMap as Map;
    use triagekit_core::{Category, ClassificationConfidence, Priority};

    fn prediction(rule_id: &str, category: Category, score: f32, matched: &str) -> Classification {
        Classification {
            rule_id: rule_id.to_string(),
            category,
            confidence: ClassificationConfidence {
                overall_score: score,
                pattern_matches: Vec::new(),
                components: Map::new(),
                factors: Vec::new(),
                explanation: String::new(),
            },
            matched_text: matched.to_string(),
            recommended_template: None,
            recommended_action: None,
            assignee: None,
            requires_approval: false,
            priority: Priority::Medium,
            fallback: false,
        }
    }

    #[test]
    fn test_empty_batch_rejected() {
        let err = Evaluator::new().evaluate_batch(&[]).unwrap_err();
        assert!(matches!(err, Error::Evaluation(_)));
    }

    #[test]
    fn test_faithfulness_counts_substring_matches() {
        let sample = EvaluationSample::new(
            "acme",
            "Pay rates are below market average",
            vec![
                prediction("low_pay_rate", Category::Email, 0.9, "below market"),
                prediction("geographic_coverage", Category::Email, 0.8, "coverage area"),
            ],
        )
        .with_ground_truth(vec!["low_pay_rate".to_string()]);

        let report = Evaluator::new().evaluate_batch(&[sample]).unwrap();
        assert!((report.metrics.faithfulness - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_fallback_predictions_excluded_from_faithfulness() {
        let sample = EvaluationSample::new(
            "acme",
            "pay rates are below market average",
            vec![
                prediction("low_pay_rate", Category::Email, 0.9, "below market"),
                prediction("unknown_email_issue", Category::Email, 0.5, ""),
            ],
        );

        let report = Evaluator::new().evaluate_batch(&[sample]).unwrap();
        // The empty-span fallback neither helps nor hurts the ratio
        assert!((report.metrics.faithfulness - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_faithfulness_zero_without_span_carrying_predictions() {
        let sample = EvaluationSample::new(
            "acme",
            "nothing matched here",
            vec![
                prediction("unknown_email_issue", Category::Email, 0.5, ""),
                prediction("unknown_action_required", Category::Action, 0.3, ""),
            ],
        );

        let report = Evaluator::new().evaluate_batch(&[sample]).unwrap();
        assert_eq!(report.metrics.faithfulness, 0.0);
        assert_eq!(report.metrics.predictions, 2);
    }

    #[test]
    fn test_precision_and_recall_on_labeled_sample() {
        let sample = EvaluationSample::new(
            "acme",
            "pay below market and more",
            vec![
                prediction("low_pay_rate", Category::Email, 0.9, "below market"),
                prediction("geographic_coverage", Category::Email, 0.8, "coverage"),
            ],
        )
        .with_ground_truth(vec!["low_pay_rate".to_string()]);

        let report = Evaluator::new().evaluate_batch(&[sample]).unwrap();
        // One of two predictions is correct; the single label is recovered
        assert!((report.metrics.precision - 0.5).abs() < 1e-6);
        assert!((report.metrics.recall - 1.0).abs() < 1e-6);
        assert!((report.metrics.f1 - 2.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_ground_truth_matches_on_category_name() {
        let sample = EvaluationSample::new(
            "acme",
            "schedule a meeting",
            vec![prediction("partner_meeting", Category::Action, 0.9, "schedule a meeting")],
        )
        .with_ground_truth(vec!["action".to_string()]);

        let report = Evaluator::new().evaluate_batch(&[sample]).unwrap();
        assert!((report.metrics.precision - 1.0).abs() < 1e-6);
        assert!((report.metrics.recall - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_unlabeled_samples_excluded_and_named() {
        let mut samples = Vec::new();
        for i in 0..7 {
            samples.push(
                EvaluationSample::new(
                    format!("labeled_{i}"),
                    "pay rates below market",
                    vec![prediction("low_pay_rate", Category::Email, 0.9, "pay rates")],
                )
                .with_ground_truth(vec!["low_pay_rate".to_string()]),
            );
        }
        for i in 0..3 {
            samples.push(EvaluationSample::new(
                format!("unlabeled_{i}"),
                "pay rates below market",
                vec![prediction("low_pay_rate", Category::Email, 0.9, "pay rates")],
            ));
        }

        let report = Evaluator::new().evaluate_batch(&samples).unwrap();

        assert_eq!(report.metrics.samples, 10);
        assert_eq!(report.metrics.evaluated, 7);
        assert_eq!(report.metrics.excluded, 3);
        // Precision/recall computed over the seven labeled samples only
        assert!((report.metrics.precision - 1.0).abs() < 1e-6);
        assert!((report.metrics.recall - 1.0).abs() < 1e-6);

        assert_eq!(report.diagnostics.len(), 3);
        for i in 0..3 {
            let id = format!("unlabeled_{i}");
            assert!(
                report.diagnostics.iter().any(|d| d.contains(&id)),
                "diagnostics missing {id}"
            );
        }
    }

    #[test]
    fn test_relevancy_token_overlap_without_ground_truth() {
        let sample = EvaluationSample::new(
            "acme",
            "pay rates are below market average",
            vec![
                prediction("low_pay_rate", Category::Email, 0.9, "below market"),
                prediction("partner_meeting", Category::Action, 0.9, "escalation call"),
            ],
        );

        let report = Evaluator::new().evaluate_batch(&[sample]).unwrap();
        // "market" overlaps; "escalation call" shares nothing
        assert!((report.metrics.relevancy - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_confidence_bins_cover_all_predictions() {
        let sample = EvaluationSample::new(
            "acme",
            "text",
            vec![
                prediction("a", Category::Email, 0.3, "x"),
                prediction("b", Category::Email, 0.75, "x"),
                prediction("c", Category::Action, 0.95, "x"),
            ],
        );

        let report = Evaluator::new().evaluate_batch(&[sample]).unwrap();
        assert_eq!(report.confidence_bins["0.0-0.5"], 1);
        assert_eq!(report.confidence_bins["0.7-0.8"], 1);
        assert_eq!(report.confidence_bins["0.9-1.0"], 1);
        assert_eq!(report.confidence_bins["0.5-0.7"], 0);
        assert_eq!(report.confidence_bins.values().sum::<usize>(), 3);
    }

    #[test]
    fn test_human_feedback_averaged() {
        let with = EvaluationSample::new("a", "text", Vec::new())
            .with_human_feedback(HumanFeedback {
                quality: 0.8,
                relevance: 0.6,
            });
        let also = EvaluationSample::new("b", "text", Vec::new())
            .with_human_feedback(HumanFeedback {
                quality: 0.4,
                relevance: 1.0,
            });
        let without = EvaluationSample::new("c", "text", Vec::new());

        let report = Evaluator::new()
            .evaluate_batch(&[with, also, without])
            .unwrap();

        let summary = report.human_feedback.unwrap();
        assert_eq!(summary.samples, 2);
        assert!((summary.quality - 0.6).abs() < 1e-6);
        assert!((summary.relevance - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_no_labeled_samples_zeroes_precision_recall() {
        let sample = EvaluationSample::new(
            "acme",
            "pay rates below market",
            vec![prediction("low_pay_rate", Category::Email, 0.9, "pay rates")],
        );

        let report = Evaluator::new().evaluate_batch(&[sample]).unwrap();
        assert_eq!(report.metrics.precision, 0.0);
        assert_eq!(report.metrics.recall, 0.0);
        assert_eq!(report.metrics.f1, 0.0);
        assert_eq!(report.metrics.evaluated, 0);
    }
}
