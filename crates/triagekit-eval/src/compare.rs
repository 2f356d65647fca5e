//! Rule-version comparison
//!
//! A/B comparison of two evaluated rule-set versions. Each metric gets
//! a delta and a verdict; deltas inside the significance margin are
//! ties so rule tweaks are not judged on noise.

use serde::{Deserialize, Serialize};
use tracing::info;

use triagekit_core::Result;

use crate::metrics::{EvaluationMetrics, Evaluator};
use crate::sample::EvaluationSample;

/// Metric deltas below this magnitude are ties
pub const DEFAULT_MARGIN: f32 = 0.02;

/// Outcome of a candidate-versus-baseline comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// Candidate is better than baseline by more than the margin
    Win,
    /// Candidate is worse than baseline by more than the margin
    Loss,
    /// Within the margin either way
    Tie,
}

/// One metric's comparison row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDelta {
    /// Metric name
    pub metric: String,

    /// Baseline value
    pub baseline: f32,

    /// Candidate value
    pub candidate: f32,

    /// Candidate minus baseline
    pub delta: f32,

    /// Verdict under the margin
    pub verdict: Verdict,
}

/// Full comparison of two evaluated rule-set versions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    /// Baseline metrics
    pub baseline: EvaluationMetrics,

    /// Candidate metrics
    pub candidate: EvaluationMetrics,

    /// Margin the verdicts were judged under
    pub margin: f32,

    /// Per-metric deltas and verdicts
    pub deltas: Vec<MetricDelta>,

    /// Majority verdict across metrics
    pub overall: Verdict,
}

impl Evaluator {
    /// Evaluate two sample sets and compare them with the default margin.
    ///
    /// The baseline set carries one rule-set version's output, the
    /// candidate set the other's; each is scored with
    /// [`Evaluator::evaluate_batch`] before the metric-level comparison.
    pub fn compare_rule_versions(
        &self,
        baseline: &[EvaluationSample],
        candidate: &[EvaluationSample],
    ) -> Result<ComparisonReport> {
        self.compare_rule_versions_with_margin(baseline, candidate, DEFAULT_MARGIN)
    }

    /// Evaluate two sample sets and compare them with an explicit margin.
    pub fn compare_rule_versions_with_margin(
        &self,
        baseline: &[EvaluationSample],
        candidate: &[EvaluationSample],
        margin: f32,
    ) -> Result<ComparisonReport> {
        let baseline = self.evaluate_batch(baseline)?;
        let candidate = self.evaluate_batch(candidate)?;
        Ok(compare_rule_versions_with_margin(
            &baseline.metrics,
            &candidate.metrics,
            margin,
        ))
    }
}

/// Compare candidate metrics against a baseline with the default margin.
pub fn compare_rule_versions(
    baseline: &EvaluationMetrics,
    candidate: &EvaluationMetrics,
) -> ComparisonReport {
    compare_rule_versions_with_margin(baseline, candidate, DEFAULT_MARGIN)
}

/// Compare candidate metrics against a baseline with an explicit margin.
pub fn compare_rule_versions_with_margin(
    baseline: &EvaluationMetrics,
    candidate: &EvaluationMetrics,
    margin: f32,
) -> ComparisonReport {
    let pairs = [
        ("faithfulness", baseline.faithfulness, candidate.faithfulness),
        ("relevancy", baseline.relevancy, candidate.relevancy),
        ("precision", baseline.precision, candidate.precision),
        ("recall", baseline.recall, candidate.recall),
        ("f1", baseline.f1, candidate.f1),
    ];

    let deltas: Vec<MetricDelta> = pairs
        .into_iter()
        .map(|(metric, base, cand)| {
            let delta = cand - base;
            MetricDelta {
                metric: metric.to_string(),
                baseline: base,
                candidate: cand,
                delta,
                verdict: verdict(delta, margin),
            }
        })
        .collect();

    let wins = deltas.iter().filter(|d| d.verdict == Verdict::Win).count();
    let losses = deltas.iter().filter(|d| d.verdict == Verdict::Loss).count();
    let overall = if wins > losses {
        Verdict::Win
    } else if losses > wins {
        Verdict::Loss
    } else {
        Verdict::Tie
    };

    info!(wins, losses, ?overall, "compared rule versions");

    ComparisonReport {
        baseline: baseline.clone(),
        candidate: candidate.clone(),
        margin,
        deltas,
        overall,
    }
}

fn verdict(delta: f32, margin: f32) -> Verdict {
    if delta > margin {
        Verdict::Win
    } else if delta < -margin {
        Verdict::Loss
    } else {
        Verdict::Tie
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(faithfulness: f32, precision: f32, recall: f32) -> EvaluationMetrics {
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        EvaluationMetrics {
            faithfulness,
            relevancy: 0.8,
            precision,
            recall,
            f1,
            samples: 10,
            evaluated: 10,
            excluded: 0,
            predictions: 12,
        }
    }

    #[test]
    fn test_candidate_improvement_wins() {
        let baseline = metrics(0.7, 0.6, 0.6);
        let candidate = metrics(0.9, 0.8, 0.8);

        let report = compare_rule_versions(&baseline, &candidate);
        assert_eq!(report.overall, Verdict::Win);
        assert!(report
            .deltas
            .iter()
            .filter(|d| d.metric != "relevancy")
            .all(|d| d.verdict == Verdict::Win));
    }

    #[test]
    fn test_regression_loses() {
        let baseline = metrics(0.9, 0.8, 0.8);
        let candidate = metrics(0.7, 0.6, 0.6);

        let report = compare_rule_versions(&baseline, &candidate);
        assert_eq!(report.overall, Verdict::Loss);
    }

    #[test]
    fn test_deltas_within_margin_tie() {
        let baseline = metrics(0.80, 0.80, 0.80);
        let candidate = metrics(0.81, 0.79, 0.81);

        let report = compare_rule_versions(&baseline, &candidate);
        assert_eq!(report.overall, Verdict::Tie);
        assert!(report.deltas.iter().all(|d| d.verdict == Verdict::Tie));
    }

    #[test]
    fn test_custom_margin_changes_verdict() {
        let baseline = metrics(0.80, 0.80, 0.80);
        let candidate = metrics(0.85, 0.80, 0.80);

        let default_report = compare_rule_versions(&baseline, &candidate);
        assert_eq!(default_report.overall, Verdict::Win);

        let strict = compare_rule_versions_with_margin(&baseline, &candidate, 0.1);
        assert_eq!(strict.overall, Verdict::Tie);
    }

    #[test]
    fn test_mixed_outcome_balances_to_tie() {
        let baseline = metrics(0.7, 0.9, 0.6);
        let candidate = metrics(0.9, 0.6, 0.9);

        // faithfulness and recall win, precision loses, f1 moves with them
        let report = compare_rule_versions(&baseline, &candidate);
        let wins = report
            .deltas
            .iter()
            .filter(|d| d.verdict == Verdict::Win)
            .count();
        let losses = report
            .deltas
            .iter()
            .filter(|d| d.verdict == Verdict::Loss)
            .count();
        assert_eq!(report.overall, verdict_from(wins, losses));
    }

    fn verdict_from(wins: usize, losses: usize) -> Verdict {
        if wins > losses {
            Verdict::Win
        } else if losses > wins {
            Verdict::Loss
        } else {
            Verdict::Tie
        }
    }

    fn labeled_sample(rule_id: &str, matched: &str) -> EvaluationSample {
        use std::collections::BTreeMap;
        use triagekit_core::{Category, Classification, ClassificationConfidence, Priority};

        let prediction = Classification {
            rule_id: rule_id.to_string(),
            category: Category::Email,
            confidence: ClassificationConfidence {
                overall_score: 0.9,
                pattern_matches: Vec::new(),
                components: BTreeMap::new(),
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
        };
        EvaluationSample::new("acme", "pay rates are below market", vec![prediction])
            .with_ground_truth(vec!["low_pay_rate".to_string()])
    }

    #[test]
    fn test_sample_sets_evaluated_before_comparison() {
        let baseline = vec![labeled_sample("low_pay_rate", "below market")];
        let candidate = vec![labeled_sample("geographic_coverage", "below market")];

        let report = Evaluator::new()
            .compare_rule_versions(&baseline, &candidate)
            .unwrap();

        // Candidate misses the label the baseline recovered
        assert!((report.baseline.recall - 1.0).abs() < 1e-6);
        assert!((report.candidate.recall - 0.0).abs() < 1e-6);
        assert_eq!(report.overall, Verdict::Loss);
    }

    #[test]
    fn test_sample_comparison_rejects_empty_batch() {
        let candidate = vec![labeled_sample("low_pay_rate", "below market")];
        let err = Evaluator::new()
            .compare_rule_versions(&[], &candidate)
            .unwrap_err();
        assert!(matches!(err, triagekit_core::Error::Evaluation(_)));
    }
}
