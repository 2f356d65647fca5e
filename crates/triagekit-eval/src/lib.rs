//! TriageKit Eval
//!
//! RAGAS-style evaluation for classification output: batch metrics
//! (faithfulness, relevancy, precision, recall, F1) over evaluation
//! samples, confidence distribution binning, and A/B comparison of two
//! rule-set versions with significance margins.

pub mod compare;
pub mod metrics;
pub mod sample;

pub use compare::{
    compare_rule_versions, compare_rule_versions_with_margin, ComparisonReport, MetricDelta,
    Verdict, DEFAULT_MARGIN,
};
pub use metrics::{EvaluationMetrics, EvaluationReport, Evaluator, FeedbackSummary};
pub use sample::{EvaluationSample, HumanFeedback};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::compare::{compare_rule_versions, ComparisonReport, Verdict};
    pub use crate::metrics::{EvaluationReport, Evaluator};
    pub use crate::sample::{EvaluationSample, HumanFeedback};
}
