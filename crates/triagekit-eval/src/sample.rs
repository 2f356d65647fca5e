//! Evaluation samples
//!
//! A sample pairs the raw recommendation text a company's classification
//! was produced from with the classifier's predictions, plus whatever
//! labels and reviewer feedback exist for it. Ground truth is optional:
//! most production samples never get labeled.

use serde::{Deserialize, Serialize};

use triagekit_core::Classification;

/// Reviewer scores attached to a sample, both on a 0..=1 scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HumanFeedback {
    /// How good the classification was overall
    pub quality: f32,

    /// How relevant the recommended response was
    pub relevance: f32,
}

/// One evaluation unit: a company's raw text, the predictions made for
/// it, and optional labels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSample {
    /// Company the sample belongs to
    pub company_id: String,

    /// Raw recommendation text the classifier ran against
    pub api_response: String,

    /// Classifier output for this text
    pub predicted: Vec<Classification>,

    /// Expected labels, as rule ids or category names
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ground_truth: Option<Vec<String>>,

    /// Reviewer feedback, when a human looked at this sample
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub human_feedback: Option<HumanFeedback>,
}

impl EvaluationSample {
    /// Create an unlabeled sample
    pub fn new(
        company_id: impl Into<String>,
        api_response: impl Into<String>,
        predicted: Vec<Classification>,
    ) -> Self {
        Self {
            company_id: company_id.into(),
            api_response: api_response.into(),
            predicted,
            ground_truth: None,
            human_feedback: None,
        }
    }

    /// Attach ground-truth labels
    pub fn with_ground_truth(mut self, labels: Vec<String>) -> Self {
        self.ground_truth = Some(labels);
        self
    }

    /// Attach reviewer feedback
    pub fn with_human_feedback(mut self, feedback: HumanFeedback) -> Self {
        self.human_feedback = Some(feedback);
        self
    }

    /// Whether this sample can contribute to precision/recall
    pub fn has_ground_truth(&self) -> bool {
        self.ground_truth
            .as_ref()
            .map(|labels| !labels.is_empty())
            .unwrap_or(false)
    }
}
