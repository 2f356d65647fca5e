//! Concurrent batch classification
//!
//! Independent inputs are embarrassingly parallel: classification shares
//! nothing but the immutable rule set, so a batch fans out across
//! futures and collects results in input order. Retry/timeout handling
//! for fetching the texts lives with the caller.

use futures::future::join_all;
use std::sync::Arc;

use triagekit_core::CompanyClassification;

use crate::classifier::RecommendationClassifier;

/// One unit of work for batch classification
#[derive(Debug, Clone)]
pub struct BatchInput {
    /// Company being classified
    pub company_id: String,

    /// Raw recommendation text retrieved upstream
    pub text: String,
}

impl BatchInput {
    /// Create a new batch input
    pub fn new(company_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            company_id: company_id.into(),
            text: text.into(),
        }
    }
}

/// Classify a batch of companies concurrently.
///
/// Results come back in input order, one per input, each carrying the
/// fallback guarantee of [`RecommendationClassifier::classify`].
pub async fn classify_batch(
    classifier: Arc<RecommendationClassifier>,
    inputs: Vec<BatchInput>,
) -> Vec<CompanyClassification> {
    let futures: Vec<_> = inputs
        .into_iter()
        .map(|input| {
            let classifier = Arc::clone(&classifier);
            async move { classifier.classify(&input.company_id, &input.text) }
        })
        .collect();

    join_all(futures).await
}
