//! TriageKit Classify
//!
//! The rule-based classification engine: turns free-text operational
//! recommendations into ordered, confidence-scored classifications.
//!
//! Flow per input: match every rule's patterns, aggregate pattern scores
//! into rule-level confidences (with boosts), select qualifying results
//! under the rule set's thresholds and label cap, and fall back to the
//! configured defaults when nothing qualifies. Classification is a pure
//! function of (text, rule set) and is deterministic across runs.

pub mod batch;
pub mod classifier;
pub mod confidence;
pub mod matcher;

pub use batch::{classify_batch, BatchInput};
pub use classifier::RecommendationClassifier;
pub use confidence::aggregate;
pub use matcher::{match_rule, PatternHit};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::batch::{classify_batch, BatchInput};
    pub use crate::classifier::RecommendationClassifier;
    pub use crate::matcher::PatternHit;
}
