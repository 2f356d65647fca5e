//! TriageKit Rules
//!
//! Declarative, versioned rule sets for recommendation classification.
//!
//! Rule sets are defined in YAML and specify:
//! - Weighted patterns (regex and keyword sets) per rule
//! - Confidence boost conditions (substring triggers)
//! - Per-category fallback rules with fixed confidence
//! - Global selection settings (multi-label, caps, aggregation strategy)
//!
//! Documents are validated and compiled into frozen [`RuleSet`]s at load
//! time; malformed regexes, out-of-range weights, and unknown fields all
//! fail the load rather than surfacing during matching.

pub mod doc;
pub mod ruleset;

pub use doc::{
    AggregationStrategy, BoostSpec, ClassificationRules, FallbackSpec, MinConfidence, OneOrMany,
    PatternSpec, RuleSetDoc, RuleSpec, Settings,
};
pub use ruleset::{CompiledBoost, CompiledPattern, CompiledRule, FallbackRule, RuleSet};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::doc::{AggregationStrategy, RuleSetDoc, Settings};
    pub use crate::ruleset::{CompiledPattern, CompiledRule, FallbackRule, RuleSet};
}
