//! TriageKit Core
//!
//! Core types and error handling shared across TriageKit components.
//!
//! This crate provides:
//! - Classification value types (categories, confidence, results, records)
//! - Error types and result handling

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{
    group_by_category, prioritize, ActionRecord, Category, Classification,
    ClassificationConfidence, CompanyClassification, PatternMatch, Priority,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::types::{
        ActionRecord, Category, Classification, ClassificationConfidence,
        CompanyClassification, PatternMatch, Priority,
    };
}
