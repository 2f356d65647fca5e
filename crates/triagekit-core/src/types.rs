//! Core types for TriageKit

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Top-level classification category: what kind of response a
/// recommendation calls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Outreach email to the account contact
    Email,
    /// Internal action requiring a human
    Action,
}

impl Category {
    /// Get a human-readable label
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Action => "action",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Priority level attached to a rule and carried into its results
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Priority {
    /// Numeric rank for sorting (higher = more urgent)
    pub fn rank(&self) -> u8 {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::High => 2,
            Self::Critical => 3,
        }
    }
}

/// A single pattern hit recorded during matching
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternMatch {
    /// Display form of the pattern (regex source or keyword list)
    pub pattern: String,

    /// Score contributed by this pattern (its declared weight)
    pub score: f32,

    /// The slice of input text that triggered the match
    pub matched_text: String,

    /// Byte spans of all occurrences in the input
    pub spans: Vec<(usize, usize)>,
}

/// Detailed confidence scoring for one classification.
///
/// Produced by the confidence aggregator and embedded in every
/// [`Classification`] so downstream consumers can audit how a score
/// came about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationConfidence {
    /// Combined confidence score (0.0-1.0)
    pub overall_score: f32,

    /// Individual pattern hits with their scores
    pub pattern_matches: Vec<PatternMatch>,

    /// Named component scores (base score, boost, ...); BTreeMap keeps
    /// serialization order deterministic
    pub components: BTreeMap<String, f32>,

    /// Tags naming the factors that shaped the score
    pub factors: Vec<String>,

    /// Human-readable explanation of the calculation
    pub explanation: String,
}

impl ClassificationConfidence {
    /// Check if this is a high-confidence classification
    pub fn is_high_confidence(&self, threshold: f32) -> bool {
        self.overall_score >= threshold
    }
}

/// A single classification produced for one input text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Identifier of the rule that matched
    pub rule_id: String,

    /// Response category
    pub category: Category,

    /// Confidence details
    pub confidence: ClassificationConfidence,

    /// Text that triggered this classification
    pub matched_text: String,

    /// Email template to use (email rules only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommended_template: Option<String>,

    /// Action to take (action rules only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommended_action: Option<String>,

    /// Role the action should be assigned to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,

    /// Whether a human must approve before executing
    #[serde(default)]
    pub requires_approval: bool,

    /// Priority carried from the rule
    pub priority: Priority,

    /// True when this result came from a fallback rule
    #[serde(default)]
    pub fallback: bool,
}

impl Classification {
    /// Overall confidence score shortcut
    pub fn score(&self) -> f32 {
        self.confidence.overall_score
    }

    /// Convert to the downstream action record format
    pub fn to_record(&self) -> ActionRecord {
        let (action, recommended) = match self.category {
            Category::Email => (
                "send_email".to_string(),
                self.recommended_template.clone(),
            ),
            Category::Action => (
                self.recommended_action
                    .clone()
                    .unwrap_or_else(|| "manual_review".to_string()),
                self.recommended_action.clone(),
            ),
        };

        ActionRecord {
            r#type: self.category,
            classification_id: self.rule_id.clone(),
            confidence: self.confidence.overall_score,
            matched_text: self.matched_text.clone(),
            recommended_template_or_action: recommended,
            priority: self.priority,
            action,
            requires_human: self.category == Category::Action,
        }
    }
}

/// Flat record handed to downstream formatting/automation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    /// Response category ("email" or "action")
    pub r#type: Category,

    /// Rule identifier that matched
    pub classification_id: String,

    /// Confidence score (0.0-1.0)
    pub confidence: f32,

    /// Text that triggered the classification
    pub matched_text: String,

    /// Email template id or action name
    pub recommended_template_or_action: Option<String>,

    /// Priority level
    pub priority: Priority,

    /// Concrete action verb for automation
    pub action: String,

    /// Whether a human is required
    pub requires_human: bool,
}

/// Complete classification output for one company
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyClassification {
    /// Company being classified
    pub company_id: String,

    /// Version of the rule set that produced these results
    pub ruleset_version: String,

    /// Results ordered highest confidence first
    pub results: Vec<Classification>,

    /// When classification was performed
    pub generated_at: DateTime<Utc>,

    /// Warnings raised during classification
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl CompanyClassification {
    /// The highest-confidence classification
    pub fn primary(&self) -> Option<&Classification> {
        self.results.first()
    }

    /// Results for a single category
    pub fn by_category(&self, category: Category) -> Vec<&Classification> {
        self.results
            .iter()
            .filter(|c| c.category == category)
            .collect()
    }

    /// Check if any result meets the confidence threshold
    pub fn has_high_confidence(&self, threshold: f32) -> bool {
        self.results
            .iter()
            .any(|c| c.confidence.is_high_confidence(threshold))
    }

    /// All results as downstream action records
    pub fn to_records(&self) -> Vec<ActionRecord> {
        self.results.iter().map(Classification::to_record).collect()
    }
}

/// Group classifications by category
pub fn group_by_category(
    classifications: &[Classification],
) -> BTreeMap<Category, Vec<&Classification>> {
    let mut grouped: BTreeMap<Category, Vec<&Classification>> = BTreeMap::new();
    for c in classifications {
        grouped.entry(c.category).or_default().push(c);
    }
    grouped
}

/// Sort classifications by priority rank, then confidence, highest first
pub fn prioritize(classifications: &mut [Classification]) {
    classifications.sort_by(|a, b| {
        (b.priority.rank(), b.score())
            .partial_cmp(&(a.priority.rank(), a.score()))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}
