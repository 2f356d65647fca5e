//! Rule-set document model
//!
//! The declarative YAML document consumed from configuration. Unknown
//! fields are rejected at parse time rather than silently ignored, so a
//! typo in a rule file fails the load instead of weakening a rule.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use triagekit_core::{Category, Priority};

/// A complete rule-set document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSetDoc {
    /// Semantic version of this rule set (identifies it for A/B comparison)
    pub version: String,

    /// Global classification settings
    #[serde(default)]
    pub settings: Settings,

    /// Primary rules partitioned by category
    pub classification_rules: ClassificationRules,

    /// Fallback rules, used only when no primary rule qualifies
    #[serde(default)]
    pub fallback_rules: BTreeMap<String, FallbackSpec>,
}

impl RuleSetDoc {
    /// Parse a rule-set document from YAML
    pub fn from_yaml(yaml: &str) -> triagekit_core::Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Parse a rule-set document from a file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> triagekit_core::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }
}

/// Primary rules keyed by classification type, partitioned by category.
///
/// BTreeMap keeps rule iteration order stable across runs.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ClassificationRules {
    #[serde(default)]
    pub email_classifications: BTreeMap<String, RuleSpec>,

    #[serde(default)]
    pub action_classifications: BTreeMap<String, RuleSpec>,
}

/// Global settings controlling selection behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Allow more than one classification per input
    #[serde(default = "default_true")]
    pub enable_multi_label: bool,

    /// Hard cap on classifications returned per company
    #[serde(default = "default_max_labels")]
    pub max_labels_per_company: usize,

    /// How pattern scores combine into a rule-level confidence
    #[serde(default)]
    pub confidence_aggregation: AggregationStrategy,

    /// Minimum confidence a non-fallback result must reach, per category
    #[serde(default)]
    pub min_confidence: MinConfidence,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enable_multi_label: true,
            max_labels_per_company: default_max_labels(),
            confidence_aggregation: AggregationStrategy::default(),
            min_confidence: MinConfidence::default(),
        }
    }
}

/// Per-category confidence floors
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MinConfidence {
    #[serde(default = "default_email_floor")]
    pub email: f32,

    #[serde(default = "default_action_floor")]
    pub action: f32,
}

impl MinConfidence {
    /// Floor for the given category
    pub fn for_category(&self, category: Category) -> f32 {
        match category {
            Category::Email => self.email,
            Category::Action => self.action,
        }
    }
}

impl Default for MinConfidence {
    fn default() -> Self {
        Self {
            email: default_email_floor(),
            action: default_action_floor(),
        }
    }
}

/// Strategy for combining pattern scores into a rule-level base score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AggregationStrategy {
    /// Highest single pattern score
    Max,

    /// Mean of all matched pattern scores
    Average,

    /// Positional weighting: a matched pattern declared at index `i`
    /// gets coefficient `1/(i+1)`, so earlier patterns dominate
    #[default]
    WeightedAverage,
}

/// A single primary rule
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSpec {
    /// Rule identifier; defaults to `<category>_<key>` when omitted
    #[serde(default)]
    pub id: Option<String>,

    /// Human-readable name
    #[serde(default)]
    pub name: Option<String>,

    /// What this rule detects
    #[serde(default)]
    pub description: Option<String>,

    /// Ordered matching patterns (order matters for weighted_average)
    pub patterns: Vec<PatternSpec>,

    /// Additive boosts applied when trigger substrings are present
    #[serde(default)]
    pub confidence_boost: Vec<BoostSpec>,

    /// Email template id (email rules)
    #[serde(default)]
    pub email_template: Option<String>,

    /// Action name (action rules)
    #[serde(default)]
    pub action_type: Option<String>,

    /// Role the resulting action should be assigned to
    #[serde(default)]
    pub assignee: Option<String>,

    /// Whether the resulting action needs human approval
    #[serde(default)]
    pub requires_approval: bool,

    /// Priority carried into results
    #[serde(default)]
    pub priority: Priority,

    /// Disabled rules are skipped at compile time
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// One matching pattern: a regex or a keyword set.
///
/// A pattern entry must carry exactly one payload key, `regex` or
/// `keywords`; an entry with both (or neither) fails the load.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum PatternSpec {
    Regex {
        /// Regular expression, matched case-insensitively anywhere
        regex: String,

        /// Score contributed when this pattern matches
        weight: f32,
    },

    Keywords {
        /// The set matches when any keyword appears as a substring
        keywords: Vec<String>,

        /// Single score for the whole set
        weight: f32,
    },
}

impl PatternSpec {
    /// The declared weight
    pub fn weight(&self) -> f32 {
        match self {
            Self::Regex { weight, .. } | Self::Keywords { weight, .. } => *weight,
        }
    }
}

impl<'de> Deserialize<'de> for PatternSpec {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(deny_unknown_fields)]
        struct Raw {
            #[serde(default)]
            regex: Option<String>,
            #[serde(default)]
            keywords: Option<Vec<String>>,
            #[serde(default = "default_weight")]
            weight: f32,
        }

        let raw = Raw::deserialize(deserializer)?;
        match (raw.regex, raw.keywords) {
            (Some(regex), None) => Ok(Self::Regex {
                regex,
                weight: raw.weight,
            }),
            (None, Some(keywords)) => Ok(Self::Keywords {
                keywords,
                weight: raw.weight,
            }),
            (Some(_), Some(_)) => Err(serde::de::Error::custom(
                "pattern must use either `regex` or `keywords`, not both",
            )),
            (None, None) => Err(serde::de::Error::custom(
                "pattern needs a `regex` or `keywords` key",
            )),
        }
    }
}

/// A confidence boost condition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BoostSpec {
    /// Trigger substring(s); any occurrence activates the boost
    pub if_contains: OneOrMany,

    /// Additive boost amount
    pub boost: f32,
}

/// A single string or a list of strings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    /// Flatten to a list of terms
    pub fn terms(&self) -> Vec<String> {
        match self {
            Self::One(s) => vec![s.clone()],
            Self::Many(v) => v.clone(),
        }
    }
}

/// A fallback rule: fixed-confidence default for one category
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FallbackSpec {
    /// Rule identifier; defaults to the map key when omitted
    #[serde(default)]
    pub id: Option<String>,

    /// Human-readable name
    #[serde(default)]
    pub name: Option<String>,

    /// Category this fallback answers for
    pub category: Category,

    /// Fixed low confidence carried by fallback results
    pub confidence: f32,

    /// Email template id (email fallbacks)
    #[serde(default)]
    pub email_template: Option<String>,

    /// Action name (action fallbacks)
    #[serde(default)]
    pub action_type: Option<String>,

    /// Priority carried into results
    #[serde(default)]
    pub priority: Priority,
}

fn default_true() -> bool {
    true
}

fn default_weight() -> f32 {
    1.0
}

fn default_max_labels() -> usize {
    3
}

fn default_email_floor() -> f32 {
    0.7
}

fn default_action_floor() -> f32 {
    0.85
}
