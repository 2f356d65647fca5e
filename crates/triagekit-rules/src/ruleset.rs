//! Compiled rule sets
//!
//! Validates a [`RuleSetDoc`] and compiles it into a frozen, shareable
//! `RuleSet`: regexes compiled once (case-insensitive), keyword sets and
//! boost triggers built into Aho-Corasick automata. All configuration
//! problems surface here as `Error::Config`, never at match time.

use aho_corasick::AhoCorasick;
use regex::{Regex, RegexBuilder};
use std::collections::BTreeSet;
use tracing::{debug, info};

use triagekit_core::{Category, Error, Priority, Result};

use crate::doc::{
    BoostSpec, FallbackSpec, PatternSpec, RuleSetDoc, RuleSpec, Settings,
};

/// Default rule document shipped with the crate
const BUILTIN_RULES: &str = include_str!("../rules/classification_rules.yaml");

/// A compiled matching pattern
#[derive(Debug, Clone)]
pub enum CompiledPattern {
    /// Case-insensitive regex, matched anywhere in the text
    Regex {
        source: String,
        regex: Regex,
        weight: f32,
    },

    /// Keyword set; any keyword appearing as a substring matches the set
    Keywords {
        keywords: Vec<String>,
        matcher: AhoCorasick,
        weight: f32,
    },
}

impl CompiledPattern {
    /// Score contributed when this pattern matches
    pub fn weight(&self) -> f32 {
        match self {
            Self::Regex { weight, .. } | Self::Keywords { weight, .. } => *weight,
        }
    }

    /// Display form for audit output
    pub fn display(&self) -> String {
        match self {
            Self::Regex { source, .. } => source.clone(),
            Self::Keywords { keywords, .. } => keywords.join("|"),
        }
    }
}

/// A compiled boost condition
#[derive(Debug, Clone)]
pub struct CompiledBoost {
    /// Trigger substrings (any occurrence activates the boost)
    pub triggers: Vec<String>,

    /// Case-insensitive matcher over the triggers
    pub matcher: AhoCorasick,

    /// Additive boost amount
    pub amount: f32,
}

/// A compiled primary rule
#[derive(Debug, Clone)]
pub struct CompiledRule {
    /// Unique rule identifier
    pub rule_id: String,

    /// Human-readable name
    pub name: String,

    /// Category this rule classifies into
    pub category: Category,

    /// Compiled patterns in declaration order
    pub patterns: Vec<CompiledPattern>,

    /// Boost conditions
    pub boosts: Vec<CompiledBoost>,

    /// Email template id (email rules)
    pub email_template: Option<String>,

    /// Action name (action rules)
    pub action_type: Option<String>,

    /// Role the resulting action should be assigned to
    pub assignee: Option<String>,

    /// Whether the resulting action needs human approval
    pub requires_approval: bool,

    /// Priority carried into results
    pub priority: Priority,
}

/// A compiled fallback rule
#[derive(Debug, Clone)]
pub struct FallbackRule {
    /// Unique rule identifier
    pub rule_id: String,

    /// Human-readable name
    pub name: String,

    /// Category this fallback answers for
    pub category: Category,

    /// Fixed confidence carried by fallback results
    pub confidence: f32,

    /// Email template id (email fallbacks)
    pub email_template: Option<String>,

    /// Action name (action fallbacks)
    pub action_type: Option<String>,

    /// Priority carried into results
    pub priority: Priority,
}

/// A validated, frozen rule set.
///
/// Immutable once compiled; safe to share read-only across concurrent
/// classification calls (wrap in `Arc`).
#[derive(Debug, Clone)]
pub struct RuleSet {
    /// Rule-set version (identifies this rule set for A/B comparison)
    pub version: String,

    /// Global selection settings
    pub settings: Settings,

    rules: Vec<CompiledRule>,
    fallbacks: Vec<FallbackRule>,
}

impl RuleSet {
    /// Compile a rule set from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Self::compile(RuleSetDoc::from_yaml(yaml)?)
    }

    /// Compile a rule set from a file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        Self::compile(RuleSetDoc::from_file(path)?)
    }

    /// The default rule set shipped with the crate
    pub fn builtin() -> Result<Self> {
        Self::from_yaml(BUILTIN_RULES)
    }

    /// Validate and compile a parsed document
    pub fn compile(doc: RuleSetDoc) -> Result<Self> {
        validate_settings(&doc.settings)?;

        let mut rules = Vec::new();
        let mut seen_ids = BTreeSet::new();

        for (key, spec) in &doc.classification_rules.email_classifications {
            if let Some(rule) = compile_rule(key, spec, Category::Email, &mut seen_ids)? {
                rules.push(rule);
            }
        }
        for (key, spec) in &doc.classification_rules.action_classifications {
            if let Some(rule) = compile_rule(key, spec, Category::Action, &mut seen_ids)? {
                rules.push(rule);
            }
        }

        let mut fallbacks = Vec::new();
        for (key, spec) in &doc.fallback_rules {
            fallbacks.push(compile_fallback(key, spec, &mut seen_ids)?);
        }
        // Highest-confidence fallback first, so fallback output is ordered
        fallbacks.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.rule_id.cmp(&b.rule_id))
        });

        info!(
            version = %doc.version,
            rules = rules.len(),
            fallbacks = fallbacks.len(),
            "compiled rule set"
        );

        Ok(Self {
            version: doc.version,
            settings: doc.settings,
            rules,
            fallbacks,
        })
    }

    /// All enabled primary rules, email rules first, in declaration order
    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    /// Primary rules for one category
    pub fn rules_for(&self, category: Category) -> impl Iterator<Item = &CompiledRule> {
        self.rules.iter().filter(move |r| r.category == category)
    }

    /// Fallback rules, highest confidence first
    pub fn fallbacks(&self) -> &[FallbackRule] {
        &self.fallbacks
    }

    /// Fallback rule for one category, if configured
    pub fn fallback_for(&self, category: Category) -> Option<&FallbackRule> {
        self.fallbacks.iter().find(|f| f.category == category)
    }

    /// Minimum confidence a non-fallback result must reach in a category
    pub fn min_confidence(&self, category: Category) -> f32 {
        self.settings.min_confidence.for_category(category)
    }
}

fn validate_settings(settings: &Settings) -> Result<()> {
    if settings.max_labels_per_company < 1 {
        return Err(Error::config(
            "settings.max_labels_per_company must be at least 1",
        ));
    }
    for (name, floor) in [
        ("email", settings.min_confidence.email),
        ("action", settings.min_confidence.action),
    ] {
        if !(0.0..=1.0).contains(&floor) {
            return Err(Error::config(format!(
                "settings.min_confidence.{} must be within [0, 1], got {}",
                name, floor
            )));
        }
    }
    Ok(())
}

fn compile_rule(
    key: &str,
    spec: &RuleSpec,
    category: Category,
    seen_ids: &mut BTreeSet<String>,
) -> Result<Option<CompiledRule>> {
    if !spec.enabled {
        debug!(rule = key, "skipping disabled rule");
        return Ok(None);
    }

    let rule_id = spec
        .id
        .clone()
        .unwrap_or_else(|| format!("{}_{}", category.as_str(), key));
    if !seen_ids.insert(rule_id.clone()) {
        return Err(Error::config(format!("duplicate rule id: {}", rule_id)));
    }

    if spec.patterns.is_empty() {
        return Err(Error::config(format!(
            "rule {} has no patterns",
            rule_id
        )));
    }

    let patterns = spec
        .patterns
        .iter()
        .map(|p| compile_pattern(&rule_id, p))
        .collect::<Result<Vec<_>>>()?;

    let boosts = spec
        .confidence_boost
        .iter()
        .map(|b| compile_boost(&rule_id, b))
        .collect::<Result<Vec<_>>>()?;

    let name = spec
        .name
        .clone()
        .unwrap_or_else(|| title_case(key));

    Ok(Some(CompiledRule {
        rule_id,
        name,
        category,
        patterns,
        boosts,
        email_template: spec.email_template.clone(),
        action_type: spec.action_type.clone(),
        assignee: spec.assignee.clone(),
        requires_approval: spec.requires_approval,
        priority: spec.priority,
    }))
}

fn compile_pattern(rule_id: &str, spec: &PatternSpec) -> Result<CompiledPattern> {
    let weight = spec.weight();
    if !(0.0..=1.0).contains(&weight) {
        return Err(Error::config(format!(
            "rule {}: pattern weight must be within [0, 1], got {}",
            rule_id, weight
        )));
    }

    match spec {
        PatternSpec::Regex { regex, .. } => {
            let compiled = RegexBuilder::new(regex)
                .case_insensitive(true)
                .build()
                .map_err(|e| {
                    Error::config(format!("rule {}: invalid regex {:?}: {}", rule_id, regex, e))
                })?;
            Ok(CompiledPattern::Regex {
                source: regex.clone(),
                regex: compiled,
                weight,
            })
        }
        PatternSpec::Keywords { keywords, .. } => {
            if keywords.is_empty() {
                return Err(Error::config(format!(
                    "rule {}: keyword set must not be empty",
                    rule_id
                )));
            }
            let matcher = build_substring_matcher(rule_id, keywords)?;
            Ok(CompiledPattern::Keywords {
                keywords: keywords.clone(),
                matcher,
                weight,
            })
        }
    }
}

fn compile_boost(rule_id: &str, spec: &BoostSpec) -> Result<CompiledBoost> {
    if !(0.0..=1.0).contains(&spec.boost) {
        return Err(Error::config(format!(
            "rule {}: boost amount must be within [0, 1], got {}",
            rule_id, spec.boost
        )));
    }
    let triggers = spec.if_contains.terms();
    if triggers.is_empty() {
        return Err(Error::config(format!(
            "rule {}: boost condition has no trigger terms",
            rule_id
        )));
    }
    let matcher = build_substring_matcher(rule_id, &triggers)?;
    Ok(CompiledBoost {
        triggers,
        matcher,
        amount: spec.boost,
    })
}

fn compile_fallback(
    key: &str,
    spec: &FallbackSpec,
    seen_ids: &mut BTreeSet<String>,
) -> Result<FallbackRule> {
    if !(0.0..=1.0).contains(&spec.confidence) {
        return Err(Error::config(format!(
            "fallback {}: confidence must be within [0, 1], got {}",
            key, spec.confidence
        )));
    }

    let rule_id = spec.id.clone().unwrap_or_else(|| key.to_string());
    if !seen_ids.insert(rule_id.clone()) {
        return Err(Error::config(format!("duplicate rule id: {}", rule_id)));
    }

    Ok(FallbackRule {
        rule_id,
        name: spec.name.clone().unwrap_or_else(|| title_case(key)),
        category: spec.category,
        confidence: spec.confidence,
        email_template: spec.email_template.clone(),
        action_type: spec.action_type.clone(),
        priority: spec.priority,
    })
}

fn build_substring_matcher(rule_id: &str, terms: &[String]) -> Result<AhoCorasick> {
    AhoCorasick::builder()
        .ascii_case_insensitive(true)
        .build(terms)
        .map_err(|e| {
            Error::config(format!(
                "rule {}: failed to build substring matcher: {}",
                rule_id, e
            ))
        })
}

fn title_case(key: &str) -> String {
    key.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
version: "1.0.0"
classification_rules:
  email_classifications:
    low_pay_rate:
      patterns:
        - regex: "pay.*below.*market"
          weight: 0.9
      email_template: pay_rate_review
  action_classifications:
    contract_renegotiation:
      patterns:
        - keywords: [contract renewal, renegotiation]
          weight: 0.9
      action_type: schedule_renegotiation
fallback_rules:
  unknown_email_issue:
    category: email
    confidence: 0.5
    email_template: general_inquiry
  unknown_action_required:
    category: action
    confidence: 0.3
    action_type: manual_review
"#;

    #[test]
    fn test_compile_minimal() {
        let ruleset = RuleSet::from_yaml(MINIMAL).unwrap();
        assert_eq!(ruleset.version, "1.0.0");
        assert_eq!(ruleset.rules().len(), 2);
        assert_eq!(ruleset.fallbacks().len(), 2);
        assert_eq!(ruleset.rules_for(Category::Email).count(), 1);
        // Fallbacks ordered highest confidence first
        assert_eq!(ruleset.fallbacks()[0].rule_id, "unknown_email_issue");
    }

    #[test]
    fn test_default_rule_id_from_key() {
        let ruleset = RuleSet::from_yaml(MINIMAL).unwrap();
        let rule = ruleset.rules_for(Category::Email).next().unwrap();
        assert_eq!(rule.rule_id, "email_low_pay_rate");
        assert_eq!(rule.name, "Low Pay Rate");
    }

    #[test]
    fn test_malformed_regex_fails_at_load() {
        let yaml = r#"
version: "1.0.0"
classification_rules:
  email_classifications:
    broken:
      patterns:
        - regex: "pay.*(below"
          weight: 0.9
  action_classifications: {}
"#;
        let err = RuleSet::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, Error::Config(_)), "got: {err}");
    }

    #[test]
    fn test_weight_out_of_bounds_rejected() {
        let yaml = r#"
version: "1.0.0"
classification_rules:
  email_classifications:
    overweight:
      patterns:
        - regex: "pay"
          weight: 1.5
  action_classifications: {}
"#;
        assert!(RuleSet::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_zero_max_labels_rejected() {
        let yaml = r#"
version: "1.0.0"
settings:
  max_labels_per_company: 0
classification_rules:
  email_classifications: {}
  action_classifications: {}
"#;
        assert!(RuleSet::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_duplicate_rule_ids_rejected() {
        let yaml = r#"
version: "1.0.0"
classification_rules:
  email_classifications:
    first:
      id: shared
      patterns:
        - regex: "one"
  action_classifications:
    second:
      id: shared
      patterns:
        - regex: "two"
"#;
        assert!(RuleSet::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_disabled_rule_skipped() {
        let yaml = r#"
version: "1.0.0"
classification_rules:
  email_classifications:
    off:
      enabled: false
      patterns:
        - regex: "whatever"
  action_classifications: {}
"#;
        let ruleset = RuleSet::from_yaml(yaml).unwrap();
        assert!(ruleset.rules().is_empty());
    }

    #[test]
    fn test_rule_without_patterns_rejected() {
        let yaml = r#"
version: "1.0.0"
classification_rules:
  email_classifications:
    empty:
      patterns: []
  action_classifications: {}
"#;
        assert!(RuleSet::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_builtin_rules_compile() {
        let ruleset = RuleSet::builtin().unwrap();
        assert!(ruleset.rules_for(Category::Email).count() >= 3);
        assert!(ruleset.rules_for(Category::Action).count() >= 3);
        assert!(ruleset.fallback_for(Category::Email).is_some());
        assert!(ruleset.fallback_for(Category::Action).is_some());
    }

    #[test]
    fn test_from_file() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();

        let ruleset = RuleSet::from_file(file.path()).unwrap();
        assert_eq!(ruleset.rules().len(), 2);
    }
}
