//! Recommendation classifier
//!
//! Runs one input text through the full classification flow:
//! validate, match every rule, aggregate confidences, select qualifying
//! results, and fall back to the configured defaults when nothing
//! qualifies. Pure function of (text, rule set); callers always get at
//! least one result when fallbacks are configured.

use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use triagekit_core::{
    Category, Classification, ClassificationConfidence, CompanyClassification,
};
use triagekit_rules::{CompiledRule, FallbackRule, RuleSet};

use crate::confidence::aggregate;
use crate::matcher::match_rule;

/// Classifies recommendation texts against a frozen rule set.
///
/// All thresholds and limits come from the injected rule set; nothing is
/// read from ambient process state. The classifier is `Send + Sync` and
/// safe to share across concurrent calls.
#[derive(Debug, Clone)]
pub struct RecommendationClassifier {
    ruleset: Arc<RuleSet>,
}

impl RecommendationClassifier {
    /// Create a classifier over a compiled rule set
    pub fn new(ruleset: Arc<RuleSet>) -> Self {
        Self { ruleset }
    }

    /// The active rule set
    pub fn ruleset(&self) -> &RuleSet {
        &self.ruleset
    }

    /// Classify one recommendation text for a company.
    ///
    /// Empty or whitespace-only text routes straight to the default
    /// email fallback: account managers always get an answer.
    pub fn classify(&self, company_id: &str, text: &str) -> CompanyClassification {
        let mut warnings = Vec::new();

        // INIT
        let results = if text.trim().is_empty() {
            warnings.push("empty input text, returning fallback".to_string());
            self.empty_input_fallback()
        } else {
            // MATCHING + AGGREGATING
            let mut candidates = self.collect_candidates(text);

            // SELECTING
            sort_candidates(&mut candidates);
            let selected = self.select(candidates);

            if selected.is_empty() {
                // FALLBACK
                debug!(company_id, "no rule qualified, emitting fallbacks");
                self.all_fallbacks()
            } else {
                selected
            }
        };

        debug!(
            company_id,
            results = results.len(),
            version = %self.ruleset.version,
            "classified recommendation"
        );

        // DONE
        CompanyClassification {
            company_id: company_id.to_string(),
            ruleset_version: self.ruleset.version.clone(),
            results,
            generated_at: Utc::now(),
            warnings,
        }
    }

    fn collect_candidates(&self, text: &str) -> Vec<Classification> {
        let strategy = self.ruleset.settings.confidence_aggregation;
        let mut candidates = Vec::new();

        for rule in self.ruleset.rules() {
            let hits = match_rule(rule, text);
            if let Some(confidence) = aggregate(rule, &hits, text, strategy) {
                candidates.push(build_classification(rule, &hits, confidence));
            }
        }

        candidates
    }

    fn select(&self, candidates: Vec<Classification>) -> Vec<Classification> {
        let settings = &self.ruleset.settings;

        let qualifying: Vec<Classification> = candidates
            .into_iter()
            .filter(|c| c.score() >= self.ruleset.min_confidence(c.category))
            .collect();

        if settings.enable_multi_label {
            qualifying
                .into_iter()
                .take(settings.max_labels_per_company)
                .collect()
        } else {
            qualifying.into_iter().take(1).collect()
        }
    }

    fn empty_input_fallback(&self) -> Vec<Classification> {
        // Only the default-category fallback for blank input
        self.ruleset
            .fallback_for(Category::Email)
            .or_else(|| self.ruleset.fallbacks().first())
            .map(fallback_classification)
            .into_iter()
            .collect()
    }

    fn all_fallbacks(&self) -> Vec<Classification> {
        self.ruleset
            .fallbacks()
            .iter()
            .map(fallback_classification)
            .take(self.ruleset.settings.max_labels_per_company)
            .collect()
    }
}

fn build_classification(
    rule: &CompiledRule,
    hits: &[crate::matcher::PatternHit],
    confidence: ClassificationConfidence,
) -> Classification {
    // Strongest hit provides the representative matched text
    let matched_text = hits
        .iter()
        .max_by(|a, b| {
            a.score
                .partial_cmp(&b.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(b.index.cmp(&a.index))
        })
        .map(|h| h.detail.matched_text.clone())
        .unwrap_or_default();

    Classification {
        rule_id: rule.rule_id.clone(),
        category: rule.category,
        confidence,
        matched_text,
        recommended_template: rule.email_template.clone(),
        recommended_action: rule.action_type.clone(),
        assignee: rule.assignee.clone(),
        requires_approval: rule.requires_approval,
        priority: rule.priority,
        fallback: false,
    }
}

fn fallback_classification(fallback: &FallbackRule) -> Classification {
    let mut components = BTreeMap::new();
    components.insert("fallback_confidence".to_string(), fallback.confidence);

    Classification {
        rule_id: fallback.rule_id.clone(),
        category: fallback.category,
        confidence: ClassificationConfidence {
            overall_score: fallback.confidence,
            pattern_matches: Vec::new(),
            components,
            factors: vec!["fallback".to_string()],
            explanation: format!(
                "Fallback {} at fixed confidence {:.3}: no primary rule qualified",
                fallback.rule_id, fallback.confidence
            ),
        },
        matched_text: String::new(),
        recommended_template: fallback.email_template.clone(),
        recommended_action: fallback.action_type.clone(),
        assignee: None,
        requires_approval: false,
        priority: fallback.priority,
        fallback: true,
    }
}

/// Highest confidence first; ties broken by rule id so repeated runs
/// produce identical orderings.
fn sort_candidates(candidates: &mut [Classification]) {
    candidates.sort_by(|a, b| {
        b.score()
            .partial_cmp(&a.score())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.rule_id.cmp(&b.rule_id))
    });
}
