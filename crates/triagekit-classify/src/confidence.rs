//! Rule-level confidence aggregation
//!
//! Combines the pattern hits for one rule into a single confidence in
//! [0, 1], applying the rule set's aggregation strategy and any boost
//! conditions. A rule with zero hits produces no confidence at all: it
//! is simply not a candidate.

use std::collections::BTreeMap;

use triagekit_core::ClassificationConfidence;
use triagekit_rules::{AggregationStrategy, CompiledRule};

use crate::matcher::PatternHit;

/// Total boost contribution is capped before the final clamp
const MAX_TOTAL_BOOST: f32 = 0.3;

/// Aggregate pattern hits into a rule-level confidence.
///
/// Returns `None` when there are no hits. The `weighted_average`
/// strategy weights each hit by the positional coefficient `1/(i+1)`,
/// where `i` is the pattern's declaration index in the rule, so earlier
/// patterns dominate:
///
/// ```text
/// base = sum(score_i / (i+1)) / sum(1 / (i+1))   over matched patterns
/// ```
///
/// Boosts are additive: every boost condition whose trigger substring
/// occurs in the text adds its amount, the total capped at 0.3, and the
/// final score clamped to [0, 1].
pub fn aggregate(
    rule: &CompiledRule,
    hits: &[PatternHit],
    text: &str,
    strategy: AggregationStrategy,
) -> Option<ClassificationConfidence> {
    if hits.is_empty() {
        return None;
    }

    let base = base_score(hits, strategy);
    let boost = boost_score(rule, text);
    let overall = (base + boost).clamp(0.0, 1.0);

    let mut components = BTreeMap::new();
    components.insert("base_score".to_string(), base);
    components.insert("boost".to_string(), boost);

    let factors = identify_factors(hits, base, boost);
    let explanation = build_explanation(hits.len(), base, boost, overall, strategy);

    Some(ClassificationConfidence {
        overall_score: overall,
        pattern_matches: hits.iter().map(|h| h.detail.clone()).collect(),
        components,
        factors,
        explanation,
    })
}

fn base_score(hits: &[PatternHit], strategy: AggregationStrategy) -> f32 {
    match strategy {
        AggregationStrategy::Max => hits.iter().map(|h| h.score).fold(0.0, f32::max),
        AggregationStrategy::Average => {
            hits.iter().map(|h| h.score).sum::<f32>() / hits.len() as f32
        }
        AggregationStrategy::WeightedAverage => {
            let mut weighted = 0.0;
            let mut total = 0.0;
            for hit in hits {
                let coefficient = 1.0 / (hit.index as f32 + 1.0);
                weighted += hit.score * coefficient;
                total += coefficient;
            }
            weighted / total
        }
    }
}

fn boost_score(rule: &CompiledRule, text: &str) -> f32 {
    let mut total = 0.0;
    for boost in &rule.boosts {
        if boost.matcher.find(text).is_some() {
            total += boost.amount;
        }
    }
    total.min(MAX_TOTAL_BOOST)
}

fn identify_factors(hits: &[PatternHit], base: f32, boost: f32) -> Vec<String> {
    let mut factors = Vec::new();
    if base > 0.8 {
        factors.push("strong_pattern_match".to_string());
    }
    if hits.len() > 2 {
        factors.push("multiple_pattern_matches".to_string());
    }
    if boost > 0.0 {
        factors.push("boost_conditions".to_string());
    }
    if base < 0.4 {
        factors.push("weak_pattern_match".to_string());
    }
    factors
}

fn build_explanation(
    hit_count: usize,
    base: f32,
    boost: f32,
    overall: f32,
    strategy: AggregationStrategy,
) -> String {
    let strategy_name = match strategy {
        AggregationStrategy::Max => "max",
        AggregationStrategy::Average => "average",
        AggregationStrategy::WeightedAverage => "weighted_average",
    };
    let mut parts = vec![format!(
        "{} pattern match(es), base {:.3} via {}",
        hit_count, base, strategy_name
    )];
    if boost > 0.0 {
        parts.push(format!("boost +{:.3}", boost));
    }
    format!(
        "Confidence {:.3} from {}",
        overall,
        parts.join(", ")
    )
}
