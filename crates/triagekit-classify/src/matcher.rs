//! Per-rule pattern matching
//!
//! Evaluates one rule's compiled patterns against an input text and
//! returns a hit for every pattern that matched. Non-matching patterns
//! are omitted, never zero-scored.

use triagekit_core::PatternMatch;
use triagekit_rules::{CompiledPattern, CompiledRule};

/// One matched pattern, with its declaration index kept for
/// position-sensitive aggregation.
#[derive(Debug, Clone)]
pub struct PatternHit {
    /// Index of the pattern in the rule's declaration order
    pub index: usize,

    /// Score contributed by this pattern (its declared weight)
    pub score: f32,

    /// Match details for audit output
    pub detail: PatternMatch,
}

/// Match every pattern of `rule` against `text`.
///
/// Regex patterns have OR semantics: each matching alternative
/// contributes its own weight. A keyword set contributes a single weight
/// when any of its keywords appears as a case-insensitive substring.
/// Empty text yields no hits and never errors.
pub fn match_rule(rule: &CompiledRule, text: &str) -> Vec<PatternHit> {
    if text.is_empty() {
        return Vec::new();
    }

    let mut hits = Vec::new();

    for (index, pattern) in rule.patterns.iter().enumerate() {
        match pattern {
            CompiledPattern::Regex {
                source,
                regex,
                weight,
            } => {
                let spans: Vec<(usize, usize)> =
                    regex.find_iter(text).map(|m| (m.start(), m.end())).collect();
                if let Some(&(start, end)) = spans.first() {
                    hits.push(PatternHit {
                        index,
                        score: *weight,
                        detail: PatternMatch {
                            pattern: source.clone(),
                            score: *weight,
                            matched_text: text[start..end].to_string(),
                            spans,
                        },
                    });
                }
            }
            CompiledPattern::Keywords {
                keywords,
                matcher,
                weight,
            } => {
                let spans: Vec<(usize, usize)> = matcher
                    .find_iter(text)
                    .map(|m| (m.start(), m.end()))
                    .collect();
                if let Some(&(start, end)) = spans.first() {
                    hits.push(PatternHit {
                        index,
                        score: *weight,
                        detail: PatternMatch {
                            pattern: keywords.join("|"),
                            score: *weight,
                            matched_text: text[start..end].to_string(),
                            spans,
                        },
                    });
                }
            }
        }
    }

    hits
}
