//! Context similarity metric.
//!
//! Similarity is computed structurally: maps compare key by key over the
//! union of their keys (recursing into nested maps), scalars score `1.0` on
//! an exact match, and differing strings earn partial credit for token
//! overlap. The metric is symmetric, reflexive (`sim(a, a) == 1.0`) and
//! bounded to `[0, 1]`.

use super::value::{Context, ContextValue};
use std::collections::{BTreeMap, BTreeSet};

/// Tunable weights for [`context_similarity`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityWeights {
    /// Multiplier applied to the token Jaccard score of two differing strings.
    pub partial_string_weight: f64,
}

impl Default for SimilarityWeights {
    fn default() -> Self {
        Self {
            partial_string_weight: 0.5,
        }
    }
}

/// Similarity of two contexts in `[0, 1]`.
pub fn context_similarity(a: &Context, b: &Context, weights: SimilarityWeights) -> f64 {
    map_similarity(a.entries(), b.entries(), weights)
}

fn map_similarity(
    a: &BTreeMap<String, ContextValue>,
    b: &BTreeMap<String, ContextValue>,
    weights: SimilarityWeights,
) -> f64 {
    let keys: BTreeSet<&String> = a.keys().chain(b.keys()).collect();
    if keys.is_empty() {
        return 1.0;
    }

    let total: f64 = keys
        .iter()
        .filter_map(|key| match (a.get(*key), b.get(*key)) {
            (Some(left), Some(right)) => Some(value_similarity(left, right, weights)),
            _ => None,
        })
        .sum();

    (total / keys.len() as f64).clamp(0.0, 1.0)
}

fn value_similarity(a: &ContextValue, b: &ContextValue, weights: SimilarityWeights) -> f64 {
    match (a, b) {
        (ContextValue::Null, ContextValue::Null) => 1.0,
        (ContextValue::Bool(x), ContextValue::Bool(y)) => exact(x == y),
        (ContextValue::Number(x), ContextValue::Number(y)) => {
            exact(x == y || (x.is_nan() && y.is_nan()))
        }
        (ContextValue::String(x), ContextValue::String(y)) => string_similarity(x, y, weights),
        (ContextValue::Map(x), ContextValue::Map(y)) => map_similarity(x, y, weights),
        (ContextValue::List(x), ContextValue::List(y)) => list_similarity(x, y),
        _ => 0.0,
    }
}

fn exact(equal: bool) -> f64 {
    if equal { 1.0 } else { 0.0 }
}

fn string_similarity(a: &str, b: &str, weights: SimilarityWeights) -> f64 {
    if a == b {
        return 1.0;
    }
    jaccard(&tokens(a), &tokens(b)) * weights.partial_string_weight
}

fn tokens(s: &str) -> BTreeSet<String> {
    s.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn list_similarity(a: &[ContextValue], b: &[ContextValue]) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let left: BTreeSet<String> = a.iter().map(element_key).collect();
    let right: BTreeSet<String> = b.iter().map(element_key).collect();
    jaccard(&left, &right)
}

fn element_key(value: &ContextValue) -> String {
    // Tag the variant so the string "1" and the number 1 stay distinct.
    match value {
        ContextValue::String(s) => format!("s:{}", s),
        other => format!("v:{}", serde_json::to_string(other).unwrap_or_default()),
    }
}

fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn ctx(value: serde_json::Value) -> Context {
        Context::from_json(&value).unwrap()
    }

    fn sim(a: &Context, b: &Context) -> f64 {
        context_similarity(a, b, SimilarityWeights::default())
    }

    #[test]
    fn identical_contexts_score_one() {
        let a = ctx(json!({"task": {"type": "research", "depth": 3}, "tags": ["x"]}));
        assert_eq!(sim(&a, &a), 1.0);
    }

    #[test]
    fn disjoint_contexts_score_zero() {
        let a = ctx(json!({"language": "rust"}));
        let b = ctx(json!({"region": "eu"}));
        assert!(sim(&a, &b).abs() < 1e-9);
    }

    #[test]
    fn empty_vs_non_empty_scores_zero() {
        assert_eq!(sim(&Context::new(), &ctx(json!({"a": 1}))), 0.0);
        assert_eq!(sim(&Context::new(), &Context::new()), 1.0);
    }

    #[test]
    fn nested_fields_contribute_partially() {
        let a = ctx(json!({"task": {"type": "research", "depth": 3}}));
        let b = ctx(json!({"task": {"type": "research", "depth": 5}}));
        let score = sim(&a, &b);
        assert!((score - 0.5).abs() < 1e-9, "score was {}", score);
    }

    #[test]
    fn partial_string_overlap_is_weighted() {
        let a = ctx(json!({"query": "rust async runtime"}));
        let b = ctx(json!({"query": "rust runtime"}));
        let score = sim(&a, &b);
        // jaccard 2/3 * 0.5
        assert!((score - (2.0 / 3.0) * 0.5).abs() < 1e-9);
    }

    #[test]
    fn partial_weight_is_configurable() {
        let a = ctx(json!({"query": "rust async"}));
        let b = ctx(json!({"query": "rust"}));
        let full = context_similarity(
            &a,
            &b,
            SimilarityWeights {
                partial_string_weight: 1.0,
            },
        );
        assert!((full - 0.5).abs() < 1e-9);
    }

    #[test]
    fn type_mismatch_scores_zero() {
        let a = ctx(json!({"n": 1}));
        let b = ctx(json!({"n": "1"}));
        assert_eq!(sim(&a, &b), 0.0);
    }

    fn arb_value() -> impl Strategy<Value = ContextValue> {
        let leaf = prop_oneof![
            Just(ContextValue::Null),
            any::<bool>().prop_map(ContextValue::Bool),
            (-100i32..100).prop_map(ContextValue::from),
            "[a-c ]{0,6}".prop_map(ContextValue::String),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                proptest::collection::vec(inner.clone(), 0..4).prop_map(ContextValue::List),
                proptest::collection::btree_map("[a-d]", inner, 0..4).prop_map(ContextValue::Map),
            ]
        })
    }

    fn arb_context() -> impl Strategy<Value = Context> {
        proptest::collection::btree_map("[a-e]", arb_value(), 0..5).prop_map(Context::from)
    }

    proptest! {
        #[test]
        fn similarity_is_symmetric(a in arb_context(), b in arb_context()) {
            let ab = sim(&a, &b);
            let ba = sim(&b, &a);
            prop_assert!((ab - ba).abs() < 1e-12);
            prop_assert!((0.0..=1.0).contains(&ab));
        }

        #[test]
        fn similarity_is_reflexive(a in arb_context()) {
            prop_assert_eq!(sim(&a, &a), 1.0);
        }
    }
}
