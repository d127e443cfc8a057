//! Property-based testing strategies for JSON bodies and key-chains

#![cfg(test)]

use crate::keychain::{KeyChain, Segment};
use proptest::collection::{btree_map, vec};
use proptest::prelude::*;
use serde_json::{Map, Value};

/// Member names, including ones that need quoting
pub fn member_name_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z][a-zA-Z0-9_]{0,8}",
        "[a-z]{1,4}-[a-z]{1,4}",
        "[0-9]{1,3}",
        "[a-z]{1,3} [a-z]{1,3}",
        "[a-z]{0,3}`[a-z`]{0,3}",
    ]
}

pub fn segment_strategy() -> impl Strategy<Value = Segment> {
    prop_oneof![
        3 => member_name_strategy().prop_map(Segment::Key),
        1 => (0usize..5).prop_map(Segment::Index),
    ]
}

/// Non-root key-chains
pub fn key_chain_strategy() -> impl Strategy<Value = KeyChain> {
    vec(segment_strategy(), 1..6).prop_map(KeyChain::new)
}

pub fn primitive_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(Value::from),
        "[a-zA-Z0-9 ]{0,12}".prop_map(Value::String),
    ]
}

/// Arbitrary JSON values a few levels deep
pub fn json_value_strategy() -> impl Strategy<Value = Value> {
    primitive_strategy().prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            vec(inner.clone(), 0..4).prop_map(Value::Array),
            btree_map(member_name_strategy(), inner, 0..5)
                .prop_map(|members| Value::Object(members.into_iter().collect::<Map<_, _>>())),
        ]
    })
}

/// JSON objects, the shape of request and message bodies
pub fn json_body_strategy() -> impl Strategy<Value = Value> {
    btree_map(member_name_strategy(), json_value_strategy(), 1..6)
        .prop_map(|members| Value::Object(members.into_iter().collect::<Map<_, _>>()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{ExpressionCodec, PathExpressionCodec};
    use crate::matcher::AutoMatcher;
    use crate::tree::TreeBuilder;
    use crate::types::MappingDirection;

    proptest! {
        #[test]
        fn test_every_chain_resolves_to_its_node(value in json_value_strategy()) {
            let tree = TreeBuilder::new().build(&value).unwrap();
            for node in tree.walk() {
                let resolved = node.key_chain.resolve(&value);
                prop_assert!(resolved.is_some());
                prop_assert_eq!(crate::tree::NodeKind::of(resolved.unwrap()), node.kind);
            }
        }

        #[test]
        fn test_synthesized_expression_references_its_chain(chain in key_chain_strategy()) {
            let codec = PathExpressionCodec;
            let expression = codec.synthesize(std::slice::from_ref(&chain));
            prop_assert_eq!(codec.references(&expression).unwrap(), vec![chain]);
        }

        #[test]
        fn test_matched_pairs_target_required_leaves(
            source in json_body_strategy(),
            target in json_body_strategy(),
        ) {
            let builder = TreeBuilder::new();
            let source_tree = builder.build(&source).unwrap();
            let target_tree = builder.build(&target).unwrap();
            let leaves: Vec<KeyChain> = target_tree
                .mappable_leaves()
                .into_iter()
                .map(|n| n.key_chain.clone())
                .collect();

            let matcher = AutoMatcher::new(MappingDirection::Output);
            let pairs = matcher.match_identical(&source_tree, &target_tree);
            for pair in &pairs {
                prop_assert!(leaves.contains(&pair.required));
            }
            prop_assert_eq!(pairs, matcher.match_identical(&source_tree, &target_tree));
        }
    }
}
