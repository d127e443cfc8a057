//! Property-based tests for completeness validation and the codec
//!
//! These tests check the invariants that must hold for any required body.

use apimap_core::codec::{render, ExpressionCodec, PathExpressionCodec};
use apimap_core::types::{keyed_interfaces, REQUEST_SECTION};
use apimap_core::{
    ApiInterface, CompletenessValidator, ExpressionTree, KeyChain, MappingBody, MappingDirection,
    MappingDocument, MappingPair, MappingPairStore, RequiredSchemas, TreeBuilder,
};
use proptest::collection::{btree_map, vec};
use proptest::prelude::*;
use serde_json::{Map, Value};
use std::collections::BTreeSet;

// Strategy functions for property testing

/// Strategy for generating member names
fn member_name_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z][a-zA-Z0-9]{0,6}",
        "[a-z]{1,3}-[a-z]{1,3}",
    ]
}

/// Strategy for generating required bodies
fn body_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        any::<i64>().prop_map(Value::from),
        "[a-z]{0,5}".prop_map(Value::String),
        any::<bool>().prop_map(Value::Bool),
        vec("[a-z]{1,3}".prop_map(Value::String), 0..3).prop_map(Value::Array),
    ];
    let value = leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            btree_map(member_name_strategy(), inner.clone(), 1..4)
                .prop_map(|m| Value::Object(m.into_iter().collect::<Map<_, _>>())),
            vec(
                btree_map(member_name_strategy(), inner, 1..3)
                    .prop_map(|m| Value::Object(m.into_iter().collect::<Map<_, _>>())),
                1..3
            )
            .prop_map(Value::Array),
        ]
    });
    btree_map(member_name_strategy(), value, 1..5)
        .prop_map(|m| Value::Object(m.into_iter().collect::<Map<_, _>>()))
}

fn document(request: ExpressionTree) -> MappingDocument {
    MappingDocument {
        source: ApiInterface::operation("src", "op", "200"),
        targets: keyed_interfaces([ApiInterface::operation("dst", "op", "200")]),
        direction: MappingDirection::Output,
        body: MappingBody::RequestResponse {
            request,
            response: ExpressionTree::empty(),
        },
    }
}

/// One pair per required leaf shape, reading the same path from the source
fn full_store(body: &Value) -> MappingPairStore {
    let codec = PathExpressionCodec;
    let mut shapes = BTreeSet::new();
    TreeBuilder::new()
        .build(body)
        .unwrap()
        .mappable_leaves()
        .into_iter()
        .filter(|leaf| shapes.insert(leaf.key_chain.shape_key()))
        .map(|leaf| {
            let provided = vec![leaf.key_chain.clone()];
            let expression = codec.synthesize(&provided);
            MappingPair::new(provided, leaf.key_chain.clone(), expression)
        })
        .collect()
}

proptest! {
    #[test]
    fn test_full_mapping_is_complete(body in body_strategy()) {
        let store = full_store(&body);
        let schemas = RequiredSchemas::new().with_section(REQUEST_SECTION, body);
        let report = CompletenessValidator::new()
            .validate(&document(render(&store).unwrap()), &schemas)
            .unwrap();
        prop_assert!(report.is_complete());
    }

    #[test]
    fn test_removing_a_pair_reports_exactly_that_field(
        body in body_strategy(),
        pick in any::<prop::sample::Index>(),
    ) {
        let mut store = full_store(&body);
        prop_assume!(!store.is_empty());
        let removed = store.remove_at(pick.index(store.len())).unwrap();

        let schemas = RequiredSchemas::new().with_section(REQUEST_SECTION, body);
        let report = CompletenessValidator::new()
            .validate(&document(render(&store).unwrap()), &schemas)
            .unwrap();
        prop_assert!(!report.is_complete());

        let missing: Vec<&KeyChain> = report.issues().map(|(_, issue)| &issue.chain).collect();
        prop_assert!(missing.iter().all(|chain| chain.same_shape(&removed.required)));
        prop_assert!(missing.contains(&&removed.required));
    }

    #[test]
    fn test_rendered_tree_parses_to_the_same_pairs(body in body_strategy()) {
        let store = full_store(&body);
        let tree = render(&store).unwrap();
        let parsed = PathExpressionCodec.parse(&tree).unwrap();
        prop_assert_eq!(parsed.len(), store.len());
        for pair in &parsed {
            prop_assert_eq!(store.get(&pair.required), Some(pair));
        }
    }
}
