//! Automatic matching of structurally identical fields
//!
//! The matcher walks the mappable leaves of the required tree in pre-order
//! and looks for a leaf with the same shape on the provided side. Matching is
//! deterministic: an exact chain match wins over a shape match, and among
//! shape matches the first leaf in pre-order wins.

use crate::codec::{ExpressionCodec, PathExpressionCodec};
use crate::keychain::{segments_same_shape, Segment};
use crate::store::MappingPair;
use crate::tree::{NodeKind, TreeNode};
use crate::types::MappingDirection;
use std::sync::Arc;

/// Proposes pairs between two trees
#[derive(Clone)]
pub struct AutoMatcher {
    direction: MappingDirection,
    qualifier_depth: usize,
    each_provider: bool,
    codec: Arc<dyn ExpressionCodec>,
}

impl std::fmt::Debug for AutoMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutoMatcher")
            .field("direction", &self.direction)
            .field("qualifier_depth", &self.qualifier_depth)
            .field("each_provider", &self.each_provider)
            .finish_non_exhaustive()
    }
}

impl AutoMatcher {
    pub fn new(direction: MappingDirection) -> Self {
        Self {
            direction,
            qualifier_depth: 0,
            each_provider: false,
            codec: Arc::new(PathExpressionCodec),
        }
    }

    /// Ignore the first `depth` segments of every chain when comparing
    ///
    /// Keyed trees carry the interface key as their first segment, so
    /// sessions match with a depth of 1.
    pub fn with_qualifier_depth(mut self, depth: usize) -> Self {
        self.qualifier_depth = depth;
        self
    }

    /// Match every provider interface on its own
    ///
    /// Provided leaves are grouped by their first segment, and each group
    /// gets its own pair for every required leaf it can satisfy. Has no
    /// effect without a qualifier depth.
    pub fn each_provider(mut self, each_provider: bool) -> Self {
        self.each_provider = each_provider;
        self
    }

    pub fn with_codec(mut self, codec: Arc<dyn ExpressionCodec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn direction(&self) -> MappingDirection {
        self.direction
    }

    /// Pairs for every required leaf that has an identical counterpart
    ///
    /// With [`MappingDirection::Output`] the `target` tree is required and
    /// `source` provides; [`MappingDirection::Input`] swaps the roles.
    pub fn match_identical(&self, source: &TreeNode, target: &TreeNode) -> Vec<MappingPair> {
        let (provided_tree, required_tree) = match self.direction {
            MappingDirection::Output => (source, target),
            MappingDirection::Input => (target, source),
        };

        let candidates = provided_tree.mappable_leaves();
        let required_leaves = required_tree.mappable_leaves();
        let mut pairs = Vec::new();

        for group in self.provider_groups(&candidates) {
            for required in &required_leaves {
                let Some(provided) = self.find_candidate(required, &group) else {
                    tracing::trace!(required = %required.key_chain, "No identical field");
                    continue;
                };
                let chains = [provided.key_chain.clone()];
                let expression = self.codec.synthesize(&chains);
                pairs.push(MappingPair::new(
                    chains.to_vec(),
                    required.key_chain.clone(),
                    expression,
                ));
            }
        }

        tracing::debug!(
            direction = %self.direction,
            required = required_leaves.len(),
            candidates = candidates.len(),
            matched = pairs.len(),
            "Auto-matched identical fields"
        );
        pairs
    }

    /// Candidates split by provider interface, in first-seen order
    fn provider_groups<'a>(&self, candidates: &[&'a TreeNode]) -> Vec<Vec<&'a TreeNode>> {
        if !self.each_provider || self.qualifier_depth == 0 {
            return vec![candidates.to_vec()];
        }
        let mut groups: Vec<(Option<&Segment>, Vec<&'a TreeNode>)> = Vec::new();
        for candidate in candidates {
            let origin = candidate.key_chain.first();
            match groups.iter_mut().find(|(key, _)| *key == origin) {
                Some((_, group)) => group.push(*candidate),
                None => groups.push((origin, vec![*candidate])),
            }
        }
        groups.into_iter().map(|(_, group)| group).collect()
    }

    fn find_candidate<'a>(&self, required: &TreeNode, candidates: &[&'a TreeNode]) -> Option<&'a TreeNode> {
        let wanted = required.key_chain.skip(self.qualifier_depth);
        let compatible = candidates.iter().filter(|c| kinds_compatible(required, c));

        let mut shape_match = None;
        for candidate in compatible {
            let offered = candidate.key_chain.skip(self.qualifier_depth);
            if offered == wanted {
                return Some(*candidate);
            }
            if shape_match.is_none() && segments_same_shape(offered, wanted) {
                shape_match = Some(*candidate);
            }
        }
        shape_match
    }
}

/// Whether two mappable leaves hold the same kind of data
///
/// Leaf arrays must agree on their single item kind. An empty array is
/// compatible with any leaf array; arrays mixing item kinds match nothing.
pub fn kinds_compatible(a: &TreeNode, b: &TreeNode) -> bool {
    match (a.kind, b.kind) {
        (NodeKind::Array, NodeKind::Array) => {
            let (left, right) = (a.item_kinds(), b.item_kinds());
            match (left.as_slice(), right.as_slice()) {
                ([], [] | [_]) | ([_], []) => true,
                ([x], [y]) => x == y,
                _ => false,
            }
        }
        (x, y) => x == y,
    }
}
