//! Mapping pairs and the ordered store they are edited in

use crate::codec::{ExpressionCodec, ExpressionTree};
use crate::keychain::{KeyChain, Segment};
use crate::types::MappingDirection;
use crate::Result;
use serde::{Deserialize, Serialize};

/// Correspondence from provided source locations to one required location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingPair {
    /// Source chains read by the expression; several when aggregating
    pub provided: Vec<KeyChain>,
    /// The single target field this pair satisfies
    pub required: KeyChain,
    /// Expression computing the target; empty while unspecified
    #[serde(rename = "mappingCode", default)]
    pub expression: String,
}

impl MappingPair {
    pub fn new(provided: Vec<KeyChain>, required: KeyChain, expression: impl Into<String>) -> Self {
        Self {
            provided,
            required,
            expression: expression.into(),
        }
    }

    /// Whether the pair still needs an expression
    pub fn is_incomplete(&self) -> bool {
        self.expression.trim().is_empty()
    }

    /// Leading segment of the first provided chain
    pub fn provided_origin(&self) -> Option<&Segment> {
        self.provided.first().and_then(KeyChain::first)
    }
}

/// When two pairs count as the same mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairIdentity {
    /// One pair per required chain
    Required,
    /// One pair per required chain and providing interface
    RequiredAndOrigin,
}

impl PairIdentity {
    pub fn same(self, a: &MappingPair, b: &MappingPair) -> bool {
        a.required == b.required
            && match self {
                PairIdentity::Required => true,
                PairIdentity::RequiredAndOrigin => a.provided_origin() == b.provided_origin(),
            }
    }
}

/// Several providers may feed the same target in [`MappingDirection::Input`]
impl From<MappingDirection> for PairIdentity {
    fn from(direction: MappingDirection) -> Self {
        match direction {
            MappingDirection::Output => PairIdentity::Required,
            MappingDirection::Input => PairIdentity::RequiredAndOrigin,
        }
    }
}

/// Ordered collection of the pairs being edited in one session
///
/// Pairs are looked up by their required chain. The store does not reject
/// a second pair for the same target; callers check [`Self::contains`]
/// first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MappingPairStore {
    pairs: Vec<MappingPair>,
}

impl MappingPairStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, pair: MappingPair) {
        self.pairs.push(pair);
    }

    /// Remove the pair targeting `required`
    pub fn remove(&mut self, required: &KeyChain) -> Option<MappingPair> {
        let index = self.pairs.iter().position(|p| &p.required == required)?;
        Some(self.pairs.remove(index))
    }

    pub fn remove_at(&mut self, index: usize) -> Option<MappingPair> {
        (index < self.pairs.len()).then(|| self.pairs.remove(index))
    }

    pub fn get(&self, required: &KeyChain) -> Option<&MappingPair> {
        self.pairs.iter().find(|p| &p.required == required)
    }

    pub fn is_mapped(&self, required: &KeyChain) -> bool {
        self.get(required).is_some()
    }

    /// Whether a pair the same as `pair` under `identity` is stored
    pub fn contains(&self, pair: &MappingPair, identity: PairIdentity) -> bool {
        self.pairs.iter().any(|existing| identity.same(existing, pair))
    }

    /// Replace the expression of the pair targeting `required`
    ///
    /// Returns `false` when no such pair exists.
    pub fn set_expression(&mut self, required: &KeyChain, expression: impl Into<String>) -> bool {
        match self.pairs.iter_mut().find(|p| &p.required == required) {
            Some(pair) => {
                pair.expression = expression.into();
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &MappingPair> {
        self.pairs.iter()
    }

    pub fn as_slice(&self) -> &[MappingPair] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Pairs with an empty expression
    pub fn incomplete(&self) -> Vec<&MappingPair> {
        self.pairs.iter().filter(|p| p.is_incomplete()).collect()
    }

    /// Append auto-matched pairs that do not duplicate existing ones
    ///
    /// Existing pairs are never overwritten. With [`PairIdentity::Required`]
    /// a pair is a duplicate when its required chain is already mapped; with
    /// [`PairIdentity::RequiredAndOrigin`] the provided origin must match as
    /// well. Returns the number of pairs added.
    pub fn merge_matched(
        &mut self,
        pairs: impl IntoIterator<Item = MappingPair>,
        identity: impl Into<PairIdentity>,
    ) -> usize {
        let identity = identity.into();
        let mut added = 0;
        for pair in pairs {
            if !self.contains(&pair, identity) {
                self.pairs.push(pair);
                added += 1;
            }
        }
        tracing::debug!(added, total = self.pairs.len(), ?identity, "Merged matched pairs");
        added
    }

    /// Replace every pair
    pub fn replace_with(&mut self, pairs: Vec<MappingPair>) {
        self.pairs = pairs;
    }

    /// Replace the contents with the pairs parsed from `tree`
    ///
    /// Parsing happens before anything is touched: on error the store keeps
    /// its previous pairs.
    pub fn apply_expression_tree(
        &mut self,
        codec: &dyn ExpressionCodec,
        tree: &ExpressionTree,
    ) -> Result<usize> {
        let parsed = codec.parse(tree)?;
        let count = parsed.len();
        self.pairs = parsed;
        Ok(count)
    }
}

impl FromIterator<MappingPair> for MappingPairStore {
    fn from_iter<T: IntoIterator<Item = MappingPair>>(iter: T) -> Self {
        Self {
            pairs: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a MappingPairStore {
    type Item = &'a MappingPair;
    type IntoIter = std::slice::Iter<'a, MappingPair>;

    fn into_iter(self) -> Self::IntoIter {
        self.pairs.iter()
    }
}
