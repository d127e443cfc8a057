//! Packaging pairs into mapping documents

use crate::codec::{render, ExpressionCodec, PathExpressionCodec};
use crate::keychain::Segment;
use crate::store::{MappingPair, MappingPairStore};
use crate::types::{ApiInterface, ApiStyle, MappingBody, MappingDirection, MappingDocument};
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Builds [`MappingDocument`]s from the pairs of a session
///
/// Pairs without an expression get a synthesized one; expressions written
/// by the operator are kept verbatim.
#[derive(Clone)]
pub struct MappingAssembler {
    source: ApiInterface,
    targets: BTreeMap<String, ApiInterface>,
    direction: MappingDirection,
    codec: Arc<dyn ExpressionCodec>,
}

impl fmt::Debug for MappingAssembler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappingAssembler")
            .field("source", &self.source)
            .field("targets", &self.targets.keys().collect::<Vec<_>>())
            .field("direction", &self.direction)
            .finish_non_exhaustive()
    }
}

impl MappingAssembler {
    pub fn new(
        source: ApiInterface,
        targets: BTreeMap<String, ApiInterface>,
        direction: MappingDirection,
    ) -> Self {
        Self {
            source,
            targets,
            direction,
            codec: Arc::new(PathExpressionCodec),
        }
    }

    pub fn with_codec(mut self, codec: Arc<dyn ExpressionCodec>) -> Self {
        self.codec = codec;
        self
    }

    /// Document with one request tree and one response tree
    pub fn request_response(
        &self,
        request: &MappingPairStore,
        response: &MappingPairStore,
    ) -> Result<MappingDocument> {
        self.expect_style(ApiStyle::OpenApi)?;
        let request = render(&self.completed(request))?;
        let response = render(&self.completed(response))?;
        Ok(self.document(MappingBody::RequestResponse { request, response }))
    }

    /// Document with one tree per target key
    ///
    /// Every target gets an entry, possibly empty.
    pub fn messages(&self, store: &MappingPairStore) -> Result<MappingDocument> {
        self.expect_style(ApiStyle::AsyncApi)?;

        let mut groups: BTreeMap<&str, Vec<MappingPair>> =
            self.targets.keys().map(|k| (k.as_str(), Vec::new())).collect();

        for pair in self.completed(store) {
            match self.group_key(&pair)? {
                Some(key) => {
                    if let Some(group) = groups.get_mut(key.as_str()) {
                        group.push(pair);
                    }
                }
                None => {
                    for group in groups.values_mut() {
                        group.push(pair.clone());
                    }
                }
            }
        }

        let messages = groups
            .into_iter()
            .map(|(key, pairs)| Ok((key.to_string(), render(&pairs)?)))
            .collect::<Result<BTreeMap<_, _>>>()?;
        tracing::debug!(targets = messages.len(), direction = %self.direction, "Assembled message mappings");
        Ok(self.document(MappingBody::Messages { messages }))
    }

    /// Target key a message pair belongs to; `None` means every target
    fn group_key(&self, pair: &MappingPair) -> Result<Option<String>> {
        let segment = match self.direction {
            MappingDirection::Output => pair.required.first(),
            MappingDirection::Input => match pair.provided_origin() {
                Some(origin) => Some(origin),
                None if pair.provided.is_empty() => return Ok(None),
                None => None,
            },
        };
        match segment {
            Some(Segment::Key(key)) if self.targets.contains_key(key) => Ok(Some(key.clone())),
            _ => Err(Error::assembly(format!(
                "pair for '{}' does not belong to any target",
                pair.required
            ))),
        }
    }

    fn completed(&self, store: &MappingPairStore) -> Vec<MappingPair> {
        store
            .iter()
            .map(|pair| {
                let mut pair = pair.clone();
                if pair.is_incomplete() {
                    pair.expression = self.codec.synthesize(&pair.provided);
                }
                pair
            })
            .collect()
    }

    fn expect_style(&self, style: ApiStyle) -> Result<()> {
        if self.source.style() == style {
            Ok(())
        } else {
            Err(Error::assembly(format!(
                "source {} is not a {:?} interface",
                self.source.key(),
                style
            )))
        }
    }

    fn document(&self, body: MappingBody) -> MappingDocument {
        MappingDocument {
            source: self.source.clone(),
            targets: self.targets.clone(),
            direction: self.direction,
            body,
        }
    }
}
