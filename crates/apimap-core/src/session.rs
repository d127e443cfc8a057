//! Editing sessions
//!
//! A [`MappingSession`] ties the engine together for one source/target
//! combination: it holds the fetched bodies, the pair stores being edited,
//! and produces the document and the schemas it must satisfy. Sessions are
//! edited by one caller at a time.

use crate::assembler::MappingAssembler;
use crate::boundary::{MappingSuggester, SchemaSource};
use crate::codec::{ExpressionCodec, PathExpressionCodec};
use crate::keychain::KeyChain;
use crate::matcher::AutoMatcher;
use crate::store::{MappingPair, MappingPairStore, PairIdentity};
use crate::tree::{TreeBuilder, TreeNode};
use crate::types::{
    keyed_interfaces, ApiInterface, ApiStyle, BodyPart, MappingBody, MappingDirection,
    MappingDocument, REQUEST_SECTION, RESPONSE_SECTION,
};
use crate::validator::{
    CompletenessValidator, FieldIssue, IssueKind, RequiredSchemas, SectionReport, ValidationResult,
};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Which pair store an operation works on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Request,
    Response,
    Messages,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Section::Request => write!(f, "request"),
            Section::Response => write!(f, "response"),
            Section::Messages => write!(f, "messages"),
        }
    }
}

/// Bodies fetched for the interfaces of a session, by interface key
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InterfaceBodies {
    bodies: BTreeMap<String, BTreeMap<BodyPart, Value>>,
}

impl InterfaceBodies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, part: BodyPart, body: Value) {
        self.bodies.entry(key.into()).or_default().insert(part, body);
    }

    pub fn get(&self, key: &str, part: BodyPart) -> Option<&Value> {
        self.bodies.get(key).and_then(|parts| parts.get(&part))
    }

    /// Present bodies of `keys` for `part`; absent ones are left out
    pub fn keyed<'a, I>(&self, keys: I, part: BodyPart) -> BTreeMap<String, Value>
    where
        I: IntoIterator<Item = &'a String>,
    {
        keys.into_iter()
            .filter_map(|key| self.get(key, part).map(|body| (key.clone(), body.clone())))
            .collect()
    }

    /// Fetch every body the interfaces of a session need
    pub async fn fetch(
        schemas: &dyn SchemaSource,
        source: &ApiInterface,
        targets: &BTreeMap<String, ApiInterface>,
    ) -> Result<Self> {
        let mut bodies = Self::new();
        for interface in std::iter::once(source).chain(targets.values()) {
            for part in parts_for(interface.style()) {
                let body = schemas.body_schema(interface, *part).await?;
                bodies.insert(interface.key(), *part, body);
            }
        }
        tracing::debug!(interfaces = targets.len() + 1, "Fetched interface bodies");
        Ok(bodies)
    }
}

fn parts_for(style: ApiStyle) -> &'static [BodyPart] {
    match style {
        ApiStyle::OpenApi => &[BodyPart::Request, BodyPart::Response],
        ApiStyle::AsyncApi => &[BodyPart::Message],
    }
}

mod targets_as_list {
    use crate::types::{keyed_interfaces, ApiInterface};
    use serde::{Deserialize, Deserializer, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S: Serializer>(
        targets: &BTreeMap<String, ApiInterface>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(targets.values())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<String, ApiInterface>, D::Error> {
        Ok(keyed_interfaces(Vec::<ApiInterface>::deserialize(deserializer)?))
    }
}

fn default_codec() -> Arc<dyn ExpressionCodec> {
    Arc::new(PathExpressionCodec)
}

/// One source/target mapping being edited
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingSession {
    source: ApiInterface,
    #[serde(with = "targets_as_list")]
    targets: BTreeMap<String, ApiInterface>,
    direction: MappingDirection,
    #[serde(default)]
    bodies: InterfaceBodies,
    #[serde(default, skip_serializing_if = "MappingPairStore::is_empty")]
    request: MappingPairStore,
    #[serde(default, skip_serializing_if = "MappingPairStore::is_empty")]
    response: MappingPairStore,
    #[serde(default, skip_serializing_if = "MappingPairStore::is_empty")]
    messages: MappingPairStore,
    #[serde(skip)]
    builder: TreeBuilder,
    #[serde(skip, default = "default_codec")]
    codec: Arc<dyn ExpressionCodec>,
}

impl fmt::Debug for MappingSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappingSession")
            .field("source", &self.source.key())
            .field("targets", &self.targets.keys().collect::<Vec<_>>())
            .field("direction", &self.direction)
            .field("request", &self.request.len())
            .field("response", &self.response.len())
            .field("messages", &self.messages.len())
            .finish_non_exhaustive()
    }
}

impl MappingSession {
    /// Start a session; every target must have the source's style
    pub fn new(
        source: ApiInterface,
        targets: Vec<ApiInterface>,
        direction: MappingDirection,
    ) -> Result<Self> {
        let session = Self {
            source,
            targets: keyed_interfaces(targets),
            direction,
            bodies: InterfaceBodies::new(),
            request: MappingPairStore::new(),
            response: MappingPairStore::new(),
            messages: MappingPairStore::new(),
            builder: TreeBuilder::new(),
            codec: default_codec(),
        };
        session.check_interfaces()?;
        Ok(session)
    }

    /// Reject sessions mixing styles or lacking targets
    pub fn check_interfaces(&self) -> Result<()> {
        if self.targets.is_empty() {
            return Err(Error::MalformedInput {
                message: "a mapping needs at least one target".to_string(),
            });
        }
        let style = self.style();
        if let Some(odd) = self.targets.values().find(|t| t.style() != style) {
            return Err(Error::MalformedInput {
                message: format!("target {} does not match the source style {:?}", odd.key(), style),
            });
        }
        Ok(())
    }

    pub fn with_codec(mut self, codec: Arc<dyn ExpressionCodec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_tree_builder(mut self, builder: TreeBuilder) -> Self {
        self.builder = builder;
        self
    }

    pub fn with_bodies(mut self, bodies: InterfaceBodies) -> Self {
        self.bodies = bodies;
        self
    }

    pub fn source(&self) -> &ApiInterface {
        &self.source
    }

    pub fn targets(&self) -> &BTreeMap<String, ApiInterface> {
        &self.targets
    }

    pub fn direction(&self) -> MappingDirection {
        self.direction
    }

    pub fn style(&self) -> ApiStyle {
        self.source.style()
    }

    pub fn bodies(&self) -> &InterfaceBodies {
        &self.bodies
    }

    pub fn set_body(&mut self, key: impl Into<String>, part: BodyPart, body: Value) {
        self.bodies.insert(key, part, body);
    }

    /// Replace the bodies with freshly fetched ones
    pub async fn load_bodies(&mut self, schemas: &dyn SchemaSource) -> Result<()> {
        self.bodies = InterfaceBodies::fetch(schemas, &self.source, &self.targets).await?;
        Ok(())
    }

    /// Sections edited in this session's style
    pub fn sections(&self) -> &'static [Section] {
        match self.style() {
            ApiStyle::OpenApi => &[Section::Request, Section::Response],
            ApiStyle::AsyncApi => &[Section::Messages],
        }
    }

    pub fn store(&self, section: Section) -> Result<&MappingPairStore> {
        self.check_section(section)?;
        Ok(match section {
            Section::Request => &self.request,
            Section::Response => &self.response,
            Section::Messages => &self.messages,
        })
    }

    pub fn store_mut(&mut self, section: Section) -> Result<&mut MappingPairStore> {
        self.check_section(section)?;
        Ok(match section {
            Section::Request => &mut self.request,
            Section::Response => &mut self.response,
            Section::Messages => &mut self.messages,
        })
    }

    fn check_section(&self, section: Section) -> Result<()> {
        if self.sections().contains(&section) {
            Ok(())
        } else {
            Err(Error::MalformedInput {
                message: format!("{:?} sessions have no {} section", self.style(), section),
            })
        }
    }

    /// Orientation of a section: which side is required
    fn section_direction(&self, section: Section) -> MappingDirection {
        match section {
            Section::Request => MappingDirection::Output,
            Section::Response => MappingDirection::Input,
            Section::Messages => self.direction,
        }
    }

    /// When two pairs of a section are the same mapping
    ///
    /// Request/response sections hold one pair per required field. Input
    /// message sessions hold one per required field and providing target.
    pub fn pair_identity(&self, section: Section) -> PairIdentity {
        match section {
            Section::Request | Section::Response => PairIdentity::Required,
            Section::Messages => self.direction.into(),
        }
    }

    fn source_tree(&self, part: BodyPart) -> Result<TreeNode> {
        let keys = [self.source.key()];
        self.builder.build_keyed(&self.bodies.keyed(&keys, part))
    }

    fn targets_tree(&self, part: BodyPart) -> Result<TreeNode> {
        self.builder.build_keyed(&self.bodies.keyed(self.targets.keys(), part))
    }

    /// Auto-match a section and merge the proposals into its store
    ///
    /// Returns the number of pairs added; pairs already present are kept.
    pub fn auto_match(&mut self, section: Section) -> Result<usize> {
        self.check_section(section)?;
        let part = match section {
            Section::Request => BodyPart::Request,
            Section::Response => BodyPart::Response,
            Section::Messages => BodyPart::Message,
        };
        let direction = self.section_direction(section);
        let identity = self.pair_identity(section);
        let source = self.source_tree(part)?;
        let targets = self.targets_tree(part)?;

        let proposals = AutoMatcher::new(direction)
            .with_qualifier_depth(1)
            .each_provider(identity == PairIdentity::RequiredAndOrigin)
            .with_codec(Arc::clone(&self.codec))
            .match_identical(&source, &targets);
        let added = self.store_mut(section)?.merge_matched(proposals, identity);
        tracing::info!(%section, added, "Auto-match finished");
        Ok(added)
    }

    /// Map hand-picked chains onto a required chain
    ///
    /// An expression is synthesized when exactly one chain is provided. A
    /// pair that is the same as a stored one under the section's
    /// [`PairIdentity`] is a conflict.
    pub fn map_selected(
        &mut self,
        section: Section,
        provided: Vec<KeyChain>,
        required: KeyChain,
    ) -> Result<()> {
        if required.is_root() {
            return Err(Error::MalformedInput {
                message: "the tree root cannot be a mapping target".to_string(),
            });
        }
        let identity = self.pair_identity(section);
        let expression = self.codec.synthesize(&provided);
        let pair = MappingPair::new(provided, required, expression);
        let store = self.store_mut(section)?;
        if store.contains(&pair, identity) {
            let message = match (identity, pair.provided_origin()) {
                (PairIdentity::RequiredAndOrigin, Some(origin)) => {
                    format!("'{}' is already mapped from {}", pair.required, origin)
                }
                _ => format!("'{}' is already mapped", pair.required),
            };
            return Err(Error::Conflict { message });
        }
        store.push(pair);
        Ok(())
    }

    /// Replace every store with the pairs of a suggested document
    ///
    /// All trees are parsed before any store changes; a parse failure
    /// leaves the session as it was.
    pub fn apply_suggestion(&mut self, document: &MappingDocument) -> Result<()> {
        if document.body.style() != self.style() {
            return Err(Error::MalformedInput {
                message: format!(
                    "suggested {:?} mapping does not fit a {:?} session",
                    document.body.style(),
                    self.style()
                ),
            });
        }

        match &document.body {
            MappingBody::RequestResponse { request, response } => {
                let request = self.codec.parse(request)?;
                let response = self.codec.parse(response)?;
                self.request.replace_with(request);
                self.response.replace_with(response);
            }
            MappingBody::Messages { messages } => {
                let mut parsed = Vec::new();
                for tree in messages.values() {
                    parsed.extend(self.codec.parse(tree)?);
                }
                let mut store = MappingPairStore::new();
                store.merge_matched(parsed, self.pair_identity(Section::Messages));
                self.messages = store;
            }
        }
        tracing::info!(mapping = %document.combination_key(), "Applied suggested mapping");
        Ok(())
    }

    /// Ask a suggester for a mapping and apply it
    pub async fn load_suggestion(&mut self, suggester: &dyn MappingSuggester) -> Result<()> {
        let document = suggester
            .generate_mapping(&self.source, &self.targets, self.direction)
            .await?;
        self.apply_suggestion(&document)
    }

    fn assembler(&self) -> MappingAssembler {
        MappingAssembler::new(self.source.clone(), self.targets.clone(), self.direction)
            .with_codec(Arc::clone(&self.codec))
    }

    /// Assemble the current pairs into a document
    pub fn document(&self) -> Result<MappingDocument> {
        let assembler = self.assembler();
        match self.style() {
            ApiStyle::OpenApi => assembler.request_response(&self.request, &self.response),
            ApiStyle::AsyncApi => assembler.messages(&self.messages),
        }
    }

    /// Required-side schemas the document is validated against
    ///
    /// Bodies that were never loaded count as empty objects.
    pub fn required_schemas(&self) -> RequiredSchemas {
        let empty = Value::Object(Map::new());
        match self.style() {
            ApiStyle::OpenApi => {
                let response = self
                    .bodies
                    .get(&self.source.key(), BodyPart::Response)
                    .unwrap_or(&empty);
                let requests = self.bodies.keyed(self.targets.keys(), BodyPart::Request);
                RequiredSchemas::request_response(&self.source, response, &requests)
            }
            ApiStyle::AsyncApi => {
                let message = self
                    .bodies
                    .get(&self.source.key(), BodyPart::Message)
                    .unwrap_or(&empty);
                let targets: BTreeMap<String, Value> = self
                    .targets
                    .keys()
                    .map(|key| {
                        let body = self.bodies.get(key, BodyPart::Message).unwrap_or(&empty);
                        (key.clone(), body.clone())
                    })
                    .collect();
                RequiredSchemas::messages(self.direction, &self.source, message, &targets)
            }
        }
    }

    /// Assemble and validate
    pub fn validate(&self, validator: &CompletenessValidator) -> Result<ValidationResult> {
        validator.validate(&self.document()?, &self.required_schemas())
    }

    /// Fail when a pair has no expression and none can be synthesized
    ///
    /// This is the cheap check run before submitting; it does not look at
    /// the schemas.
    pub fn pre_check(&self) -> Result<()> {
        let sections: Vec<SectionReport> = self
            .sections()
            .iter()
            .filter_map(|section| {
                let store = self.store(*section).ok()?;
                let issues: Vec<FieldIssue> = store
                    .incomplete()
                    .into_iter()
                    .filter(|p| self.codec.synthesize(&p.provided).trim().is_empty())
                    .map(|p| FieldIssue {
                        chain: p.required.clone(),
                        kind: IssueKind::EmptyExpression,
                    })
                    .collect();
                Some(SectionReport {
                    section: section_label(*section).to_string(),
                    required_fields: store.len(),
                    issues,
                })
            })
            .collect();

        let report = ValidationResult::from_sections(sections);
        if report.is_complete() {
            Ok(())
        } else {
            Err(Error::IncompleteMapping {
                report: Box::new(report),
            })
        }
    }
}

fn section_label(section: Section) -> &'static str {
    match section {
        Section::Request => REQUEST_SECTION,
        Section::Response => RESPONSE_SECTION,
        Section::Messages => "messages",
    }
}
