//! Completeness validation of mapping documents
//!
//! A document is complete when every mappable leaf of every required schema
//! has a pair with a non-empty expression whose required chain has the same
//! shape. An incomplete document is a normal result the operator keeps
//! editing; only the finalize and build gates turn it into an error.

use crate::codec::{ExpressionCodec, PathExpressionCodec};
use crate::keychain::KeyChain;
use crate::store::MappingPair;
use crate::tree::TreeBuilder;
use crate::types::{
    ApiInterface, MappingDirection, MappingDocument, REQUEST_SECTION, RESPONSE_SECTION,
};
use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Overall verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationStatus {
    Complete,
    Incomplete,
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationStatus::Complete => write!(f, "COMPLETE"),
            ValidationStatus::Incomplete => write!(f, "INCOMPLETE"),
        }
    }
}

/// Why a required field is not satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// No pair targets the field
    Unmapped,
    /// A pair exists but its expression is empty
    EmptyExpression,
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueKind::Unmapped => write!(f, "unmapped"),
            IssueKind::EmptyExpression => write!(f, "empty expression"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldIssue {
    pub chain: KeyChain,
    pub kind: IssueKind,
}

/// Findings for one section of a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionReport {
    pub section: String,
    pub required_fields: usize,
    pub issues: Vec<FieldIssue>,
}

impl SectionReport {
    pub fn is_complete(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Outcome of [`CompletenessValidator::validate`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub status: ValidationStatus,
    pub sections: Vec<SectionReport>,
}

impl ValidationResult {
    pub(crate) fn from_sections(sections: Vec<SectionReport>) -> Self {
        let status = if sections.iter().all(SectionReport::is_complete) {
            ValidationStatus::Complete
        } else {
            ValidationStatus::Incomplete
        };
        Self { status, sections }
    }

    pub fn is_complete(&self) -> bool {
        self.status == ValidationStatus::Complete
    }

    pub fn issue_count(&self) -> usize {
        self.sections.iter().map(|s| s.issues.len()).sum()
    }

    /// Every issue with the section it was found in
    pub fn issues(&self) -> impl Iterator<Item = (&str, &FieldIssue)> {
        self.sections
            .iter()
            .flat_map(|s| s.issues.iter().map(move |i| (s.section.as_str(), i)))
    }

    pub fn section(&self, name: &str) -> Option<&SectionReport> {
        self.sections.iter().find(|s| s.section == name)
    }
}

/// Required-side values a document is validated against, by section label
///
/// Each value is keyed the same way the session keys its trees: its
/// top-level members are interface keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequiredSchemas {
    sections: BTreeMap<String, Value>,
}

impl RequiredSchemas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_section(mut self, section: impl Into<String>, value: Value) -> Self {
        self.sections.insert(section.into(), value);
        self
    }

    pub fn insert(&mut self, section: impl Into<String>, value: Value) {
        self.sections.insert(section.into(), value);
    }

    pub fn get(&self, section: &str) -> Option<&Value> {
        self.sections.get(section)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.sections.iter()
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Schemas of a request/response session
    ///
    /// The request section requires every target request, the response
    /// section requires the source response.
    pub fn request_response(
        source: &ApiInterface,
        source_response: &Value,
        target_requests: &BTreeMap<String, Value>,
    ) -> Self {
        Self::new()
            .with_section(REQUEST_SECTION, keyed(target_requests.clone()))
            .with_section(
                RESPONSE_SECTION,
                keyed([(source.key(), source_response.clone())]),
            )
    }

    /// Schemas of a message session, one section per target key
    ///
    /// With [`MappingDirection::Output`] section `k` requires target `k`'s
    /// message. With [`MappingDirection::Input`] every section requires the
    /// source message.
    pub fn messages(
        direction: MappingDirection,
        source: &ApiInterface,
        source_message: &Value,
        target_messages: &BTreeMap<String, Value>,
    ) -> Self {
        let sections = target_messages
            .iter()
            .map(|(key, message)| {
                let required = match direction {
                    MappingDirection::Output => keyed([(key.clone(), message.clone())]),
                    MappingDirection::Input => {
                        keyed([(source.key(), source_message.clone())])
                    }
                };
                (key.clone(), required)
            })
            .collect();
        Self { sections }
    }
}

fn keyed<I: IntoIterator<Item = (String, Value)>>(bodies: I) -> Value {
    Value::Object(bodies.into_iter().collect::<Map<String, Value>>())
}

/// Checks documents against their required schemas
#[derive(Clone)]
pub struct CompletenessValidator {
    codec: Arc<dyn ExpressionCodec>,
    builder: TreeBuilder,
}

impl fmt::Debug for CompletenessValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletenessValidator")
            .field("builder", &self.builder)
            .finish_non_exhaustive()
    }
}

impl Default for CompletenessValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletenessValidator {
    pub fn new() -> Self {
        Self {
            codec: Arc::new(PathExpressionCodec),
            builder: TreeBuilder::new(),
        }
    }

    pub fn with_codec(mut self, codec: Arc<dyn ExpressionCodec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_tree_builder(mut self, builder: TreeBuilder) -> Self {
        self.builder = builder;
        self
    }

    /// Validate every section named in `schemas`
    ///
    /// A section missing from the document reports all of its fields as
    /// unmapped. Unparseable trees and oversized schemas are errors.
    pub fn validate(
        &self,
        document: &MappingDocument,
        schemas: &RequiredSchemas,
    ) -> Result<ValidationResult> {
        let mut sections = Vec::with_capacity(schemas.len());
        for (section, required) in schemas.iter() {
            let pairs = match document.body.section(section) {
                Some(tree) => self.codec.parse(tree)?,
                None => Vec::new(),
            };
            sections.push(self.check_section(section, required, &pairs)?);
        }

        let result = ValidationResult::from_sections(sections);
        tracing::debug!(
            status = %result.status,
            issues = result.issue_count(),
            "Validated mapping document"
        );
        Ok(result)
    }

    fn check_section(
        &self,
        section: &str,
        required: &Value,
        pairs: &[MappingPair],
    ) -> Result<SectionReport> {
        let tree = self.builder.build(required)?;
        let leaves = tree.mappable_leaves();
        let mut issues = Vec::new();

        for leaf in &leaves {
            let mut matching = pairs.iter().filter(|p| p.required.same_shape(&leaf.key_chain));
            let kind = match matching.next() {
                None => Some(IssueKind::Unmapped),
                Some(first) => {
                    let satisfied = !first.is_incomplete() || matching.any(|p| !p.is_incomplete());
                    (!satisfied).then_some(IssueKind::EmptyExpression)
                }
            };
            if let Some(kind) = kind {
                issues.push(FieldIssue {
                    chain: leaf.key_chain.clone(),
                    kind,
                });
            }
        }

        Ok(SectionReport {
            section: section.to_string(),
            required_fields: leaves.len(),
            issues,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{render, ExpressionTree};
    use crate::types::{keyed_interfaces, MappingBody};
    use serde_json::json;

    fn document(request: ExpressionTree, response: ExpressionTree) -> MappingDocument {
        let target = ApiInterface::operation("crm", "createAccount", "201");
        MappingDocument {
            source: ApiInterface::operation("shop", "getOrder", "200"),
            targets: keyed_interfaces([target]),
            direction: MappingDirection::Output,
            body: MappingBody::RequestResponse { request, response },
        }
    }

    #[test]
    fn test_complete_document() {
        let schemas = RequiredSchemas::new()
            .with_section(REQUEST_SECTION, json!({"accountId": 0, "tags": ["x"]}));
        let request = ExpressionTree::from_value(json!({"accountId": "$.id", "tags": "$.labels"}));
        let result = CompletenessValidator::new()
            .validate(&document(request, ExpressionTree::empty()), &schemas)
            .unwrap();
        assert!(result.is_complete());
        assert_eq!(result.section(REQUEST_SECTION).unwrap().required_fields, 2);
    }

    #[test]
    fn test_reports_unmapped_and_empty_fields() {
        let schemas = RequiredSchemas::new()
            .with_section(REQUEST_SECTION, json!({"a": 1, "b": 2, "c": 3}))
            .with_section(RESPONSE_SECTION, json!({"d": 4}));
        let request = ExpressionTree::from_value(json!({"a": "$.a", "b": ""}));
        let result = CompletenessValidator::new()
            .validate(&document(request, ExpressionTree::empty()), &schemas)
            .unwrap();

        assert_eq!(result.status, ValidationStatus::Incomplete);
        let issues: Vec<(&str, String, IssueKind)> = result
            .issues()
            .map(|(s, i)| (s, i.chain.join(), i.kind))
            .collect();
        assert_eq!(
            issues,
            vec![
                ("request", "b".to_string(), IssueKind::EmptyExpression),
                ("request", "c".to_string(), IssueKind::Unmapped),
                ("response", "d".to_string(), IssueKind::Unmapped),
            ]
        );
    }

    #[test]
    fn test_array_items_match_by_shape() {
        let schemas = RequiredSchemas::new()
            .with_section(REQUEST_SECTION, json!({"items": [{"sku": ""}, {"sku": ""}]}));
        let pairs = vec![MappingPair::new(
            vec![KeyChain::from_keys(["lines"])],
            KeyChain::new(vec!["items".into(), 0.into(), "sku".into()]),
            "$.lines[0].code",
        )];
        let request = render(&pairs).unwrap();
        let result = CompletenessValidator::new()
            .validate(&document(request, ExpressionTree::empty()), &schemas)
            .unwrap();
        assert!(result.is_complete());
    }

    #[test]
    fn test_missing_section_counts_every_field() {
        let source = ApiInterface::message("iot", "onReading", "mqtt");
        let mut targets = BTreeMap::new();
        targets.insert("crm_onEvent".to_string(), json!({"x": 1, "y": 2}));
        let schemas =
            RequiredSchemas::messages(MappingDirection::Output, &source, &json!({}), &targets);
        let doc = MappingDocument {
            source,
            targets: BTreeMap::new(),
            direction: MappingDirection::Output,
            body: MappingBody::Messages {
                messages: BTreeMap::new(),
            },
        };
        let result = CompletenessValidator::new().validate(&doc, &schemas).unwrap();
        assert_eq!(result.issue_count(), 2);
        assert_eq!(
            result.sections[0].issues[0].chain,
            KeyChain::from_keys(["crm_onEvent", "x"])
        );
    }

    #[test]
    fn test_schema_constructors_key_bodies() {
        let source = ApiInterface::operation("shop", "getOrder", "200");
        let mut requests = BTreeMap::new();
        requests.insert("crm_create_201".to_string(), json!({"a": 1}));
        let schemas = RequiredSchemas::request_response(&source, &json!({"b": 2}), &requests);
        assert_eq!(schemas.get("request"), Some(&json!({"crm_create_201": {"a": 1}})));
        assert_eq!(schemas.get("response"), Some(&json!({"shop_getOrder_200": {"b": 2}})));

        let input = RequiredSchemas::messages(
            MappingDirection::Input,
            &ApiInterface::message("iot", "onReading", "mqtt"),
            &json!({"v": 1}),
            &requests,
        );
        assert_eq!(input.get("crm_create_201"), Some(&json!({"iot_onReading": {"v": 1}})));
    }

    #[test]
    fn test_unparseable_tree_is_an_error() {
        let schemas = RequiredSchemas::new().with_section(REQUEST_SECTION, json!({"a": 1}));
        let request = ExpressionTree::from_value(json!({"a": "$.`open"}));
        let err = CompletenessValidator::new()
            .validate(&document(request, ExpressionTree::empty()), &schemas)
            .unwrap_err();
        assert!(matches!(err, crate::Error::ExpressionParse { .. }));
    }
}
