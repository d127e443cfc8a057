//! Core data types shared by the mapping engine
//!
//! Interface descriptors identify the endpoints and messages being joined,
//! and [`MappingDocument`] is the persistable result handed to the storage
//! and adapter-build collaborators.

use crate::codec::{as_json_string, as_json_string_map, ExpressionTree};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Which side of a mapping plays the required output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MappingDirection {
    /// Required fields belong to the source; targets provide them
    Input,
    /// Required fields belong to the targets; the source provides them
    Output,
}

impl MappingDirection {
    pub fn flipped(self) -> Self {
        match self {
            MappingDirection::Input => MappingDirection::Output,
            MappingDirection::Output => MappingDirection::Input,
        }
    }
}

impl fmt::Display for MappingDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MappingDirection::Input => write!(f, "INPUT"),
            MappingDirection::Output => write!(f, "OUTPUT"),
        }
    }
}

/// Description style of an API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApiStyle {
    /// Request/response operations
    #[serde(rename = "OPENAPI")]
    OpenApi,
    /// Event messages
    #[serde(rename = "ASYNCAPI")]
    AsyncApi,
}

/// Role-specific part of an interface descriptor
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InterfaceQualifier {
    /// Selected response of an OpenAPI operation
    #[serde(rename = "responseId")]
    Response(String),
    /// Server carrying an AsyncAPI message
    #[serde(rename = "server")]
    Server(String),
}

/// Identifies one endpoint or message
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiInterface {
    pub api_id: String,
    pub operation_id: String,
    #[serde(flatten)]
    pub qualifier: InterfaceQualifier,
}

impl ApiInterface {
    /// OpenAPI operation with a selected response
    pub fn operation(
        api_id: impl Into<String>,
        operation_id: impl Into<String>,
        response_id: impl Into<String>,
    ) -> Self {
        Self {
            api_id: api_id.into(),
            operation_id: operation_id.into(),
            qualifier: InterfaceQualifier::Response(response_id.into()),
        }
    }

    /// AsyncAPI message on a server
    pub fn message(
        api_id: impl Into<String>,
        operation_id: impl Into<String>,
        server: impl Into<String>,
    ) -> Self {
        Self {
            api_id: api_id.into(),
            operation_id: operation_id.into(),
            qualifier: InterfaceQualifier::Server(server.into()),
        }
    }

    pub fn style(&self) -> ApiStyle {
        match self.qualifier {
            InterfaceQualifier::Response(_) => ApiStyle::OpenApi,
            InterfaceQualifier::Server(_) => ApiStyle::AsyncApi,
        }
    }

    /// Key under which this interface's bodies and mappings are filed
    ///
    /// `{apiId}_{operationId}_{responseId}` for operations,
    /// `{apiId}_{operationId}` for messages.
    pub fn key(&self) -> String {
        match &self.qualifier {
            InterfaceQualifier::Response(response) => {
                format!("{}_{}_{}", self.api_id, self.operation_id, response)
            }
            InterfaceQualifier::Server(_) => format!("{}_{}", self.api_id, self.operation_id),
        }
    }
}

/// Index a list of interfaces by key
pub fn keyed_interfaces<I>(interfaces: I) -> BTreeMap<String, ApiInterface>
where
    I: IntoIterator<Item = ApiInterface>,
{
    interfaces.into_iter().map(|i| (i.key(), i)).collect()
}

/// Which body of an interface a schema describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyPart {
    Request,
    Response,
    Message,
}

/// Expression trees of a mapping document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MappingBody {
    /// One tree for the request leg, one for the response leg
    #[serde(rename = "OPENAPI")]
    RequestResponse {
        #[serde(rename = "requestMapping", with = "as_json_string")]
        request: ExpressionTree,
        #[serde(rename = "responseMapping", with = "as_json_string")]
        response: ExpressionTree,
    },
    /// One tree per target interface key
    #[serde(rename = "ASYNCAPI")]
    Messages {
        #[serde(rename = "messageMappings", with = "as_json_string_map")]
        messages: BTreeMap<String, ExpressionTree>,
    },
}

/// Section label of the request tree
pub const REQUEST_SECTION: &str = "request";
/// Section label of the response tree
pub const RESPONSE_SECTION: &str = "response";

impl MappingBody {
    /// Labelled trees: `request`/`response`, or one per target key
    pub fn sections(&self) -> Vec<(String, &ExpressionTree)> {
        match self {
            MappingBody::RequestResponse { request, response } => vec![
                (REQUEST_SECTION.to_string(), request),
                (RESPONSE_SECTION.to_string(), response),
            ],
            MappingBody::Messages { messages } => {
                messages.iter().map(|(k, t)| (k.clone(), t)).collect()
            }
        }
    }

    pub fn section(&self, label: &str) -> Option<&ExpressionTree> {
        match self {
            MappingBody::RequestResponse { request, .. } if label == REQUEST_SECTION => Some(request),
            MappingBody::RequestResponse { response, .. } if label == RESPONSE_SECTION => {
                Some(response)
            }
            MappingBody::RequestResponse { .. } => None,
            MappingBody::Messages { messages } => messages.get(label),
        }
    }

    pub fn style(&self) -> ApiStyle {
        match self {
            MappingBody::RequestResponse { .. } => ApiStyle::OpenApi,
            MappingBody::Messages { .. } => ApiStyle::AsyncApi,
        }
    }
}

/// Persistable result of a mapping session
///
/// Documents are values: an edit produces a new document that supersedes
/// the old one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingDocument {
    pub source: ApiInterface,
    pub targets: BTreeMap<String, ApiInterface>,
    pub direction: MappingDirection,
    #[serde(flatten)]
    pub body: MappingBody,
}

impl MappingDocument {
    /// Key identifying the source/target combination
    pub fn combination_key(&self) -> String {
        let targets: Vec<&str> = self.targets.keys().map(String::as_str).collect();
        format!("{}__{}", self.source.key(), targets.join("+"))
    }
}

/// Runtime an adapter is generated for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TargetRuntime {
    JavaScript,
}

/// Where a built adapter bundle can be fetched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadReference {
    pub file_id: String,
    pub url: String,
}
