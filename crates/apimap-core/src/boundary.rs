//! Collaborator interfaces and the gates guarding them
//!
//! Schema retrieval, suggestion, persistence and adapter packaging live
//! outside the engine. They are modelled as async traits so that any runtime
//! can drive them; the engine itself never awaits anything else.
//!
//! [`finalize_mapping`] and [`build_adapter`] run the completeness check
//! immediately before handing a document over. An incomplete document is
//! rejected with [`Error::IncompleteMapping`] and the collaborator is never
//! called.

use crate::types::{
    ApiInterface, BodyPart, DownloadReference, MappingDirection, MappingDocument, TargetRuntime,
};
use crate::validator::{CompletenessValidator, RequiredSchemas, ValidationResult};
use crate::{Error, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;

/// Supplies the sample body of an interface
///
/// Must return the same value for the same arguments within one session.
#[async_trait]
pub trait SchemaSource: Send + Sync {
    async fn body_schema(&self, interface: &ApiInterface, part: BodyPart) -> Result<Value>;
}

/// External heuristic producing a candidate mapping
#[async_trait]
pub trait MappingSuggester: Send + Sync {
    async fn generate_mapping(
        &self,
        source: &ApiInterface,
        targets: &BTreeMap<String, ApiInterface>,
        direction: MappingDirection,
    ) -> Result<MappingDocument>;
}

/// Stores finalized mappings
#[async_trait]
pub trait MappingRepository: Send + Sync {
    /// Store `document`, failing with [`Error::Conflict`] when an identical
    /// mapping already exists
    async fn upsert_mapping(&self, document: &MappingDocument) -> Result<()>;
}

/// Packages a complete mapping into a downloadable adapter
#[async_trait]
pub trait AdapterBuilder: Send + Sync {
    async fn create_adapter(
        &self,
        document: &MappingDocument,
        runtime: TargetRuntime,
    ) -> Result<DownloadReference>;
}

/// Validate and turn an incomplete result into an error
pub fn ensure_complete(
    validator: &CompletenessValidator,
    document: &MappingDocument,
    schemas: &RequiredSchemas,
) -> Result<ValidationResult> {
    let report = validator.validate(document, schemas)?;
    if report.is_complete() {
        Ok(report)
    } else {
        tracing::info!(
            issues = report.issue_count(),
            mapping = %document.combination_key(),
            "Rejected incomplete mapping"
        );
        Err(Error::IncompleteMapping {
            report: Box::new(report),
        })
    }
}

/// Persist a document after it passes validation
pub async fn finalize_mapping<R>(
    repository: &R,
    validator: &CompletenessValidator,
    document: &MappingDocument,
    schemas: &RequiredSchemas,
) -> Result<ValidationResult>
where
    R: MappingRepository + ?Sized,
{
    let report = ensure_complete(validator, document, schemas)?;
    repository.upsert_mapping(document).await?;
    tracing::info!(mapping = %document.combination_key(), "Mapping finalized");
    Ok(report)
}

/// Build an adapter from a document after it passes validation
pub async fn build_adapter<B>(
    builder: &B,
    validator: &CompletenessValidator,
    document: &MappingDocument,
    schemas: &RequiredSchemas,
    runtime: TargetRuntime,
) -> Result<DownloadReference>
where
    B: AdapterBuilder + ?Sized,
{
    ensure_complete(validator, document, schemas)?;
    let reference = builder.create_adapter(document, runtime).await?;
    tracing::info!(file_id = %reference.file_id, "Adapter built");
    Ok(reference)
}
