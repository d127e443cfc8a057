//! File-backed mapping repository
//!
//! One JSON file per source/target combination. Storing a document that is
//! equal to the stored one is a conflict; any other document replaces it.

use apimap_core::{Error as CoreError, MappingDocument, MappingRepository};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;
use tracing::{debug, info};

/// What is written to disk for each mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMapping {
    pub stored_at: DateTime<Utc>,
    pub document: MappingDocument,
}

#[derive(Debug, Clone)]
pub struct FileMappingRepository {
    root: PathBuf,
}

fn collaborator(message: String, err: impl Into<anyhow::Error>) -> CoreError {
    CoreError::Collaborator {
        message,
        source: Some(err.into()),
    }
}

impl FileMappingRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// File a document is stored in
    ///
    /// Bytes outside the portable file name set are percent-escaped, so
    /// distinct combinations never share a file.
    pub fn path_for(&self, document: &MappingDocument) -> PathBuf {
        let mut name = String::new();
        for byte in document.combination_key().bytes() {
            if byte.is_ascii_alphanumeric() || matches!(byte, b'_' | b'-' | b'+' | b'.') {
                name.push(char::from(byte));
            } else {
                name.push_str(&format!("%{:02X}", byte));
            }
        }
        self.root.join(format!("{}.json", name))
    }

    /// Read the entry stored for the document's combination, if any
    pub async fn load(
        &self,
        document: &MappingDocument,
    ) -> apimap_core::Result<Option<StoredMapping>> {
        let path = self.path_for(document);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(collaborator(format!("reading {}", path.display()), e)),
        };
        let stored = serde_json::from_str(&content)
            .map_err(|e| collaborator(format!("decoding {}", path.display()), e))?;
        Ok(Some(stored))
    }
}

#[async_trait]
impl MappingRepository for FileMappingRepository {
    async fn upsert_mapping(&self, document: &MappingDocument) -> apimap_core::Result<()> {
        if let Some(existing) = self.load(document).await? {
            if existing.document == *document {
                return Err(CoreError::Conflict {
                    message: format!(
                        "mapping {} is already stored unchanged",
                        document.combination_key()
                    ),
                });
            }
            debug!(stored_at = %existing.stored_at, "Replacing stored mapping");
        }

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| collaborator(format!("creating {}", self.root.display()), e))?;

        let entry = StoredMapping {
            stored_at: Utc::now(),
            document: document.clone(),
        };
        let content = serde_json::to_string_pretty(&entry)?;
        let path = self.path_for(document);
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| collaborator(format!("writing {}", path.display()), e))?;

        info!(path = %path.display(), "Mapping stored");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apimap_core::types::keyed_interfaces;
    use apimap_core::{ApiInterface, ExpressionTree, MappingBody, MappingDirection};
    use serde_json::json;

    fn document(expression: &str) -> MappingDocument {
        MappingDocument {
            source: ApiInterface::operation("shop", "getOrder", "200"),
            targets: keyed_interfaces([ApiInterface::operation("crm", "createDeal", "201")]),
            direction: MappingDirection::Output,
            body: MappingBody::RequestResponse {
                request: ExpressionTree::from_value(json!({
                    "crm_createDeal_201": {"id": expression}
                })),
                response: ExpressionTree::empty(),
            },
        }
    }

    #[tokio::test]
    async fn test_store_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let repository = FileMappingRepository::new(dir.path().join("mappings"));
        let doc = document("$.shop_getOrder_200.id");

        repository.upsert_mapping(&doc).await.unwrap();

        let path = repository.path_for(&doc);
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "shop_getOrder_200__crm_createDeal_201.json"
        );
        let stored = repository.load(&doc).await.unwrap().unwrap();
        assert_eq!(stored.document, doc);
    }

    #[tokio::test]
    async fn test_identical_document_conflicts() {
        let dir = tempfile::tempdir().unwrap();
        let repository = FileMappingRepository::new(dir.path());
        let doc = document("$.shop_getOrder_200.id");

        repository.upsert_mapping(&doc).await.unwrap();
        let err = repository.upsert_mapping(&doc).await.unwrap_err();
        assert!(matches!(err, CoreError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_changed_document_replaces_the_stored_one() {
        let dir = tempfile::tempdir().unwrap();
        let repository = FileMappingRepository::new(dir.path());
        let first = document("$.shop_getOrder_200.id");
        let second = document("$string($.shop_getOrder_200.id)");

        repository.upsert_mapping(&first).await.unwrap();
        repository.upsert_mapping(&second).await.unwrap();

        let stored = repository.load(&first).await.unwrap().unwrap();
        assert_eq!(stored.document, second);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_unreadable_entry_is_a_collaborator_error() {
        let dir = tempfile::tempdir().unwrap();
        let repository = FileMappingRepository::new(dir.path());
        let doc = document("$.shop_getOrder_200.id");
        std::fs::write(repository.path_for(&doc), "not json").unwrap();

        let err = repository.upsert_mapping(&doc).await.unwrap_err();
        assert!(matches!(err, CoreError::Collaborator { .. }));
    }

    #[test]
    fn test_file_names_never_collide() {
        let repository = FileMappingRepository::new("/mappings");
        let mut slashed = document("$.x");
        slashed.source = ApiInterface::operation("a/b", "getOrder", "200");
        let mut underscored = document("$.x");
        underscored.source = ApiInterface::operation("a_b", "getOrder", "200");

        let slashed = repository.path_for(&slashed);
        let underscored = repository.path_for(&underscored);
        assert_ne!(slashed, underscored);
        assert_eq!(slashed.parent(), Some(std::path::Path::new("/mappings")));
        assert!(slashed
            .file_name()
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("a%2Fb_getOrder_200"));
    }

    #[tokio::test]
    async fn test_missing_entry_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let repository = FileMappingRepository::new(dir.path());
        assert!(repository
            .load(&document("$.x"))
            .await
            .unwrap()
            .is_none());
    }
}
