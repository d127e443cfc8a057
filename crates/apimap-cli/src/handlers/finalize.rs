//! Finalize command handler

use crate::cli::FinalizeArgs;
use crate::config::Config;
use crate::error::Result;
use crate::logging::timing::Timer;
use crate::output::OutputWriter;
use crate::store::FileMappingRepository;
use super::utils::{auto_match_all, load_session};
use apimap_core::{finalize_mapping, CompletenessValidator, Error as CoreError};
use tracing::instrument;

/// Handle the finalize command
///
/// Nothing is written unless the document passes the completeness check.
#[instrument(skip(config, output), fields(session = %args.session.display()))]
pub async fn handle_finalize(
    args: FinalizeArgs,
    config: &Config,
    output: &mut OutputWriter,
) -> Result<()> {
    let _timer = Timer::with_details("finalize_command", &format!("file: {}", args.session.display()));
    let mut session = load_session(&args.session, config)?;
    if args.auto_match {
        auto_match_all(&mut session, output)?;
    }
    session.pre_check()?;

    let repository = FileMappingRepository::new(
        args.mappings_dir
            .unwrap_or_else(|| config.paths.mappings_dir.clone()),
    );
    let validator = CompletenessValidator::new().with_tree_builder(config.tree_builder());
    let document = session.document()?;

    let report = match finalize_mapping(
        &repository,
        &validator,
        &document,
        &session.required_schemas(),
    )
    .await
    {
        Ok(report) => report,
        Err(CoreError::IncompleteMapping { report }) => {
            output.report(&report)?;
            return Err(CoreError::IncompleteMapping { report }.into());
        }
        Err(e) => return Err(e.into()),
    };

    output.report(&report)?;
    output.success(&format!(
        "✓ Stored {}",
        repository.path_for(&document).display()
    ))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::OutputFormat;
    use crate::error::{Error, EXIT_INCOMPLETE};
    use serde_json::json;
    use std::path::{Path, PathBuf};

    fn write_session(dir: &Path) -> PathBuf {
        let session = json!({
            "source": {"apiId": "shop", "operationId": "getOrder", "responseId": "200"},
            "targets": [{"apiId": "crm", "operationId": "createDeal", "responseId": "201"}],
            "direction": "OUTPUT",
            "bodies": {
                "shop_getOrder_200": {
                    "request": {"id": 1, "email": "a@b"},
                    "response": {"status": "ok"}
                },
                "crm_createDeal_201": {
                    "request": {"id": 0, "email": ""},
                    "response": {"status": "created"}
                }
            }
        });
        let path = dir.join("session.json");
        std::fs::write(&path, session.to_string()).unwrap();
        path
    }

    fn args(session: PathBuf, store: &Path, auto_match: bool) -> FinalizeArgs {
        FinalizeArgs {
            session,
            auto_match,
            mappings_dir: Some(store.to_path_buf()),
        }
    }

    fn quiet_output() -> OutputWriter {
        OutputWriter::with_writer(OutputFormat::Json, false, true, 0, Box::new(std::io::sink()))
    }

    #[tokio::test]
    async fn test_matched_session_is_stored_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("mappings");
        let session = write_session(dir.path());
        let config = Config::default();

        handle_finalize(args(session.clone(), &store, true), &config, &mut quiet_output())
            .await
            .unwrap();
        assert!(store.join("shop_getOrder_200__crm_createDeal_201.json").exists());

        let err = handle_finalize(args(session, &store, true), &config, &mut quiet_output())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Core(CoreError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_unmatched_session_is_not_stored() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("mappings");
        let session = write_session(dir.path());

        let err = handle_finalize(args(session, &store, false), &Config::default(), &mut quiet_output())
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), EXIT_INCOMPLETE);
        assert!(!store.exists());
    }
}
