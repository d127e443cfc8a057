//! Validate command handler

use crate::cli::ValidateArgs;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::logging::timing::Timer;
use crate::output::OutputWriter;
use super::utils::read_input;
use apimap_core::{CompletenessValidator, MappingDocument, RequiredSchemas};
use tracing::{info, instrument, warn};

/// Handle the validate command
///
/// The report is always printed; an incomplete document then fails with
/// its own exit code.
#[instrument(skip(config, output), fields(document = %args.document.display(), schemas = %args.schemas.display()))]
pub async fn handle_validate(
    args: ValidateArgs,
    config: &Config,
    output: &mut OutputWriter,
) -> Result<()> {
    let _timer = Timer::with_details("validate_command", &format!("file: {}", args.document.display()));

    let document: MappingDocument = read_input(&args.document)?;
    let schemas: RequiredSchemas = read_input(&args.schemas)?;
    if schemas.is_empty() {
        output.warning("No required bodies given; only expressions are checked")?;
    }

    let report = {
        let _validation_timer = Timer::new("completeness_validation");
        CompletenessValidator::new()
            .with_tree_builder(config.tree_builder())
            .validate(&document, &schemas)?
    };
    output.report(&report)?;

    if report.is_complete() {
        info!(mapping = %document.combination_key(), "Mapping is complete");
        output.success("✓ Every required field is mapped")?;
        Ok(())
    } else {
        warn!(issues = report.issue_count(), "Mapping is incomplete");
        Err(Error::Incomplete {
            report: Box::new(report),
        })
    }
}
