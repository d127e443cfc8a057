//! Assemble command handler

use crate::cli::AssembleArgs;
use crate::config::Config;
use crate::error::Result;
use crate::logging::timing::Timer;
use crate::output::OutputWriter;
use super::utils::{auto_match_all, load_session, read_input, write_output};
use apimap_core::{Error as CoreError, MappingDocument};
use tracing::{info, instrument};

/// Handle the assemble command
#[instrument(skip(config, output), fields(session = %args.session.display(), auto_match = args.auto_match))]
pub async fn handle_assemble(
    args: AssembleArgs,
    config: &Config,
    output: &mut OutputWriter,
) -> Result<()> {
    let _timer = Timer::with_details("assemble_command", &format!("file: {}", args.session.display()));
    let mut session = load_session(&args.session, config)?;

    if let Some(path) = &args.from {
        let existing: MappingDocument = read_input(path)?;
        session.apply_suggestion(&existing)?;
        output.info(&format!("Loaded pairs from {}", path.display()))?;
    }
    if args.auto_match {
        auto_match_all(&mut session, output)?;
    }

    // Gaps are reported, not fatal: the document may still be edited
    if let Err(CoreError::IncompleteMapping { report }) = session.pre_check() {
        for (section, issue) in report.issues() {
            output.warning(&format!("{}: {} has no expression", section, issue.chain))?;
        }
    }

    let document = session.document()?;
    info!(mapping = %document.combination_key(), "Document assembled");
    output.data(&document)?;

    if let Some(path) = args.save_to {
        write_output(&path, &document, output.format())?;
        output.success(&format!("✓ Document saved to {}", path.display()))?;
    }

    Ok(())
}
