//! Match command handler

use crate::cli::MatchArgs;
use crate::config::Config;
use crate::error::Result;
use crate::logging::timing::Timer;
use crate::output::OutputWriter;
use super::utils::read_input;
use apimap_core::{AutoMatcher, MappingDirection};
use serde_json::Value;
use tracing::{info, instrument};

/// Handle the match command
#[instrument(skip(config, output), fields(source = %args.source.display(), target = %args.target.display()))]
pub async fn handle_match(args: MatchArgs, config: &Config, output: &mut OutputWriter) -> Result<()> {
    let _timer = Timer::new("match_command");
    let direction: MappingDirection = args
        .direction
        .unwrap_or(config.mapping.default_direction)
        .into();

    let builder = config.tree_builder();
    let source = builder.build(&read_input::<Value>(&args.source)?)?;
    let target = builder.build(&read_input::<Value>(&args.target)?)?;

    let pairs = AutoMatcher::new(direction).match_identical(&source, &target);
    info!(%direction, pairs = pairs.len(), "Matching finished");

    output.info(&format!("{} pair(s) proposed, direction {}", pairs.len(), direction))?;
    output.pairs(&pairs)
}
