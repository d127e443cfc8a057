//! Tree command handler

use crate::cli::TreeArgs;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::logging::timing::Timer;
use crate::output::OutputWriter;
use super::utils::read_input;
use apimap_core::TreeBuilder;
use serde_json::Value;
use tracing::{info, instrument};

/// Handle the tree command
#[instrument(skip(config, output), fields(file = %args.body.display()))]
pub async fn handle_tree(args: TreeArgs, config: &Config, output: &mut OutputWriter) -> Result<()> {
    let _timer = Timer::with_details("tree_command", &format!("file: {}", args.body.display()));

    let builder = match args.max_depth {
        Some(0) => return Err(Error::invalid_args("--max-depth must be at least 1")),
        Some(depth) => TreeBuilder::new().with_max_depth(depth),
        None => config.tree_builder(),
    };

    let body: Value = read_input(&args.body)?;
    let tree = builder.build(&body)?;
    let leaves = tree.mappable_leaves();
    info!(nodes = tree.node_count(), leaves = leaves.len(), "Tree built");

    output.info(&format!(
        "{} node(s), {} mappable field(s)",
        tree.node_count(),
        leaves.len()
    ))?;
    if args.all {
        output.tree(&tree.walk())
    } else {
        output.tree(&leaves)
    }
}
