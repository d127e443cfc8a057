//! Parse command handler

use crate::cli::ParseArgs;
use crate::config::Config;
use crate::error::Result;
use crate::logging::timing::Timer;
use crate::output::OutputWriter;
use super::utils::read_input;
use apimap_core::{ExpressionCodec, ExpressionTree, PathExpressionCodec};
use serde_json::Value;
use tracing::instrument;

/// Handle the parse command
///
/// Accepts the tree as an object or in its wire form, a JSON string.
#[instrument(skip(_config, output), fields(file = %args.tree.display()))]
pub async fn handle_parse(args: ParseArgs, _config: &Config, output: &mut OutputWriter) -> Result<()> {
    let _timer = Timer::with_details("parse_command", &format!("file: {}", args.tree.display()));

    let tree = match read_input::<Value>(&args.tree)? {
        Value::String(text) => ExpressionTree::from_json_str(&text)?,
        value => ExpressionTree::from_value(value),
    };
    let pairs = PathExpressionCodec.parse(&tree)?;

    let unspecified = pairs.iter().filter(|p| p.is_incomplete()).count();
    if unspecified > 0 {
        output.warning(&format!("{} field(s) have no expression", unspecified))?;
    }
    output.pairs(&pairs)
}
