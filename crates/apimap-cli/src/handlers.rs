//! Command handlers for CLI subcommands
//!
//! Each subcommand lives in its own module under `handlers/`.

mod assemble;
mod completions;
mod config;
mod finalize;
mod matching;
mod parse;
mod tree;
mod utils;
mod validate;

pub use assemble::handle_assemble;
pub use completions::handle_completions;
pub use config::handle_config;
pub use finalize::handle_finalize;
pub use matching::handle_match;
pub use parse::handle_parse;
pub use tree::handle_tree;
pub use validate::handle_validate;
