//! Command-line interface argument parsing and definitions
//!
//! This module defines the CLI structure using clap's derive API.

use clap::{Parser, Subcommand, ValueEnum};
use is_terminal::IsTerminal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Apimap CLI - map the fields of one API interface onto others
///
/// Builds key-chain trees from JSON bodies, proposes field correspondences,
/// assembles mapping documents and checks them for completeness.
#[derive(Parser, Debug)]
#[command(
    name = "apimap",
    version,
    author,
    about,
    long_about = None,
    propagate_version = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Enable verbose output (can be used multiple times for increased verbosity)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "APIMAP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format for results
    #[arg(short, long, value_enum, global = true, default_value = "human")]
    pub output: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// The subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the key-chains and kinds of a JSON body
    Tree(TreeArgs),

    /// Propose pairs between identical fields of two bodies
    Match(MatchArgs),

    /// Read a serialized expression tree back into pairs
    Parse(ParseArgs),

    /// Assemble the mapping document of a session
    Assemble(AssembleArgs),

    /// Check a mapping document for completeness
    Validate(ValidateArgs),

    /// Assemble, validate and store the mapping of a session
    Finalize(FinalizeArgs),

    /// Manage configuration files and settings
    Config(ConfigArgs),

    /// Generate shell completions for the specified shell
    Completions(CompletionsArgs),
}

/// Arguments for the tree command
#[derive(Parser, Debug)]
pub struct TreeArgs {
    /// Path to the body (JSON or YAML)
    #[arg(value_name = "BODY")]
    pub body: PathBuf,

    /// Depth bound, overriding the configured one
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// List every node rather than only mappable leaves
    #[arg(long)]
    pub all: bool,
}

/// Arguments for the match command
#[derive(Parser, Debug)]
pub struct MatchArgs {
    /// Path to the source body
    #[arg(short, long, value_name = "BODY")]
    pub source: PathBuf,

    /// Path to the target body
    #[arg(short, long, value_name = "BODY")]
    pub target: PathBuf,

    /// Which side is required; defaults to the configured direction
    #[arg(short, long, value_enum)]
    pub direction: Option<Direction>,
}

/// Arguments for the parse command
#[derive(Parser, Debug)]
pub struct ParseArgs {
    /// Path to the expression tree (JSON object or its string encoding)
    #[arg(value_name = "TREE")]
    pub tree: PathBuf,
}

/// Arguments for the assemble command
#[derive(Parser, Debug)]
pub struct AssembleArgs {
    /// Path to the session file
    #[arg(value_name = "SESSION")]
    pub session: PathBuf,

    /// Start from the pairs of an existing mapping document
    #[arg(long, value_name = "DOCUMENT")]
    pub from: Option<PathBuf>,

    /// Run the matcher on every section first
    #[arg(long)]
    pub auto_match: bool,

    /// Also write the document to a file
    #[arg(long = "save-to", value_name = "OUTPUT_FILE")]
    pub save_to: Option<PathBuf>,
}

/// Arguments for the validate command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to the mapping document
    #[arg(value_name = "DOCUMENT")]
    pub document: PathBuf,

    /// Required bodies by section, keyed by interface
    #[arg(short, long, value_name = "FILE")]
    pub schemas: PathBuf,
}

/// Arguments for the finalize command
#[derive(Parser, Debug)]
pub struct FinalizeArgs {
    /// Path to the session file
    #[arg(value_name = "SESSION")]
    pub session: PathBuf,

    /// Run the matcher on every section first
    #[arg(long)]
    pub auto_match: bool,

    /// Directory mappings are stored in, overriding the configured one
    #[arg(long)]
    pub mappings_dir: Option<PathBuf>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Configuration management actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write a default configuration file
    Init(ConfigInitArgs),

    /// Show the loaded configuration
    Show,
}

/// Arguments for config init
#[derive(Parser, Debug)]
pub struct ConfigInitArgs {
    /// Where to write; defaults to the user config directory
    #[arg(long)]
    pub path: Option<PathBuf>,

    /// Force overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

/// Arguments for generating shell completions
#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Output format options
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable formatted output
    Human,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
    /// Pretty-printed JSON output
    JsonPretty,
}

/// Which side of a mapping is required
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// The source is required, the target provides
    Input,
    /// The target is required, the source provides
    Output,
}

/// Supported shells for completion generation
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Shell {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    PowerShell,
    /// Elvish shell
    Elvish,
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the effective verbosity level (considering quiet flag)
    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }

    /// Check if colored output should be used
    pub fn use_color(&self) -> bool {
        !self.no_color && std::io::stdout().is_terminal()
    }
}

impl From<Direction> for apimap_core::MappingDirection {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Input => apimap_core::MappingDirection::Input,
            Direction::Output => apimap_core::MappingDirection::Output,
        }
    }
}

impl Shell {
    /// Convert to clap_complete shell type
    pub fn to_clap_shell(self) -> clap_complete::Shell {
        match self {
            Shell::Bash => clap_complete::Shell::Bash,
            Shell::Zsh => clap_complete::Shell::Zsh,
            Shell::Fish => clap_complete::Shell::Fish,
            Shell::PowerShell => clap_complete::Shell::PowerShell,
            Shell::Elvish => clap_complete::Shell::Elvish,
        }
    }
}
