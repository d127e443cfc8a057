//! Output formatting and writing utilities
//!
//! Results are written as JSON, YAML or a human-readable rendering of trees,
//! pairs and validation reports.

use crate::cli::OutputFormat;
use crate::error::Result;
use apimap_core::{KeyChain, MappingPair, NodeKind, TreeNode, ValidationResult};
use colored::Colorize;
use serde::Serialize;
use std::io::{self, Write};
use tracing::trace;

/// One row of a tree listing
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeEntry<'a> {
    pub key_chain: &'a KeyChain,
    pub kind: NodeKind,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub item_kinds: Vec<NodeKind>,
}

impl<'a> From<&'a TreeNode> for TreeEntry<'a> {
    fn from(node: &'a TreeNode) -> Self {
        let item_kinds = if node.kind == NodeKind::Array && node.is_mappable_leaf() {
            node.item_kinds()
        } else {
            Vec::new()
        };
        Self {
            key_chain: &node.key_chain,
            kind: node.kind,
            item_kinds,
        }
    }
}

/// Trait for formatting output with specialized support for mapping types
pub trait OutputFormatter {
    /// Format a serializable value
    fn format<T: Serialize>(&self, value: &T) -> Result<String>;

    /// Format a listing of tree nodes
    fn format_tree(&self, entries: &[TreeEntry<'_>]) -> Result<String>;

    /// Format mapping pairs
    fn format_pairs(&self, pairs: &[MappingPair]) -> Result<String>;

    /// Format a completeness report
    fn format_report(&self, report: &ValidationResult) -> Result<String>;
}

impl OutputFormatter for OutputFormat {
    fn format<T: Serialize>(&self, value: &T) -> Result<String> {
        match self {
            OutputFormat::Json => Ok(serde_json::to_string(value)?),
            OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(value)?),
            OutputFormat::Yaml => Ok(serde_yaml::to_string(value)?),
            // Documents have no better human form than indented JSON
            OutputFormat::Human => Ok(serde_json::to_string_pretty(value)?),
        }
    }

    fn format_tree(&self, entries: &[TreeEntry<'_>]) -> Result<String> {
        match self {
            OutputFormat::Human => Ok(format_tree_human(entries)),
            _ => self.format(&entries),
        }
    }

    fn format_pairs(&self, pairs: &[MappingPair]) -> Result<String> {
        match self {
            OutputFormat::Human => Ok(format_pairs_human(pairs)),
            _ => self.format(&pairs),
        }
    }

    fn format_report(&self, report: &ValidationResult) -> Result<String> {
        match self {
            OutputFormat::Human => Ok(format_report_human(report)),
            _ => self.format(report),
        }
    }
}

/// Output writer that handles formatting and writing
pub struct OutputWriter {
    format: OutputFormat,
    use_color: bool,
    quiet: bool,
    verbose: u8,
    writer: Box<dyn Write>,
}

impl OutputWriter {
    /// Create a new output writer
    pub fn new(format: OutputFormat, use_color: bool, quiet: bool, verbose: u8) -> Self {
        Self::with_writer(format, use_color, quiet, verbose, Box::new(io::stdout()))
    }

    /// Create an output writer with a custom writer
    pub fn with_writer(
        format: OutputFormat,
        use_color: bool,
        quiet: bool,
        verbose: u8,
        writer: Box<dyn Write>,
    ) -> Self {
        Self {
            format,
            use_color,
            quiet,
            verbose,
            writer,
        }
    }

    /// Get the output format
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    fn is_human(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Write raw output
    pub fn write(&mut self, content: &str) -> Result<()> {
        write!(self.writer, "{}", content)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Write a line of output
    pub fn writeln(&mut self, content: &str) -> Result<()> {
        writeln!(self.writer, "{}", content)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Write an info message
    pub fn info(&mut self, message: &str) -> Result<()> {
        if self.quiet || !self.is_human() {
            return Ok(());
        }

        if self.use_color {
            self.writeln(&format!("{} {}", "ℹ".blue(), message))
        } else {
            self.writeln(&format!("INFO: {}", message))
        }
    }

    /// Write a success message
    pub fn success(&mut self, message: &str) -> Result<()> {
        if self.quiet || !self.is_human() {
            return Ok(());
        }

        if self.use_color {
            self.writeln(&message.green().to_string())
        } else {
            self.writeln(message)
        }
    }

    /// Write a warning message
    pub fn warning(&mut self, message: &str) -> Result<()> {
        if !self.is_human() {
            return Ok(());
        }

        if self.use_color {
            self.writeln(&message.yellow().to_string())
        } else {
            self.writeln(&format!("WARNING: {}", message))
        }
    }

    /// Write an error message
    pub fn error(&mut self, message: &str) -> Result<()> {
        if !self.is_human() {
            return Ok(());
        }

        if self.use_color {
            self.writeln(&message.red().to_string())
        } else {
            self.writeln(&format!("ERROR: {}", message))
        }
    }

    /// Write a section header
    pub fn section(&mut self, title: &str) -> Result<()> {
        if self.quiet || !self.is_human() {
            return Ok(());
        }

        self.writeln("")?;
        if self.use_color {
            self.writeln(&format!("═══ {} ═══", title).bright_blue().to_string())
        } else {
            self.writeln(&format!("=== {} ===", title))
        }
    }

    /// Write debug information if verbose mode is enabled
    pub fn debug(&mut self, message: &str) -> Result<()> {
        if self.verbose == 0 || !self.is_human() {
            return Ok(());
        }

        if self.use_color {
            self.writeln(&format!("{} {}", "DEBUG:".dimmed(), message.dimmed()))
        } else {
            self.writeln(&format!("DEBUG: {}", message))
        }
    }

    /// Write data in the configured format
    pub fn data<T: Serialize>(&mut self, value: &T) -> Result<()> {
        let formatted = self.format.format(value)?;
        trace!(bytes = formatted.len(), "Outputting data");
        self.emit(formatted)
    }

    /// Write tree nodes
    pub fn tree(&mut self, nodes: &[&TreeNode]) -> Result<()> {
        let entries: Vec<TreeEntry<'_>> = nodes.iter().map(|n| TreeEntry::from(*n)).collect();
        let formatted = self.format.format_tree(&entries)?;
        self.emit(formatted)
    }

    /// Write mapping pairs
    pub fn pairs(&mut self, pairs: &[MappingPair]) -> Result<()> {
        let formatted = self.format.format_pairs(pairs)?;
        self.emit(formatted)
    }

    /// Write a completeness report, coloring the verdict in human form
    pub fn report(&mut self, report: &ValidationResult) -> Result<()> {
        if self.is_human() && self.use_color {
            let verdict = if report.is_complete() {
                report.status.to_string().green().bold()
            } else {
                report.status.to_string().red().bold()
            };
            self.writeln(&format!("Status: {}", verdict))?;
            let body = format_sections_human(report);
            return self.write(&body);
        }
        let formatted = self.format.format_report(report)?;
        self.emit(formatted)
    }

    fn emit(&mut self, formatted: String) -> Result<()> {
        if self.is_human() || self.format == OutputFormat::JsonPretty {
            if formatted.ends_with('\n') {
                self.write(&formatted)
            } else {
                self.writeln(&formatted)
            }
        } else {
            // Machine formats are written as-is, one document per line
            self.writeln(formatted.trim_end())
        }
    }
}

fn describe_kind(entry: &TreeEntry<'_>) -> String {
    if entry.item_kinds.is_empty() {
        entry.kind.to_string()
    } else {
        let items: Vec<String> = entry.item_kinds.iter().map(ToString::to_string).collect();
        format!("{}<{}>", entry.kind, items.join("|"))
    }
}

/// Format tree entries as aligned chain/kind columns
fn format_tree_human(entries: &[TreeEntry<'_>]) -> String {
    if entries.is_empty() {
        return "(no mappable fields)\n".to_string();
    }
    let chains: Vec<String> = entries.iter().map(|e| e.key_chain.to_string()).collect();
    let width = chains.iter().map(|c| c.chars().count()).max().unwrap_or(0);

    let mut output = String::new();
    for (chain, entry) in chains.iter().zip(entries) {
        output.push_str(&format!("{:width$}  {}\n", chain, describe_kind(entry), width = width));
    }
    output
}

/// Format pairs as `required <- provided` with the expression underneath
fn format_pairs_human(pairs: &[MappingPair]) -> String {
    if pairs.is_empty() {
        return "(no pairs)\n".to_string();
    }

    let mut output = String::new();
    for pair in pairs {
        let provided = if pair.provided.is_empty() {
            "(literal)".to_string()
        } else {
            pair.provided
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        };
        output.push_str(&format!("{} <- {}\n", pair.required, provided));
        if pair.expression.trim().is_empty() {
            output.push_str("    (no expression)\n");
        } else {
            output.push_str(&format!("    {}\n", pair.expression));
        }
    }
    output
}

fn format_report_human(report: &ValidationResult) -> String {
    format!("Status: {}\n{}", report.status, format_sections_human(report))
}

fn format_sections_human(report: &ValidationResult) -> String {
    let mut output = String::new();
    for section in &report.sections {
        output.push_str(&format!(
            "{}: {} required field(s), {} issue(s)\n",
            section.section,
            section.required_fields,
            section.issues.len()
        ));
        for issue in &section.issues {
            output.push_str(&format!("  - {}: {}\n", issue.chain, issue.kind));
        }
    }
    output
}

#[cfg(test)]
mod tests {
    include!("output/tests.rs");
}
