//! Shared utilities for command handlers

use crate::cli::OutputFormat;
use crate::config::Config;
use crate::error::{Error, ErrorContext, Result};
use crate::output::OutputWriter;
use apimap_core::MappingSession;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::debug;

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|s| s == "yaml" || s == "yml")
        .unwrap_or(false)
}

/// Read a JSON or YAML file, choosing by extension
pub fn read_input<T: DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Err(Error::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = fs::read_to_string(path)?;
    debug!(path = %path.display(), bytes = content.len(), "Read input file");

    if is_yaml(path) {
        serde_yaml::from_str(&content).map_err(|e| {
            debug!(error = %e, "YAML decoding failed");
            Error::InvalidFormat {
                path: path.to_path_buf(),
                expected: "YAML".to_string(),
            }
        })
    } else {
        serde_json::from_str(&content).map_err(|e| {
            debug!(error = %e, "JSON decoding failed");
            Error::InvalidFormat {
                path: path.to_path_buf(),
                expected: "JSON".to_string(),
            }
        })
    }
}

/// Write a value to a file in the requested format
pub fn write_output<T: Serialize>(path: &Path, value: &T, format: OutputFormat) -> Result<()> {
    let content = match format {
        OutputFormat::Yaml => serde_yaml::to_string(value)?,
        OutputFormat::Json => serde_json::to_string(value)?,
        OutputFormat::JsonPretty | OutputFormat::Human if is_yaml(path) => {
            serde_yaml::to_string(value)?
        }
        OutputFormat::JsonPretty | OutputFormat::Human => serde_json::to_string_pretty(value)?,
    };
    fs::write(path, content).with_context(|| format!("Writing {}", path.display()))
}

/// Load a session file and check its interfaces
pub fn load_session(path: &Path, config: &Config) -> Result<MappingSession> {
    let session: MappingSession = read_input(path)?;
    session.check_interfaces()?;
    debug!(session = ?session, "Loaded session");
    Ok(session.with_tree_builder(config.tree_builder()))
}

/// Run the matcher on every section of a session
pub fn auto_match_all(session: &mut MappingSession, output: &mut OutputWriter) -> Result<usize> {
    let mut total = 0;
    for section in session.sections() {
        let added = session.auto_match(*section)?;
        output.debug(&format!("{}: {} pair(s) matched", section, added))?;
        total += added;
    }
    output.info(&format!("Auto-match added {} pair(s)", total))?;
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_yaml_and_json_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = dir.path().join("body.yaml");
        let json_file = dir.path().join("body.json");
        fs::write(&yaml, "id: 1\ntags: [a, b]\n").unwrap();
        fs::write(&json_file, r#"{"id": 1, "tags": ["a", "b"]}"#).unwrap();

        let from_yaml: Value = read_input(&yaml).unwrap();
        let from_json: Value = read_input(&json_file).unwrap();
        assert_eq!(from_yaml, from_json);
        assert_eq!(from_json, json!({"id": 1, "tags": ["a", "b"]}));
    }

    #[test]
    fn test_bad_input_names_the_expected_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("body.json");
        fs::write(&path, "{not json").unwrap();
        match read_input::<Value>(&path) {
            Err(Error::InvalidFormat { expected, .. }) => assert_eq!(expected, "JSON"),
            other => panic!("unexpected result {:?}", other),
        }
        assert!(matches!(
            read_input::<Value>(&dir.path().join("missing.json")),
            Err(Error::FileNotFound { .. })
        ));
    }

    #[test]
    fn test_session_without_targets_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(
            &path,
            r#"{
                "source": {"apiId": "shop", "operationId": "getOrder", "responseId": "200"},
                "targets": [],
                "direction": "OUTPUT"
            }"#,
        )
        .unwrap();
        let err = load_session(&path, &Config::default()).unwrap_err();
        assert!(matches!(
            err,
            Error::Core(apimap_core::Error::MalformedInput { .. })
        ));
    }

    #[test]
    fn test_write_output_follows_the_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.yaml");
        write_output(&path, &json!({"a": 1}), OutputFormat::Human).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "a: 1\n");
    }
}
