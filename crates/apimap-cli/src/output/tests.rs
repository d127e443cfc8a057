// Tests for tree, pair and report formatting

use super::*;
use apimap_core::{TreeBuilder, ValidationStatus};
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Clone, Default)]
struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SharedBuffer {
    fn contents(&self) -> String {
        String::from_utf8(self.0.borrow().clone()).unwrap()
    }
}

fn writer(format: OutputFormat, quiet: bool) -> (OutputWriter, SharedBuffer) {
    let buffer = SharedBuffer::default();
    let writer = OutputWriter::with_writer(format, false, quiet, 0, Box::new(buffer.clone()));
    (writer, buffer)
}

fn incomplete_report() -> ValidationResult {
    serde_json::from_value(json!({
        "status": "INCOMPLETE",
        "sections": [{
            "section": "request",
            "requiredFields": 2,
            "issues": [{"chain": ["accounts_create_201", "name"], "kind": "unmapped"}]
        }]
    }))
    .unwrap()
}

#[test]
fn test_tree_listing_human() {
    let tree = TreeBuilder::new()
        .build(&json!({"id": 1, "tags": ["a"], "owner": {"name": "x"}}))
        .unwrap();
    let (mut output, buffer) = writer(OutputFormat::Human, false);
    output.tree(&tree.mappable_leaves()).unwrap();

    let text = buffer.contents();
    assert!(text.contains("id          number"));
    assert!(text.contains("tags        array<string>"));
    assert!(text.contains("owner.name  string"));
}

#[test]
fn test_tree_listing_json() {
    let tree = TreeBuilder::new().build(&json!({"tags": ["a", 1]})).unwrap();
    let (mut output, buffer) = writer(OutputFormat::Json, false);
    output.tree(&tree.mappable_leaves()).unwrap();

    let listed: serde_json::Value = serde_json::from_str(&buffer.contents()).unwrap();
    assert_eq!(listed[0]["kind"], "array");
    assert_eq!(listed[0]["keyChain"], json!(["tags"]));
    assert_eq!(listed[0]["itemKinds"], json!(["string", "number"]));
}

#[test]
fn test_pairs_human_marks_literals_and_gaps() {
    let pairs = vec![
        MappingPair::new(
            vec![KeyChain::from_keys(["user", "id"])],
            KeyChain::from_keys(["accountId"]),
            "$.user.id",
        ),
        MappingPair::new(Vec::new(), KeyChain::from_keys(["kind"]), "'person'"),
        MappingPair::new(
            vec![KeyChain::from_keys(["user", "name"])],
            KeyChain::from_keys(["accountName"]),
            "",
        ),
    ];
    let text = OutputFormat::Human.format_pairs(&pairs).unwrap();
    assert_eq!(
        text,
        "accountId <- user.id\n    $.user.id\n\
         kind <- (literal)\n    'person'\n\
         accountName <- user.name\n    (no expression)\n"
    );
}

#[test]
fn test_report_human_lists_issues() {
    let (mut output, buffer) = writer(OutputFormat::Human, false);
    output.report(&incomplete_report()).unwrap();
    assert_eq!(
        buffer.contents(),
        "Status: INCOMPLETE\n\
         request: 2 required field(s), 1 issue(s)\n  \
         - accounts_create_201.name: unmapped\n"
    );
}

#[test]
fn test_report_yaml_round_trips() {
    let report = incomplete_report();
    let text = OutputFormat::Yaml.format_report(&report).unwrap();
    let parsed: ValidationResult = serde_yaml::from_str(&text).unwrap();
    assert_eq!(parsed.status, ValidationStatus::Incomplete);
    assert_eq!(parsed, report);
}

#[test]
fn test_quiet_suppresses_messages_but_not_data() {
    let (mut output, buffer) = writer(OutputFormat::Human, true);
    output.info("hidden").unwrap();
    output.success("hidden").unwrap();
    output.section("hidden").unwrap();
    output.data(&json!({"shown": true})).unwrap();

    let text = buffer.contents();
    assert!(!text.contains("hidden"));
    assert!(text.contains("\"shown\": true"));
}

#[test]
fn test_machine_formats_skip_messages() {
    let (mut output, buffer) = writer(OutputFormat::Json, false);
    output.info("progress").unwrap();
    output.warning("careful").unwrap();
    output.data(&json!({"a": 1})).unwrap();
    assert_eq!(buffer.contents(), "{\"a\":1}\n");
}
