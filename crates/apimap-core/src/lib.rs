//! Apimap Core - Schema-mapping and expression-synthesis engine
//!
//! This crate turns the JSON bodies of API interfaces into addressable trees,
//! records field-level correspondences between a source and one or more
//! targets, compiles them into path expressions and checks that every
//! required field is satisfied before a mapping may be stored or built.
//!
//! # Main Components
//!
//! - **Key-chains** ([`keychain`]): addresses inside a JSON value
//! - **Trees** ([`tree`]): typed node hierarchies built from JSON
//! - **Expressions** ([`codec`]): synthesis and parsing of path expressions
//! - **Pairs** ([`store`]): the correspondences being edited
//! - **Matching** ([`matcher`]): automatic matching of identical fields
//! - **Validation** ([`validator`]): completeness reports
//! - **Assembly** ([`assembler`]): mapping documents from pairs
//! - **Collaborators** ([`boundary`]): async interfaces and their gates
//! - **Sessions** ([`session`]): one mapping being edited
//!
//! # Example
//!
//! ```
//! use apimap_core::{AutoMatcher, MappingDirection, TreeBuilder};
//! use serde_json::json;
//!
//! fn example() -> apimap_core::Result<()> {
//!     let body = json!({"id": 1, "tags": ["a", "b"]});
//!     let tree = TreeBuilder::new().build(&body)?;
//!     let pairs = AutoMatcher::new(MappingDirection::Output).match_identical(&tree, &tree);
//!     assert_eq!(pairs.len(), 2);
//!     Ok(())
//! }
//! # example().unwrap();
//! ```

pub mod assembler;
pub mod boundary;
pub mod codec;
pub mod error;
pub mod keychain;
pub mod matcher;
pub mod session;
pub mod store;
pub mod tree;
pub mod types;
pub mod validator;

#[cfg(test)]
mod proptest_strategies;

// Re-export main types for convenience
pub use error::{Error, Result};
pub use keychain::{KeyChain, Segment};
pub use tree::{NodeKind, TreeBuilder, TreeNode, DEFAULT_MAX_DEPTH};
pub use codec::{render, ExpressionCodec, ExpressionTree, PathExpressionCodec};
pub use store::{MappingPair, MappingPairStore, PairIdentity};
pub use matcher::AutoMatcher;
pub use validator::{
    CompletenessValidator, FieldIssue, IssueKind, RequiredSchemas, SectionReport,
    ValidationResult, ValidationStatus,
};
pub use assembler::MappingAssembler;
pub use boundary::{
    build_adapter, finalize_mapping, AdapterBuilder, MappingRepository, MappingSuggester,
    SchemaSource,
};
pub use session::{InterfaceBodies, MappingSession, Section};
pub use types::{
    ApiInterface, ApiStyle, BodyPart, DownloadReference, InterfaceQualifier, MappingBody,
    MappingDirection, MappingDocument, TargetRuntime,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
