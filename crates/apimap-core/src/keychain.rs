//! Key-chains: addresses of locations inside a JSON tree
//!
//! A [`KeyChain`] is an ordered list of [`Segment`]s. Object members are
//! addressed by name, array items by index. Two notions of equality exist:
//! exact equality (`==`) keeps indices, while [`KeyChain::same_shape`] treats
//! every index as the same array marker.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// One step of a key-chain
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Segment {
    /// Array item at a concrete index
    Index(usize),
    /// Object member by name
    Key(String),
}

impl Segment {
    /// Create an object member segment
    pub fn key(name: impl Into<String>) -> Self {
        Segment::Key(name.into())
    }

    /// Whether this segment is an array marker
    pub fn is_index(&self) -> bool {
        matches!(self, Segment::Index(_))
    }

    /// Structural equality: member names must match, indices never matter
    pub fn same_shape(&self, other: &Segment) -> bool {
        match (self, other) {
            (Segment::Key(a), Segment::Key(b)) => a == b,
            (Segment::Index(_), Segment::Index(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(name) => f.write_str(name),
            Segment::Index(i) => write!(f, "[{}]", i),
        }
    }
}

impl From<&str> for Segment {
    fn from(name: &str) -> Self {
        Segment::Key(name.to_string())
    }
}

impl From<String> for Segment {
    fn from(name: String) -> Self {
        Segment::Key(name)
    }
}

impl From<usize> for Segment {
    fn from(index: usize) -> Self {
        Segment::Index(index)
    }
}

/// Whether a member name can be written without quoting
pub fn is_plain_key(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Append a member name, backtick-quoted unless plain
///
/// A backtick inside a quoted name is doubled.
pub fn push_key(out: &mut String, name: &str) {
    if is_plain_key(name) {
        out.push_str(name);
    } else {
        out.push('`');
        out.push_str(&name.replace('`', "``"));
        out.push('`');
    }
}

/// Immutable address of one location in a JSON value
///
/// The empty chain denotes the root. It is a valid tree address but never a
/// valid mapping target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyChain {
    segments: Vec<Segment>,
}

impl KeyChain {
    /// The root chain
    pub fn root() -> Self {
        Self::default()
    }

    /// Build a chain from segments
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// Build a chain of member names, e.g. `KeyChain::from_keys(["user", "id"])`
    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: keys.into_iter().map(|k| Segment::Key(k.into())).collect(),
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Whether this chain addresses the tree root
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn first(&self) -> Option<&Segment> {
        self.segments.first()
    }

    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    /// Return a new chain with `segment` appended
    pub fn append(&self, segment: impl Into<Segment>) -> Self {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.extend_from_slice(&self.segments);
        segments.push(segment.into());
        Self { segments }
    }

    /// Chain without its first `n` segments
    pub fn skip(&self, n: usize) -> &[Segment] {
        &self.segments[n.min(self.segments.len())..]
    }

    pub fn starts_with(&self, prefix: &KeyChain) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    /// Structural equality ignoring concrete array indices
    pub fn same_shape(&self, other: &KeyChain) -> bool {
        segments_same_shape(&self.segments, &other.segments)
    }

    /// Dotted, human-readable form, stable for set membership checks
    pub fn join(&self) -> String {
        render_segments(&self.segments, false)
    }

    /// Dotted form with every index replaced by `[*]`
    pub fn shape_key(&self) -> String {
        render_segments(&self.segments, true)
    }

    /// Dereference this chain against a JSON value
    pub fn resolve<'a>(&self, value: &'a Value) -> Option<&'a Value> {
        let mut current = value;
        for segment in &self.segments {
            current = match (segment, current) {
                (Segment::Key(k), Value::Object(map)) => map.get(k)?,
                (Segment::Index(i), Value::Array(items)) => items.get(*i)?,
                _ => return None,
            };
        }
        Some(current)
    }
}

/// Structural equality over raw segment slices
pub fn segments_same_shape(a: &[Segment], b: &[Segment]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_shape(y))
}

fn render_segments(segments: &[Segment], shape: bool) -> String {
    let mut out = String::new();
    for segment in segments {
        match segment {
            Segment::Key(name) => {
                if !out.is_empty() {
                    out.push('.');
                }
                push_key(&mut out, name);
            }
            Segment::Index(_) if shape => out.push_str("[*]"),
            Segment::Index(i) => {
                out.push('[');
                out.push_str(&i.to_string());
                out.push(']');
            }
        }
    }
    out
}

impl fmt::Display for KeyChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            write!(f, "$")
        } else {
            write!(f, "{}", self.join())
        }
    }
}

impl From<Vec<Segment>> for KeyChain {
    fn from(segments: Vec<Segment>) -> Self {
        Self { segments }
    }
}

impl FromIterator<Segment> for KeyChain {
    fn from_iter<T: IntoIterator<Item = Segment>>(iter: T) -> Self {
        Self {
            segments: iter.into_iter().collect(),
        }
    }
}
