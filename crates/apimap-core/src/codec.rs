//! Expression synthesis and parsing
//!
//! Mapping pairs are compiled into *path expressions* that read a provided
//! field from an implicit root binding, and packaged into an
//! [`ExpressionTree`]: a JSON object mirroring the required shape whose
//! leaves are expression strings. The inverse direction parses such a tree
//! back into mapping pairs, which is how stored or suggested mappings are
//! reopened for editing.
//!
//! The expression language itself is pluggable through [`ExpressionCodec`].
//! [`PathExpressionCodec`] speaks the JSONata path subset used by generated
//! adapters: `$.user.id`, `` $.`first-name` ``, `$.tags[0]`.

use crate::keychain::{push_key, KeyChain, Segment};
use crate::store::MappingPair;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::iter::Peekable;
use std::str::CharIndices;

/// Serialized expression tree
///
/// A JSON object whose leaves are expressions. Array items appear where the
/// required chain contains an index. `null` leaves are placeholders and
/// carry no mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpressionTree(Value);

impl Default for ExpressionTree {
    fn default() -> Self {
        Self::empty()
    }
}

impl ExpressionTree {
    /// Tree with no assignments
    pub fn empty() -> Self {
        Self(Value::Object(Map::new()))
    }

    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    /// Read a tree from its JSON text
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).map(Self).map_err(|e| {
            Error::expression_parse(format!("invalid expression tree: {}", e), e.column(), text)
        })
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// Compact JSON text, the form stored in mapping documents
    pub fn to_json_string(&self) -> String {
        self.0.to_string()
    }

    pub fn is_empty(&self) -> bool {
        match &self.0 {
            Value::Object(map) => map.is_empty(),
            Value::Null => true,
            _ => false,
        }
    }
}

/// Serde helper storing an [`ExpressionTree`] as a JSON string
///
/// Deserialization also accepts an inline object.
pub mod as_json_string {
    use super::ExpressionTree;
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    #[derive(Deserialize)]
    #[serde(untagged)]
    pub(super) enum Repr {
        Text(String),
        Inline(Value),
    }

    impl Repr {
        pub(super) fn into_tree<E: serde::de::Error>(self) -> Result<ExpressionTree, E> {
            match self {
                Repr::Text(text) => serde_json::from_str(&text)
                    .map(ExpressionTree::from_value)
                    .map_err(E::custom),
                Repr::Inline(value) => Ok(ExpressionTree::from_value(value)),
            }
        }
    }

    pub fn serialize<S: Serializer>(tree: &ExpressionTree, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&tree.to_json_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ExpressionTree, D::Error> {
        Repr::deserialize(deserializer)?.into_tree::<D::Error>()
    }
}

/// Same as [`as_json_string`] for a map of trees
pub mod as_json_string_map {
    use super::as_json_string::Repr;
    use super::ExpressionTree;
    use serde::ser::SerializeMap;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S: Serializer>(
        trees: &BTreeMap<String, ExpressionTree>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(trees.len()))?;
        for (key, tree) in trees {
            map.serialize_entry(key, &tree.to_json_string())?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<String, ExpressionTree>, D::Error> {
        let raw = BTreeMap::<String, Repr>::deserialize(deserializer)?;
        raw.into_iter()
            .map(|(key, repr)| repr.into_tree::<D::Error>().map(|tree| (key, tree)))
            .collect()
    }
}

/// A pluggable expression language
pub trait ExpressionCodec: Send + Sync {
    /// Expression reading the given provided chains
    ///
    /// Only the single-chain case is synthesized. Zero or several chains
    /// yield an empty expression: aggregation logic is written by hand.
    fn synthesize(&self, chains: &[KeyChain]) -> String;

    /// Root references read by an expression, in order of first appearance
    fn references(&self, expression: &str) -> Result<Vec<KeyChain>>;

    /// Parse a serialized tree into one pair per leaf assignment
    fn parse(&self, tree: &ExpressionTree) -> Result<Vec<MappingPair>> {
        let Value::Object(members) = tree.as_value() else {
            return Err(Error::expression_parse(
                "expression tree root must be an object",
                0,
                tree.to_json_string(),
            ));
        };

        let mut pairs = Vec::new();
        for (key, value) in members {
            parse_member(self, key, value, &KeyChain::root(), &mut pairs)?;
        }
        tracing::debug!(pairs = pairs.len(), "Parsed expression tree");
        Ok(pairs)
    }

    /// Parse tree JSON text
    fn parse_str(&self, text: &str) -> Result<Vec<MappingPair>> {
        self.parse(&ExpressionTree::from_json_str(text)?)
    }
}

fn parse_member<C: ExpressionCodec + ?Sized>(
    codec: &C,
    key: &str,
    value: &Value,
    parent: &KeyChain,
    pairs: &mut Vec<MappingPair>,
) -> Result<()> {
    if key.is_empty() {
        return Err(Error::expression_parse(
            format!("empty member name under '{}'", parent),
            0,
            value.to_string(),
        ));
    }
    parse_node(codec, value, parent.append(key), pairs)
}

fn parse_node<C: ExpressionCodec + ?Sized>(
    codec: &C,
    value: &Value,
    chain: KeyChain,
    pairs: &mut Vec<MappingPair>,
) -> Result<()> {
    match value {
        Value::Object(members) => {
            for (key, child) in members {
                parse_member(codec, key, child, &chain, pairs)?;
            }
        }
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                parse_node(codec, item, chain.append(i), pairs)?;
            }
        }
        Value::Null => {}
        Value::String(expression) => {
            let provided = codec.references(expression).map_err(|e| match e {
                Error::ExpressionParse {
                    message,
                    position,
                    expression,
                } => Error::ExpressionParse {
                    message: format!("{} (assigned to '{}')", message, chain),
                    position,
                    expression,
                },
                other => other,
            })?;
            pairs.push(MappingPair::new(provided, chain, expression.clone()));
        }
        literal => {
            pairs.push(MappingPair::new(Vec::new(), chain, literal.to_string()));
        }
    }
    Ok(())
}

/// Package pairs into an expression tree
///
/// Fails when a required chain is the root, or when two pairs claim the same
/// location or nested locations.
pub fn render<'a, I>(pairs: I) -> Result<ExpressionTree>
where
    I: IntoIterator<Item = &'a MappingPair>,
{
    let mut root = Value::Object(Map::new());
    for pair in pairs {
        if pair.required.is_root() {
            return Err(Error::assembly("the tree root cannot be a mapping target"));
        }
        insert(&mut root, pair.required.segments(), &pair.required, &pair.expression)?;
    }
    Ok(ExpressionTree(root))
}

fn insert(slot: &mut Value, segments: &[Segment], full: &KeyChain, expression: &str) -> Result<()> {
    let Some((head, rest)) = segments.split_first() else {
        if !slot.is_null() {
            return Err(Error::assembly(format!("conflicting assignments to '{}'", full)));
        }
        *slot = Value::String(expression.to_string());
        return Ok(());
    };

    let conflict = || Error::assembly(format!("conflicting assignments to '{}'", full));
    let child = match head {
        Segment::Key(name) => {
            if slot.is_null() {
                *slot = Value::Object(Map::new());
            }
            let Value::Object(members) = slot else {
                return Err(conflict());
            };
            members.entry(name.clone()).or_insert(Value::Null)
        }
        Segment::Index(index) => {
            if slot.is_null() {
                *slot = Value::Array(Vec::new());
            }
            let Value::Array(items) = slot else {
                return Err(conflict());
            };
            if items.len() <= *index {
                items.resize(index + 1, Value::Null);
            }
            &mut items[*index]
        }
    };
    insert(child, rest, full, expression)
}

/// JSONata-style path expressions
#[derive(Debug, Clone, Copy, Default)]
pub struct PathExpressionCodec;

impl PathExpressionCodec {
    pub fn new() -> Self {
        Self
    }
}

impl ExpressionCodec for PathExpressionCodec {
    fn synthesize(&self, chains: &[KeyChain]) -> String {
        let [chain] = chains else {
            return String::new();
        };
        let mut out = String::from("$");
        for segment in chain.segments() {
            match segment {
                Segment::Key(name) => {
                    out.push('.');
                    push_key(&mut out, name);
                }
                Segment::Index(i) => {
                    out.push('[');
                    out.push_str(&i.to_string());
                    out.push(']');
                }
            }
        }
        out
    }

    fn references(&self, expression: &str) -> Result<Vec<KeyChain>> {
        ReferenceScanner::new(expression).scan()
    }
}

/// Finds root path references inside an expression
struct ReferenceScanner<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> ReferenceScanner<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
        }
    }

    fn scan(mut self) -> Result<Vec<KeyChain>> {
        let mut found: Vec<KeyChain> = Vec::new();
        while let Some((position, ch)) = self.chars.next() {
            match ch {
                '"' | '\'' => self.skip_string(position, ch)?,
                '`' => {
                    self.quoted_name(position)?;
                }
                '$' => {
                    if let Some(chain) = self.reference()? {
                        if !found.contains(&chain) {
                            found.push(chain);
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(found)
    }

    /// After a `$`: a root path, or `None` for `$variable` / `$function`
    fn reference(&mut self) -> Result<Option<KeyChain>> {
        if matches!(self.peek_char(), Some(c) if is_name_char(c) || c == '$') {
            while matches!(self.peek_char(), Some(c) if is_name_char(c) || c == '$') {
                self.chars.next();
            }
            return Ok(None);
        }

        let mut segments = Vec::new();
        loop {
            match self.peek_char() {
                Some('.') => {
                    let checkpoint = self.chars.clone();
                    self.chars.next();
                    match self.chars.peek().copied() {
                        Some((start, '`')) => {
                            self.chars.next();
                            segments.push(Segment::Key(self.quoted_name(start)?));
                        }
                        Some((_, c)) if is_name_char(c) => {
                            segments.push(Segment::Key(self.name()));
                        }
                        _ => {
                            self.chars = checkpoint;
                            break;
                        }
                    }
                }
                Some('[') => match self.index() {
                    Some(i) => segments.push(Segment::Index(i)),
                    None => break,
                },
                _ => break,
            }
        }
        Ok(Some(KeyChain::new(segments)))
    }

    /// `[digits]`; leaves the scanner untouched when the bracket is a predicate
    fn index(&mut self) -> Option<usize> {
        let mut probe = self.chars.clone();
        probe.next();
        let mut digits = String::new();
        while let Some((_, c)) = probe.peek().copied() {
            if !c.is_ascii_digit() {
                break;
            }
            digits.push(c);
            probe.next();
        }
        if digits.is_empty() || !matches!(probe.next(), Some((_, ']'))) {
            return None;
        }
        let index = digits.parse().ok()?;
        self.chars = probe;
        Some(index)
    }

    fn name(&mut self) -> String {
        let mut name = String::new();
        while let Some(c) = self.peek_char() {
            if !is_name_char(c) {
                break;
            }
            name.push(c);
            self.chars.next();
        }
        name
    }

    /// Body of a backtick-quoted name whose opening quote sits at `start`
    ///
    /// A doubled backtick stands for one backtick in the name.
    fn quoted_name(&mut self, start: usize) -> Result<String> {
        let mut name = String::new();
        while let Some((_, c)) = self.chars.next() {
            if c == '`' && self.chars.next_if(|&(_, next)| next == '`').is_none() {
                return Ok(name);
            }
            name.push(c);
        }
        Err(Error::expression_parse("unterminated quoted name", start, self.input))
    }

    fn skip_string(&mut self, start: usize, quote: char) -> Result<()> {
        while let Some((_, c)) = self.chars.next() {
            if c == '\\' {
                self.chars.next();
            } else if c == quote {
                return Ok(());
            }
        }
        Err(Error::expression_parse("unterminated string literal", start, self.input))
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn refs(expression: &str) -> Vec<String> {
        PathExpressionCodec
            .references(expression)
            .unwrap()
            .iter()
            .map(KeyChain::join)
            .collect()
    }

    #[test]
    fn test_synthesize_single_chain() {
        let chain = KeyChain::new(vec!["user".into(), "first-name".into(), "tags".into(), 0.into()]);
        assert_eq!(
            PathExpressionCodec.synthesize(&[chain]),
            "$.user.`first-name`.tags[0]"
        );
        assert_eq!(PathExpressionCodec.synthesize(&[KeyChain::root()]), "$");
    }

    #[test]
    fn test_synthesize_aggregation_is_empty() {
        let a = KeyChain::from_keys(["first"]);
        let b = KeyChain::from_keys(["last"]);
        assert_eq!(PathExpressionCodec.synthesize(&[a, b]), "");
        assert_eq!(PathExpressionCodec.synthesize(&[]), "");
    }

    #[test]
    fn test_references_in_hand_written_expressions() {
        assert_eq!(refs("$.first & ' ' & $.last"), vec!["first", "last"]);
        assert_eq!(refs("$string($.user.id)"), vec!["user.id"]);
        assert_eq!(refs("$.items[price > 5].name"), vec!["items"]);
        assert_eq!(refs("'$.not.a.ref' & $.real"), vec!["real"]);
        assert_eq!(refs("$.a + $.a"), vec!["a"]);
        assert_eq!(refs("42"), Vec::<String>::new());
    }

    #[test]
    fn test_unterminated_quote_is_rejected() {
        let err = PathExpressionCodec.references("$.`broken").unwrap_err();
        match err {
            Error::ExpressionParse { position, .. } => assert_eq!(position, 2),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(PathExpressionCodec.references("'open").is_err());
    }

    #[test]
    fn test_backtick_in_key_round_trips() {
        let chain = KeyChain::from_keys(["a`b", "`", "c"]);
        let expression = PathExpressionCodec.synthesize(std::slice::from_ref(&chain));
        assert_eq!(expression, "$.`a``b`.````.c");
        assert_eq!(PathExpressionCodec.references(&expression).unwrap(), vec![chain]);

        let empty = KeyChain::from_keys(["", "x"]);
        let expression = PathExpressionCodec.synthesize(std::slice::from_ref(&empty));
        assert_eq!(PathExpressionCodec.references(&expression).unwrap(), vec![empty]);
    }

    #[test]
    fn test_parse_tree() {
        let tree = ExpressionTree::from_value(json!({
            "accountId": "$.user.id",
            "profile": {"name": "$.user.first & ' ' & $.user.last"},
            "items": [{"sku": "$.lines[0].code"}],
            "version": 2,
            "later": null
        }));
        let pairs = PathExpressionCodec.parse(&tree).unwrap();
        let required: Vec<String> = pairs.iter().map(|p| p.required.join()).collect();
        assert_eq!(required, vec!["accountId", "items[0].sku", "profile.name", "version"]);
        assert_eq!(pairs[2].provided.len(), 2);
        assert_eq!(pairs[3].expression, "2");
        assert!(pairs[3].provided.is_empty());
    }

    #[test]
    fn test_parse_rejects_non_object_root() {
        let tree = ExpressionTree::from_value(json!(["$.a"]));
        assert!(matches!(
            PathExpressionCodec.parse(&tree),
            Err(Error::ExpressionParse { .. })
        ));
        assert!(PathExpressionCodec.parse_str("not json").is_err());
    }

    #[test]
    fn test_render_and_parse_round_trip() {
        let pairs = vec![
            MappingPair::new(
                vec![KeyChain::from_keys(["user", "id"])],
                KeyChain::from_keys(["accountId"]),
                "$.user.id",
            ),
            MappingPair::new(
                vec![KeyChain::from_keys(["lines"])],
                KeyChain::new(vec!["items".into(), 1.into(), "sku".into()]),
                "$.lines",
            ),
        ];
        let tree = render(&pairs).unwrap();
        assert_eq!(
            tree.as_value(),
            &json!({"accountId": "$.user.id", "items": [null, {"sku": "$.lines"}]})
        );
        let parsed = PathExpressionCodec.parse(&tree).unwrap();
        assert_eq!(parsed, pairs);
    }

    #[test]
    fn test_render_rejects_overlapping_targets() {
        let pairs = vec![
            MappingPair::new(vec![], KeyChain::from_keys(["a"]), "1"),
            MappingPair::new(vec![], KeyChain::from_keys(["a", "b"]), "2"),
        ];
        assert!(matches!(render(&pairs), Err(Error::Assembly { .. })));

        let root = vec![MappingPair::new(vec![], KeyChain::root(), "1")];
        assert!(render(&root).is_err());
    }

    #[test]
    fn test_json_string_wire_form() {
        #[derive(Serialize, Deserialize)]
        struct Holder {
            #[serde(with = "as_json_string")]
            tree: ExpressionTree,
        }

        let holder = Holder {
            tree: ExpressionTree::from_value(json!({"a": "$.b"})),
        };
        let wire = serde_json::to_value(&holder).unwrap();
        assert_eq!(wire, json!({"tree": "{\"a\":\"$.b\"}"}));

        let back: Holder = serde_json::from_value(wire).unwrap();
        assert_eq!(back.tree, holder.tree);

        let inline: Holder = serde_json::from_value(json!({"tree": {"a": "$.b"}})).unwrap();
        assert_eq!(inline.tree, holder.tree);
    }
}
