//! Attribute values: literals, references and the expressions built from them.
//!
//! Attribute values are plain data. A value that depends on another node is
//! a [`AttributeValue::Reference`] (or contains one), never a magic string, so
//! the resolver can walk it and the builder can derive dependency edges from
//! it without parsing text.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// A pointer at one attribute of another node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AttrRef {
    /// Id of the referenced node
    pub node: String,
    /// Name of the referenced attribute
    pub attribute: String,
}

impl AttrRef {
    /// Create a reference to `node.attribute`.
    pub fn new(node: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            attribute: attribute.into(),
        }
    }
}

impl fmt::Display for AttrRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.node, self.attribute)
    }
}

/// One piece of a [`AttributeValue::Composite`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fragment {
    /// Fixed value, stringified when concatenated
    Literal(Value),
    /// Value of another node's attribute
    Reference(AttrRef),
}

impl From<&str> for Fragment {
    fn from(text: &str) -> Self {
        Self::Literal(Value::String(text.to_string()))
    }
}

impl From<String> for Fragment {
    fn from(text: String) -> Self {
        Self::Literal(Value::String(text))
    }
}

impl From<AttrRef> for Fragment {
    fn from(reference: AttrRef) -> Self {
        Self::Reference(reference)
    }
}

/// The value of a node attribute, tag, or output.
///
/// The first three variants are the core model: fixed data, a whole
/// reference, and a string interpolation. The rest compose them into the
/// structures resources need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeValue {
    /// Fixed data
    Literal(Value),
    /// The value of another node's attribute, keeping its native type
    Reference(AttrRef),
    /// String built by concatenating fragments in order
    Composite(Vec<Fragment>),
    /// Ordered list of values
    List(Vec<AttributeValue>),
    /// Nested block keyed by name
    Map(BTreeMap<String, AttributeValue>),
    /// JSON text of the inner value
    JsonEncode(Box<AttributeValue>),
    /// One element of a string split on a separator
    Element {
        /// The string to split
        source: Box<AttributeValue>,
        /// Separator to split on
        separator: String,
        /// Zero-based element index
        index: usize,
    },
    /// Only known once the owning resource is realized
    Computed,
}

impl AttributeValue {
    /// Build a literal from anything JSON-convertible.
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }

    /// Build a string interpolation.
    ///
    /// ```rust
    /// use stacksynth::graph::{AttrRef, AttributeValue};
    ///
    /// let url = AttributeValue::concat(["http://".into(), AttrRef::new("alb", "dns_name").into(), "/health".into()]);
    /// assert_eq!(url.references().len(), 1);
    /// ```
    pub fn concat(fragments: impl IntoIterator<Item = Fragment>) -> Self {
        Self::Composite(fragments.into_iter().collect())
    }

    /// Build a list.
    pub fn list(items: impl IntoIterator<Item = AttributeValue>) -> Self {
        Self::List(items.into_iter().collect())
    }

    /// Build a nested block from `(key, value)` pairs.
    pub fn map<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<AttributeValue>,
    {
        Self::Map(entries.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    /// JSON-encode a value into a string.
    #[must_use]
    pub fn json_encode(self) -> Self {
        Self::JsonEncode(Box::new(self))
    }

    /// Take element `index` of this string split on `separator`.
    #[must_use]
    pub fn element(self, separator: impl Into<String>, index: usize) -> Self {
        Self::Element {
            source: Box::new(self),
            separator: separator.into(),
            index,
        }
    }

    /// Every reference contained in this value, in traversal order.
    #[must_use]
    pub fn references(&self) -> Vec<&AttrRef> {
        let mut found = Vec::new();
        self.collect_references(&mut found);
        found
    }

    fn collect_references<'a>(&'a self, found: &mut Vec<&'a AttrRef>) {
        match self {
            Self::Literal(_) | Self::Computed => {}
            Self::Reference(reference) => found.push(reference),
            Self::Composite(fragments) => {
                for fragment in fragments {
                    if let Fragment::Reference(reference) = fragment {
                        found.push(reference);
                    }
                }
            }
            Self::List(items) => {
                for item in items {
                    item.collect_references(found);
                }
            }
            Self::Map(entries) => {
                for value in entries.values() {
                    value.collect_references(found);
                }
            }
            Self::JsonEncode(inner) => inner.collect_references(found),
            Self::Element {
                source,
                ..
            } => source.collect_references(found),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(text: &str) -> Self {
        Self::Literal(Value::String(text.to_string()))
    }
}

impl From<String> for AttributeValue {
    fn from(text: String) -> Self {
        Self::Literal(Value::String(text))
    }
}

impl From<bool> for AttributeValue {
    fn from(flag: bool) -> Self {
        Self::Literal(Value::Bool(flag))
    }
}

impl From<i64> for AttributeValue {
    fn from(number: i64) -> Self {
        Self::Literal(Value::from(number))
    }
}

impl From<u32> for AttributeValue {
    fn from(number: u32) -> Self {
        Self::Literal(Value::from(number))
    }
}

impl From<u16> for AttributeValue {
    fn from(number: u16) -> Self {
        Self::Literal(Value::from(number))
    }
}

impl From<AttrRef> for AttributeValue {
    fn from(reference: AttrRef) -> Self {
        Self::Reference(reference)
    }
}

impl From<Vec<AttributeValue>> for AttributeValue {
    fn from(items: Vec<AttributeValue>) -> Self {
        Self::List(items)
    }
}
