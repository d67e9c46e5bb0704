//! Resolved attribute values.
//!
//! After resolution every attribute is either [`Resolved::Known`] or
//! [`Resolved::Deferred`]: its value depends on an attribute that only exists
//! once some resource is realized. Deferred values keep their structure so
//! they can be composed further; they become text only when rendered into a
//! plan.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Stable identity of a not-yet-realized attribute, `<address>.<attribute>`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Placeholder {
    /// Address of the owning node, e.g. `aws_lb.alb`
    pub address: String,
    /// Attribute name
    pub attribute: String,
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.address, self.attribute)
    }
}

/// A value built on top of at least one placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum Deferred {
    /// A computed attribute itself
    Attribute(Placeholder),
    /// String concatenation of known text and deferred parts
    Interpolation(Vec<Resolved>),
    /// List with at least one deferred item
    List(Vec<Resolved>),
    /// Block with at least one deferred entry
    Map(BTreeMap<String, Resolved>),
    /// JSON text of a deferred value
    JsonEncode(Box<Resolved>),
    /// One element of a deferred string split on a separator
    Element {
        /// The string to split
        source: Box<Resolved>,
        /// Separator
        separator: String,
        /// Zero-based index
        index: usize,
    },
}

/// A fully evaluated attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    /// Value known at synthesis time
    Known(Value),
    /// Value known only after realization
    Deferred(Deferred),
}

impl Resolved {
    /// A known string.
    pub fn string(text: impl Into<String>) -> Self {
        Self::Known(Value::String(text.into()))
    }

    /// True when no placeholder is involved.
    #[must_use]
    pub const fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }

    /// Render into plan JSON.
    ///
    /// Known values render unchanged, lists and blocks render element-wise,
    /// and every other deferred form renders as text containing
    /// `${...}` tokens.
    #[must_use]
    pub fn render(&self) -> Value {
        match self {
            Self::Known(value) => value.clone(),
            Self::Deferred(Deferred::List(items)) => Value::Array(items.iter().map(Self::render).collect()),
            Self::Deferred(Deferred::Map(entries)) => {
                Value::Object(entries.iter().map(|(k, v)| (k.clone(), v.render())).collect())
            }
            Self::Deferred(_) => Value::String(self.render_text()),
        }
    }

    /// Render as text embedded in a larger string.
    #[must_use]
    pub fn render_text(&self) -> String {
        match self {
            Self::Known(value) => stringify(value),
            Self::Deferred(deferred) => match deferred {
                Deferred::Attribute(placeholder) => format!("${{{placeholder}}}"),
                Deferred::Interpolation(parts) => parts.iter().map(Self::render_text).collect(),
                Deferred::List(_) | Deferred::Map(_) => self.render().to_string(),
                Deferred::JsonEncode(inner) => inner.render().to_string(),
                Deferred::Element {
                    source,
                    separator,
                    index,
                } => {
                    format!("${{element(split({}, {}), {index})}}", Value::from(separator.as_str()), source.expression())
                }
            },
        }
    }

    /// Render as an expression operand: a bare placeholder for computed
    /// attributes, a quoted string otherwise.
    fn expression(&self) -> String {
        match self {
            Self::Deferred(Deferred::Attribute(placeholder)) => placeholder.to_string(),
            other => Value::String(other.render_text()).to_string(),
        }
    }
}

/// Stringify a known value for concatenation.
///
/// Strings are used verbatim, numbers and booleans via their display form,
/// null as the empty string, arrays and objects as compact JSON.
#[must_use]
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}
