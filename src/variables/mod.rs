//! Typed configuration variables with defaults and layered overrides.
//!
//! A synthesis run starts by declaring its variables in a [`VariableTable`]
//! and resolving them exactly once against the caller's [`Overrides`]. The
//! result, [`ResolvedVariables`], is immutable: graph construction reads from
//! it and nothing writes back.
//!
//! # Override precedence
//!
//! Overrides record where they came from ([`ValueSource`]). When the same
//! variable is overridden twice, the higher source wins:
//!
//! | Source | Example |
//! |--------|---------|
//! | [`ValueSource::Default`] | declared default |
//! | [`ValueSource::Environment`] | `STACKSYNTH_VAR_env=prod` |
//! | [`ValueSource::File`] | `env = "prod"` in a `--var-file` |
//! | [`ValueSource::Flag`] | `--var env=prod` |
//!
//! # Coercion
//!
//! Flags and environment variables are always text, so values are coerced to
//! the declared type: `"8080"` becomes the number `8080` for a `number`
//! variable, while a TOML integer given for a `string` variable is
//! stringified. Anything that cannot be coerced is a
//! [`SynthError::ConfigError`].
//!
//! ```rust
//! use stacksynth::variables::{Overrides, ValueSource, VariableTable, VariableType, VariableValue};
//!
//! # fn example() -> stacksynth::core::SynthResult<()> {
//! let mut table = VariableTable::new();
//! table.define("containerPort", VariableType::Number, Some(VariableValue::from(3000_i64)))?;
//!
//! let mut overrides = Overrides::new();
//! overrides.insert_text("containerPort", "8080", ValueSource::Flag);
//!
//! let vars = table.resolve(&overrides)?;
//! assert_eq!(vars.number("containerPort")?.as_i64(), Some(8080));
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

use crate::core::{SynthError, SynthResult};
use crate::utils::similar_names;

/// Declared type of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableType {
    /// Free text
    String,
    /// Integer or floating point number
    Number,
    /// Map of string keys to string values
    Map,
}

impl fmt::Display for VariableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Map => "map<string,string>",
        };
        f.write_str(name)
    }
}

/// A typed variable value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariableValue {
    /// A string value
    String(String),
    /// A number, kept as JSON number so integers render without a fraction
    Number(serde_json::Number),
    /// A string-to-string map
    Map(BTreeMap<String, String>),
}

impl VariableValue {
    /// The type this value satisfies.
    #[must_use]
    pub const fn var_type(&self) -> VariableType {
        match self {
            Self::String(_) => VariableType::String,
            Self::Number(_) => VariableType::Number,
            Self::Map(_) => VariableType::Map,
        }
    }

    /// Convert into a JSON value for use as an attribute literal.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::Number(n) => serde_json::Value::Number(n.clone()),
            Self::Map(m) => serde_json::Value::Object(
                m.iter().map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone()))).collect(),
            ),
        }
    }
}

impl fmt::Display for VariableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
            Self::Map(m) => {
                let body = serde_json::to_string(m).map_err(|_| fmt::Error)?;
                f.write_str(&body)
            }
        }
    }
}

impl From<&str> for VariableValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for VariableValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for VariableValue {
    fn from(value: i64) -> Self {
        Self::Number(serde_json::Number::from(value))
    }
}

impl From<BTreeMap<String, String>> for VariableValue {
    fn from(value: BTreeMap<String, String>) -> Self {
        Self::Map(value)
    }
}

/// Where a resolved value came from, in increasing precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueSource {
    /// The declared default
    Default,
    /// A `STACKSYNTH_VAR_<name>` environment variable
    Environment,
    /// A `--var-file` TOML file
    File,
    /// A `--var name=value` flag
    Flag,
}

impl fmt::Display for ValueSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Default => "default",
            Self::Environment => "environment",
            Self::File => "file",
            Self::Flag => "flag",
        };
        f.write_str(name)
    }
}

/// A declared variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    /// Variable name, unique within a table
    pub name: String,
    /// Declared type; overrides are coerced to it
    pub var_type: VariableType,
    /// Human-readable description
    pub description: String,
    /// Default value; `None` makes the variable required
    pub default: Option<VariableValue>,
}

impl Variable {
    /// Attach a description.
    pub fn describe(&mut self, description: impl Into<String>) -> &mut Self {
        self.description = description.into();
        self
    }
}

/// A raw override before coercion.
#[derive(Debug, Clone, PartialEq)]
pub struct Override {
    /// The raw value as given by the caller
    pub value: toml::Value,
    /// Where the value came from
    pub source: ValueSource,
}

/// Caller-supplied overrides, merged by [`ValueSource`] precedence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    entries: BTreeMap<String, Override>,
}

impl Overrides {
    /// Create an empty override set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an override unless a higher-precedence one is already present.
    pub fn insert(&mut self, name: impl Into<String>, value: toml::Value, source: ValueSource) {
        let name = name.into();
        match self.entries.get(&name) {
            Some(existing) if existing.source > source => {
                debug!("Ignoring {source} override for '{name}': {} value takes precedence", existing.source);
            }
            _ => {
                self.entries.insert(
                    name,
                    Override {
                        value,
                        source,
                    },
                );
            }
        }
    }

    /// Record a textual override (flags and environment variables).
    pub fn insert_text(&mut self, name: impl Into<String>, value: impl Into<String>, source: ValueSource) {
        self.insert(name, toml::Value::String(value.into()), source);
    }

    /// Look up the winning override for a variable.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Override> {
        self.entries.get(name)
    }

    /// Iterate over overrides in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Override)> {
        self.entries.iter()
    }

    /// Number of overridden variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no override was supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A variable after resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedVariable {
    /// The coerced value
    pub value: VariableValue,
    /// Where the value came from
    pub source: ValueSource,
}

/// The frozen variable table consumed by graph construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResolvedVariables {
    values: BTreeMap<String, ResolvedVariable>,
}

impl ResolvedVariables {
    /// Look up a resolved variable.
    pub fn get(&self, name: &str) -> SynthResult<&ResolvedVariable> {
        self.values.get(name).ok_or_else(|| SynthError::ConfigError {
            message: format!("variable '{name}' is not declared"),
            similar: similar_names(name, self.values.keys()),
        })
    }

    /// Read a `string` variable.
    pub fn string(&self, name: &str) -> SynthResult<&str> {
        match &self.get(name)?.value {
            VariableValue::String(s) => Ok(s),
            other => Err(type_mismatch(name, VariableType::String, other.var_type())),
        }
    }

    /// Read a `number` variable.
    pub fn number(&self, name: &str) -> SynthResult<&serde_json::Number> {
        match &self.get(name)?.value {
            VariableValue::Number(n) => Ok(n),
            other => Err(type_mismatch(name, VariableType::Number, other.var_type())),
        }
    }

    /// Read a `map` variable.
    pub fn map(&self, name: &str) -> SynthResult<&BTreeMap<String, String>> {
        match &self.get(name)?.value {
            VariableValue::Map(m) => Ok(m),
            other => Err(type_mismatch(name, VariableType::Map, other.var_type())),
        }
    }

    /// Iterate over resolved variables in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ResolvedVariable)> {
        self.values.iter()
    }
}

fn type_mismatch(name: &str, wanted: VariableType, actual: VariableType) -> SynthError {
    SynthError::config(format!("variable '{name}' is a {actual}, not a {wanted}"))
}

/// Declared variables of a stack, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableTable {
    variables: Vec<Variable>,
}

impl VariableTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a variable.
    ///
    /// Fails when the name is already taken or the default does not match the
    /// declared type.
    pub fn define(
        &mut self,
        name: impl Into<String>,
        var_type: VariableType,
        default: Option<VariableValue>,
    ) -> SynthResult<&mut Variable> {
        let name = name.into();
        if self.find(&name).is_some() {
            return Err(SynthError::config(format!("variable '{name}' is declared twice")));
        }
        if let Some(value) = &default
            && value.var_type() != var_type
        {
            return Err(SynthError::config(format!(
                "default for variable '{name}' is a {}, but the variable is declared as {var_type}",
                value.var_type()
            )));
        }

        self.variables.push(Variable {
            name,
            var_type,
            description: String::new(),
            default,
        });
        let last = self.variables.len() - 1;
        Ok(&mut self.variables[last])
    }

    /// Find a declared variable by name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// Declared variables in declaration order.
    #[must_use]
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Apply overrides on top of defaults and coerce every value.
    ///
    /// Runs once per synthesis. Fails with [`SynthError::ConfigError`] for
    /// overrides naming undeclared variables, values that cannot be coerced,
    /// and required variables left without a value.
    pub fn resolve(&self, overrides: &Overrides) -> SynthResult<ResolvedVariables> {
        for (name, _) in overrides.iter() {
            if self.find(name).is_none() {
                return Err(SynthError::ConfigError {
                    message: format!("override for undeclared variable '{name}'"),
                    similar: similar_names(name, self.variables.iter().map(|v| &v.name)),
                });
            }
        }

        let mut values = BTreeMap::new();
        for variable in &self.variables {
            let resolved = match overrides.get(&variable.name) {
                Some(raw) => ResolvedVariable {
                    value: coerce(variable, &raw.value)?,
                    source: raw.source,
                },
                None => match &variable.default {
                    Some(default) => ResolvedVariable {
                        value: default.clone(),
                        source: ValueSource::Default,
                    },
                    None => {
                        return Err(SynthError::config(format!(
                            "required variable '{}' has no default and no override",
                            variable.name
                        )));
                    }
                },
            };
            debug!("Variable {} = {} ({})", variable.name, resolved.value, resolved.source);
            values.insert(variable.name.clone(), resolved);
        }

        Ok(ResolvedVariables {
            values,
        })
    }
}

fn coerce(variable: &Variable, raw: &toml::Value) -> SynthResult<VariableValue> {
    let fail = |detail: String| {
        SynthError::config(format!(
            "cannot use {detail} for variable '{}' of type {}",
            variable.name, variable.var_type
        ))
    };

    match variable.var_type {
        VariableType::String => scalar_text(raw)
            .map(VariableValue::String)
            .ok_or_else(|| fail(format!("a {}", raw.type_str()))),
        VariableType::Number => match raw {
            toml::Value::Integer(i) => Ok(VariableValue::Number(serde_json::Number::from(*i))),
            toml::Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(VariableValue::Number)
                .ok_or_else(|| fail(format!("'{f}'"))),
            toml::Value::String(s) => parse_number(s)
                .map(VariableValue::Number)
                .ok_or_else(|| fail(format!("'{s}'"))),
            other => Err(fail(format!("a {}", other.type_str()))),
        },
        VariableType::Map => match raw {
            toml::Value::Table(table) => {
                let mut map = BTreeMap::new();
                for (key, value) in table {
                    let text = scalar_text(value)
                        .ok_or_else(|| fail(format!("a nested {} under key '{key}'", value.type_str())))?;
                    map.insert(key.clone(), text);
                }
                Ok(VariableValue::Map(map))
            }
            toml::Value::String(s) => {
                let parsed: BTreeMap<String, serde_json::Value> = serde_json::from_str(s)
                    .map_err(|e| fail(format!("'{s}' (expected a JSON object: {e})")))?;
                let mut map = BTreeMap::new();
                for (key, value) in parsed {
                    let text = match value {
                        serde_json::Value::String(s) => s,
                        serde_json::Value::Number(n) => n.to_string(),
                        serde_json::Value::Bool(b) => b.to_string(),
                        other => return Err(fail(format!("a non-scalar value under key '{key}': {other}"))),
                    };
                    map.insert(key, text);
                }
                Ok(VariableValue::Map(map))
            }
            other => Err(fail(format!("a {}", other.type_str()))),
        },
    }
}

fn scalar_text(raw: &toml::Value) -> Option<String> {
    match raw {
        toml::Value::String(s) => Some(s.clone()),
        toml::Value::Integer(i) => Some(i.to_string()),
        toml::Value::Float(f) => Some(f.to_string()),
        toml::Value::Boolean(b) => Some(b.to_string()),
        _ => None,
    }
}

fn parse_number(text: &str) -> Option<serde_json::Number> {
    let text = text.trim();
    if let Ok(i) = text.parse::<i64>() {
        return Some(serde_json::Number::from(i));
    }
    text.parse::<f64>().ok().filter(|f| f.is_finite()).and_then(serde_json::Number::from_f64)
}
