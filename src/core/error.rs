//! Error handling for stacksynth
//!
//! This module provides the error taxonomy of a synthesis run and the
//! user-friendly reporting used by the CLI. The error system follows two rules:
//! 1. **Strongly-typed errors** so callers (and tests) can match on the exact
//!    failure kind
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Architecture
//!
//! - [`SynthError`] - Enumerated error types for every fatal synthesis failure
//! - [`ErrorContext`] - Wrapper that adds details and suggestions for display
//!
//! # Error Categories
//!
//! - **Configuration**: [`SynthError::ConfigError`]
//! - **Graph construction**: [`SynthError::DuplicateNode`], [`SynthError::DuplicateOutput`]
//! - **Resolution**: [`SynthError::ReferenceError`], [`SynthError::InvalidExpression`]
//! - **Ordering**: [`SynthError::CycleError`]
//! - **I/O and formats**: [`SynthError::Io`], [`SynthError::Toml`], [`SynthError::Json`],
//!   [`SynthError::Yaml`]
//!
//! Synthesis is atomic: any of these aborts the run before a plan exists.
//!
//! # Examples
//!
//! ```rust,no_run
//! use stacksynth::core::{SynthError, user_friendly_error};
//!
//! let error = SynthError::CycleError {
//!     nodes: vec!["a".to_string(), "b".to_string()],
//! };
//! let ctx = user_friendly_error(anyhow::Error::from(error));
//! ctx.display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for synthesis runs.
///
/// Each variant names one fatal failure mode. None of them is retried: the
/// run stops at the first error and no plan artifact is produced.
#[derive(Error, Debug)]
pub enum SynthError {
    /// A variable could not be resolved.
    ///
    /// Raised when an override cannot be coerced to the declared type, when a
    /// variable without default receives no override, when an override names
    /// an undeclared variable, or when a derived value is out of range.
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration problem
        message: String,
        /// Close matches among declared variable names
        similar: Vec<String>,
    },

    /// Two nodes were declared with the same id.
    #[error("Duplicate node id '{id}': already declared as {existing}")]
    DuplicateNode {
        /// The colliding node id
        id: String,
        /// Address of the node that claimed the id first
        existing: String,
    },

    /// Two outputs were declared with the same name.
    #[error("Duplicate output '{name}'")]
    DuplicateOutput {
        /// The colliding output name
        name: String,
    },

    /// A reference names a node or attribute that does not exist.
    ///
    /// # Fields
    /// - `reference`: the reference as written, `node.attribute`
    /// - `referrer`: where the reference appears (node attribute, tag, or output)
    /// - `reason`: which half of the reference is missing
    #[error("Unresolvable reference '{reference}' in {referrer}: {reason}")]
    ReferenceError {
        /// The offending reference, rendered as `node.attribute`
        reference: String,
        /// Location of the reference
        referrer: String,
        /// Why the reference cannot resolve
        reason: String,
        /// Close matches among declared node ids or attribute names
        similar: Vec<String>,
    },

    /// The dependency relation contains a cycle.
    ///
    /// `nodes` lists the participating node ids in cycle order; the display
    /// closes the chain back to the first id.
    #[error("Circular dependency detected: {}", format_cycle(.nodes))]
    CycleError {
        /// Node ids participating in the cycle
        nodes: Vec<String>,
    },

    /// An expression was evaluated against a known value it cannot accept.
    #[error("Invalid expression in {location}: {reason}")]
    InvalidExpression {
        /// Node attribute or output holding the expression
        location: String,
        /// What went wrong during evaluation
        reason: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl SynthError {
    /// Shorthand for a [`SynthError::ConfigError`] without suggestions.
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
            similar: Vec::new(),
        }
    }
}

fn format_cycle(nodes: &[String]) -> String {
    match nodes.first() {
        Some(first) => {
            let mut chain = nodes.to_vec();
            chain.push(first.clone());
            chain.join(" → ")
        }
        None => String::from("(empty)"),
    }
}

/// Error context wrapper that provides user-friendly error information.
///
/// Wraps a [`SynthError`] with optional details and a suggestion. When
/// displayed, the error is shown in red, details in yellow and the suggestion
/// in green.
///
/// ```rust,no_run
/// use stacksynth::core::{ErrorContext, SynthError};
///
/// let context = ErrorContext::new(SynthError::config("bad port"))
///     .with_suggestion("Pass --var containerPort=8080")
///     .with_details("containerPort must be an integer between 1 and 65535");
/// context.display();
/// ```
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: SynthError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no details or suggestion.
    #[must_use]
    pub const fn new(error: SynthError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error context to stderr with terminal colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

/// Convert any error into a user-friendly [`ErrorContext`].
///
/// Typed [`SynthError`]s get tailored suggestions. Anything else is reported
/// with its full `anyhow` cause chain so wrapped context is not lost.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let is_typed_root =
        error.chain().next().is_some_and(|cause| cause.downcast_ref::<SynthError>().is_some());

    // The typed error may sit below `.context(..)` layers added by the CLI
    if let Some(typed) = error.chain().find_map(|cause| cause.downcast_ref::<SynthError>()) {
        let mut ctx = create_error_context(clone_for_display(typed));
        if matches!(typed, SynthError::Toml(_)) {
            ctx = ctx
                .with_suggestion("Check the TOML syntax of the variable file: one `name = value` per line")
                .with_details("Variable files are flat TOML tables keyed by variable name");
        }
        if is_typed_root {
            return ctx;
        }
        let outer = error.to_string();
        let details = match ctx.details {
            Some(details) => format!("{outer}. {details}"),
            None => outer,
        };
        return ErrorContext {
            details: Some(details),
            ..ctx
        };
    }

    let mut message = error.to_string();
    let chain: Vec<String> = error.chain().skip(1).map(ToString::to_string).collect();
    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(SynthError::config(message))
}

/// Rebuild a borrowed error for display.
///
/// Source errors (`io`, `toml`, ...) are not `Clone`; they are flattened into
/// a configuration message carrying their text.
fn clone_for_display(error: &SynthError) -> SynthError {
    match error {
        SynthError::ConfigError {
            message,
            similar,
        } => SynthError::ConfigError {
            message: message.clone(),
            similar: similar.clone(),
        },
        SynthError::DuplicateNode {
            id,
            existing,
        } => SynthError::DuplicateNode {
            id: id.clone(),
            existing: existing.clone(),
        },
        SynthError::DuplicateOutput {
            name,
        } => SynthError::DuplicateOutput {
            name: name.clone(),
        },
        SynthError::ReferenceError {
            reference,
            referrer,
            reason,
            similar,
        } => SynthError::ReferenceError {
            reference: reference.clone(),
            referrer: referrer.clone(),
            reason: reason.clone(),
            similar: similar.clone(),
        },
        SynthError::CycleError {
            nodes,
        } => SynthError::CycleError {
            nodes: nodes.clone(),
        },
        SynthError::InvalidExpression {
            location,
            reason,
        } => SynthError::InvalidExpression {
            location: location.clone(),
            reason: reason.clone(),
        },
        other => SynthError::config(other.to_string()),
    }
}

fn did_you_mean(similar: &[String]) -> Option<String> {
    if similar.is_empty() {
        None
    } else {
        let quoted: Vec<String> = similar.iter().map(|s| format!("'{s}'")).collect();
        Some(format!("Did you mean {}?", quoted.join(" or ")))
    }
}

/// Map each [`SynthError`] variant to an [`ErrorContext`] with suggestions.
fn create_error_context(error: SynthError) -> ErrorContext {
    match &error {
        SynthError::ConfigError {
            similar,
            ..
        } => {
            let suggestion = did_you_mean(similar).unwrap_or_else(|| {
                "Check --var, --var-file and STACKSYNTH_VAR_* values against the declared variables (see 'stacksynth vars')".to_string()
            });
            ErrorContext::new(error)
                .with_suggestion(suggestion)
                .with_details("Variables are resolved once before graph construction; any bad value aborts the run")
        }

        SynthError::DuplicateNode {
            id,
            ..
        } => {
            let details = format!("Node ids are unique within a run; '{id}' was declared twice");
            ErrorContext::new(error)
                .with_suggestion("Rename one of the declarations so every node id is unique")
                .with_details(details)
        }

        SynthError::DuplicateOutput {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Give every output a distinct name"),

        SynthError::ReferenceError {
            similar,
            ..
        } => {
            let suggestion = did_you_mean(similar).unwrap_or_else(|| {
                "Declare the referenced node, or reference an attribute it declares".to_string()
            });
            ErrorContext::new(error)
                .with_suggestion(suggestion)
                .with_details("Every reference must name an existing node and an attribute that node declares")
        }

        SynthError::CycleError {
            nodes,
        } => {
            let details = format!(
                "Nodes {} depend on each other; no deployment order can satisfy them",
                nodes.join(", ")
            );
            ErrorContext::new(error)
                .with_suggestion("Break the cycle by removing one of the references between these nodes")
                .with_details(details)
        }

        SynthError::InvalidExpression {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Check the separator and index of element expressions against the value they split"),

        _ => ErrorContext::new(error),
    }
}
