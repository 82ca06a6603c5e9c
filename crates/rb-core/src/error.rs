//! Error types shared across RuleBridge crates.

use crate::types::{Dialect, NameKind};

/// Outcome of a failed classification, extraction, lookup or conversion.
///
/// None of these abort list processing: callers skip the rule and continue.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The text is not a rule of the requested kind or dialect.
    #[error("Not a recognized rule")]
    NotARule,
    /// Marker present but the call structure is malformed.
    #[error("Invalid syntax ({reason}): {text}")]
    InvalidSyntax { reason: &'static str, text: String },
    /// The name has no compatibility entry for the dialect it was read from.
    #[error("Unknown {kind} name for {dialect}: {name}")]
    NotFound {
        name: String,
        dialect: Dialect,
        kind: NameKind,
    },
    #[error(transparent)]
    Conversion(#[from] ConversionError),
}

impl Error {
    pub fn invalid_syntax(reason: &'static str, text: impl Into<String>) -> Self {
        Self::InvalidSyntax {
            reason,
            text: text.into(),
        }
    }

    pub fn not_found(name: impl Into<String>, dialect: Dialect, kind: NameKind) -> Self {
        Self::NotFound {
            name: name.into(),
            dialect,
            kind,
        }
    }

    pub fn is_not_a_rule(&self) -> bool {
        matches!(self, Self::NotARule)
    }

    /// `NotARule` and `NotFound` are the frequent, unremarkable outcomes.
    pub fn is_expected(&self) -> bool {
        matches!(self, Self::NotARule | Self::NotFound { .. })
    }
}

/// A rule that parsed and resolved but cannot be written in the target dialect.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversionError {
    #[error("No equivalent {kind} name in {dialect} for {name}")]
    NoEquivalentName {
        name: String,
        dialect: Dialect,
        kind: NameKind,
    },
    #[error("Content type required but absent and indeterminable: {rule}")]
    ContentTypeRequired { rule: String },
    #[error("{feature} is not supported by {dialect}: {rule}")]
    Unsupported {
        feature: &'static str,
        dialect: Dialect,
        rule: String,
    },
}

/// Error type for compatibility table loading.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("Malformed compatibility table: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Empty canonical name in {0} table")]
    EmptyCanonical(NameKind),
    #[error("Scriptlet not in catalog: {0}")]
    UnknownScriptlet(String),
    #[error("Duplicate {kind} entry: {canonical}")]
    DuplicateEntry { kind: NameKind, canonical: String },
    #[error("Unknown content type '{content_type}' for redirect {canonical}")]
    UnknownContentType {
        canonical: String,
        content_type: String,
    },
}

/// Failure to parse one of the small string enums (`Dialect`, `NameKind`).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown {what}: {value}")]
pub struct ParseEnumError {
    pub what: &'static str,
    pub value: String,
}

impl ParseEnumError {
    pub fn new(what: &'static str, value: &str) -> Self {
        Self {
            what,
            value: value.to_string(),
        }
    }
}
