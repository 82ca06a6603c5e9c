//! RuleBridge Core Library
//!
//! Shared data model for converting scriptlet and redirect rules between the
//! AdGuard, uBlock Origin and Adblock Plus filter dialects.
//!
//! # Modules
//!
//! - `types`: Dialects, rule classifications, content types and redirect directives
//! - `catalog`: Every known scriptlet with its parameter list
//! - `compat`: Compatibility table mapping canonical names to per-dialect aliases
//! - `error`: Error types shared by the converter, wasm bindings and CLI

pub mod catalog;
pub mod compat;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use catalog::{ResolvedCall, Scriptlet};
pub use compat::{CompatibilityTable, Entry};
pub use error::{ConversionError, Error, TableError};
pub use types::{
    ContentType, Dialect, NameKind, RedirectDirective, RedirectModifier, RuleClassification,
    RuleKind, ScriptletCall,
};

pub type Result<T> = std::result::Result<T, Error>;
