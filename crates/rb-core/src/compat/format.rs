//! Compatibility table file format.
//!
//! ```json
//! {
//!   "scriptlets": [
//!     { "canonical": "set-constant",
//!       "aliases": { "adg": ["set-constant"], "ubo": ["set-constant.js", "set.js"] },
//!       "values": { "ubo": { "emptyArr": "[]" } } }
//!   ],
//!   "redirects": [
//!     { "canonical": "noopjs",
//!       "aliases": { "adg": ["noopjs"], "ubo": ["noop.js"], "abp": ["blank-js"] },
//!       "content_types": ["script"] }
//!   ]
//! }
//! ```
//!
//! The first alias of a dialect is the name written when converting into that
//! dialect. Later aliases are only read.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::Dialect;

/// Table shipped with the crate.
pub const EMBEDDED_TABLE: &str = include_str!("../../data/compatibility-table.json");

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableFile {
    #[serde(default)]
    pub scriptlets: Vec<Record>,
    #[serde(default)]
    pub redirects: Vec<Record>,
}

/// One row of the table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub canonical: String,
    #[serde(default)]
    pub aliases: PerDialect<Vec<String>>,
    /// Redirects only: request types the resource can stand in for.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content_types: Vec<String>,
    /// Redirects only: uBO accepts the resource without a content type.
    #[serde(default, skip_serializing_if = "is_false")]
    pub content_type_optional: bool,
    /// Scriptlets only: argument values rewritten when converting from the
    /// AdGuard-native name into the keyed dialect.
    #[serde(default)]
    pub values: PerDialect<BTreeMap<String, String>>,
}

/// A value for each dialect, serialized under its short identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerDialect<T> {
    #[serde(default)]
    pub adg: T,
    #[serde(default)]
    pub ubo: T,
    #[serde(default)]
    pub abp: T,
}

impl<T> PerDialect<T> {
    pub fn get(&self, dialect: Dialect) -> &T {
        match dialect {
            Dialect::AdGuard => &self.adg,
            Dialect::UBlock => &self.ubo,
            Dialect::AdblockPlus => &self.abp,
        }
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}
