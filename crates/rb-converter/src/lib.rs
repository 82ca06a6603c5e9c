//! RuleBridge Rule Converter
//!
//! Converts scriptlet and redirect rules between the AdGuard, uBlock Origin and
//! Adblock Plus dialects:
//!
//! raw text → `detector` (classify) → `extractor` (calls, via `tokenizer`)
//! → `resolver` (names) → `converter` (re-serialize) → output rules.

pub mod converter;
pub mod detector;
pub mod extractor;
pub mod list;
pub mod resolver;
pub mod tokenizer;

pub use converter::{convert_rule, Converter};
pub use detector::{classify, classify_with};
pub use extractor::{extract_calls, extract_redirect, ParsedRedirectRule, ParsedScriptletRule};
pub use list::{convert_filter_list, ConvertStats, ListConversion, ListOptions};
pub use resolver::{Resolution, Resolver};
pub use tokenizer::{split_args, Token};

use rb_core::types::{Dialect, NameKind};

/// Name accepted by the injection (AdGuard) dialect, per the embedded table.
pub fn is_valid_name(name: &str, kind: NameKind) -> bool {
    Resolver::global().is_valid_name(name, kind)
}

/// Redirect resource name for `to`, per the embedded table.
pub fn resolve_redirect_name(name: &str, from: Dialect, to: Dialect) -> rb_core::Result<String> {
    Resolver::global().resolve_redirect_name(name, from, to)
}
