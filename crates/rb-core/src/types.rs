//! Core type definitions for RuleBridge
//!
//! These types describe a filter rule after classification and are shared by
//! the converter, the wasm bindings and the CLI.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::ParseEnumError;

// =============================================================================
// Dialects
// =============================================================================

/// Filter-rule syntax family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Dialect {
    /// `example.org#%#//scriptlet('name', 'arg')`
    AdGuard = 0,
    /// `example.org##+js(name, arg)`
    UBlock = 1,
    /// `example.org#$#name arg; name2 arg`
    AdblockPlus = 2,
}

impl Dialect {
    pub const ALL: [Dialect; 3] = [Self::AdGuard, Self::UBlock, Self::AdblockPlus];

    /// Index into per-dialect lookup arrays.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Short identifier used in the compatibility table and on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AdGuard => "adg",
            Self::UBlock => "ubo",
            Self::AdblockPlus => "abp",
        }
    }

    /// Marker that introduces a scriptlet call when the rule is written.
    pub fn scriptlet_marker(self) -> &'static str {
        match self {
            Self::AdGuard => "#%#//scriptlet",
            Self::UBlock => "##+js",
            Self::AdblockPlus => "#$#",
        }
    }

    /// Marker for the exception (disabling) form of a scriptlet rule.
    pub fn scriptlet_exception_marker(self) -> &'static str {
        match self {
            Self::AdGuard => "#@%#//scriptlet",
            Self::UBlock => "#@#+js",
            Self::AdblockPlus => "#@$#",
        }
    }

    /// uBO needs an explicit content type on every redirect rule.
    pub fn requires_content_type(self) -> bool {
        self == Self::UBlock
    }

    /// Prefix AdGuard puts in front of this dialect's names to expose its
    /// compatibility aliases (`ubo-set-constant.js`, `abp-log`).
    pub fn adguard_alias_prefix(self) -> &'static str {
        match self {
            Self::AdGuard => "",
            Self::UBlock => "ubo-",
            Self::AdblockPlus => "abp-",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AdGuard => "AdGuard",
            Self::UBlock => "uBlock Origin",
            Self::AdblockPlus => "Adblock Plus",
        };
        f.write_str(name)
    }
}

impl FromStr for Dialect {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "adg" | "adguard" => Ok(Self::AdGuard),
            "ubo" | "ublock" | "ublock-origin" => Ok(Self::UBlock),
            "abp" | "adblockplus" | "adblock-plus" => Ok(Self::AdblockPlus),
            _ => Err(ParseEnumError::new("dialect", s)),
        }
    }
}

// =============================================================================
// Rule Kinds
// =============================================================================

/// What a recognized rule does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RuleKind {
    ScriptletApply,
    ScriptletException,
    RedirectApply,
    RedirectException,
}

impl RuleKind {
    pub fn is_exception(self) -> bool {
        matches!(self, Self::ScriptletException | Self::RedirectException)
    }

    pub fn name_kind(self) -> NameKind {
        match self {
            Self::ScriptletApply | Self::ScriptletException => NameKind::Scriptlet,
            Self::RedirectApply | Self::RedirectException => NameKind::Redirect,
        }
    }
}

/// Result of classifying a raw rule line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RuleClassification {
    /// Comments, cosmetic rules and anything else this crate does not convert.
    NotARule,
    Rule { dialect: Dialect, kind: RuleKind },
}

impl RuleClassification {
    pub fn is_rule(&self) -> bool {
        matches!(self, Self::Rule { .. })
    }

    pub fn dialect(&self) -> Option<Dialect> {
        match self {
            Self::Rule { dialect, .. } => Some(*dialect),
            Self::NotARule => None,
        }
    }

    pub fn kind(&self) -> Option<RuleKind> {
        match self {
            Self::Rule { kind, .. } => Some(*kind),
            Self::NotARule => None,
        }
    }
}

/// Which namespace a name is looked up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NameKind {
    Scriptlet,
    Redirect,
}

impl fmt::Display for NameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scriptlet => f.write_str("scriptlet"),
            Self::Redirect => f.write_str("redirect"),
        }
    }
}

impl FromStr for NameKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scriptlet" | "snippet" => Ok(Self::Scriptlet),
            "redirect" | "resource" => Ok(Self::Redirect),
            _ => Err(ParseEnumError::new("name kind", s)),
        }
    }
}

// =============================================================================
// Scriptlet Calls
// =============================================================================

/// A scriptlet invocation extracted from a rule.
///
/// `args` are fully unescaped: separators and quotes are in literal form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ScriptletCall {
    pub name: String,
    pub args: Vec<String>,
}

impl ScriptletCall {
    pub fn new(name: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }
}

// =============================================================================
// Content Types (bit mask for redirect rules)
// =============================================================================

bitflags::bitflags! {
    /// Request types a redirect rule applies to.
    ///
    /// Declaration order is the order used when a list is written out.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ContentType: u16 {
        const IMAGE = 1 << 0;
        const MEDIA = 1 << 1;
        const SUBDOCUMENT = 1 << 2;
        const STYLESHEET = 1 << 3;
        const SCRIPT = 1 << 4;
        const XMLHTTPREQUEST = 1 << 5;
        const OTHER = 1 << 6;
        const OBJECT = 1 << 7;
        const FONT = 1 << 8;
        const PING = 1 << 9;
        const WEBSOCKET = 1 << 10;
    }
}

const MODIFIER_NAMES: [(ContentType, &str); 11] = [
    (ContentType::IMAGE, "image"),
    (ContentType::MEDIA, "media"),
    (ContentType::SUBDOCUMENT, "subdocument"),
    (ContentType::STYLESHEET, "stylesheet"),
    (ContentType::SCRIPT, "script"),
    (ContentType::XMLHTTPREQUEST, "xmlhttprequest"),
    (ContentType::OTHER, "other"),
    (ContentType::OBJECT, "object"),
    (ContentType::FONT, "font"),
    (ContentType::PING, "ping"),
    (ContentType::WEBSOCKET, "websocket"),
];

impl ContentType {
    /// Parse a single `$` option name into a content type.
    pub fn from_modifier(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "image" => Some(Self::IMAGE),
            "media" => Some(Self::MEDIA),
            "subdocument" | "frame" => Some(Self::SUBDOCUMENT),
            "stylesheet" | "css" => Some(Self::STYLESHEET),
            "script" => Some(Self::SCRIPT),
            "xmlhttprequest" | "xhr" => Some(Self::XMLHTTPREQUEST),
            "other" => Some(Self::OTHER),
            "object" => Some(Self::OBJECT),
            "font" => Some(Self::FONT),
            "ping" | "beacon" => Some(Self::PING),
            "websocket" => Some(Self::WEBSOCKET),
            _ => None,
        }
    }

    /// Canonical option name of a single flag.
    pub fn modifier_name(self) -> Option<&'static str> {
        MODIFIER_NAMES
            .iter()
            .find(|(flag, _)| *flag == self)
            .map(|(_, name)| *name)
    }

    /// Option names of every flag in the set, in declaration order.
    pub fn modifier_names(self) -> Vec<&'static str> {
        self.iter().filter_map(Self::modifier_name).collect()
    }
}

// =============================================================================
// Redirect Directives
// =============================================================================

/// Option token that names a redirect resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RedirectModifier {
    /// `$redirect=` - block and redirect
    Redirect,
    /// `$redirect-rule=` - redirect only if another rule blocks
    RedirectRule,
    /// `$rewrite=abp-resource:`
    AbpRewrite,
}

impl RedirectModifier {
    pub const ALL: [RedirectModifier; 3] = [Self::Redirect, Self::RedirectRule, Self::AbpRewrite];

    /// Text that precedes the resource name inside the option list.
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Redirect => "redirect=",
            Self::RedirectRule => "redirect-rule=",
            Self::AbpRewrite => "rewrite=abp-resource:",
        }
    }

    /// Match an option token, returning the modifier and the resource name.
    pub fn strip(option: &str) -> Option<(Self, &str)> {
        Self::ALL
            .iter()
            .find_map(|m| option.strip_prefix(m.prefix()).map(|name| (*m, name)))
    }
}

/// A redirect resource reference extracted from a network rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RedirectDirective {
    pub name: String,
    pub modifier: RedirectModifier,
    /// Content types listed (not negated) in the rule's options.
    pub content_types: ContentType,
    /// Content types the rule negates with `~`.
    pub excluded_types: ContentType,
}
