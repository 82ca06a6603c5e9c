//! Call extraction
//!
//! Pulls the scriptlet calls out of a classified scriptlet rule, or the
//! redirect directive out of a network rule.

use std::ops::Range;

use rb_core::error::Error;
use rb_core::types::{
    ContentType, Dialect, RedirectDirective, RedirectModifier, RuleKind, ScriptletCall,
};

use crate::detector::{is_cosmetic, parse_modifiers, ublock_marker_regex, Modifiers};
use crate::tokenizer::{find_call_parens, split_args, split_commands, split_words, SyntaxError};

/// A scriptlet rule split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedScriptletRule<'a> {
    /// Domain list before the marker, verbatim.
    pub domains: &'a str,
    pub exception: bool,
    /// One call, except for snippet filters bundling several commands.
    pub calls: Vec<ScriptletCall>,
}

/// A network rule carrying a redirect option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRedirectRule<'a> {
    pub text: &'a str,
    pub exception: bool,
    pub directive: RedirectDirective,
    /// Byte range of the redirect option within `text`.
    pub range: Range<usize>,
    pub modifiers: Modifiers<'a>,
}

fn syntax_error(text: &str) -> impl FnOnce(SyntaxError) -> Error + '_ {
    move |e| Error::invalid_syntax(e.reason(), text)
}

// =============================================================================
// Scriptlet Rules
// =============================================================================

/// Extract every call of a scriptlet rule written in `dialect`.
///
/// `kind` selects the apply or exception marker. Redirect kinds are not
/// scriptlet rules.
pub fn extract_calls(text: &str, dialect: Dialect, kind: RuleKind) -> Result<ParsedScriptletRule<'_>, Error> {
    let exception = match kind {
        RuleKind::ScriptletApply => false,
        RuleKind::ScriptletException => true,
        RuleKind::RedirectApply | RuleKind::RedirectException => return Err(Error::NotARule),
    };
    let text = text.trim();

    match dialect {
        Dialect::AdGuard => extract_adguard(text, exception),
        Dialect::UBlock => extract_ublock(text, exception),
        Dialect::AdblockPlus => extract_abp(text, exception),
    }
}

fn extract_adguard(text: &str, exception: bool) -> Result<ParsedScriptletRule<'_>, Error> {
    let marker = if exception {
        Dialect::AdGuard.scriptlet_exception_marker()
    } else {
        Dialect::AdGuard.scriptlet_marker()
    };
    let pos = text.find(marker).ok_or(Error::NotARule)?;
    let interior = find_call_parens(&text[pos + marker.len()..]).map_err(syntax_error(text))?;
    let tokens = split_args(interior).map_err(syntax_error(text))?;

    if tokens.iter().any(|t| !t.quoted) {
        return Err(Error::invalid_syntax("unquoted argument", text));
    }
    let call = call_from_values(text, tokens.into_iter().map(|t| t.value))?;

    Ok(ParsedScriptletRule {
        domains: &text[..pos],
        exception,
        calls: vec![call],
    })
}

fn extract_ublock(text: &str, exception: bool) -> Result<ParsedScriptletRule<'_>, Error> {
    let found = ublock_marker_regex()
        .and_then(|re| re.find(text))
        .ok_or(Error::NotARule)?;
    if found.as_str().contains('@') != exception {
        return Err(Error::NotARule);
    }
    let interior = find_call_parens(&text[found.end()..]).map_err(syntax_error(text))?;
    let tokens = split_args(interior).map_err(syntax_error(text))?;
    let call = call_from_values(text, tokens.into_iter().map(|t| t.value))?;

    Ok(ParsedScriptletRule {
        domains: &text[..found.start()],
        exception,
        calls: vec![call],
    })
}

fn extract_abp(text: &str, exception: bool) -> Result<ParsedScriptletRule<'_>, Error> {
    let marker = if exception {
        Dialect::AdblockPlus.scriptlet_exception_marker()
    } else {
        Dialect::AdblockPlus.scriptlet_marker()
    };
    let pos = text.find(marker).ok_or(Error::NotARule)?;
    let body = &text[pos + marker.len()..];

    let mut calls = Vec::new();
    for command in split_commands(body).map_err(syntax_error(text))? {
        let words = split_words(command).map_err(syntax_error(text))?;
        calls.push(call_from_values(text, words.into_iter())?);
    }
    if calls.is_empty() {
        return Err(Error::invalid_syntax("empty snippet", text));
    }

    Ok(ParsedScriptletRule {
        domains: &text[..pos],
        exception,
        calls,
    })
}

/// First value is the name, the rest are arguments.
fn call_from_values(text: &str, mut values: impl Iterator<Item = String>) -> Result<ScriptletCall, Error> {
    let name = values.next().map(|n| n.trim().to_string()).unwrap_or_default();
    if name.is_empty() {
        return Err(Error::invalid_syntax("empty name", text));
    }
    Ok(ScriptletCall::new(name, values.collect()))
}

// =============================================================================
// Redirect Rules
// =============================================================================

/// Extract the redirect directive of a network rule.
pub fn extract_redirect(text: &str) -> Result<ParsedRedirectRule<'_>, Error> {
    let text = text.trim();
    if is_cosmetic(text) {
        return Err(Error::NotARule);
    }
    let modifiers = parse_modifiers(text).ok_or(Error::NotARule)?;

    let (item, modifier, name) = modifiers
        .items
        .iter()
        .find_map(|item| {
            RedirectModifier::strip(item.text)
                .filter(|(_, name)| !name.is_empty())
                .map(|(modifier, name)| (*item, modifier, name))
        })
        .ok_or(Error::NotARule)?;

    let mut content_types = ContentType::empty();
    let mut excluded_types = ContentType::empty();
    for m in &modifiers.items {
        let option = m.text.trim();
        let (set, name) = match option.strip_prefix('~') {
            Some(negated) => (&mut excluded_types, negated),
            None => (&mut content_types, option),
        };
        if let Some(flag) = ContentType::from_modifier(name) {
            *set |= flag;
        }
    }

    Ok(ParsedRedirectRule {
        text,
        exception: text.starts_with("@@"),
        directive: RedirectDirective {
            name: name.to_string(),
            modifier,
            content_types,
            excluded_types,
        },
        range: item.start..item.end(),
        modifiers,
    })
}
