//! Dialect converter
//!
//! Rewrites a whole rule from one dialect into another. The domain or URL
//! pattern part is copied verbatim and only the call or the redirect option is
//! re-serialized.

use rb_core::compat::{CompatibilityTable, Entry};
use rb_core::error::{ConversionError, Error};
use rb_core::types::{
    ContentType, Dialect, NameKind, RedirectModifier, RuleClassification, RuleKind, ScriptletCall,
};

use crate::detector::{classify_with, is_comment};
use crate::extractor::{extract_calls, extract_redirect};
use crate::resolver::{is_adguard_native, Resolver};
use crate::tokenizer::quote_with;

/// Rule converter bound to a compatibility table.
#[derive(Debug, Clone, Copy)]
pub struct Converter<'t> {
    resolver: Resolver<'t>,
}

impl Converter<'static> {
    /// Converter over the embedded table.
    pub fn global() -> Self {
        Self::new(CompatibilityTable::global())
    }
}

impl<'t> Converter<'t> {
    pub fn new(table: &'t CompatibilityTable) -> Self {
        Self {
            resolver: Resolver::new(table),
        }
    }

    pub fn resolver(&self) -> &Resolver<'t> {
        &self.resolver
    }

    pub fn classify(&self, text: &str) -> RuleClassification {
        classify_with(text, self.resolver.table())
    }

    /// Convert one rule written in `from` into `to`.
    ///
    /// Comments pass through unchanged. Anything that is not a scriptlet or
    /// redirect rule of `from` is `NotARule`. Snippet filters bundling several
    /// commands produce one rule per command.
    pub fn convert_rule(&self, text: &str, from: Dialect, to: Dialect) -> Result<Vec<String>, Error> {
        if is_comment(text) {
            return Ok(vec![text.to_string()]);
        }

        let (dialect, kind) = match self.classify(text) {
            RuleClassification::Rule { dialect, kind } => (dialect, kind),
            RuleClassification::NotARule => return Err(Error::NotARule),
        };
        if !accepts_source(dialect, from, kind) {
            return Err(Error::NotARule);
        }

        match kind.name_kind() {
            NameKind::Scriptlet => self.convert_scriptlet(text, from, to, kind),
            NameKind::Redirect => self.convert_redirect(text, from, to).map(|rule| vec![rule]),
        }
    }

    fn convert_scriptlet(&self, text: &str, from: Dialect, to: Dialect, kind: RuleKind) -> Result<Vec<String>, Error> {
        let parsed = extract_calls(text, from, kind)?;
        let mut rules = Vec::with_capacity(parsed.calls.len());

        for call in &parsed.calls {
            if from == Dialect::AdGuard {
                self.resolver.resolve_call(call, from)?;
            }
            let resolution = self
                .resolver
                .resolve_name(&call.name, from, to, NameKind::Scriptlet)?;
            let args = target_args(call, resolution.entry, from, to);
            rules.push(format_scriptlet(
                parsed.domains,
                parsed.exception,
                to,
                &resolution.target,
                &args,
            ));
        }

        log::debug!("{} -> {:?}", text.trim(), rules);
        Ok(rules)
    }

    fn convert_redirect(&self, text: &str, from: Dialect, to: Dialect) -> Result<String, Error> {
        let parsed = extract_redirect(text)?;
        let directive = &parsed.directive;

        let modifier = match (to, directive.modifier) {
            (Dialect::AdblockPlus, RedirectModifier::RedirectRule) => {
                return Err(ConversionError::Unsupported {
                    feature: "redirect-rule",
                    dialect: to,
                    rule: parsed.text.to_string(),
                }
                .into());
            }
            (Dialect::AdblockPlus, _) => RedirectModifier::AbpRewrite,
            (_, RedirectModifier::AbpRewrite) => RedirectModifier::Redirect,
            (_, modifier) => modifier,
        };
        let resolution = self
            .resolver
            .resolve_name(&directive.name, from, to, NameKind::Redirect)?;

        let rule = parsed.text;
        let mut out = String::with_capacity(rule.len() + 64);
        out.push_str(&rule[..parsed.range.start]);
        out.push_str(modifier.prefix());
        out.push_str(&resolution.target);
        out.push_str(&rule[parsed.range.end..]);

        if to.requires_content_type() && directive.content_types.is_empty() {
            append_content_types(&mut out, resolution.entry, directive.excluded_types, rule)?;
        }

        log::debug!("{} -> {}", rule, out);
        Ok(out)
    }
}

/// Redirect options are shared by AdGuard and uBO, so either may read them.
fn accepts_source(classified: Dialect, from: Dialect, kind: RuleKind) -> bool {
    if classified == from {
        return true;
    }
    kind.name_kind() == NameKind::Redirect
        && classified != Dialect::AdblockPlus
        && from != Dialect::AdblockPlus
}

/// Types the rule negates itself are left out.
fn append_content_types(out: &mut String, entry: &Entry, excluded: ContentType, rule: &str) -> Result<(), Error> {
    if entry.content_type_optional {
        return Ok(());
    }
    let types = entry.content_types.difference(excluded);
    if types.is_empty() {
        return Err(ConversionError::ContentTypeRequired {
            rule: rule.to_string(),
        }
        .into());
    }
    for name in types.modifier_names() {
        out.push(',');
        out.push_str(name);
    }
    Ok(())
}

/// Arguments rewritten for the target dialect.
///
/// Value mappings apply to AdGuard-native names only; prefixed aliases already
/// carry the foreign dialect's values.
fn target_args(call: &ScriptletCall, entry: &Entry, from: Dialect, to: Dialect) -> Vec<String> {
    if from != Dialect::AdGuard || to == Dialect::AdGuard || !is_adguard_native(&call.name) {
        return call.args.clone();
    }
    call.args
        .iter()
        .map(|arg| entry.map_value(to, arg).to_string())
        .collect()
}

// =============================================================================
// Serialization
// =============================================================================

/// Write a single call as a complete rule.
pub fn format_scriptlet(domains: &str, exception: bool, dialect: Dialect, name: &str, args: &[String]) -> String {
    let marker = if exception {
        dialect.scriptlet_exception_marker()
    } else {
        dialect.scriptlet_marker()
    };

    let mut out = String::with_capacity(domains.len() + marker.len() + name.len() + 16);
    out.push_str(domains);
    out.push_str(marker);

    match dialect {
        Dialect::AdGuard => {
            out.push('(');
            let quoted: Vec<String> = std::iter::once(name)
                .chain(args.iter().map(String::as_str))
                .map(quote_adguard)
                .collect();
            out.push_str(&quoted.join(", "));
            out.push(')');
        }
        Dialect::UBlock => {
            out.push('(');
            out.push_str(name);
            let last = args.len().saturating_sub(1);
            for (i, arg) in args.iter().enumerate() {
                out.push_str(", ");
                if arg.is_empty() && i == last {
                    out.push_str("''");
                } else {
                    out.push_str(&escape_ublock(arg));
                }
            }
            out.push(')');
        }
        Dialect::AdblockPlus => {
            out.push_str(name);
            for arg in args {
                out.push(' ');
                out.push_str(&quote_abp(arg));
            }
        }
    }
    out
}

/// `'value'` with embedded single quotes and the backslashes before them escaped.
pub fn quote_adguard(value: &str) -> String {
    quote_with(value, '\'')
}

/// Unquoted value with literal commas escaped.
///
/// Values the reader would otherwise strip or unwrap (surrounding blanks, a
/// leading quote, a trailing backslash) are quoted instead, preferring the
/// quote character the value does not contain.
pub fn escape_ublock(value: &str) -> String {
    let needs_quotes = value.trim() != value
        || value.starts_with(['\'', '"'])
        || value.ends_with('\\');
    if !needs_quotes {
        return value.replace(',', "\\,");
    }
    let quote = if value.contains('\'') && !value.contains('"') { '"' } else { '\'' };
    quote_with(value, quote)
}

/// Snippet argument, single-quoted only when it would not survive as a bare word.
pub fn quote_abp(value: &str) -> String {
    let needs_quotes = value.is_empty()
        || value
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '\'' | '"' | ';' | '\\'));
    if !needs_quotes {
        return value.to_string();
    }

    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Convert one rule with the embedded table.
pub fn convert_rule(text: &str, from: Dialect, to: Dialect) -> Result<Vec<String>, Error> {
    Converter::global().convert_rule(text, from, to)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convert(text: &str, from: Dialect, to: Dialect) -> Vec<String> {
        convert_rule(text, from, to).unwrap_or_else(|e| panic!("{text}: {e}"))
    }

    fn one(text: &str, from: Dialect, to: Dialect) -> String {
        let mut rules = convert(text, from, to);
        assert_eq!(rules.len(), 1, "{text}");
        rules.remove(0)
    }

    const ADG: Dialect = Dialect::AdGuard;
    const UBO: Dialect = Dialect::UBlock;
    const ABP: Dialect = Dialect::AdblockPlus;

    #[test]
    fn test_ublock_to_adguard() {
        assert_eq!(
            one("example.org##+js(aopr,__ad)", UBO, ADG),
            "example.org#%#//scriptlet('ubo-aopr.js', '__ad')"
        );
        assert_eq!(
            one("example.org##+js(nano-stb)", UBO, ADG),
            "example.org#%#//scriptlet('ubo-nano-stb.js')"
        );
        assert_eq!(
            one("example.com#@#+js(acis, Math.random)", UBO, ADG),
            "example.com#@%#//scriptlet('ubo-acis.js', 'Math.random')"
        );
    }

    #[test]
    fn test_abp_to_adguard_fans_out() {
        assert_eq!(
            convert(
                "example.org#$#abort-on-property-read atob; abort-on-property-write Fingerprint",
                ABP,
                ADG
            ),
            vec![
                "example.org#%#//scriptlet('abp-abort-on-property-read', 'atob')",
                "example.org#%#//scriptlet('abp-abort-on-property-write', 'Fingerprint')",
            ]
        );
    }

    #[test]
    fn test_adguard_to_ublock() {
        let cases = [
            ("example.org#%#//scriptlet('prevent-setTimeout', '[native code]', '8000')",
             "example.org##+js(no-setTimeout-if, [native code], 8000)"),
            ("example.org#%#//scriptlet('prevent-adfly')", "example.org##+js(adfly-defuser)"),
            ("example.org#%#//scriptlet('close-window')", "example.org##+js(window-close-if)"),
            ("example.org#%#//scriptlet('abp-abort-current-inline-script', 'atob')",
             "example.org##+js(abort-current-script, atob)"),
            ("example.org#%#//scriptlet('prevent-fetch', '*')", "example.org##+js(no-fetch-if, /^/)"),
            ("example.org#%#//scriptlet('set-constant', 'a.b', 'emptyArr')", "example.org##+js(set-constant, a.b, [])"),
            ("example.org#%#//scriptlet('set-constant', 'a.b', 'emptyObj')", "example.org##+js(set-constant, a.b, {})"),
            ("example.org#%#//scriptlet('set-constant', 'a.b', '')", "example.org##+js(set-constant, a.b, '')"),
            ("example.org#%#//scriptlet('remove-class', 'a', 'div.x, div.y')",
             r"example.org##+js(remove-class, a, div.x\, div.y)"),
            ("example.org#%#//scriptlet('remove-class', 'cookie--not-set', '', 'stay')",
             "example.org##+js(remove-class, cookie--not-set, , stay)"),
        ];
        for (input, expected) in cases {
            assert_eq!(one(input, ADG, UBO), expected);
        }
    }

    #[test]
    fn test_prefixed_alias_is_not_value_mapped() {
        assert_eq!(
            one("example.org#%#//scriptlet('ubo-set.js', 'a.b', '[]')", ADG, UBO),
            "example.org##+js(set, a.b, [])"
        );
    }

    #[test]
    fn test_adguard_to_abp() {
        assert_eq!(
            one("example.org#%#//scriptlet('abort-on-property-read', 'a b')", ADG, ABP),
            "example.org#$#abort-on-property-read 'a b'"
        );
        assert_eq!(
            one(r"example.org#%#//scriptlet('log', 'it\'s', '', 'x;y')", ADG, ABP),
            r"example.org#$#log 'it\'s' '' 'x;y'"
        );
    }

    #[test]
    fn test_adguard_argument_quoting() {
        assert_eq!(
            one("example.org##+js(set, title, it's)", UBO, ADG),
            r"example.org#%#//scriptlet('ubo-set.js', 'title', 'it\'s')"
        );
    }

    #[test]
    fn test_partially_quoted_ublock_argument() {
        let adg = one(r#"example.org##+js(remove-node-text, script, "adblock" in window)"#, UBO, ADG);
        assert_eq!(
            adg,
            r#"example.org#%#//scriptlet('ubo-remove-node-text.js', 'script', '"adblock" in window')"#
        );
        assert_eq!(
            one(&adg, ADG, UBO),
            r#"example.org##+js(remove-node-text, script, '"adblock" in window')"#
        );
    }

    #[test]
    fn test_ublock_output_keeps_quotes_and_blanks() {
        let ubo = one(r#"example.org#%#//scriptlet('set-constant', 'a', '"yes"')"#, ADG, UBO);
        assert_eq!(ubo, r#"example.org##+js(set-constant, a, '"yes"')"#);
        assert_eq!(
            one(&ubo, UBO, ADG),
            r#"example.org#%#//scriptlet('ubo-set-constant.js', 'a', '"yes"')"#
        );

        assert_eq!(escape_ublock("it's"), "it's");
        assert_eq!(escape_ublock("'x'"), r#""'x'""#);
        assert_eq!(escape_ublock(" padded"), "' padded'");
        assert_eq!(escape_ublock("a,b"), r"a\,b");
    }

    #[test]
    fn test_trailing_backslash_survives_adguard() {
        let adg = one(r"example.org##+js(remove-node-text, script, /foo\)", UBO, ADG);
        assert_eq!(adg, r"example.org#%#//scriptlet('ubo-remove-node-text.js', 'script', '/foo\\')");
        assert_eq!(
            one(&adg, ADG, UBO),
            r"example.org##+js(remove-node-text, script, '/foo\\')"
        );
        assert_eq!(quote_adguard(r"a\'b"), r"'a\\\'b'");
        assert_eq!(quote_adguard(r"/\d+/"), r"'/\d+/'");
    }

    #[test]
    fn test_single_quotes_in_ublock_arguments_are_kept() {
        assert_eq!(
            one("example.org##+js(ra, href, a[data-st-area='back'])", UBO, ADG),
            r"example.org#%#//scriptlet('ubo-ra.js', 'href', 'a[data-st-area=\'back\']')"
        );
    }

    #[test]
    fn test_comments_pass_through() {
        assert_eq!(convert("! Title: list", UBO, ADG), vec!["! Title: list"]);
    }

    #[test]
    fn test_wrong_source_dialect_is_not_a_rule() {
        let err = convert_rule("example.org##+js(aopr, x)", ADG, UBO).unwrap_err();
        assert!(err.is_not_a_rule());
        let err = convert_rule("example.org##.banner", UBO, ADG).unwrap_err();
        assert!(err.is_not_a_rule());
    }

    #[test]
    fn test_unknown_and_untranslatable_scriptlets() {
        let err = convert_rule("example.org##+js(no-such-thing, x)", UBO, ADG).unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));

        let err = convert_rule("example.org#%#//scriptlet('log', 'x')", ADG, UBO).unwrap_err();
        assert!(matches!(err, Error::Conversion(ConversionError::NoEquivalentName { .. })));

        let err = convert_rule("example.org#%#//scriptlet('set-constant', 'x')", ADG, UBO).unwrap_err();
        assert!(matches!(err, Error::InvalidSyntax { .. }));
    }

    #[test]
    fn test_redirect_to_ublock_injects_content_types() {
        assert_eq!(
            one("||example.com/ad.txt$redirect=nooptext", ADG, UBO),
            "||example.com/ad.txt$redirect=noop.txt,image,media,subdocument,stylesheet,script,xmlhttprequest,other"
        );
        assert_eq!(
            one("||example.com/ad.css$domain=a.com,redirect=noopcss", ADG, UBO),
            "||example.com/ad.css$domain=a.com,redirect=noop.css,stylesheet"
        );
        assert_eq!(
            one("||example.com/ad$redirect=empty", ADG, UBO),
            "||example.com/ad$redirect=empty"
        );
    }

    #[test]
    fn test_negated_content_types_are_not_injected() {
        assert_eq!(
            one("||example.com/ad$~script,redirect=nooptext", ADG, UBO),
            "||example.com/ad$~script,redirect=noop.txt,image,media,subdocument,stylesheet,xmlhttprequest,other"
        );
        let err = convert_rule("||example.com^$~script,redirect=noopjs", ADG, UBO).unwrap_err();
        assert!(matches!(err, Error::Conversion(ConversionError::ContentTypeRequired { .. })));
    }

    #[test]
    fn test_redirect_with_content_type_passes_through() {
        assert_eq!(
            one("||example.com/banner$image,redirect=32x32-transparent.png", ADG, UBO),
            "||example.com/banner$image,redirect=32x32.png"
        );
        assert_eq!(
            one("||example.com/banner$image,redirect=32x32.png", UBO, ADG),
            "||example.com/banner$image,redirect=32x32-transparent.png"
        );
    }

    #[test]
    fn test_redirect_dialect_changes() {
        assert_eq!(
            one("||example.com/ad.js$script,rewrite=abp-resource:blank-js,domain=a.com", ABP, ADG),
            "||example.com/ad.js$script,redirect=noopjs,domain=a.com"
        );
        assert_eq!(
            one("||example.com/ad.js$script,redirect=noopjs", ADG, ABP),
            "||example.com/ad.js$script,rewrite=abp-resource:blank-js"
        );
        assert_eq!(
            one("@@||example.com/ad.js$redirect-rule=noop.js", UBO, ADG),
            "@@||example.com/ad.js$redirect-rule=noopjs"
        );
    }

    #[test]
    fn test_redirect_failures() {
        let err = convert_rule("||example.com/vast$redirect=noopvast-2.0", ADG, UBO).unwrap_err();
        assert!(matches!(err, Error::Conversion(ConversionError::NoEquivalentName { .. })));

        let err = convert_rule("||example.com/ad.js$redirect-rule=noopjs", ADG, ABP).unwrap_err();
        assert!(matches!(err, Error::Conversion(ConversionError::Unsupported { .. })));
    }

    #[test]
    fn test_content_type_required() {
        let table = CompatibilityTable::from_json(
            r#"{ "redirects": [{ "canonical": "bare", "aliases": { "adg": ["bare"], "ubo": ["bare.js"] } }] }"#,
        )
        .unwrap();
        let converter = Converter::new(&table);
        let err = converter
            .convert_rule("||example.com/x$redirect=bare", ADG, UBO)
            .unwrap_err();
        assert!(matches!(err, Error::Conversion(ConversionError::ContentTypeRequired { .. })));
        assert_eq!(
            converter.convert_rule("||example.com/x$script,redirect=bare", ADG, UBO).unwrap(),
            vec!["||example.com/x$script,redirect=bare.js"]
        );
    }

    #[test]
    fn test_quote_abp() {
        assert_eq!(quote_abp("plain"), "plain");
        assert_eq!(quote_abp(""), "''");
        assert_eq!(quote_abp(r"a\b"), r"'a\\b'");
        assert_eq!(quote_abp("line\nbreak"), r"'line\nbreak'");
    }
}
