//! Dialect detection
//!
//! Classification runs an ordered list of named predicates. The first one that
//! reaches a decision wins, and the comment check always runs first.

use std::sync::OnceLock;

use regex::Regex;

use rb_core::compat::CompatibilityTable;
use rb_core::types::{Dialect, NameKind, RedirectModifier, RuleClassification, RuleKind};

/// Comment marker shared by every dialect.
pub const COMMENT_MARKER: char = '!';

/// A predicate returns `None` to defer to the next one.
pub type DetectFn = fn(&str, &CompatibilityTable) -> Option<RuleClassification>;

pub struct Detector {
    pub name: &'static str,
    pub detect: DetectFn,
}

/// Detection order.
pub const DETECTORS: &[Detector] = &[
    Detector { name: "comment", detect: comment },
    Detector { name: "adguard_scriptlet", detect: adguard_scriptlet },
    Detector { name: "ublock_scriptlet", detect: ublock_scriptlet },
    Detector { name: "abp_snippet", detect: abp_snippet },
    Detector { name: "redirect", detect: redirect },
];

/// Classify a rule against the embedded compatibility table.
pub fn classify(text: &str) -> RuleClassification {
    classify_with(text, CompatibilityTable::global())
}

pub fn classify_with(text: &str, table: &CompatibilityTable) -> RuleClassification {
    let text = text.trim();
    if text.is_empty() {
        return RuleClassification::NotARule;
    }
    for detector in DETECTORS {
        if let Some(classification) = (detector.detect)(text, table) {
            log::trace!("{} -> {:?} by {}", text, classification, detector.name);
            return classification;
        }
    }
    RuleClassification::NotARule
}

fn rule(dialect: Dialect, kind: RuleKind) -> Option<RuleClassification> {
    Some(RuleClassification::Rule { dialect, kind })
}

fn scriptlet_kind(exception: bool) -> RuleKind {
    if exception {
        RuleKind::ScriptletException
    } else {
        RuleKind::ScriptletApply
    }
}

// =============================================================================
// Regexes
// =============================================================================

fn compiled(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            log::error!("Invalid detector regex {}: {}", pattern, e);
            None
        }
    })
    .as_ref()
}

/// `##+js`, `## +js`, `##script:inject` and their `#@#` exceptions.
pub(crate) fn ublock_marker_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    compiled(&RE, r"#@?#script:inject|#@?#\s*\+js")
}

/// A `#$#` rule whose body is a CSS declaration block.
fn abp_css_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    compiled(&RE, r"#@?\$#.+?\s*\{.*\}\s*$")
}

/// Element hiding, CSS, scriptlet and JS injection separators.
fn cosmetic_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    compiled(&RE, r"#@?(?:\$\??|%|\?)?#")
}

// =============================================================================
// Predicates
// =============================================================================

pub fn is_comment(text: &str) -> bool {
    text.trim_start().starts_with(COMMENT_MARKER)
}

/// The rule carries a cosmetic separator and is therefore not a network rule.
pub fn is_cosmetic(text: &str) -> bool {
    cosmetic_regex().is_some_and(|re| re.is_match(text))
}

/// Comments are never rules.
pub fn comment(text: &str, _table: &CompatibilityTable) -> Option<RuleClassification> {
    is_comment(text).then_some(RuleClassification::NotARule)
}

pub fn adguard_scriptlet(text: &str, _table: &CompatibilityTable) -> Option<RuleClassification> {
    if text.contains(Dialect::AdGuard.scriptlet_exception_marker()) {
        return rule(Dialect::AdGuard, RuleKind::ScriptletException);
    }
    if text.contains(Dialect::AdGuard.scriptlet_marker()) {
        return rule(Dialect::AdGuard, RuleKind::ScriptletApply);
    }
    None
}

pub fn ublock_scriptlet(text: &str, _table: &CompatibilityTable) -> Option<RuleClassification> {
    const MARKERS: [&str; 4] = ["##+js", "##script:inject", "#@#+js", "#@#script:inject"];

    if !MARKERS.iter().any(|m| text.contains(m)) {
        return None;
    }
    let found = ublock_marker_regex()?.find(text)?;
    rule(Dialect::UBlock, scriptlet_kind(found.as_str().contains('@')))
}

pub fn abp_snippet(text: &str, _table: &CompatibilityTable) -> Option<RuleClassification> {
    let exception = text.contains(Dialect::AdblockPlus.scriptlet_exception_marker());
    if !exception && !text.contains(Dialect::AdblockPlus.scriptlet_marker()) {
        return None;
    }
    if abp_css_regex().is_some_and(|re| re.is_match(text)) {
        return None;
    }
    rule(Dialect::AdblockPlus, scriptlet_kind(exception))
}

/// Network rules with a redirect modifier after the last unescaped `$`.
pub fn redirect(text: &str, table: &CompatibilityTable) -> Option<RuleClassification> {
    if is_cosmetic(text) {
        return None;
    }
    let modifiers = parse_modifiers(text)?;
    let (modifier, name) = modifiers.items.iter().find_map(|item| {
        RedirectModifier::strip(item.text).filter(|(_, name)| !name.is_empty())
    })?;

    let kind = if text.starts_with("@@") {
        RuleKind::RedirectException
    } else {
        RuleKind::RedirectApply
    };
    rule(redirect_dialect(modifier, name, table), kind)
}

/// `redirect=` is shared by AdGuard and uBO; names only uBO knows decide for uBO.
fn redirect_dialect(modifier: RedirectModifier, name: &str, table: &CompatibilityTable) -> Dialect {
    if modifier == RedirectModifier::AbpRewrite {
        return Dialect::AdblockPlus;
    }
    let redirects = table.kind(NameKind::Redirect);
    if redirects.lookup(name, Dialect::AdGuard).is_none()
        && redirects.lookup(name, Dialect::UBlock).is_some()
    {
        Dialect::UBlock
    } else {
        Dialect::AdGuard
    }
}

// =============================================================================
// Network Rule Modifiers
// =============================================================================

/// One comma-separated option of a network rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModifierItem<'a> {
    pub text: &'a str,
    /// Byte offset of `text` within the rule.
    pub start: usize,
}

impl ModifierItem<'_> {
    pub fn end(&self) -> usize {
        self.start + self.text.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modifiers<'a> {
    /// Everything before the `$`.
    pub pattern: &'a str,
    /// Byte offset just past the `$`.
    pub start: usize,
    pub items: Vec<ModifierItem<'a>>,
}

/// Split the options after the last unescaped `$` on unescaped commas.
pub fn parse_modifiers(text: &str) -> Option<Modifiers<'_>> {
    let dollar = find_last_unescaped(text, '$')?;
    let start = dollar + 1;
    let options = &text[start..];

    let mut items = Vec::new();
    let mut item_start = 0;
    let mut escaped = false;
    for (i, c) in options.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            ',' => {
                push_item(&mut items, options, item_start, i, start);
                item_start = i + 1;
            }
            _ => {}
        }
    }
    push_item(&mut items, options, item_start, options.len(), start);

    Some(Modifiers {
        pattern: &text[..dollar],
        start,
        items,
    })
}

fn push_item<'a>(items: &mut Vec<ModifierItem<'a>>, options: &'a str, from: usize, to: usize, base: usize) {
    let raw = &options[from..to];
    let text = raw.trim();
    if text.is_empty() {
        return;
    }
    let leading = raw.len() - raw.trim_start().len();
    items.push(ModifierItem {
        text,
        start: base + from + leading,
    });
}

fn find_last_unescaped(text: &str, needle: char) -> Option<usize> {
    let mut found = None;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == needle {
            found = Some(i);
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify_rule(text: &str) -> RuleClassification {
        classify(text)
    }

    fn expect(dialect: Dialect, kind: RuleKind) -> RuleClassification {
        RuleClassification::Rule { dialect, kind }
    }

    #[test]
    fn test_comment_is_checked_first() {
        assert_eq!(classify_rule("! example.org##+js(aopr, x)"), RuleClassification::NotARule);
        assert_eq!(classify_rule("!||example.com$redirect=noopjs"), RuleClassification::NotARule);
        assert_eq!(classify_rule(""), RuleClassification::NotARule);
    }

    #[test]
    fn test_adguard_scriptlet() {
        assert_eq!(
            classify_rule("example.org#%#//scriptlet('set-constant', 'a', '1')"),
            expect(Dialect::AdGuard, RuleKind::ScriptletApply)
        );
        assert_eq!(
            classify_rule("example.org#@%#//scriptlet('set-constant', 'a', '1')"),
            expect(Dialect::AdGuard, RuleKind::ScriptletException)
        );
    }

    #[test]
    fn test_ublock_scriptlet() {
        assert_eq!(
            classify_rule("example.org##+js(aopr, __ad)"),
            expect(Dialect::UBlock, RuleKind::ScriptletApply)
        );
        assert_eq!(
            classify_rule("example.org##script:inject(aopr.js, __ad)"),
            expect(Dialect::UBlock, RuleKind::ScriptletApply)
        );
        assert_eq!(
            classify_rule("example.org#@#+js(aopr, __ad)"),
            expect(Dialect::UBlock, RuleKind::ScriptletException)
        );
        assert_eq!(classify_rule("example.org##.banner"), RuleClassification::NotARule);
    }

    #[test]
    fn test_abp_snippet_rejects_css() {
        assert_eq!(
            classify_rule("example.org#$#abort-on-property-read x; log y"),
            expect(Dialect::AdblockPlus, RuleKind::ScriptletApply)
        );
        assert_eq!(
            classify_rule("example.org#@$#log y"),
            expect(Dialect::AdblockPlus, RuleKind::ScriptletException)
        );
        assert_eq!(
            classify_rule("example.org#$#body { overflow: auto!important; }"),
            RuleClassification::NotARule
        );
    }

    #[test]
    fn test_redirect_dialects() {
        assert_eq!(
            classify_rule("||example.com/ads.js$script,redirect=noopjs"),
            expect(Dialect::AdGuard, RuleKind::RedirectApply)
        );
        assert_eq!(
            classify_rule("||example.com/ads.js$script,redirect=noop.js"),
            expect(Dialect::UBlock, RuleKind::RedirectApply)
        );
        assert_eq!(
            classify_rule("||example.com/ads.js$rewrite=abp-resource:blank-js,domain=a.com"),
            expect(Dialect::AdblockPlus, RuleKind::RedirectApply)
        );
        assert_eq!(
            classify_rule("@@||example.com/ads.js$redirect-rule=noopjs"),
            expect(Dialect::AdGuard, RuleKind::RedirectException)
        );
    }

    #[test]
    fn test_redirect_text_in_payload_is_not_a_rule() {
        let text = r#"example.org#%#document.cookie = "app_redirect=false";"#;
        assert_eq!(redirect(text, CompatibilityTable::global()), None);
        assert_eq!(classify_rule(text), RuleClassification::NotARule);
        assert_eq!(classify_rule("||example.com/redirect=noopjs"), RuleClassification::NotARule);
        assert_eq!(classify_rule("||example.com$redirect="), RuleClassification::NotARule);
    }

    #[test]
    fn test_classification_is_pure() {
        let text = "example.org##+js(set, a, 1)";
        let first = classify_rule(text);
        classify_rule("||example.com$redirect=noopjs");
        assert_eq!(classify_rule(text), first);
    }

    #[test]
    fn test_parse_modifiers_uses_last_unescaped_dollar() {
        let text = r"/ads\$/$image,redirect=1x1.gif";
        let modifiers = parse_modifiers(text).unwrap();
        assert_eq!(modifiers.pattern, r"/ads\$/");
        let names: Vec<&str> = modifiers.items.iter().map(|m| m.text).collect();
        assert_eq!(names, vec!["image", "redirect=1x1.gif"]);
        let item = modifiers.items[1];
        assert_eq!(&text[item.start..item.end()], "redirect=1x1.gif");
    }

    #[test]
    fn test_parse_modifiers_keeps_escaped_commas() {
        let modifiers = parse_modifiers(r"||a.com$replace=/a\,b/c/, script").unwrap();
        let names: Vec<&str> = modifiers.items.iter().map(|m| m.text).collect();
        assert_eq!(names, vec![r"replace=/a\,b/c/", "script"]);
        assert!(parse_modifiers("||a.com^").is_none());
    }

    #[test]
    fn test_is_cosmetic() {
        for text in ["a.com##.ad", "a.com#@#.ad", "a.com#?#.ad", "a.com#$#log", "a.com#%#x", "a.com#@$?#x"] {
            assert!(is_cosmetic(text), "{text}");
        }
        assert!(!is_cosmetic("||a.com^$script"));
    }
}
