//! Compatibility resolver
//!
//! Translates scriptlet and redirect names between dialects through the
//! canonical entries of a [`CompatibilityTable`].

use rb_core::catalog::ResolvedCall;
use rb_core::compat::{CompatibilityTable, Entry};
use rb_core::error::{ConversionError, Error};
use rb_core::types::{Dialect, NameKind, ScriptletCall};

/// A name translated into a target dialect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution<'t> {
    pub entry: &'t Entry,
    pub target: String,
}

impl Resolution<'_> {
    pub fn canonical(&self) -> &str {
        &self.entry.canonical
    }
}

/// AdGuard name without a `ubo-`/`abp-` compatibility prefix.
pub fn is_adguard_native(name: &str) -> bool {
    [Dialect::UBlock, Dialect::AdblockPlus]
        .iter()
        .all(|d| !name.starts_with(d.adguard_alias_prefix()))
}

fn strip_js(name: &str) -> &str {
    name.strip_suffix(".js").unwrap_or(name)
}

#[derive(Debug, Clone, Copy)]
pub struct Resolver<'t> {
    table: &'t CompatibilityTable,
}

impl Resolver<'static> {
    pub fn global() -> Self {
        Self::new(CompatibilityTable::global())
    }
}

impl<'t> Resolver<'t> {
    pub fn new(table: &'t CompatibilityTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &'t CompatibilityTable {
        self.table
    }

    /// Entry `dialect` knows as `name`.
    pub fn canonical(&self, name: &str, dialect: Dialect, kind: NameKind) -> Result<&'t Entry, Error> {
        self.table
            .lookup(name, dialect, kind)
            .ok_or_else(|| Error::not_found(name, dialect, kind))
    }

    /// Translate `name` from one dialect's naming into another's.
    pub fn resolve_name(
        &self,
        name: &str,
        from: Dialect,
        to: Dialect,
        kind: NameKind,
    ) -> Result<Resolution<'t>, Error> {
        let entry = self.canonical(name, from, kind)?;
        let target = if from == to {
            Some(name.to_string())
        } else {
            match kind {
                NameKind::Scriptlet => self.scriptlet_target(entry, name, from, to),
                NameKind::Redirect => entry.designated(to).map(str::to_string),
            }
        };

        let target = target.ok_or_else(|| ConversionError::NoEquivalentName {
            name: name.to_string(),
            dialect: to,
            kind,
        })?;
        log::debug!("{} {} ({}) -> {} ({})", kind, name, from.as_str(), target, to.as_str());

        Ok(Resolution { entry, target })
    }

    fn scriptlet_target(&self, entry: &'t Entry, name: &str, from: Dialect, to: Dialect) -> Option<String> {
        // AdGuard keeps foreign argument semantics behind a prefixed alias
        if to == Dialect::AdGuard {
            let prefix = from.adguard_alias_prefix();
            if from == Dialect::UBlock {
                let with_js = format!("{prefix}{}.js", strip_js(name));
                if self.is_alias_of(&with_js, Dialect::AdGuard, entry) {
                    return Some(with_js);
                }
            }
            return Some(format!("{prefix}{name}"));
        }

        // A prefixed AdGuard alias already names the target's own alias
        if from == Dialect::AdGuard {
            if let Some(foreign) = name.strip_prefix(to.adguard_alias_prefix()) {
                if self.is_alias_of(foreign, to, entry) {
                    return Some(target_spelling(foreign, to));
                }
            }
        }

        entry.designated(to).map(|n| target_spelling(n, to))
    }

    fn is_alias_of(&self, name: &str, dialect: Dialect, entry: &Entry) -> bool {
        self.table
            .lookup(name, dialect, NameKind::Scriptlet)
            .is_some_and(|found| found.canonical == entry.canonical)
    }

    /// Redirect resource name for `to`.
    pub fn resolve_redirect_name(&self, name: &str, from: Dialect, to: Dialect) -> Result<String, Error> {
        self.resolve_name(name, from, to, NameKind::Redirect)
            .map(|resolution| resolution.target)
    }

    /// Name accepted by the injection (AdGuard) dialect.
    pub fn is_valid_name(&self, name: &str, kind: NameKind) -> bool {
        self.table.lookup(name, Dialect::AdGuard, kind).is_some()
    }

    /// Validate a call for the injection packager.
    ///
    /// The argument count is checked for AdGuard-native names only. Foreign
    /// aliases follow their own dialect's parameter conventions.
    pub fn resolve_call(&self, call: &ScriptletCall, dialect: Dialect) -> Result<ResolvedCall, Error> {
        let entry = self.canonical(&call.name, dialect, NameKind::Scriptlet)?;
        let scriptlet = entry
            .scriptlet
            .ok_or_else(|| Error::not_found(call.name.as_str(), dialect, NameKind::Scriptlet))?;

        if dialect == Dialect::AdGuard
            && is_adguard_native(&call.name)
            && !scriptlet.accepts_arg_count(call.args.len())
        {
            return Err(Error::invalid_syntax("wrong argument count", call.name.as_str()));
        }

        Ok(ResolvedCall {
            scriptlet,
            name: call.name.clone(),
            args: call.args.clone(),
        })
    }
}

/// uBO scriptlet names are written without `.js`.
fn target_spelling(name: &str, to: Dialect) -> String {
    match to {
        Dialect::UBlock => strip_js(name).to_string(),
        _ => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use rb_core::catalog::Scriptlet;

    use super::*;

    fn resolver() -> Resolver<'static> {
        Resolver::global()
    }

    fn target(name: &str, from: Dialect, to: Dialect, kind: NameKind) -> String {
        resolver().resolve_name(name, from, to, kind).unwrap().target
    }

    #[test]
    fn test_scriptlet_into_adguard_uses_compat_alias() {
        let s = NameKind::Scriptlet;
        assert_eq!(target("aopr", Dialect::UBlock, Dialect::AdGuard, s), "ubo-aopr.js");
        assert_eq!(target("nano-stb.js", Dialect::UBlock, Dialect::AdGuard, s), "ubo-nano-stb.js");
        assert_eq!(
            target("abort-on-property-read", Dialect::AdblockPlus, Dialect::AdGuard, s),
            "abp-abort-on-property-read"
        );
    }

    #[test]
    fn test_scriptlet_out_of_adguard_uses_designated_name() {
        let s = NameKind::Scriptlet;
        assert_eq!(target("prevent-setTimeout", Dialect::AdGuard, Dialect::UBlock, s), "no-setTimeout-if");
        assert_eq!(target("prevent-adfly", Dialect::AdGuard, Dialect::UBlock, s), "adfly-defuser");
        assert_eq!(target("close-window", Dialect::AdGuard, Dialect::UBlock, s), "window-close-if");
        assert_eq!(
            target("abp-abort-current-inline-script", Dialect::AdGuard, Dialect::UBlock, s),
            "abort-current-script"
        );
    }

    #[test]
    fn test_prefixed_adguard_alias_keeps_foreign_spelling() {
        let s = NameKind::Scriptlet;
        assert_eq!(target("ubo-aopr.js", Dialect::AdGuard, Dialect::UBlock, s), "aopr");
        assert_eq!(target("ubo-nostif", Dialect::AdGuard, Dialect::UBlock, s), "nostif");
    }

    #[test]
    fn test_name_aliasing() {
        let r = resolver();
        let a = r.canonical("set-constant", Dialect::AdGuard, NameKind::Scriptlet).unwrap();
        let b = r.canonical("ubo-set-constant.js", Dialect::AdGuard, NameKind::Scriptlet).unwrap();
        assert_eq!(a.canonical, b.canonical);

        let old = r.canonical("googletagmanager-gtm", Dialect::AdGuard, NameKind::Redirect).unwrap();
        let new = r.canonical("google-analytics", Dialect::AdGuard, NameKind::Redirect).unwrap();
        assert_eq!(old.canonical, new.canonical);
    }

    #[test]
    fn test_resolve_redirect_name() {
        let r = resolver();
        let cases = [
            ("32x32.png", Dialect::UBlock, Dialect::AdGuard, "32x32-transparent.png"),
            ("noop-1s.mp4", Dialect::UBlock, Dialect::AdGuard, "noopmp4-1s"),
            ("googlesyndication.com/adsbygoogle.js", Dialect::UBlock, Dialect::AdGuard, "googlesyndication-adsbygoogle"),
            ("fuckadblock.js-3.2.0", Dialect::UBlock, Dialect::AdGuard, "prevent-fab-3.2.0"),
            ("google-ima.js", Dialect::UBlock, Dialect::AdGuard, "google-ima3"),
            ("noop.css", Dialect::UBlock, Dialect::AdGuard, "noopcss"),
            ("blank-js", Dialect::AdblockPlus, Dialect::AdGuard, "noopjs"),
            ("blank-mp3", Dialect::AdblockPlus, Dialect::AdGuard, "noopmp3-0.1s"),
            ("noopjs", Dialect::AdGuard, Dialect::UBlock, "noop.js"),
        ];
        for (name, from, to, expected) in cases {
            assert_eq!(r.resolve_redirect_name(name, from, to).unwrap(), expected, "{name}");
        }
    }

    #[test]
    fn test_not_found_and_no_equivalent() {
        let r = resolver();
        let err = r.resolve_redirect_name("does-not-exist", Dialect::AdGuard, Dialect::UBlock).unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));

        let err = r.resolve_redirect_name("noopvast-2.0", Dialect::AdGuard, Dialect::UBlock).unwrap_err();
        assert!(matches!(err, Error::Conversion(ConversionError::NoEquivalentName { .. })));
    }

    #[test]
    fn test_is_valid_name() {
        let r = resolver();
        assert!(r.is_valid_name("set-constant", NameKind::Scriptlet));
        assert!(r.is_valid_name("ubo-set.js", NameKind::Scriptlet));
        assert!(r.is_valid_name("abp-override-property-read", NameKind::Scriptlet));
        assert!(!r.is_valid_name("set", NameKind::Scriptlet));
        assert!(r.is_valid_name("noopjs", NameKind::Redirect));
        assert!(!r.is_valid_name("noop.js", NameKind::Redirect));
    }

    #[test]
    fn test_resolve_call_checks_arity_for_native_names() {
        let r = resolver();
        let call = ScriptletCall::new("set-constant", vec!["a".into(), "1".into()]);
        let resolved = r.resolve_call(&call, Dialect::AdGuard).unwrap();
        assert_eq!(resolved.scriptlet, Scriptlet::SetConstant);

        let short = ScriptletCall::new("set-constant", vec!["a".into()]);
        assert!(matches!(
            r.resolve_call(&short, Dialect::AdGuard),
            Err(Error::InvalidSyntax { .. })
        ));

        let foreign = ScriptletCall::new("ubo-set.js", vec!["a".into()]);
        assert!(r.resolve_call(&foreign, Dialect::AdGuard).is_ok());
    }
}
