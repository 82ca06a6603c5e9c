//! Scriptlet catalog
//!
//! Every scriptlet the injection side ships is listed here once, under its
//! canonical AdGuard name, with the parameters it takes. The compatibility
//! table refers to these entries by canonical name; nothing is looked up by
//! evaluating code.

use serde::Serialize;

/// How a parameter may be supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Arity {
    Required,
    Optional,
    /// Accepts any number of trailing arguments.
    Variadic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Param {
    pub name: &'static str,
    pub arity: Arity,
}

macro_rules! scriptlets {
    (@arity req) => { Arity::Required };
    (@arity opt) => { Arity::Optional };
    (@arity var) => { Arity::Variadic };
    (
        $(
            $variant:ident => $name:literal [ $( $param:literal : $arity:ident ),* ]
        ),* $(,)?
    ) => {
        /// Scriptlet identifier.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
        pub enum Scriptlet {
            $( $variant, )*
        }

        impl Scriptlet {
            pub const ALL: &'static [Scriptlet] = &[ $( Scriptlet::$variant, )* ];

            /// Canonical (AdGuard) name.
            pub fn name(self) -> &'static str {
                match self {
                    $( Scriptlet::$variant => $name, )*
                }
            }

            pub fn params(self) -> &'static [Param] {
                match self {
                    $(
                        Scriptlet::$variant => &[
                            $( Param { name: $param, arity: scriptlets!(@arity $arity) }, )*
                        ],
                    )*
                }
            }
        }
    };
}

scriptlets! {
    AbortCurrentInlineScript => "abort-current-inline-script" ["property": req, "search": opt],
    AbortOnPropertyRead => "abort-on-property-read" ["property": req],
    AbortOnPropertyWrite => "abort-on-property-write" ["property": req],
    AbortOnStackTrace => "abort-on-stack-trace" ["property": req, "stack": req],
    AdjustSetInterval => "adjust-setInterval" ["matchCallback": opt, "matchDelay": opt, "boost": opt],
    AdjustSetTimeout => "adjust-setTimeout" ["matchCallback": opt, "matchDelay": opt, "boost": opt],
    CloseWindow => "close-window" ["path": opt],
    DisableNewtabLinks => "disable-newtab-links" [],
    JsonPrune => "json-prune" ["propsToRemove": opt, "requiredInitialProps": opt, "stack": opt],
    Log => "log" ["args": var],
    LogAddEventListener => "log-addEventListener" [],
    LogEval => "log-eval" [],
    LogSetInterval => "log-setInterval" [],
    LogSetTimeout => "log-setTimeout" [],
    NoTopics => "no-topics" [],
    Noeval => "noeval" [],
    Nowebrtc => "nowebrtc" [],
    PreventAddEventListener => "prevent-addEventListener" ["typeSearch": opt, "listenerSearch": opt],
    PreventAdfly => "prevent-adfly" [],
    PreventBab => "prevent-bab" [],
    PreventElementSrcLoading => "prevent-element-src-loading" ["tagName": req, "match": req],
    PreventEvalIf => "prevent-eval-if" ["search": opt],
    PreventFab => "prevent-fab-3.2.0" [],
    PreventFetch => "prevent-fetch" ["propsToMatch": opt, "responseBody": opt, "responseType": opt],
    PreventPopadsNet => "prevent-popads-net" [],
    PreventRefresh => "prevent-refresh" ["delay": opt],
    PreventRequestAnimationFrame => "prevent-requestAnimationFrame" ["search": opt],
    PreventSetInterval => "prevent-setInterval" ["matchCallback": opt, "matchDelay": opt],
    PreventSetTimeout => "prevent-setTimeout" ["matchCallback": opt, "matchDelay": opt],
    PreventWindowOpen => "prevent-window-open" ["match": opt, "delay": opt, "replacement": opt],
    PreventXhr => "prevent-xhr" ["propsToMatch": opt, "customResponseText": opt],
    RemoveAttr => "remove-attr" ["attrs": req, "selector": opt, "applying": opt],
    RemoveClass => "remove-class" ["classNames": req, "selector": opt, "applying": opt],
    RemoveCookie => "remove-cookie" ["match": opt],
    RemoveNodeText => "remove-node-text" ["nodeName": req, "textMatch": req],
    SetAttr => "set-attr" ["selector": req, "attr": req, "value": opt],
    SetConstant => "set-constant" ["property": req, "value": req, "stack": opt],
    SetCookie => "set-cookie" ["name": req, "value": req, "path": opt],
    SetLocalStorageItem => "set-local-storage-item" ["key": req, "value": req],
    SetPopadsDummy => "set-popads-dummy" [],
    TrustedReplaceXhrResponse => "trusted-replace-xhr-response" ["pattern": req, "replacement": req, "propsToMatch": opt],
}

impl Scriptlet {
    /// Find a catalog entry by canonical name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.name() == name)
    }

    /// Upper bound on the argument count, `None` when variadic.
    pub fn max_args(self) -> Option<usize> {
        let params = self.params();
        if params.iter().any(|p| p.arity == Arity::Variadic) {
            None
        } else {
            Some(params.len())
        }
    }

    pub fn required_args(self) -> usize {
        self.params()
            .iter()
            .filter(|p| p.arity == Arity::Required)
            .count()
    }

    /// Check an argument count against the parameter list.
    pub fn accepts_arg_count(self, count: usize) -> bool {
        count >= self.required_args() && self.max_args().map_or(true, |max| count <= max)
    }
}

/// A validated scriptlet invocation, ready to hand to the injection packager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedCall {
    pub scriptlet: Scriptlet,
    /// Name as written in the rule (one of the scriptlet's accepted names).
    pub name: String,
    pub args: Vec<String>,
}
