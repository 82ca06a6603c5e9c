//! WebAssembly bindings for RuleBridge

use std::sync::OnceLock;

use wasm_bindgen::prelude::*;

use rb_converter::{extract_calls, Converter, ListOptions};
use rb_core::{
    CompatibilityTable, Dialect, Error, NameKind, RuleClassification, RuleKind,
};

static CUSTOM_TABLE: OnceLock<CompatibilityTable> = OnceLock::new();

/// Replace the embedded compatibility table with custom data.
#[wasm_bindgen]
pub fn init_table(json: &str) -> Result<(), JsValue> {
    if CUSTOM_TABLE.get().is_some() {
        return Err(JsValue::from_str("Already initialized. Reload the page to reinitialize."));
    }

    let table = CompatibilityTable::from_json(json)
        .map_err(|e| JsValue::from_str(&format!("Failed to load compatibility table: {}", e)))?;

    CUSTOM_TABLE
        .set(table)
        .map_err(|_| JsValue::from_str("Failed to set compatibility table"))?;

    Ok(())
}

#[wasm_bindgen]
pub fn get_table_info() -> JsValue {
    let table = table();
    let result = js_sys::Object::new();
    let _ = js_sys::Reflect::set(&result, &"custom".into(), &JsValue::from(CUSTOM_TABLE.get().is_some()));
    let _ = js_sys::Reflect::set(&result, &"scriptlets".into(), &JsValue::from(table.scriptlets().len() as u32));
    let _ = js_sys::Reflect::set(&result, &"redirects".into(), &JsValue::from(table.redirects().len() as u32));
    result.into()
}

#[wasm_bindgen]
pub fn classify_rule(text: &str) -> JsValue {
    let result = js_sys::Object::new();
    match converter().classify(text) {
        RuleClassification::Rule { dialect, kind } => {
            let _ = js_sys::Reflect::set(&result, &"isRule".into(), &JsValue::from(true));
            let _ = js_sys::Reflect::set(&result, &"dialect".into(), &JsValue::from_str(dialect.as_str()));
            let _ = js_sys::Reflect::set(&result, &"kind".into(), &JsValue::from_str(kind_name(kind)));
        }
        RuleClassification::NotARule => {
            let _ = js_sys::Reflect::set(&result, &"isRule".into(), &JsValue::from(false));
        }
    }
    result.into()
}

#[wasm_bindgen]
pub fn is_valid_name(name: &str, kind: &str) -> bool {
    match kind.parse::<NameKind>() {
        Ok(kind) => converter().resolver().is_valid_name(name, kind),
        Err(_) => false,
    }
}

/// Returns an array of rule strings, or throws `{ kind, message }`.
#[wasm_bindgen]
pub fn convert_rule(text: &str, from: &str, to: &str) -> Result<JsValue, JsValue> {
    let from = parse_dialect(from)?;
    let to = parse_dialect(to)?;

    let rules = converter()
        .convert_rule(text, from, to)
        .map_err(to_js_error)?;

    let array = js_sys::Array::new();
    for rule in rules {
        array.push(&JsValue::from_str(&rule));
    }
    Ok(array.into())
}

#[wasm_bindgen]
pub fn resolve_redirect_name(name: &str, from: &str, to: &str) -> Result<String, JsValue> {
    let from = parse_dialect(from)?;
    let to = parse_dialect(to)?;
    converter()
        .resolver()
        .resolve_redirect_name(name, from, to)
        .map_err(to_js_error)
}

/// Validated call descriptors for the injection packager.
///
/// Names are given in AdGuard form, the dialect the packager injects.
#[wasm_bindgen]
pub fn get_scriptlet_calls(text: &str) -> Result<JsValue, JsValue> {
    let converter = converter();
    let resolver = converter.resolver();

    let (dialect, kind) = match converter.classify(text) {
        RuleClassification::Rule { dialect, kind } if kind.name_kind() == NameKind::Scriptlet => (dialect, kind),
        _ => return Err(to_js_error(Error::NotARule)),
    };
    let parsed = extract_calls(text, dialect, kind).map_err(to_js_error)?;

    let calls = js_sys::Array::new();
    for call in &parsed.calls {
        let resolved = resolver.resolve_call(call, dialect).map_err(to_js_error)?;
        let name = resolver
            .resolve_name(&call.name, dialect, Dialect::AdGuard, NameKind::Scriptlet)
            .map_err(to_js_error)?
            .target;

        let args = js_sys::Array::new();
        for arg in &resolved.args {
            args.push(&JsValue::from_str(arg));
        }

        let descriptor = js_sys::Object::new();
        let _ = js_sys::Reflect::set(&descriptor, &"name".into(), &JsValue::from_str(&name));
        let _ = js_sys::Reflect::set(&descriptor, &"canonical".into(), &JsValue::from_str(resolved.scriptlet.name()));
        let _ = js_sys::Reflect::set(&descriptor, &"args".into(), &args);
        let _ = js_sys::Reflect::set(&descriptor, &"domains".into(), &JsValue::from_str(parsed.domains));
        let _ = js_sys::Reflect::set(&descriptor, &"exception".into(), &JsValue::from(parsed.exception));
        calls.push(&descriptor);
    }

    Ok(calls.into())
}

#[wasm_bindgen]
pub fn convert_filter_list(
    text: &str,
    from: &str,
    to: &str,
    keep_unrecognized: Option<bool>,
) -> Result<JsValue, JsValue> {
    let from = parse_dialect(from)?;
    let to = parse_dialect(to)?;
    let options = ListOptions {
        keep_unrecognized: keep_unrecognized.unwrap_or(true),
        ..ListOptions::default()
    };

    let result = converter().convert_list(text, from, to, &options);
    let stats = result.stats;

    let js_result = js_sys::Object::new();
    let _ = js_sys::Reflect::set(&js_result, &"text".into(), &JsValue::from_str(&result.to_text()));
    let _ = js_sys::Reflect::set(&js_result, &"lines".into(), &JsValue::from(stats.lines as u32));
    let _ = js_sys::Reflect::set(&js_result, &"converted".into(), &JsValue::from(stats.converted as u32));
    let _ = js_sys::Reflect::set(&js_result, &"emitted".into(), &JsValue::from(stats.emitted as u32));
    let _ = js_sys::Reflect::set(&js_result, &"passedThrough".into(), &JsValue::from(stats.passed_through as u32));
    let _ = js_sys::Reflect::set(&js_result, &"failed".into(), &JsValue::from(stats.failed as u32));
    let _ = js_sys::Reflect::set(&js_result, &"deduped".into(), &JsValue::from(stats.deduped as u32));

    let failures = js_sys::Array::new_with_length(result.failures.len() as u32);
    for (i, failure) in result.failures.iter().enumerate() {
        let entry = js_sys::Object::new();
        let _ = js_sys::Reflect::set(&entry, &"line".into(), &JsValue::from(failure.line as u32));
        let _ = js_sys::Reflect::set(&entry, &"text".into(), &JsValue::from_str(&failure.text));
        let _ = js_sys::Reflect::set(&entry, &"error".into(), &JsValue::from_str(&failure.error));
        failures.set(i as u32, entry.into());
    }
    let _ = js_sys::Reflect::set(&js_result, &"failures".into(), &failures);

    Ok(js_result.into())
}

fn table() -> &'static CompatibilityTable {
    CUSTOM_TABLE.get().unwrap_or_else(CompatibilityTable::global)
}

fn converter() -> Converter<'static> {
    Converter::new(table())
}

fn parse_dialect(value: &str) -> Result<Dialect, JsValue> {
    value
        .parse::<Dialect>()
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

fn kind_name(kind: RuleKind) -> &'static str {
    match kind {
        RuleKind::ScriptletApply => "scriptletApply",
        RuleKind::ScriptletException => "scriptletException",
        RuleKind::RedirectApply => "redirectApply",
        RuleKind::RedirectException => "redirectException",
    }
}

fn error_kind(error: &Error) -> &'static str {
    match error {
        Error::NotARule => "notARule",
        Error::InvalidSyntax { .. } => "invalidSyntax",
        Error::NotFound { .. } => "notFound",
        Error::Conversion(_) => "conversion",
    }
}

fn to_js_error(error: Error) -> JsValue {
    let message = error.to_string();
    if !error.is_expected() {
        web_sys::console::warn_1(&JsValue::from_str(&message));
    }

    let result = js_sys::Object::new();
    let _ = js_sys::Reflect::set(&result, &"kind".into(), &JsValue::from_str(error_kind(&error)));
    let _ = js_sys::Reflect::set(&result, &"message".into(), &JsValue::from_str(&message));
    result.into()
}
