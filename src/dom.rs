//! Thin helpers over `web_sys` shared by the three page units.

use js_sys::{Array, Object, Reflect};
use serde_json::Value;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    Document, Element, Event, EventTarget, PerformanceEntry, PerformanceObserver,
    PerformanceObserverEntryList, Window,
};

const LOG_PREFIX: &str = "[site]";

pub fn diag(message: &str) {
    web_sys::console::log_1(&JsValue::from_str(&format!("{} {}", LOG_PREFIX, message)));
}

pub fn warn(message: &str) {
    web_sys::console::warn_1(&JsValue::from_str(&format!("{} {}", LOG_PREFIX, message)));
}

pub fn report_error(context: &str, err: &JsValue) {
    web_sys::console::error_1(&JsValue::from_str(&format!(
        "{} {}: {}",
        LOG_PREFIX,
        context,
        js_value_to_string(err)
    )));
}

pub fn js_value_to_string(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{:?}", value))
}

pub fn now() -> f64 {
    js_sys::Date::now()
}

/// Snapshot of every element matching `selector` at call time.
pub fn query_all(document: &Document, selector: &str) -> Vec<Element> {
    let Ok(list) = document.query_selector_all(selector) else {
        return Vec::new();
    };
    (0..list.length())
        .filter_map(|i| list.item(i))
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .collect()
}

/// Registers `handler` for the page lifetime.
pub fn listen<F>(target: &EventTarget, event: &str, handler: F) -> Result<(), JsValue>
where
    F: FnMut(Event) + 'static,
{
    let closure = Closure::wrap(Box::new(handler) as Box<dyn FnMut(Event)>);
    target.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())?;
    closure.forget();
    Ok(())
}

pub fn has_global(window: &Window, name: &str) -> bool {
    Reflect::has(window.as_ref(), &JsValue::from_str(name)).unwrap_or(false)
}

pub fn js_object(entries: &[(&str, JsValue)]) -> Result<Object, JsValue> {
    let object = Object::new();
    for (key, value) in entries {
        Reflect::set(&object, &JsValue::from_str(key), value)?;
    }
    Ok(object)
}

pub fn set_global(window: &Window, name: &str, value: &JsValue) -> Result<(), JsValue> {
    Reflect::set(window.as_ref(), &JsValue::from_str(name), value)?;
    Ok(())
}

/// Lossy conversion of a page-supplied value; `undefined`/`null` become `None`.
pub fn js_to_json(value: &JsValue) -> Option<Value> {
    if value.is_undefined() || value.is_null() {
        return None;
    }
    if let Some(number) = value.as_f64() {
        return serde_json::Number::from_f64(number).map(Value::Number);
    }
    if let Some(text) = value.as_string() {
        return Some(Value::String(text));
    }
    if let Some(flag) = value.as_bool() {
        return Some(Value::Bool(flag));
    }
    let text = js_sys::JSON::stringify(value).ok()?.as_string()?;
    serde_json::from_str(&text).ok()
}

pub fn json_to_js(value: &Value) -> Result<JsValue, JsValue> {
    js_sys::JSON::parse(&value.to_string())
}

/// Observes navigation and resource timing entries. Returns `false` when the
/// browser has no PerformanceObserver.
pub fn observe_performance<F>(window: &Window, mut handler: F) -> Result<bool, JsValue>
where
    F: FnMut(String, f64) + 'static,
{
    if !has_global(window, "PerformanceObserver") {
        return Ok(false);
    }

    let callback = Closure::wrap(Box::new(
        move |list: PerformanceObserverEntryList, _observer: PerformanceObserver| {
            for entry in list.get_entries().iter() {
                let Ok(entry) = entry.dyn_into::<PerformanceEntry>() else {
                    continue;
                };
                handler(entry.name(), entry.duration());
            }
        },
    ) as Box<dyn FnMut(PerformanceObserverEntryList, PerformanceObserver)>);

    let observer = PerformanceObserver::new(callback.as_ref().unchecked_ref())?;
    callback.forget();

    let entry_types = Array::of2(&JsValue::from_str("navigation"), &JsValue::from_str("resource"));
    let init = js_object(&[("entryTypes", entry_types.into())])?;
    observer.observe(init.unchecked_ref());
    Ok(true)
}
