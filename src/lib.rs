//! Browser scripting for the Ragdoll Archers landing page, compiled to wasm.
//!
//! Three independent units start at page-ready: analytics instrumentation,
//! the game embed loader, and the page chrome widgets. A handful of functions
//! are published on `window` for inline `onclick` handlers and page scripts.

pub mod analytics;
pub mod chrome;
pub mod config;
pub mod dom;
pub mod game;

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::Reflect;
use wasm_bindgen::closure::WasmClosure;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Window};

use analytics::consent::{Consent, LocalStorageFlags};
use analytics::reporter::{GtagReporter, Reporter};
use analytics::{Analytics, CommerceAction, CommerceData};
use config::SiteConfig;
use game::GameEmbed;

/// Everything the `window` entry points need after boot.
struct Site {
    window: Window,
    document: Document,
    config: SiteConfig,
    consent: Consent<LocalStorageFlags>,
    analytics: Rc<Analytics>,
    embed: Option<Rc<GameEmbed>>,
}

thread_local! {
    static SITE: RefCell<Option<Rc<Site>>> = const { RefCell::new(None) };
}

/// Runs `f` against the booted site. Returns `None` before page-ready.
fn with_site<R, F: FnOnce(&Site) -> R>(f: F) -> Option<R> {
    let site = SITE.with(|slot| slot.borrow().clone());
    site.map(|site| f(&site))
}

/// The opt-out flag as boot will read it, for calls that arrive earlier.
fn early_consent() -> Option<(Window, Consent<LocalStorageFlags>)> {
    let window = web_sys::window()?;
    let document = window.document()?;
    let config = SiteConfig::from_document(&document);
    let consent = Consent::new(LocalStorageFlags::new(&window), &config.opt_out_key);
    Some((window, consent))
}

/// Persists the opt-out and silences the current page view.
pub fn disable_analytics() {
    let booted = with_site(|site| {
        site.consent.opt_out();
        site.analytics.mute();
    });
    if booted.is_none() {
        if let Some((_, consent)) = early_consent() {
            consent.opt_out();
        }
    }
    dom::diag("analytics disabled by user preference");
}

/// Clears the opt-out and reloads so analytics boot from scratch.
pub fn enable_analytics() {
    let window = match with_site(|site| {
        site.consent.opt_in();
        site.window.clone()
    }) {
        Some(window) => Some(window),
        None => early_consent().map(|(window, consent)| {
            consent.opt_in();
            window
        }),
    };
    if let Some(window) = window {
        if let Err(err) = window.location().reload() {
            dom::report_error("reload", &err);
        }
    }
}

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();

    if let Err(err) = start_impl() {
        dom::report_error("start", &err);
    }
}

fn start_impl() -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("missing window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("missing document"))?;

    expose_globals(&window)?;

    let ready_state = Reflect::get(document.as_ref(), &JsValue::from_str("readyState"))?
        .as_string()
        .unwrap_or_default();
    if ready_state != "loading" {
        boot(window, document);
        return Ok(());
    }

    let mut pending = Some((window, document.clone()));
    dom::listen(&document, "DOMContentLoaded", move |_event| {
        if let Some((window, document)) = pending.take() {
            boot(window, document);
        }
    })
}

fn boot(window: Window, document: Document) {
    let config = SiteConfig::from_document(&document);
    let consent = Consent::new(LocalStorageFlags::new(&window), &config.opt_out_key);
    let analytics = Rc::new(Analytics::for_consent(
        &consent,
        &config.measurement_id,
        || -> Rc<dyn Reporter> { Rc::new(GtagReporter) },
    ));

    if analytics.is_enabled() {
        if let Err(err) = analytics::page::install(&window, &document, &config, &analytics) {
            dom::report_error("analytics", &err);
        }
    } else {
        dom::diag("analytics disabled by user preference");
    }

    let embed = match GameEmbed::init(&window, &document, &config, &analytics) {
        Ok(embed) => embed,
        Err(err) => {
            dom::report_error("game loader", &err);
            None
        }
    };

    chrome::init(&window, &document, &config, &analytics);

    let site = Rc::new(Site {
        window,
        document,
        config,
        consent,
        analytics,
        embed,
    });
    SITE.with(|slot| *slot.borrow_mut() = Some(site));
}

fn expose<T>(window: &Window, name: &str, closure: Closure<T>) -> Result<(), JsValue>
where
    T: ?Sized + WasmClosure,
{
    dom::set_global(window, name, closure.as_ref())?;
    closure.forget();
    Ok(())
}

/// String argument from page script; `undefined`, `null` and `""` count as absent.
fn text_arg(value: &JsValue) -> Option<String> {
    value.as_string().filter(|text| !text.is_empty())
}

fn commerce_data(value: &JsValue) -> CommerceData {
    let Some(json) = dom::js_to_json(value) else {
        return CommerceData::default();
    };
    match serde_json::from_value(json) {
        Ok(data) => data,
        Err(err) => {
            dom::warn(&format!("ignoring malformed commerce data: {}", err));
            CommerceData::default()
        }
    }
}

fn expose_globals(window: &Window) -> Result<(), JsValue> {
    let track_custom_event = Closure::wrap(Box::new(
        |name: JsValue, category: JsValue, label: JsValue, value: JsValue| {
            let Some(name) = text_arg(&name) else {
                return;
            };
            with_site(|site| {
                site.analytics.custom_event(
                    &name,
                    category.as_string().as_deref(),
                    label.as_string().as_deref(),
                    dom::js_to_json(&value),
                );
            });
        },
    ) as Box<dyn FnMut(JsValue, JsValue, JsValue, JsValue)>);
    expose(window, "trackCustomEvent", track_custom_event)?;

    let track_page_view = Closure::wrap(Box::new(|path: JsValue, title: JsValue| {
        with_site(|site| {
            let path = text_arg(&path)
                .unwrap_or_else(|| site.window.location().pathname().unwrap_or_default());
            let title = text_arg(&title).unwrap_or_else(|| site.document.title());
            site.analytics.page_view(&path, &title);
        });
    }) as Box<dyn FnMut(JsValue, JsValue)>);
    expose(window, "trackPageView", track_page_view)?;

    let track_ecommerce = Closure::wrap(Box::new(|action: JsValue, data: JsValue| {
        let Some(action) = action.as_string().as_deref().and_then(CommerceAction::parse) else {
            return;
        };
        let data = commerce_data(&data);
        with_site(|site| site.analytics.commerce(action, &data));
    }) as Box<dyn FnMut(JsValue, JsValue)>);
    expose(window, "trackEcommerce", track_ecommerce)?;

    let disable = Closure::wrap(Box::new(disable_analytics) as Box<dyn FnMut()>);
    expose(window, "disableAnalytics", disable)?;

    let enable = Closure::wrap(Box::new(enable_analytics) as Box<dyn FnMut()>);
    expose(window, "enableAnalytics", enable)?;

    let retry_game_load = Closure::wrap(Box::new(|| {
        with_site(|site| {
            if let Some(embed) = &site.embed {
                embed.retry();
            }
        });
    }) as Box<dyn FnMut()>);
    expose(window, "retryGameLoad", retry_game_load)?;

    let scroll_to_game = Closure::wrap(Box::new(|| {
        with_site(|site| {
            if let Err(err) =
                chrome::scroll::scroll_to_game(&site.window, &site.document, &site.config, &site.analytics)
            {
                dom::report_error("scrollToGame", &err);
            }
        });
    }) as Box<dyn FnMut()>);
    expose(window, "scrollToGame", scroll_to_game)?;

    let track_event = Closure::wrap(Box::new(|name: JsValue, value: JsValue| {
        let Some(name) = text_arg(&name) else {
            return;
        };
        let value = dom::js_to_json(&value);
        dom::diag(&format!("event tracked: {}", name));
        with_site(|site| site.analytics.track_event(&name, value));
    }) as Box<dyn FnMut(JsValue, JsValue)>);
    expose(window, "trackEvent", track_event)?;

    Ok(())
}
