//! Page-ready instrumentation. Element listeners are attached to a snapshot of
//! the document taken here; elements inserted later are not instrumented.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use js_sys::{Array, Function, Reflect};
use serde_json::Value;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    Document, ErrorEvent, HtmlAnchorElement, HtmlIFrameElement, HtmlInputElement,
    HtmlScriptElement, IntersectionObserver, IntersectionObserverEntry, Window,
};

use super::Analytics;
use super::classify;
use super::engagement::{
    self, EngagedScroll, MilestoneTracker, SectionSighting, SessionClock, Throttle,
    ThrottleDecision, VisibilityTimer,
};
use super::events;
use super::reporter::Command;
use crate::config::SiteConfig;
use crate::dom;

const TAG_URL: &str = "https://www.googletagmanager.com/gtag/js";
const ENGAGED_SCROLL_INTERVAL_MS: f64 = 1000.0;
const MILESTONE_SCROLL_INTERVAL_MS: f64 = 250.0;
const GAME_VISIBILITY_THRESHOLD: f64 = 0.5;

pub fn install(
    window: &Window,
    document: &Document,
    config: &SiteConfig,
    analytics: &Rc<Analytics>,
) -> Result<(), JsValue> {
    if install_tag(window, document, &config.measurement_id)? {
        analytics.dispatch(Command::Js);
        let location = window.location().href().unwrap_or_default();
        analytics.config(events::page_metadata(&document.title(), &location));
        dom::diag("analytics initialized");
    }

    track_links(window, document, analytics)?;
    track_search_inputs(document, analytics)?;
    track_forms(document, analytics)?;

    track_game_start(document, config, analytics)?;
    track_script_errors(window, config, analytics)?;
    track_game_timing(window, config, analytics)?;

    track_engaged_scroll(window, document, analytics)?;
    track_scroll_milestones(window, document, config, analytics)?;
    let game_view = track_game_visibility(window, document, config, analytics)?;
    track_session(window, document, analytics, game_view)?;

    set_user_properties(window, analytics);
    Ok(())
}

/// Loads the tag script and defines the `dataLayer`/`gtag` shim. Returns
/// `false` when a `gtag` handle already exists.
fn install_tag(window: &Window, document: &Document, measurement_id: &str) -> Result<bool, JsValue> {
    if dom::has_global(window, "gtag") {
        return Ok(false);
    }

    let script = document
        .create_element("script")?
        .dyn_into::<HtmlScriptElement>()?;
    script.set_async(true);
    script.set_src(&format!("{}?id={}", TAG_URL, measurement_id));
    if let Some(head) = document.head() {
        head.append_child(&script)?;
    }

    let data_layer = Reflect::get(window.as_ref(), &JsValue::from_str("dataLayer"))?;
    if data_layer.is_undefined() || data_layer.is_null() {
        dom::set_global(window, "dataLayer", &Array::new().into())?;
    }
    // gtag.js only accepts `arguments` objects, hence a real JS function.
    let gtag = Function::new_no_args("window.dataLayer.push(arguments);");
    dom::set_global(window, "gtag", &gtag.into())?;
    Ok(true)
}

fn track_links(window: &Window, document: &Document, analytics: &Rc<Analytics>) -> Result<(), JsValue> {
    let location = window.location();
    let hostname = location.hostname().unwrap_or_default();
    let path = location.pathname().unwrap_or_default();

    for element in dom::query_all(document, "a[href]") {
        let Ok(anchor) = element.dyn_into::<HtmlAnchorElement>() else {
            continue;
        };
        let href = anchor.get_attribute("href").unwrap_or_default();
        let targets = classify::classify_link(&href, &hostname);

        if targets.outbound {
            let analytics = Rc::clone(analytics);
            let link = anchor.clone();
            dom::listen(&anchor, "click", move |_event| {
                analytics.emit(events::outbound_click(&link.href()));
            })?;
        }
        if targets.download {
            let analytics = Rc::clone(analytics);
            let link = anchor.clone();
            dom::listen(&anchor, "click", move |_event| {
                analytics.emit(events::file_download(&link.href()));
            })?;
        }
        if let Some(platform) = targets.social {
            let analytics = Rc::clone(analytics);
            let path = path.clone();
            dom::listen(&anchor, "click", move |_event| {
                analytics.emit(events::share(platform, &path));
            })?;
        }
    }
    Ok(())
}

fn track_search_inputs(document: &Document, analytics: &Rc<Analytics>) -> Result<(), JsValue> {
    for element in dom::query_all(document, "input") {
        let Ok(input) = element.dyn_into::<HtmlInputElement>() else {
            continue;
        };
        let name = input.get_attribute("name").unwrap_or_default();
        if !classify::is_search_input(&input.type_(), &name) {
            continue;
        }

        let analytics = Rc::clone(analytics);
        let field = input.clone();
        dom::listen(&input, "blur", move |_event| {
            if let Some(term) = classify::search_term(&field.value()) {
                analytics.emit(events::search(&term));
            }
        })?;
    }
    Ok(())
}

fn track_forms(document: &Document, analytics: &Rc<Analytics>) -> Result<(), JsValue> {
    for form in dom::query_all(document, "form") {
        let analytics = Rc::clone(analytics);
        let target = form.clone();
        dom::listen(&form, "submit", move |_event| {
            let label = classify::form_label(&target.id(), &target.class_name());
            analytics.emit(events::form_submit(&label));
        })?;
    }
    Ok(())
}

fn track_game_start(document: &Document, config: &SiteConfig, analytics: &Rc<Analytics>) -> Result<(), JsValue> {
    let Some(iframe) = document
        .query_selector(".game-wrapper iframe")?
        .and_then(|el| el.dyn_into::<HtmlIFrameElement>().ok())
    else {
        return Ok(());
    };

    let analytics = Rc::clone(analytics);
    let label = config.game_label.clone();
    let frame = iframe.clone();
    dom::listen(&iframe, "load", move |_event| {
        // A retry blanks the frame first; that load is not the game.
        let src = frame.get_attribute("src").unwrap_or_default();
        if src.is_empty() || src == "about:blank" {
            return;
        }
        analytics.emit(events::game_start(&label));
    })
}

fn track_script_errors(window: &Window, config: &SiteConfig, analytics: &Rc<Analytics>) -> Result<(), JsValue> {
    let analytics = Rc::clone(analytics);
    let marker = config.game_asset_marker.clone();
    dom::listen(window, "error", move |event| {
        let Some(error) = event.dyn_ref::<ErrorEvent>() else {
            return;
        };
        if classify::is_game_asset(&error.filename(), &marker) {
            analytics.emit(events::exception(&error.message()));
        }
    })
}

fn track_game_timing(window: &Window, config: &SiteConfig, analytics: &Rc<Analytics>) -> Result<(), JsValue> {
    let analytics = Rc::clone(analytics);
    let marker = config.game_asset_marker.clone();
    dom::observe_performance(window, move |name, duration| {
        if classify::is_game_asset(&name, &marker) {
            analytics.emit(events::game_load_timing(duration));
        }
    })?;
    Ok(())
}

/// Calls `handler` on scroll, spaced by `throttle`. A trailing throttle runs
/// the deferred call from a timer.
fn on_scroll<F>(window: &Window, throttle: Throttle, handler: F) -> Result<(), JsValue>
where
    F: FnMut() + 'static,
{
    let handler = Rc::new(RefCell::new(handler));
    let throttle = Rc::new(RefCell::new(throttle));
    let pending: Rc<Cell<Option<i32>>> = Rc::new(Cell::new(None));

    let deferred = {
        let handler = Rc::clone(&handler);
        let throttle = Rc::clone(&throttle);
        let pending = Rc::clone(&pending);
        Closure::wrap(Box::new(move || {
            pending.set(None);
            throttle.borrow_mut().mark_run(dom::now());
            (&mut *handler.borrow_mut())();
        }) as Box<dyn FnMut()>)
    };

    let win = window.clone();
    dom::listen(window, "scroll", move |_event| {
        let decision = throttle.borrow_mut().poll(dom::now());
        match decision {
            ThrottleDecision::Run => (&mut *handler.borrow_mut())(),
            ThrottleDecision::Defer(delay) => {
                if let Some(handle) = pending.take() {
                    win.clear_timeout_with_handle(handle);
                }
                match win.set_timeout_with_callback_and_timeout_and_arguments_0(
                    deferred.as_ref().unchecked_ref(),
                    delay.ceil() as i32,
                ) {
                    Ok(handle) => pending.set(Some(handle)),
                    Err(err) => dom::report_error("scroll timer", &err),
                }
            }
            ThrottleDecision::Skip => {}
        }
    })
}

fn viewport_height(window: &Window) -> f64 {
    window
        .inner_height()
        .ok()
        .and_then(|height| height.as_f64())
        .unwrap_or(0.0)
}

fn track_engaged_scroll(window: &Window, document: &Document, analytics: &Rc<Analytics>) -> Result<(), JsValue> {
    let analytics = Rc::clone(analytics);
    let win = window.clone();
    let doc = document.clone();
    let mut engaged = EngagedScroll::default();

    on_scroll(window, Throttle::leading(ENGAGED_SCROLL_INTERVAL_MS), move || {
        let body_height = doc.body().map(|body| body.scroll_height() as f64).unwrap_or(0.0);
        let Some(depth) = engagement::scrollable_depth(
            win.scroll_y().unwrap_or(0.0),
            body_height,
            viewport_height(&win),
        ) else {
            return;
        };
        if engaged.observe(depth) {
            analytics.emit(events::engaged_scroll());
        }
    })
}

fn track_scroll_milestones(
    window: &Window,
    document: &Document,
    config: &SiteConfig,
    analytics: &Rc<Analytics>,
) -> Result<(), JsValue> {
    let analytics = Rc::clone(analytics);
    let win = window.clone();
    let doc = document.clone();
    let section_id = config.game_section_id.clone();
    let mut milestones = MilestoneTracker::default();
    let mut sighting = SectionSighting::default();

    on_scroll(window, Throttle::with_trailing(MILESTONE_SCROLL_INTERVAL_MS), move || {
        let viewport = viewport_height(&win);
        let document_height = doc
            .document_element()
            .map(|el| el.scroll_height() as f64)
            .unwrap_or(0.0);

        if let Some(depth) =
            engagement::viewport_depth(win.scroll_y().unwrap_or(0.0), viewport, document_height)
        {
            for milestone in milestones.observe(depth) {
                analytics.track_event(&engagement::milestone_event_name(milestone), None);
            }
        }

        if let Some(section) = doc.get_element_by_id(&section_id) {
            let rect = section.get_bounding_client_rect();
            if sighting.observe(rect.top(), rect.bottom(), viewport) {
                analytics.track_event("game_section_viewed", None);
            }
        }
    })
}

fn track_game_visibility(
    window: &Window,
    document: &Document,
    config: &SiteConfig,
    analytics: &Rc<Analytics>,
) -> Result<Rc<RefCell<VisibilityTimer>>, JsValue> {
    let timer = Rc::new(RefCell::new(VisibilityTimer::default()));
    let Some(section) = document.get_element_by_id(&config.game_section_id) else {
        return Ok(timer);
    };
    if !dom::has_global(window, "IntersectionObserver") {
        return Ok(timer);
    }

    let analytics = Rc::clone(analytics);
    let state = Rc::clone(&timer);
    let callback = Closure::wrap(Box::new(move |entries: Array, _observer: IntersectionObserver| {
        for entry in entries.iter() {
            let entry: IntersectionObserverEntry = entry.unchecked_into();
            let reached = state.borrow_mut().update(entry.is_intersecting(), dom::now());
            if let Some(seconds) = reached {
                analytics.emit(events::game_engagement(seconds));
            }
        }
    }) as Box<dyn FnMut(Array, IntersectionObserver)>);

    let init = dom::js_object(&[("threshold", JsValue::from_f64(GAME_VISIBILITY_THRESHOLD))])?;
    let observer =
        IntersectionObserver::new_with_options(callback.as_ref().unchecked_ref(), init.unchecked_ref())?;
    callback.forget();
    observer.observe(&section);
    Ok(timer)
}

fn track_session(
    window: &Window,
    document: &Document,
    analytics: &Rc<Analytics>,
    game_view: Rc<RefCell<VisibilityTimer>>,
) -> Result<(), JsValue> {
    let clock = SessionClock::start(dom::now());

    {
        let analytics = Rc::clone(analytics);
        dom::listen(window, "beforeunload", move |_event| {
            let now = dom::now();
            if let Some(seconds) = game_view.borrow_mut().update(false, now) {
                analytics.emit(events::game_engagement(seconds));
            }
            let seconds = clock.elapsed_secs(now);
            analytics.emit(events::session_duration(seconds));
            if seconds > engagement::ENGAGED_SESSION_SECS {
                analytics.track_event("engaged_user", Some(Value::from(seconds)));
            }
        })?;
    }

    let analytics = Rc::clone(analytics);
    let doc = document.clone();
    dom::listen(document, "visibilitychange", move |_event| {
        if !doc.hidden() {
            return;
        }
        let seconds = clock.elapsed_secs(dom::now());
        if seconds > engagement::HIDDEN_TAB_SECS {
            analytics.track_event("tab_hidden", Some(Value::from(seconds)));
        }
    })
}

fn set_user_properties(window: &Window, analytics: &Analytics) {
    let user_agent = window.navigator().user_agent().unwrap_or_default();
    analytics.config(events::user_properties(&user_agent));
}
