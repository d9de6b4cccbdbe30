//! Binds a [`GameLoader`] to the `.game-wrapper` markup: feeds it frame and
//! message events, runs its timers on `setTimeout`, and renders its effects.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use js_sys::{Object, Reflect};
use serde_json::Value;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Event, HtmlElement, HtmlIFrameElement, MessageEvent, Window};

use super::loader::{Effect, Failure, GameLoader};
use super::overlay;
use crate::analytics::Analytics;
use crate::analytics::classify;
use crate::config::SiteConfig;
use crate::dom;

const WRAPPER_SELECTOR: &str = ".game-wrapper";
const FRAME_SELECTOR: &str = ".game-wrapper iframe";
const SANDBOX: &str = "allow-scripts allow-same-origin allow-forms allow-popups";
const REFERRER_POLICY: &str = "strict-origin-when-cross-origin";

pub struct GameEmbed {
    window: Window,
    document: Document,
    wrapper: HtmlElement,
    iframe: HtmlIFrameElement,
    config: SiteConfig,
    analytics: Rc<Analytics>,
    loader: RefCell<GameLoader>,
    source: RefCell<String>,
    overlay: RefCell<Option<HtmlElement>>,
    timer_handle: Cell<Option<i32>>,
    on_timer: Closure<dyn FnMut()>,
    on_retry: Closure<dyn FnMut()>,
}

impl GameEmbed {
    /// Returns `Ok(None)` without touching the page when the wrapper or its
    /// frame is missing.
    pub fn init(
        window: &Window,
        document: &Document,
        config: &SiteConfig,
        analytics: &Rc<Analytics>,
    ) -> Result<Option<Rc<Self>>, JsValue> {
        let Some(wrapper) = document.query_selector(WRAPPER_SELECTOR)? else {
            return Ok(None);
        };
        let Some(iframe) = document.query_selector(FRAME_SELECTOR)? else {
            return Ok(None);
        };
        let wrapper = wrapper.dyn_into::<HtmlElement>()?;
        let iframe = iframe.dyn_into::<HtmlIFrameElement>()?;

        harden(&iframe)?;
        overlay::ensure_styles(document)?;
        wrapper.style().set_property("position", "relative")?;

        let embed = Rc::new_cyclic(|weak: &Weak<Self>| {
            let timer_weak = weak.clone();
            let on_timer = Closure::wrap(Box::new(move || {
                if let Some(embed) = timer_weak.upgrade() {
                    embed.timer_handle.set(None);
                    embed.step(GameLoader::tick);
                }
            }) as Box<dyn FnMut()>);

            let retry_weak = weak.clone();
            let on_retry = Closure::wrap(Box::new(move || {
                if let Some(embed) = retry_weak.upgrade() {
                    embed.retry();
                }
            }) as Box<dyn FnMut()>);

            Self {
                window: window.clone(),
                document: document.clone(),
                source: RefCell::new(frame_source(&iframe)),
                wrapper,
                iframe,
                config: config.clone(),
                analytics: Rc::clone(analytics),
                loader: RefCell::new(GameLoader::new(config.loader, config.tips.len())),
                overlay: RefCell::new(None),
                timer_handle: Cell::new(None),
                on_timer,
                on_retry,
            }
        });

        Self::subscribe(&embed)?;
        embed.step(GameLoader::start);
        dom::diag("game loader armed");
        Ok(Some(embed))
    }

    /// Reloads the frame after an error; ignored in any other phase.
    pub fn retry(&self) {
        self.step(GameLoader::retry);
    }

    fn subscribe(embed: &Rc<Self>) -> Result<(), JsValue> {
        let weak = Rc::downgrade(embed);
        dom::listen(&embed.iframe, "load", move |_event| {
            if let Some(embed) = weak.upgrade() {
                embed.step(GameLoader::on_load);
            }
        })?;

        let weak = Rc::downgrade(embed);
        dom::listen(&embed.iframe, "error", move |_event| {
            if let Some(embed) = weak.upgrade() {
                embed.step(|loader, now| loader.on_failure(Failure::Network, now));
            }
        })?;

        let weak = Rc::downgrade(embed);
        dom::listen(&embed.window, "message", move |event: Event| {
            let Some(embed) = weak.upgrade() else {
                return;
            };
            let Ok(message) = event.dyn_into::<MessageEvent>() else {
                return;
            };
            if embed.is_game_error(&message) {
                embed.step(|loader, now| loader.on_failure(Failure::GameReported, now));
            }
        })?;

        let analytics = Rc::clone(&embed.analytics);
        dom::listen(&embed.wrapper, "click", move |_event| {
            analytics.track_event("game_area_clicked", None);
        })?;

        let analytics = Rc::clone(&embed.analytics);
        let marker = embed.config.game_asset_marker.clone();
        dom::observe_performance(&embed.window, move |name, duration| {
            if classify::is_game_asset(&name, &marker) {
                analytics.track_event("game_performance", Some(Value::from(duration.round() as i64)));
            }
        })?;
        Ok(())
    }

    /// Only messages posted by the game's own window count.
    fn is_game_error(&self, message: &MessageEvent) -> bool {
        let (Some(source), Some(frame_window)) = (message.source(), self.iframe.content_window())
        else {
            return false;
        };
        if !Object::is(source.as_ref(), frame_window.as_ref()) {
            return false;
        }
        let data = message.data();
        if !data.is_object() {
            return false;
        }
        Reflect::get(&data, &JsValue::from_str("type"))
            .ok()
            .and_then(|kind| kind.as_string())
            .is_some_and(|kind| kind == "error")
    }

    fn step<F>(&self, input: F)
    where
        F: FnOnce(&mut GameLoader, f64) -> Vec<Effect>,
    {
        let effects = input(&mut self.loader.borrow_mut(), dom::now());
        for effect in effects {
            if let Err(err) = self.apply(effect) {
                dom::report_error("game overlay", &err);
            }
        }
        self.reschedule();
    }

    fn apply(&self, effect: Effect) -> Result<(), JsValue> {
        match effect {
            Effect::ShowLoading => {
                let tip = self.tip_text(self.loader.borrow().tip());
                let node = overlay::loading(&self.document, &self.config.game_title, tip)?;
                self.replace_overlay(node)?;
            }
            Effect::ShowError(message) => {
                let node = overlay::error(&self.document, &message, &self.config.guide_url)?;
                if let Some(button) = overlay::retry_button(&node)? {
                    button.set_onclick(Some(self.on_retry.as_ref().unchecked_ref()));
                }
                self.replace_overlay(node)?;
            }
            Effect::RotateTip(index) => {
                if let Some(node) = self.overlay.borrow().as_ref() {
                    overlay::set_tip(node, self.tip_text(index))?;
                }
            }
            Effect::FadeOverlay => {
                if let Some(node) = self.overlay.borrow().as_ref() {
                    overlay::fade(node)?;
                }
            }
            Effect::RemoveOverlay => {
                if let Some(node) = self.overlay.borrow_mut().take() {
                    node.remove();
                }
            }
            Effect::ClearSource => {
                // A failure during the restore delay leaves the frame cleared.
                let current = frame_source(&self.iframe);
                if !current.is_empty() {
                    *self.source.borrow_mut() = current;
                }
                self.iframe.set_src("");
            }
            Effect::RestoreSource => {
                self.iframe.set_src(&self.source.borrow());
            }
            Effect::Track(name, value) => self.analytics.track_event(name, value),
        }
        Ok(())
    }

    fn replace_overlay(&self, node: HtmlElement) -> Result<(), JsValue> {
        if let Some(previous) = self.overlay.borrow_mut().take() {
            previous.remove();
        }
        self.wrapper.append_child(&node)?;
        *self.overlay.borrow_mut() = Some(node);
        Ok(())
    }

    fn tip_text(&self, index: usize) -> &str {
        self.config.tips.get(index).map(String::as_str).unwrap_or("")
    }

    /// Keeps a single pending timeout aimed at the loader's next deadline.
    fn reschedule(&self) {
        if let Some(handle) = self.timer_handle.take() {
            self.window.clear_timeout_with_handle(handle);
        }
        let Some(deadline) = self.loader.borrow().next_deadline() else {
            return;
        };
        let delay = (deadline - dom::now()).max(0.0).ceil() as i32;
        match self
            .window
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                self.on_timer.as_ref().unchecked_ref(),
                delay,
            ) {
            Ok(handle) => self.timer_handle.set(Some(handle)),
            Err(err) => dom::report_error("setTimeout", &err),
        }
    }
}

impl Drop for GameEmbed {
    fn drop(&mut self) {
        if let Some(handle) = self.timer_handle.take() {
            self.window.clear_timeout_with_handle(handle);
        }
    }
}

/// The `src` attribute as written. The reflected property resolves an empty
/// value to the page URL.
fn frame_source(iframe: &HtmlIFrameElement) -> String {
    iframe.get_attribute("src").unwrap_or_default()
}

fn harden(iframe: &HtmlIFrameElement) -> Result<(), JsValue> {
    iframe.set_attribute("loading", "lazy")?;
    iframe.set_attribute("sandbox", SANDBOX)?;
    iframe.set_attribute("referrerpolicy", REFERRER_POLICY)?;
    Ok(())
}
