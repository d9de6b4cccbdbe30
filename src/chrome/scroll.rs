//! Smooth in-page navigation under the fixed header.

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Event, HtmlElement, ScrollToOptions, Window};

use crate::analytics::{Analytics, events};
use crate::config::SiteConfig;
use crate::dom;

/// Element id addressed by an in-page link, if any.
pub fn fragment_target(href: &str) -> Option<&str> {
    href.strip_prefix('#').filter(|id| !id.is_empty())
}

pub fn scroll_top_for(offset_top: f64, header_offset: f64) -> f64 {
    offset_top - header_offset
}

/// Smooth-scrolls so the element with `id` sits just below the header.
/// Returns `false` when no such element exists.
pub fn scroll_to_id(
    window: &Window,
    document: &Document,
    id: &str,
    header_offset: f64,
) -> Result<bool, JsValue> {
    let Some(target) = document.get_element_by_id(id) else {
        return Ok(false);
    };
    let Ok(target) = target.dyn_into::<HtmlElement>() else {
        return Ok(false);
    };
    let top = scroll_top_for(f64::from(target.offset_top()), header_offset);
    let options = dom::js_object(&[
        ("top", JsValue::from_f64(top)),
        ("behavior", JsValue::from_str("smooth")),
    ])?;
    window.scroll_to_with_scroll_to_options(options.unchecked_ref::<ScrollToOptions>());
    Ok(true)
}

pub fn scroll_to_game(
    window: &Window,
    document: &Document,
    config: &SiteConfig,
    analytics: &Analytics,
) -> Result<(), JsValue> {
    if scroll_to_id(window, document, &config.game_section_id, config.header_offset)? {
        analytics.emit(events::scroll_to_game());
    }
    Ok(())
}

pub fn init(window: &Window, document: &Document, config: &SiteConfig) -> Result<(), JsValue> {
    for link in dom::query_all(document, r##"a[href^="#"]"##) {
        let window = window.clone();
        let document = document.clone();
        let header_offset = config.header_offset;
        let anchor = link.clone();
        dom::listen(&link, "click", move |event: Event| {
            event.prevent_default();
            let href = anchor.get_attribute("href").unwrap_or_default();
            let Some(id) = fragment_target(&href) else {
                return;
            };
            if let Err(err) = scroll_to_id(&window, &document, id, header_offset) {
                dom::report_error("smooth scroll", &err);
            }
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragments() {
        assert_eq!(fragment_target("#game"), Some("game"));
        assert_eq!(fragment_target("#"), None);
        assert_eq!(fragment_target("/guide.html#faq"), None);
    }

    #[test]
    fn header_is_subtracted() {
        assert_eq!(scroll_top_for(1200.0, 80.0), 1120.0);
        assert_eq!(scroll_top_for(40.0, 80.0), -40.0);
    }
}
