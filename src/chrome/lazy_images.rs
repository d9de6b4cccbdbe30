//! Deferred image loading for `img[data-src]`.

use js_sys::Array;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Element, HtmlImageElement, IntersectionObserver, IntersectionObserverEntry, Window};

use crate::dom;

const SELECTOR: &str = "img[data-src]";
const PENDING_CLASS: &str = "lazy-load";

fn reveal(image: &Element) -> Result<(), JsValue> {
    let Ok(image) = image.clone().dyn_into::<HtmlImageElement>() else {
        return Ok(());
    };
    if let Some(src) = image.get_attribute("data-src") {
        image.set_src(&src);
    }
    image.class_list().remove_1(PENDING_CLASS)?;
    Ok(())
}

/// Swaps each image in as it nears the viewport, or all of them at once when
/// the browser has no IntersectionObserver.
pub fn init(window: &Window, document: &Document) -> Result<(), JsValue> {
    let images = dom::query_all(document, SELECTOR);
    if images.is_empty() {
        return Ok(());
    }

    if !dom::has_global(window, "IntersectionObserver") {
        for image in &images {
            reveal(image)?;
        }
        return Ok(());
    }

    let callback = Closure::wrap(Box::new(|entries: Array, observer: IntersectionObserver| {
        for entry in entries.iter() {
            let entry: IntersectionObserverEntry = entry.unchecked_into();
            if !entry.is_intersecting() {
                continue;
            }
            let image = entry.target();
            if let Err(err) = reveal(&image) {
                dom::report_error("lazy image", &err);
            }
            observer.unobserve(&image);
        }
    }) as Box<dyn FnMut(Array, IntersectionObserver)>);

    let observer = IntersectionObserver::new(callback.as_ref().unchecked_ref())?;
    callback.forget();
    for image in &images {
        observer.observe(image);
    }
    Ok(())
}
