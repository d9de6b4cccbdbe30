//! Page chrome: navigation menu, in-page scrolling, lazy images and the FAQ.
//!
//! Each widget is independent; one failing to set up leaves the others working.

pub mod faq;
pub mod lazy_images;
pub mod menu;
pub mod scroll;

use std::rc::Rc;

use wasm_bindgen::prelude::*;
use web_sys::{Document, Window};

use crate::analytics::Analytics;
use crate::config::SiteConfig;
use crate::dom;

pub fn init(window: &Window, document: &Document, config: &SiteConfig, analytics: &Rc<Analytics>) {
    let results: [(&str, Result<(), JsValue>); 4] = [
        ("menu", menu::init(document)),
        ("smooth scroll", scroll::init(window, document, config)),
        ("lazy images", lazy_images::init(window, document)),
        ("faq", faq::init(document, analytics, config.faq_label_limit)),
    ];
    for (widget, result) in results {
        if let Err(err) = result {
            dom::report_error(widget, &err);
        }
    }
}
