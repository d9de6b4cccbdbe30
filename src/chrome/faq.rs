//! FAQ accordion.

use std::rc::Rc;

use serde_json::Value;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Element, HtmlElement};

use crate::analytics::Analytics;
use crate::analytics::classify;
use crate::dom;

pub const OPEN_GLYPH: &str = "−";
pub const CLOSED_GLYPH: &str = "+";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presentation {
    pub glyph: &'static str,
    pub max_height: String,
    pub padding_bottom: &'static str,
}

impl Presentation {
    pub fn for_state(open: bool, scroll_height: i32) -> Self {
        if open {
            Self {
                glyph: OPEN_GLYPH,
                max_height: format!("{}px", scroll_height),
                padding_bottom: "25px",
            }
        } else {
            Self {
                glyph: CLOSED_GLYPH,
                max_height: "0px".to_string(),
                padding_bottom: "0px",
            }
        }
    }
}

pub fn faq_label(question: &str, limit: usize) -> String {
    classify::truncate_chars(question, limit)
}

fn toggle(question: &Element, analytics: &Analytics, label_limit: usize) -> Result<(), JsValue> {
    let Some(item) = question.parent_element() else {
        return Ok(());
    };
    let open = item.class_list().toggle("active")?;

    let answer = item
        .query_selector(".faq-answer")?
        .and_then(|el| el.dyn_into::<HtmlElement>().ok());
    let scroll_height = answer.as_ref().map_or(0, |answer| answer.scroll_height());
    let presentation = Presentation::for_state(open, scroll_height);

    if let Some(glyph) = question.query_selector(".faq-toggle")? {
        glyph.set_text_content(Some(presentation.glyph));
    }
    if let Some(answer) = answer {
        let style = answer.style();
        style.set_property("max-height", &presentation.max_height)?;
        style.set_property("padding-bottom", presentation.padding_bottom)?;
    }

    let text = question
        .query_selector("h3")?
        .and_then(|heading| heading.text_content())
        .unwrap_or_default();
    analytics.track_event("faq_clicked", Some(Value::from(faq_label(&text, label_limit))));
    Ok(())
}

pub fn init(document: &Document, analytics: &Rc<Analytics>, label_limit: usize) -> Result<(), JsValue> {
    for question in dom::query_all(document, ".faq-question") {
        let analytics = Rc::clone(analytics);
        let target = question.clone();
        dom::listen(&question, "click", move |_event| {
            if let Err(err) = toggle(&target, &analytics, label_limit) {
                dom::report_error("faq", &err);
            }
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_and_closed_presentation() {
        let open = Presentation::for_state(true, 184);
        assert_eq!(open.glyph, "−");
        assert_eq!(open.max_height, "184px");
        assert_eq!(open.padding_bottom, "25px");

        let closed = Presentation::for_state(false, 184);
        assert_eq!(closed.glyph, "+");
        assert_eq!(closed.max_height, "0px");
        assert_eq!(closed.padding_bottom, "0px");
    }

    #[test]
    fn label_is_cut_on_characters() {
        let question = "How do I change arrows in Ragdoll Archers on a touch screen device?";
        let label = faq_label(question, 50);
        assert_eq!(label.chars().count(), 50);
        assert!(question.starts_with(&label));
        assert_eq!(faq_label("Is it free? ✅", 50), "Is it free? ✅");
    }
}
