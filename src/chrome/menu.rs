//! Mobile navigation menu.

use std::cell::Cell;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Element, Event, HtmlElement, Node};

use crate::dom;

pub const ACTIVE_CLASS: &str = "active";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Toggle,
    NavLinkClicked,
    OutsideClick,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MenuState {
    open: bool,
}

impl MenuState {
    pub fn is_open(self) -> bool {
        self.open
    }

    /// Returns the new open state.
    pub fn apply(&mut self, action: MenuAction) -> bool {
        self.open = match action {
            MenuAction::Toggle => !self.open,
            MenuAction::NavLinkClicked | MenuAction::OutsideClick => false,
        };
        self.open
    }
}

struct MenuView {
    hamburger: Element,
    nav: Element,
    body: Option<HtmlElement>,
    state: Cell<MenuState>,
}

impl MenuView {
    fn dispatch(&self, action: MenuAction) {
        let mut state = self.state.get();
        let open = state.apply(action);
        self.state.set(state);
        if let Err(err) = self.render(open) {
            dom::report_error("menu", &err);
        }
    }

    fn render(&self, open: bool) -> Result<(), JsValue> {
        self.hamburger.class_list().toggle_with_force(ACTIVE_CLASS, open)?;
        self.nav.class_list().toggle_with_force(ACTIVE_CLASS, open)?;
        if let Some(body) = &self.body {
            if open {
                body.style().set_property("overflow", "hidden")?;
            } else {
                body.style().remove_property("overflow")?;
            }
        }
        Ok(())
    }

    fn contains(&self, event: &Event) -> bool {
        let target = event.target().and_then(|target| target.dyn_into::<Node>().ok());
        let target = target.as_ref();
        self.hamburger.contains(target) || self.nav.contains(target)
    }
}

pub fn init(document: &Document) -> Result<(), JsValue> {
    let (Some(hamburger), Some(nav)) = (
        document.query_selector(".hamburger")?,
        document.query_selector(".nav-menu")?,
    ) else {
        return Ok(());
    };

    let view = Rc::new(MenuView {
        hamburger: hamburger.clone(),
        nav,
        body: document.body(),
        state: Cell::new(MenuState::default()),
    });

    let toggle_view = Rc::clone(&view);
    dom::listen(&hamburger, "click", move |_event| {
        toggle_view.dispatch(MenuAction::Toggle);
    })?;

    for link in dom::query_all(document, ".nav-menu a") {
        let link_view = Rc::clone(&view);
        dom::listen(&link, "click", move |_event| {
            link_view.dispatch(MenuAction::NavLinkClicked);
        })?;
    }

    let outside_view = Rc::clone(&view);
    dom::listen(document, "click", move |event: Event| {
        if !outside_view.contains(&event) {
            outside_view.dispatch(MenuAction::OutsideClick);
        }
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_flips_and_links_close() {
        let mut state = MenuState::default();
        assert!(state.apply(MenuAction::Toggle));
        assert!(state.is_open());
        assert!(!state.apply(MenuAction::NavLinkClicked));
        assert!(state.apply(MenuAction::Toggle));
        assert!(!state.apply(MenuAction::Toggle));
    }

    #[test]
    fn outside_click_only_closes() {
        let mut state = MenuState::default();
        assert!(!state.apply(MenuAction::OutsideClick));
        state.apply(MenuAction::Toggle);
        assert!(!state.apply(MenuAction::OutsideClick));
        assert!(!state.is_open());
    }
}
