//! The analytics backend as a capability handed to each page unit.

use std::cell::RefCell;

use js_sys::{Function, Reflect};
use serde_json::{Map, Value};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

use crate::dom;

pub type Params = Map<String, Value>;

/// One `(command, target, parameters)` call on the backend handle.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Js,
    Config { target: String, params: Params },
    Event { name: String, params: Params },
}

pub trait Reporter {
    fn dispatch(&self, command: Command);
}

pub struct NoopReporter;

impl Reporter for NoopReporter {
    fn dispatch(&self, _command: Command) {}
}

/// Keeps every dispatched command, in order.
#[derive(Default)]
pub struct RecordingReporter {
    commands: RefCell<Vec<Command>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> Vec<Command> {
        self.commands.borrow().clone()
    }

    pub fn events(&self) -> Vec<(String, Params)> {
        self.commands
            .borrow()
            .iter()
            .filter_map(|command| match command {
                Command::Event { name, params } => Some((name.clone(), params.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn event_names(&self) -> Vec<String> {
        self.events().into_iter().map(|(name, _)| name).collect()
    }
}

impl Reporter for RecordingReporter {
    fn dispatch(&self, command: Command) {
        self.commands.borrow_mut().push(command);
    }
}

/// Forwards to `window.gtag`, looked up on every call. Does nothing while the
/// tag is not installed.
pub struct GtagReporter;

impl GtagReporter {
    fn handle() -> Option<Function> {
        let window = web_sys::window()?;
        Reflect::get(window.as_ref(), &JsValue::from_str("gtag"))
            .ok()?
            .dyn_into::<Function>()
            .ok()
    }

    fn call(gtag: &Function, command: Command) -> Result<(), JsValue> {
        match command {
            Command::Js => {
                gtag.call2(
                    &JsValue::UNDEFINED,
                    &JsValue::from_str("js"),
                    &js_sys::Date::new_0().into(),
                )?;
            }
            Command::Config { target, params } => {
                gtag.call3(
                    &JsValue::UNDEFINED,
                    &JsValue::from_str("config"),
                    &JsValue::from_str(&target),
                    &dom::json_to_js(&Value::Object(params))?,
                )?;
            }
            Command::Event { name, params } => {
                gtag.call3(
                    &JsValue::UNDEFINED,
                    &JsValue::from_str("event"),
                    &JsValue::from_str(&name),
                    &dom::json_to_js(&Value::Object(params))?,
                )?;
            }
        }
        Ok(())
    }
}

impl Reporter for GtagReporter {
    fn dispatch(&self, command: Command) {
        let Some(gtag) = Self::handle() else {
            return;
        };
        if let Err(err) = Self::call(&gtag, command) {
            dom::report_error("gtag", &err);
        }
    }
}
