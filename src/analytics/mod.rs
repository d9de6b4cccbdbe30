//! Analytics reporting: the facade every page unit reports through, plus the
//! instrumentation installed on page-ready.

pub mod classify;
pub mod consent;
pub mod engagement;
pub mod events;
pub mod page;
pub mod reporter;

use std::cell::Cell;
use std::rc::Rc;

use serde::Deserialize;
use serde_json::Value;

use consent::{Consent, FlagStore};
use events::Event;
use reporter::{Command, NoopReporter, Params, Reporter};

pub const DEFAULT_CURRENCY: &str = "USD";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommerceAction {
    Purchase,
    AddToCart,
}

impl CommerceAction {
    pub fn parse(action: &str) -> Option<Self> {
        match action {
            "purchase" => Some(CommerceAction::Purchase),
            "add_to_cart" => Some(CommerceAction::AddToCart),
            _ => None,
        }
    }
}

/// Commerce payload as page scripts pass it. Fields are forwarded as given,
/// so a number where a string is usual (or the reverse) never drops the rest.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CommerceData {
    pub transaction_id: Option<Value>,
    pub value: Option<Value>,
    pub currency: Option<Value>,
    pub items: Option<Value>,
}

pub struct Analytics {
    reporter: Rc<dyn Reporter>,
    measurement_id: String,
    muted: Cell<bool>,
}

impl Analytics {
    pub fn new(reporter: Rc<dyn Reporter>, measurement_id: &str) -> Self {
        Self {
            reporter,
            measurement_id: measurement_id.to_string(),
            muted: Cell::new(false),
        }
    }

    /// Analytics that never reports.
    pub fn disabled() -> Self {
        let analytics = Self::new(Rc::new(NoopReporter), "");
        analytics.mute();
        analytics
    }

    /// Builds live analytics unless the visitor opted out, in which case
    /// `connect` is never called.
    pub fn for_consent<S, F>(consent: &Consent<S>, measurement_id: &str, connect: F) -> Self
    where
        S: FlagStore,
        F: FnOnce() -> Rc<dyn Reporter>,
    {
        if consent.is_opted_out() {
            return Self::disabled();
        }
        Self::new(connect(), measurement_id)
    }

    pub fn is_enabled(&self) -> bool {
        !self.muted.get()
    }

    /// Stops reporting for the rest of the page view.
    pub fn mute(&self) {
        self.muted.set(true);
    }

    pub fn dispatch(&self, command: Command) {
        if self.muted.get() {
            return;
        }
        self.reporter.dispatch(command);
    }

    pub fn emit(&self, event: Event) {
        self.dispatch(Command::Event {
            name: event.name,
            params: event.params,
        });
    }

    pub fn config(&self, params: Params) {
        self.dispatch(Command::Config {
            target: self.measurement_id.clone(),
            params,
        });
    }

    pub fn track_event(&self, name: &str, value: Option<Value>) {
        self.emit(events::tracked(name, value));
    }

    pub fn custom_event(
        &self,
        name: &str,
        category: Option<&str>,
        label: Option<&str>,
        value: Option<Value>,
    ) {
        self.emit(events::custom(
            name,
            category.unwrap_or("custom"),
            label.unwrap_or(""),
            value,
        ));
    }

    pub fn page_view(&self, path: &str, title: &str) {
        self.config(events::page_view(path, title));
    }

    pub fn commerce(&self, action: CommerceAction, data: &CommerceData) {
        let mut params = Params::new();
        let currency = match &data.currency {
            Some(Value::String(code)) if !code.is_empty() => Value::from(code.as_str()),
            _ => Value::from(DEFAULT_CURRENCY),
        };

        let name = match action {
            CommerceAction::Purchase => {
                if let Some(id) = &data.transaction_id {
                    params.insert("transaction_id".into(), id.clone());
                }
                "purchase"
            }
            CommerceAction::AddToCart => "add_to_cart",
        };
        params.insert("currency".into(), currency);
        if let Some(value) = &data.value {
            params.insert("value".into(), value.clone());
        }
        if let Some(items) = &data.items {
            params.insert("items".into(), items.clone());
        }

        self.dispatch(Command::Event {
            name: name.to_string(),
            params,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use consent::MemoryFlags;
    use reporter::RecordingReporter;
    use serde_json::json;

    fn recording() -> (Rc<RecordingReporter>, Analytics) {
        let reporter = Rc::new(RecordingReporter::new());
        let analytics = Analytics::new(reporter.clone(), "G-TEST");
        (reporter, analytics)
    }

    #[test]
    fn custom_event_defaults() {
        let (reporter, analytics) = recording();
        analytics.custom_event("bow_selected", None, None, None);
        analytics.custom_event("level_up", Some("progress"), Some("level"), Some(json!(4)));

        let events = reporter.events();
        assert_eq!(events[0].0, "bow_selected");
        assert_eq!(events[0].1["event_category"], json!("custom"));
        assert_eq!(events[0].1["event_label"], json!(""));
        assert!(!events[0].1.contains_key("value"));
        assert_eq!(events[1].1["value"], json!(4));
    }

    #[test]
    fn page_view_is_a_config_command() {
        let (reporter, analytics) = recording();
        analytics.page_view("/guide.html", "Guide");
        match &reporter.commands()[0] {
            Command::Config { target, params } => {
                assert_eq!(target, "G-TEST");
                assert_eq!(params["page_path"], json!("/guide.html"));
                assert_eq!(params["page_title"], json!("Guide"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn purchase_defaults_currency_to_usd() {
        let (reporter, analytics) = recording();
        let data = CommerceData {
            transaction_id: Some(json!("T-1")),
            value: Some(json!(4.99)),
            currency: None,
            items: Some(json!([{"item_id": "bow"}])),
        };
        analytics.commerce(CommerceAction::Purchase, &data);

        let (name, params) = &reporter.events()[0];
        assert_eq!(name, "purchase");
        assert_eq!(params["currency"], json!("USD"));
        assert_eq!(params["transaction_id"], json!("T-1"));
        assert_eq!(params["value"], json!(4.99));
        assert_eq!(params["items"][0]["item_id"], json!("bow"));
    }

    #[test]
    fn add_to_cart_keeps_given_currency_and_has_no_transaction() {
        let (reporter, analytics) = recording();
        let data = CommerceData {
            transaction_id: Some(json!("ignored")),
            currency: Some(json!("EUR")),
            ..CommerceData::default()
        };
        analytics.commerce(CommerceAction::AddToCart, &data);

        let (name, params) = &reporter.events()[0];
        assert_eq!(name, "add_to_cart");
        assert_eq!(params["currency"], json!("EUR"));
        assert!(!params.contains_key("transaction_id"));
        assert!(!params.contains_key("value"));
    }

    #[test]
    fn commerce_payload_from_page_json() {
        let data: CommerceData =
            serde_json::from_str(r#"{"transactionId":"T-9","value":10,"items":[]}"#).unwrap();
        assert_eq!(data.transaction_id, Some(json!("T-9")));
        assert_eq!(data.value, Some(json!(10)));
        assert_eq!(data.currency, None);
        assert_eq!(CommerceAction::parse("refund"), None);
    }

    #[test]
    fn loosely_typed_commerce_fields_survive() {
        let (reporter, analytics) = recording();
        let data: CommerceData =
            serde_json::from_str(r#"{"transactionId":12345,"value":"9.99","items":[{"item_id":"bow"}]}"#)
                .unwrap();
        analytics.commerce(CommerceAction::Purchase, &data);

        let (name, params) = &reporter.events()[0];
        assert_eq!(name, "purchase");
        assert_eq!(params["transaction_id"], json!(12345));
        assert_eq!(params["value"], json!("9.99"));
        assert_eq!(params["items"][0]["item_id"], json!("bow"));
        assert_eq!(params["currency"], json!("USD"));
    }

    #[test]
    fn null_commerce_fields_are_omitted() {
        let (reporter, analytics) = recording();
        let data: CommerceData =
            serde_json::from_str(r#"{"transactionId":null,"value":null,"currency":null}"#).unwrap();
        analytics.commerce(CommerceAction::Purchase, &data);

        let (_, params) = &reporter.events()[0];
        assert!(!params.contains_key("transaction_id"));
        assert!(!params.contains_key("value"));
        assert_eq!(params["currency"], json!("USD"));
    }

    #[test]
    fn muted_analytics_drops_everything() {
        let (reporter, analytics) = recording();
        analytics.track_event("before", None);
        analytics.mute();
        analytics.track_event("after", None);
        analytics.page_view("/", "Home");
        assert_eq!(reporter.event_names(), vec!["before"]);
        assert_eq!(reporter.commands().len(), 1);
        assert!(!analytics.is_enabled());
    }

    #[test]
    fn opted_out_visitor_never_connects() {
        let consent = Consent::new(MemoryFlags::default(), "analytics_disabled");
        consent.opt_out();

        let mut connected = false;
        let analytics = Analytics::for_consent(&consent, "G-TEST", || {
            connected = true;
            Rc::new(RecordingReporter::new())
        });
        assert!(!connected);
        assert!(!analytics.is_enabled());
    }

    #[test]
    fn consenting_visitor_connects() {
        let consent = Consent::new(MemoryFlags::default(), "analytics_disabled");
        let reporter = Rc::new(RecordingReporter::new());
        let shared = reporter.clone();
        let analytics = Analytics::for_consent(&consent, "G-TEST", move || shared);
        analytics.track_event("hello", None);
        assert!(analytics.is_enabled());
        assert_eq!(reporter.event_names(), vec!["hello"]);
    }
}
