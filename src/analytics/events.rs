//! Event records sent to the analytics backend.

use serde_json::{Value, json};

use super::classify::{self, DeviceType};
use super::reporter::Params;

const USER_AGENT_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub name: String,
    pub params: Params,
}

impl Event {
    pub fn new(name: &str, params: Value) -> Self {
        Self {
            name: name.to_string(),
            params: into_params(params),
        }
    }

    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }
}

pub fn into_params(value: Value) -> Params {
    match value {
        Value::Object(map) => map,
        _ => Params::new(),
    }
}

pub fn outbound_click(url: &str) -> Event {
    Event::new(
        "click",
        json!({
            "event_category": "outbound",
            "event_label": url,
            "transport_type": "beacon",
        }),
    )
}

pub fn file_download(url: &str) -> Event {
    let (file_name, extension) = classify::download_file(url);
    Event::new(
        "file_download",
        json!({
            "event_category": "downloads",
            "event_label": file_name,
            "file_extension": extension,
        }),
    )
}

pub fn share(platform: &str, path: &str) -> Event {
    Event::new(
        "share",
        json!({
            "method": platform,
            "content_type": "webpage",
            "item_id": path,
        }),
    )
}

pub fn search(term: &str) -> Event {
    Event::new("search", json!({ "search_term": term }))
}

pub fn form_submit(label: &str) -> Event {
    Event::new(
        "form_submit",
        json!({
            "event_category": "engagement",
            "event_label": label,
        }),
    )
}

pub fn game_start(game_label: &str) -> Event {
    Event::new(
        "game_start",
        json!({
            "event_category": "games",
            "event_label": game_label,
            "value": 1,
        }),
    )
}

pub fn exception(description: &str) -> Event {
    Event::new(
        "exception",
        json!({
            "description": description,
            "fatal": false,
        }),
    )
}

pub fn game_load_timing(duration_ms: f64) -> Event {
    Event::new(
        "timing_complete",
        json!({
            "name": "game_load_time",
            "value": duration_ms.round() as i64,
        }),
    )
}

pub fn engaged_scroll() -> Event {
    Event::new(
        "scroll",
        json!({
            "event_category": "engagement",
            "event_label": "engaged_user",
        }),
    )
}

pub fn game_engagement(seconds: u64) -> Event {
    Event::new(
        "game_engagement",
        json!({
            "event_category": "games",
            "event_label": "time_spent",
            "value": seconds,
        }),
    )
}

pub fn session_duration(seconds: u64) -> Event {
    Event::new(
        "session_duration",
        json!({
            "event_category": "engagement",
            "value": seconds,
        }),
    )
}

pub fn scroll_to_game() -> Event {
    Event::new(
        "scroll_to_game",
        json!({
            "event_category": "engagement",
            "event_label": "cta_button",
        }),
    )
}

/// The generic helper's shape: category `engagement`, label = event name.
pub fn tracked(name: &str, value: Option<Value>) -> Event {
    let mut event = Event::new(
        name,
        json!({
            "event_category": "engagement",
            "event_label": name,
        }),
    );
    if let Some(value) = value {
        event.params.insert("value".to_string(), value);
    }
    event
}

pub fn custom(name: &str, category: &str, label: &str, value: Option<Value>) -> Event {
    let mut event = Event::new(
        name,
        json!({
            "event_category": category,
            "event_label": label,
        }),
    );
    if let Some(value) = value {
        event.params.insert("value".to_string(), value);
    }
    event
}

pub fn page_metadata(title: &str, location: &str) -> Params {
    into_params(json!({
        "page_title": title,
        "page_location": location,
    }))
}

pub fn page_view(path: &str, title: &str) -> Params {
    into_params(json!({
        "page_path": path,
        "page_title": title,
    }))
}

pub fn user_properties(user_agent: &str) -> Params {
    let device = DeviceType::from_user_agent(user_agent);
    into_params(json!({
        "custom_map": {
            "device_type": device.as_str(),
            "user_agent": classify::truncate_chars(user_agent, USER_AGENT_LIMIT),
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracked_omits_missing_value() {
        let event = tracked("game_area_clicked", None);
        assert_eq!(event.param("event_category"), Some(&json!("engagement")));
        assert_eq!(event.param("event_label"), Some(&json!("game_area_clicked")));
        assert!(event.param("value").is_none());

        let event = tracked("tab_hidden", Some(json!(42)));
        assert_eq!(event.param("value"), Some(&json!(42)));
    }

    #[test]
    fn file_download_uses_last_segment() {
        let event = file_download("https://ragdollarchers.io/docs/controls.zip");
        assert_eq!(event.param("event_label"), Some(&json!("controls.zip")));
        assert_eq!(event.param("file_extension"), Some(&json!("zip")));
    }

    #[test]
    fn timing_is_rounded() {
        let event = game_load_timing(1234.6);
        assert_eq!(event.param("value"), Some(&json!(1235)));
    }

    #[test]
    fn user_agent_is_limited() {
        let agent = format!("Mozilla/5.0 (X11) {}", "x".repeat(200));
        let params = user_properties(&agent);
        let map = params["custom_map"].as_object().unwrap();
        assert_eq!(map["device_type"], json!("desktop"));
        assert_eq!(map["user_agent"].as_str().unwrap().chars().count(), 100);
    }
}
