//! Page-level settings.
//!
//! Defaults describe the live page. Any field can be overridden from markup
//! with an inline `<script type="application/json" id="site-config">` block.

use serde::Deserialize;
use web_sys::Document;

use crate::dom;

pub const CONFIG_ELEMENT_ID: &str = "site-config";

const DEFAULT_TIPS: [&str; 8] = [
    "🎯 Aim for the head for maximum damage!",
    "🏹 Different arrows have unique properties - experiment!",
    "💨 Account for wind direction when aiming",
    "🎪 Use physics to your advantage with trick shots",
    "⚡ Quick shots can catch enemies off guard",
    "🛡️ Learn enemy patterns to predict movement",
    "💎 Collect power-ups for special abilities",
    "🎨 Master the art of bank shots and ricochets",
];

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SiteConfig {
    pub measurement_id: String,
    /// Substring identifying the embedded game's assets in URLs and script errors.
    pub game_asset_marker: String,
    pub game_label: String,
    pub game_title: String,
    pub game_section_id: String,
    pub guide_url: String,
    pub opt_out_key: String,
    pub header_offset: f64,
    pub faq_label_limit: usize,
    pub loader: LoaderTimings,
    pub tips: Vec<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            measurement_id: "G-XXXXXXXXXX".to_string(),
            game_asset_marker: "ragdoll-archers".to_string(),
            game_label: "ragdoll_archers".to_string(),
            game_title: "Ragdoll Archers".to_string(),
            game_section_id: "game".to_string(),
            guide_url: "/guide.html".to_string(),
            opt_out_key: "analytics_disabled".to_string(),
            header_offset: 80.0,
            faq_label_limit: 50,
            loader: LoaderTimings::default(),
            tips: DEFAULT_TIPS.iter().map(|tip| tip.to_string()).collect(),
        }
    }
}

/// Millisecond timings for the game loader.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoaderTimings {
    pub load_timeout_ms: f64,
    pub grace_ms: f64,
    pub fade_ms: f64,
    pub restore_delay_ms: f64,
    pub tip_start_ms: f64,
    pub tip_interval_ms: f64,
}

impl Default for LoaderTimings {
    fn default() -> Self {
        Self {
            load_timeout_ms: 30_000.0,
            grace_ms: 1_000.0,
            fade_ms: 500.0,
            restore_delay_ms: 100.0,
            tip_start_ms: 4_000.0,
            tip_interval_ms: 3_000.0,
        }
    }
}

impl SiteConfig {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Reads the inline config block, falling back to defaults when it is
    /// missing or malformed.
    pub fn from_document(document: &Document) -> Self {
        let Some(text) = document
            .get_element_by_id(CONFIG_ELEMENT_ID)
            .and_then(|el| el.text_content())
        else {
            return Self::default();
        };

        match Self::from_json(&text) {
            Ok(config) => config,
            Err(err) => {
                dom::warn(&format!("ignoring #{}: {}", CONFIG_ELEMENT_ID, err));
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_live_page() {
        let config = SiteConfig::default();
        assert_eq!(config.opt_out_key, "analytics_disabled");
        assert_eq!(config.header_offset, 80.0);
        assert_eq!(config.loader.load_timeout_ms, 30_000.0);
        assert_eq!(config.loader.restore_delay_ms, 100.0);
        assert_eq!(config.tips.len(), 8);
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let config = SiteConfig::from_json(
            r#"{"measurementId":"G-ABC123","loader":{"loadTimeoutMs":5000}}"#,
        )
        .unwrap();
        assert_eq!(config.measurement_id, "G-ABC123");
        assert_eq!(config.loader.load_timeout_ms, 5000.0);
        assert_eq!(config.loader.grace_ms, 1000.0);
        assert_eq!(config.guide_url, "/guide.html");
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(SiteConfig::from_json("{ nope").is_err());
    }
}
