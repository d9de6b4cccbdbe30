//! Decides which instrumentation category a page element belongs to.

const DOWNLOAD_EXTENSIONS: [&str; 4] = [".pdf", ".zip", ".doc", ".docx"];

const SOCIAL_PLATFORMS: [(&str, &str); 4] = [
    ("facebook.com", "Facebook"),
    ("twitter.com", "Twitter"),
    ("linkedin.com", "LinkedIn"),
    ("pinterest.com", "Pinterest"),
];

/// Categories a link falls into; one link may be in several.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkTargets {
    pub outbound: bool,
    pub download: bool,
    pub social: Option<&'static str>,
}

impl LinkTargets {
    pub fn is_tracked(&self) -> bool {
        self.outbound || self.download || self.social.is_some()
    }
}

/// `href` is the raw attribute value, `hostname` the current page's host.
pub fn classify_link(href: &str, hostname: &str) -> LinkTargets {
    LinkTargets {
        outbound: is_outbound(href, hostname),
        download: DOWNLOAD_EXTENSIONS.iter().any(|ext| href.ends_with(ext)),
        social: social_platform(href),
    }
}

pub fn is_outbound(href: &str, hostname: &str) -> bool {
    if !href.starts_with("http") {
        return false;
    }
    hostname.is_empty() || !href.contains(hostname)
}

pub fn social_platform(href: &str) -> Option<&'static str> {
    SOCIAL_PLATFORMS
        .iter()
        .find(|(domain, _)| href.contains(domain))
        .map(|(_, platform)| *platform)
}

/// File name and extension of a resolved download URL.
pub fn download_file(url: &str) -> (String, String) {
    let name = url.rsplit('/').next().unwrap_or(url);
    let extension = name.rsplit('.').next().unwrap_or(name);
    (name.to_string(), extension.to_string())
}

pub fn is_search_input(input_type: &str, name: &str) -> bool {
    input_type.eq_ignore_ascii_case("search") || name.contains("search")
}

pub fn search_term(value: &str) -> Option<String> {
    let term = value.trim();
    (!term.is_empty()).then(|| term.to_string())
}

pub fn form_label(id: &str, class_name: &str) -> String {
    if !id.is_empty() {
        id.to_string()
    } else if !class_name.is_empty() {
        class_name.to_string()
    } else {
        "unknown".to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceType {
    Mobile,
    Tablet,
    Desktop,
}

impl DeviceType {
    pub fn from_user_agent(user_agent: &str) -> Self {
        let has = |needle: &str| user_agent.contains(needle);
        if has("iPad") || (has("Android") && !has("Mobile")) {
            DeviceType::Tablet
        } else if has("Mobile") || has("Android") || has("iPhone") {
            DeviceType::Mobile
        } else {
            DeviceType::Desktop
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DeviceType::Mobile => "mobile",
            DeviceType::Tablet => "tablet",
            DeviceType::Desktop => "desktop",
        }
    }
}

pub fn is_game_asset(name: &str, marker: &str) -> bool {
    !marker.is_empty() && name.contains(marker)
}

/// First `limit` characters of `text`.
pub fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}
