//! Markup for the loading and error overlays drawn over the game frame.

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Element, HtmlElement};

pub const OVERLAY_CLASS: &str = "game-loading-overlay";
pub const ERROR_CLASS: &str = "game-loading-error";
pub const STYLE_ID: &str = "game-loading-styles";
pub const RETRY_BUTTON_CLASS: &str = "retry-button";

const FADE_TRANSITION: &str = "opacity 0.5s ease";

const STYLES: &str = r#"
.game-loading-overlay {
    position: absolute;
    top: 0;
    left: 0;
    right: 0;
    bottom: 0;
    background: var(--game-container-bg);
    display: flex;
    align-items: center;
    justify-content: center;
    z-index: 10;
    border-radius: 10px;
}
.loading-content {
    text-align: center;
    padding: 40px 20px;
}
.loading-spinner {
    width: 50px;
    height: 50px;
    border: 4px solid var(--border-color);
    border-top: 4px solid var(--primary-color);
    border-radius: 50%;
    animation: game-loading-spin 1s linear infinite;
    margin: 0 auto 20px;
}
@keyframes game-loading-spin {
    0% { transform: rotate(0deg); }
    100% { transform: rotate(360deg); }
}
.loading-content h3 {
    color: var(--primary-color);
    margin-bottom: 10px;
    font-size: 1.5rem;
}
.loading-content p {
    color: var(--text-secondary);
    margin-bottom: 20px;
}
.loading-tips {
    background: var(--card-bg);
    padding: 15px;
    border-radius: 8px;
    border: 1px solid var(--border-color);
    max-width: 300px;
    margin: 0 auto;
}
.loading-tips p {
    margin: 0;
    font-size: 0.9rem;
    color: var(--text-secondary);
}
.game-loading-error {
    background: rgba(233, 69, 96, 0.1);
    border: 2px solid var(--primary-color);
    color: var(--text-primary);
}
.error-content {
    text-align: center;
    padding: 30px;
}
.error-content h3 {
    color: var(--primary-color);
    margin-bottom: 15px;
}
.retry-button {
    background: var(--primary-color);
    color: white;
    border: none;
    padding: 12px 24px;
    border-radius: 6px;
    cursor: pointer;
    font-size: 1rem;
    margin-top: 15px;
    transition: background 0.3s ease;
}
.retry-button:hover {
    background: #d63651;
}
"#;

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

pub fn tip_html(tip: &str) -> String {
    format!("<strong>Pro Tip:</strong> {}", escape_html(tip))
}

pub fn loading_html(title: &str, tip: &str) -> String {
    format!(
        concat!(
            r#"<div class="loading-content">"#,
            r#"<div class="loading-spinner"></div>"#,
            r#"<h3>🎯 Loading {}...</h3>"#,
            r#"<p>Preparing your archery adventure!</p>"#,
            r#"<div class="loading-tips"><p>{}</p></div>"#,
            r#"</div>"#,
        ),
        escape_html(title),
        tip_html(tip)
    )
}

pub fn error_html(message: &str, guide_url: &str) -> String {
    format!(
        concat!(
            r#"<div class="error-content">"#,
            r#"<h3>⚠️ Game Loading Error</h3>"#,
            r#"<p>{}</p>"#,
            r#"<button class="retry-button" type="button">🔄 Retry</button>"#,
            r#"<p style="margin-top: 15px; font-size: 0.9rem;">"#,
            r#"Or try our <a href="{}" style="color: var(--accent-color);">game guide</a> while you wait!"#,
            r#"</p>"#,
            r#"</div>"#,
        ),
        escape_html(message),
        escape_html(guide_url)
    )
}

/// Adds the overlay style sheet to `<head>` unless a previous call already did.
pub fn ensure_styles(document: &Document) -> Result<(), JsValue> {
    if document.get_element_by_id(STYLE_ID).is_some() {
        return Ok(());
    }
    let style = document.create_element("style")?;
    style.set_id(STYLE_ID);
    style.set_text_content(Some(STYLES));
    if let Some(head) = document.head() {
        head.append_child(&style)?;
    }
    Ok(())
}

pub fn loading(document: &Document, title: &str, tip: &str) -> Result<HtmlElement, JsValue> {
    let overlay = document.create_element("div")?.dyn_into::<HtmlElement>()?;
    overlay.set_class_name(OVERLAY_CLASS);
    overlay.set_inner_html(&loading_html(title, tip));
    Ok(overlay)
}

pub fn error(document: &Document, message: &str, guide_url: &str) -> Result<HtmlElement, JsValue> {
    let overlay = document.create_element("div")?.dyn_into::<HtmlElement>()?;
    overlay.set_class_name(&format!("{} {}", OVERLAY_CLASS, ERROR_CLASS));
    overlay.set_inner_html(&error_html(message, guide_url));
    Ok(overlay)
}

pub fn retry_button(overlay: &Element) -> Result<Option<HtmlElement>, JsValue> {
    match overlay.query_selector(&format!(".{}", RETRY_BUTTON_CLASS))? {
        Some(button) => Ok(Some(button.dyn_into::<HtmlElement>()?)),
        None => Ok(None),
    }
}

pub fn set_tip(overlay: &Element, tip: &str) -> Result<(), JsValue> {
    if let Some(line) = overlay.query_selector(".loading-tips p")? {
        line.set_inner_html(&tip_html(tip));
    }
    Ok(())
}

pub fn fade(overlay: &HtmlElement) -> Result<(), JsValue> {
    let style = overlay.style();
    style.set_property("transition", FADE_TRANSITION)?;
    style.set_property("opacity", "0")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html(r#"<img src=x onerror="a()"> & 'b'"#),
            "&lt;img src=x onerror=&quot;a()&quot;&gt; &amp; &#39;b&#39;"
        );
        assert_eq!(escape_html("🎯 plain"), "🎯 plain");
    }

    #[test]
    fn loading_markup_carries_title_and_tip() {
        let html = loading_html("Ragdoll Archers", "Aim <high>");
        assert!(html.contains("<h3>🎯 Loading Ragdoll Archers...</h3>"));
        assert!(html.contains("<strong>Pro Tip:</strong> Aim &lt;high&gt;"));
        assert!(html.contains(r#"class="loading-spinner""#));
    }

    #[test]
    fn error_markup_has_retry_and_guide_link() {
        let html = error_html("Game encountered an error. Please try reloading.", "/guide.html");
        assert!(html.contains("<p>Game encountered an error. Please try reloading.</p>"));
        assert!(html.contains(r#"class="retry-button""#));
        assert!(html.contains(r#"href="/guide.html""#));
        assert!(!html.contains("onclick"));
    }

    #[test]
    fn stylesheet_covers_both_overlays() {
        assert!(STYLES.contains(".game-loading-overlay {"));
        assert!(STYLES.contains(".game-loading-error {"));
        assert!(STYLES.contains(".retry-button:hover"));
    }
}
