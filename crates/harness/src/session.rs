//! Browser session management over the Chrome DevTools Protocol
//!
//! One session per scenario: a headless Chromium with its own user-data
//! directory, driven through `chromiumoxide`. The session exposes the small
//! set of primitives the dispatcher and extractor need - navigation, element
//! lookup, script evaluation, trusted clicks at surface coordinates, and key
//! chords - and nothing else.

use std::path::PathBuf;
use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchKeyEventParams, DispatchKeyEventType, DispatchMouseEventParams, DispatchMouseEventType,
    MouseButton,
};
use chromiumoxide::Page;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{HarnessError, HarnessResult};

/// Configuration for launching a browser session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Explicit browser binary; autodetected when unset.
    pub chrome_executable: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            chrome_executable: None,
        }
    }
}

/// A point on the editing surface, addressed as an offset into an element.
///
/// The tiled canvas has no per-cell DOM nodes, so cells are reached by
/// coordinates relative to the canvas container.
#[derive(Debug, Clone)]
pub struct SurfacePoint {
    pub selector: String,
    pub x: f64,
    pub y: f64,
}

impl SurfacePoint {
    pub fn new(selector: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            selector: selector.into(),
            x,
            y,
        }
    }
}

/// A modifier+key combination dispatched as trusted CDP input.
#[derive(Debug, Clone)]
pub struct KeyChord {
    /// CDP modifier bitmask: Alt=1, Ctrl=2, Meta=4, Shift=8.
    pub modifiers: i64,
    pub key: String,
    pub code: String,
}

impl KeyChord {
    pub fn ctrl(letter: char) -> Self {
        Self {
            modifiers: 2,
            key: letter.to_string(),
            code: format!("Key{}", letter.to_ascii_uppercase()),
        }
    }

    pub fn escape() -> Self {
        Self {
            modifiers: 0,
            key: "Escape".into(),
            code: "Escape".into(),
        }
    }

    pub fn label(&self) -> String {
        if self.modifiers & 2 != 0 {
            format!("Ctrl+{}", self.key)
        } else {
            self.key.clone()
        }
    }
}

pub struct Session {
    browser: Browser,
    page: Page,
    handler: tokio::task::JoinHandle<()>,
    // Keeps the per-session profile directory alive for the browser's lifetime.
    _user_data: tempfile::TempDir,
}

impl Session {
    /// Launch a browser and open a blank page.
    pub async fn launch(config: &SessionConfig) -> HarnessResult<Self> {
        let user_data = tempfile::Builder::new()
            .prefix("sheetcheck-session-")
            .tempdir()?;

        let mut builder = BrowserConfig::builder()
            .window_size(config.viewport_width, config.viewport_height)
            .user_data_dir(user_data.path())
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage");

        if !config.headless {
            builder = builder.with_head();
        }

        let executable = config.chrome_executable.clone().or_else(find_chrome);
        if let Some(path) = executable {
            debug!("using browser binary: {}", path.display());
            builder = builder.chrome_executable(path);
        }

        let browser_config = builder
            .build()
            .map_err(HarnessError::BrowserLaunch)?;

        let (browser, mut handler) = Browser::launch(browser_config).await?;

        let handle = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser.new_page("about:blank").await?;
        info!("browser session ready");

        Ok(Self {
            browser,
            page,
            handler: handle,
            _user_data: user_data,
        })
    }

    /// Navigate and wait for the load to settle.
    pub async fn goto(&self, url: &str) -> HarnessResult<()> {
        debug!("navigating to {url}");
        self.page.goto(url).await?;
        self.page.wait_for_navigation().await?;
        Ok(())
    }

    /// Evaluate a script and deserialize its completion value.
    pub async fn eval<T: DeserializeOwned>(&self, js: &str) -> HarnessResult<T> {
        let value = self.page.evaluate(js).await?.into_value()?;
        Ok(value)
    }

    /// Trusted click on an element, mapping absence to `ElementNotFound`.
    pub async fn click(&self, selector: &str) -> HarnessResult<()> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|_| HarnessError::ElementNotFound(selector.to_string()))?;
        element.click().await?;
        Ok(())
    }

    /// Trusted click (press + release) at an offset into an element, with a
    /// CDP click count (2 = double click).
    pub async fn click_at(&self, point: &SurfacePoint, click_count: i64) -> HarnessResult<()> {
        let (left, top) = self.origin_of(&point.selector).await?;
        let x = left + point.x;
        let y = top + point.y;

        for event_type in [
            DispatchMouseEventType::MousePressed,
            DispatchMouseEventType::MouseReleased,
        ] {
            let params = DispatchMouseEventParams::builder()
                .r#type(event_type)
                .x(x)
                .y(y)
                .button(MouseButton::Left)
                .click_count(click_count)
                .build()
                .map_err(HarnessError::InputDispatch)?;
            self.page.execute(params).await?;
        }
        Ok(())
    }

    /// Dispatch a key chord (down + up) to the focused element.
    pub async fn key_chord(&self, chord: &KeyChord) -> HarnessResult<()> {
        for event_type in [DispatchKeyEventType::KeyDown, DispatchKeyEventType::KeyUp] {
            let params = DispatchKeyEventParams::builder()
                .r#type(event_type)
                .modifiers(chord.modifiers)
                .key(chord.key.clone())
                .code(chord.code.clone())
                .build()
                .map_err(HarnessError::InputDispatch)?;
            self.page.execute(params).await?;
        }
        Ok(())
    }

    /// Type text into an element via keyboard simulation.
    pub async fn type_text(&self, selector: &str, text: &str) -> HarnessResult<()> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|_| HarnessError::ElementNotFound(selector.to_string()))?;
        element.type_str(text).await?;
        Ok(())
    }

    /// Close the page and reap the browser process. Dropping an unclosed
    /// session also kills the browser; closing is just the quiet path.
    pub async fn close(self) -> HarnessResult<()> {
        let _ = self.page.close().await;
        drop(self.browser);
        self.handler.abort();
        Ok(())
    }

    async fn origin_of(&self, selector: &str) -> HarnessResult<(f64, f64)> {
        #[derive(Debug, Deserialize)]
        struct Origin {
            status: String,
            #[serde(default)]
            left: Option<f64>,
            #[serde(default)]
            top: Option<f64>,
        }

        let js = format!(
            r#"(() => {{
                const el = document.querySelector({sel});
                if (!el) return {{ status: 'missing' }};
                const r = el.getBoundingClientRect();
                return {{ status: 'ok', left: r.left, top: r.top }};
            }})()"#,
            sel = js_string(selector),
        );
        let origin: Origin = self.eval(&js).await?;
        match (origin.status.as_str(), origin.left, origin.top) {
            ("ok", Some(left), Some(top)) => Ok((left, top)),
            _ => Err(HarnessError::ElementNotFound(selector.to_string())),
        }
    }
}

/// Quote a string as a JavaScript literal.
pub(crate) fn js_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| String::from("\"\""))
}

/// Locate a usable Chromium/Chrome binary.
///
/// Honors `SHEETCHECK_CHROME`, then a Chrome-for-Testing install under the
/// Puppeteer cache, then well-known system paths. Returning `None` lets
/// `chromiumoxide` run its own autodetection.
pub fn find_chrome() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("SHEETCHECK_CHROME") {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
        warn!("SHEETCHECK_CHROME is set but does not exist: {}", path.display());
    }

    if let Ok(home) = std::env::var("HOME") {
        let cache = PathBuf::from(home).join(".cache/puppeteer/chrome");
        if let Ok(entries) = std::fs::read_dir(&cache) {
            let mut versions: Vec<_> = entries
                .filter_map(|e| e.ok())
                .filter(|e| e.path().is_dir())
                .collect();
            versions.sort_by_key(|v| std::cmp::Reverse(v.path()));

            for version in versions {
                for candidate in [
                    "chrome-linux64/chrome",
                    "chrome-mac-arm64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing",
                    "chrome-mac-x64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing",
                ] {
                    let path = version.path().join(candidate);
                    if path.exists() {
                        return Some(path);
                    }
                }
            }
        }
    }

    ["/usr/bin/chromium", "/usr/bin/chromium-browser", "/usr/bin/google-chrome"]
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}

/// Whether browser-backed paths should be skipped in this environment.
pub fn skip_browser() -> bool {
    std::env::var("SHEETCHECK_SKIP_BROWSER").is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn js_string_quotes_and_escapes() {
        assert_eq!(js_string("#AlignLeft"), "\"#AlignLeft\"");
        assert_eq!(js_string("a'b\"c"), "\"a'b\\\"c\"");
    }

    #[test]
    fn ctrl_chord_sets_modifier_bit() {
        let chord = KeyChord::ctrl('a');
        assert_eq!(chord.modifiers, 2);
        assert_eq!(chord.key, "a");
        assert_eq!(chord.code, "KeyA");
        assert_eq!(chord.label(), "Ctrl+a");
    }

    #[test]
    fn escape_chord_is_unmodified() {
        let chord = KeyChord::escape();
        assert_eq!(chord.modifiers, 0);
        assert_eq!(chord.label(), "Escape");
    }

    #[test]
    fn surface_point_carries_offsets() {
        let point = SurfacePoint::new(".leaflet-tile-container", 20.0, 15.0);
        assert_eq!(point.selector, ".leaflet-tile-container");
        assert_eq!(point.x, 20.0);
        assert_eq!(point.y, 15.0);
    }
}
