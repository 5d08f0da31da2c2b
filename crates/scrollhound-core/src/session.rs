//! Session abstraction over a WebDriver/Appium-style automation backend.
//!
//! This module defines the [`Session`] trait, the narrow surface the gesture
//! and discovery layers need from a live driver session: element queries,
//! geometry, screenshots, W3C action execution and script execution. The
//! session itself (capability negotiation, lifecycle) is created elsewhere;
//! [`WebDriverSession`](crate::webdriver::WebDriverSession) attaches to an
//! existing one over HTTP.
//!
//! Higher-level primitives such as [`click_and_hold`](Session::click_and_hold)
//! and [`drag_and_drop`](Session::drag_and_drop) have default implementations
//! built from [`perform_actions`](Session::perform_actions), so backends only
//! need to provide the raw commands.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::actions::{ActionSequence, Origin, PointerKind, SequenceBuilder, WheelScroll};
use crate::geometry::Rectangle;
use crate::locator::Locator;

/// Duration used by the emulated mouse moves of the high-level primitives.
pub const DEFAULT_MOVE_DURATION: Duration = Duration::from_millis(250);

/// The W3C web element identifier key.
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Errors raised by a session backend.
#[derive(Error, Debug)]
pub enum SessionError {
    /// A command was rejected or failed with the given message.
    #[error("Command failed: {0}")]
    CommandFailed(String),

    /// The referenced element no longer exists or was never found.
    #[error("No such element: {0}")]
    NoSuchElement(String),

    /// The backend does not implement the requested command.
    #[error("Unsupported command: {0}")]
    UnsupportedCommand(String),

    /// The session is not reachable.
    #[error("Not connected to automation session")]
    NotConnected,

    /// A command did not complete in time.
    #[error("Operation timed out")]
    Timeout,

    /// The HTTP transport failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A response could not be interpreted.
    #[error("JSON parse error: {0}")]
    JsonParse(String),

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The platform a session drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// A native Android application (UiAutomator2 / Espresso).
    Android,
    /// A native iOS application (XCUITest).
    Ios,
    /// A browser, desktop or mobile, driven through W3C actions.
    Web,
}

impl Platform {
    /// Derives the platform from a session's capabilities.
    ///
    /// Sessions that name a browser are treated as web sessions even on a
    /// mobile device, because native scroll primitives do not apply to a
    /// browser context.
    pub fn from_capabilities(capabilities: &Value) -> Self {
        let browser = capabilities
            .get("browserName")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if !browser.is_empty() {
            return Platform::Web;
        }
        let platform = capabilities
            .get("platformName")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_ascii_lowercase();
        match platform.as_str() {
            "android" => Platform::Android,
            "ios" | "tvos" => Platform::Ios,
            _ => Platform::Web,
        }
    }

    /// Returns true for native Android and iOS sessions.
    pub fn is_native_mobile(&self) -> bool {
        matches!(self, Platform::Android | Platform::Ios)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Android => f.write_str("android"),
            Platform::Ios => f.write_str("ios"),
            Platform::Web => f.write_str("web"),
        }
    }
}

/// A reference to a live element in the session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle {
    pub id: String,
}

impl ElementHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// The W3C JSON reference for this element.
    pub fn to_reference(&self) -> Value {
        let mut map = Map::new();
        map.insert(ELEMENT_KEY.to_string(), Value::String(self.id.clone()));
        Value::Object(map)
    }
}

/// A live WebDriver/Appium-style automation session.
///
/// Calls are awaited one at a time by the gesture and discovery layers; a
/// session is owned by a single test execution and is never driven from two
/// operations concurrently.
#[async_trait]
pub trait Session: Send + Sync {
    /// The platform this session drives.
    fn platform(&self) -> Platform;

    /// Find all elements currently matching the locator.
    async fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementHandle>, SessionError>;

    /// The bounding box of an element.
    async fn element_rect(&self, element: &ElementHandle) -> Result<Rectangle, SessionError>;

    /// The visible text of an element.
    async fn element_text(&self, element: &ElementHandle) -> Result<String, SessionError>;

    /// The value of an element attribute, if set.
    async fn element_attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, SessionError>;

    /// Click (or tap) an element.
    async fn click(&self, element: &ElementHandle) -> Result<(), SessionError>;

    /// The current window size. Only `width` and `height` are meaningful.
    async fn window_size(&self) -> Result<Rectangle, SessionError>;

    /// Capture the current screen as PNG bytes.
    async fn screenshot(&self) -> Result<Vec<u8>, SessionError>;

    /// Dispatch a set of input source sequences as one action chain.
    async fn perform_actions(&self, actions: &[ActionSequence]) -> Result<(), SessionError>;

    /// Release all pressed keys and pointer buttons.
    async fn release_actions(&self) -> Result<(), SessionError>;

    /// Execute a script (or a `mobile:` extension command) synchronously.
    async fn execute_script(&self, script: &str, args: Vec<Value>) -> Result<Value, SessionError>;

    /// Execute a `mobile:` extension command with a single parameter map.
    async fn execute_mobile(
        &self,
        command: &str,
        params: Map<String, Value>,
    ) -> Result<Value, SessionError> {
        self.execute_script(&format!("mobile: {command}"), vec![Value::Object(params)])
            .await
    }

    /// Press the primary button on an element and keep it pressed.
    async fn click_and_hold(&self, element: &ElementHandle) -> Result<(), SessionError> {
        let sequence = SequenceBuilder::pointer("default mouse", PointerKind::Mouse)
            .move_to(DEFAULT_MOVE_DURATION, Origin::Element(element.clone()), 0, 0)
            .down()
            .build();
        self.perform_actions(&[sequence]).await
    }

    /// Drag `source` and drop it onto the center of `destination`.
    async fn drag_and_drop(
        &self,
        source: &ElementHandle,
        destination: &ElementHandle,
    ) -> Result<(), SessionError> {
        let sequence = SequenceBuilder::pointer("default mouse", PointerKind::Mouse)
            .move_to(DEFAULT_MOVE_DURATION, Origin::Element(source.clone()), 0, 0)
            .down()
            .move_to(DEFAULT_MOVE_DURATION, Origin::Element(destination.clone()), 0, 0)
            .up()
            .build();
        self.perform_actions(&[sequence]).await
    }

    /// Drag `source` by a pixel offset relative to its current position.
    async fn drag_and_drop_by(
        &self,
        source: &ElementHandle,
        x_offset: i32,
        y_offset: i32,
    ) -> Result<(), SessionError> {
        let sequence = SequenceBuilder::pointer("default mouse", PointerKind::Mouse)
            .move_to(DEFAULT_MOVE_DURATION, Origin::Element(source.clone()), 0, 0)
            .down()
            .move_to(DEFAULT_MOVE_DURATION, Origin::Pointer, x_offset, y_offset)
            .up()
            .build();
        self.perform_actions(&[sequence]).await
    }

    /// Scroll until `target` is in view, optionally hovering `container` first
    /// so the wheel events land inside it.
    async fn scroll_to_element(
        &self,
        container: Option<&ElementHandle>,
        target: &ElementHandle,
    ) -> Result<(), SessionError> {
        let mut actions = Vec::with_capacity(2);
        if let Some(container) = container {
            actions.push(
                SequenceBuilder::pointer("default mouse", PointerKind::Mouse)
                    .move_to(DEFAULT_MOVE_DURATION, Origin::Element(container.clone()), 0, 0)
                    .build(),
            );
        }
        actions.push(ActionSequence::wheel(
            "default wheel",
            WheelScroll {
                origin: Origin::Element(target.clone()),
                x: 0,
                y: 0,
                delta_x: 0,
                delta_y: 0,
                duration: DEFAULT_MOVE_DURATION,
            },
        ));
        self.perform_actions(&actions).await
    }

    /// Dispatch a single wheel scroll.
    async fn scroll_wheel(&self, scroll: WheelScroll) -> Result<(), SessionError> {
        self.perform_actions(&[ActionSequence::wheel("default wheel", scroll)])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_session_error_display() {
        let err = SessionError::CommandFailed("tap failed".to_string());
        assert!(err.to_string().contains("tap failed"));

        let err = SessionError::NoSuchElement("//button".to_string());
        assert!(err.to_string().contains("//button"));

        let err = SessionError::UnsupportedCommand("mobile: scroll".to_string());
        assert!(err.to_string().contains("mobile: scroll"));

        let err = SessionError::Timeout;
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn platform_from_native_capabilities() {
        let caps = json!({"platformName": "Android", "appium:automationName": "UiAutomator2"});
        assert_eq!(Platform::from_capabilities(&caps), Platform::Android);

        let caps = json!({"platformName": "iOS"});
        assert_eq!(Platform::from_capabilities(&caps), Platform::Ios);
    }

    #[test]
    fn platform_browser_wins_over_mobile_os() {
        let caps = json!({"platformName": "Android", "browserName": "chrome"});
        assert_eq!(Platform::from_capabilities(&caps), Platform::Web);
    }

    #[test]
    fn platform_defaults_to_web() {
        assert_eq!(Platform::from_capabilities(&json!({})), Platform::Web);
        assert!(!Platform::Web.is_native_mobile());
        assert!(Platform::Ios.is_native_mobile());
    }

    #[test]
    fn element_reference_uses_w3c_key() {
        let handle = ElementHandle::new("abc-123");
        let reference = handle.to_reference();
        assert_eq!(reference[ELEMENT_KEY], "abc-123");
        assert_eq!(reference.as_object().map(|m| m.len()), Some(1));
    }
}
