//! [`Session`] over the W3C WebDriver HTTP protocol.
//!
//! [`WebDriverSession`] attaches to a session that already exists on a
//! WebDriver or Appium server; creating and deleting sessions is left to the
//! caller. Every command is a JSON request against
//! `{base_url}/session/{id}/...` whose reply carries its payload under
//! `value`. Error replies are mapped onto [`SessionError`] by their W3C error
//! code.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;

use crate::actions::ActionSequence;
use crate::geometry::Rectangle;
use crate::locator::Locator;
use crate::session::{ElementHandle, Platform, Session, SessionError, ELEMENT_KEY};

/// Timeout applied to each HTTP request.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(60);

/// Legacy JSON-wire element key, still sent by some Appium drivers.
const LEGACY_ELEMENT_KEY: &str = "ELEMENT";

/// A live session on a remote WebDriver or Appium server.
#[derive(Debug, Clone)]
pub struct WebDriverSession {
    client: reqwest::Client,
    base_url: String,
    session_id: String,
    platform: Platform,
}

impl WebDriverSession {
    /// Wraps a known session without contacting the server.
    pub fn new(
        base_url: &str,
        session_id: impl Into<String>,
        platform: Platform,
    ) -> Result<Self, SessionError> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_COMMAND_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session_id: session_id.into(),
            platform,
        })
    }

    /// Attaches to a session, reading its capabilities to learn the platform.
    pub async fn attach(base_url: &str, session_id: impl Into<String>) -> Result<Self, SessionError> {
        let mut session = Self::new(base_url, session_id, Platform::Web)?;
        let value = session.command(Method::GET, "", None).await?;
        let capabilities = value.get("capabilities").unwrap_or(&value);
        session.platform = Platform::from_capabilities(capabilities);
        debug!(session_id = %session.session_id, platform = %session.platform, "attached to session");
        Ok(session)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    fn url(&self, path: &str) -> String {
        format!("{}/session/{}{}", self.base_url, self.session_id, path)
    }

    /// Sends one command and returns the reply's `value`.
    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, SessionError> {
        let url = self.url(path);
        debug!(%method, %url, "webdriver command");
        let mut request = self.client.request(method.clone(), &url);
        if let Some(body) = body {
            request = request.json(&body);
        } else if method == Method::POST {
            request = request.json(&json!({}));
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                SessionError::Timeout
            } else if e.is_connect() {
                SessionError::NotConnected
            } else {
                SessionError::Http(e)
            }
        })?;
        let status = response.status();
        let text = response.text().await?;
        let reply: Value = serde_json::from_str(&text)
            .map_err(|e| SessionError::JsonParse(format!("{e}: {text}")))?;
        let value = reply.get("value").cloned().unwrap_or(Value::Null);

        if !status.is_success() || value.get("error").is_some() {
            return Err(map_error(status.as_u16(), &value));
        }
        Ok(value)
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, SessionError> {
        self.command(Method::POST, path, Some(body)).await
    }

    async fn get(&self, path: &str) -> Result<Value, SessionError> {
        self.command(Method::GET, path, None).await
    }
}

/// Maps a W3C error reply onto [`SessionError`].
fn map_error(status: u16, value: &Value) -> SessionError {
    let code = value.get("error").and_then(Value::as_str).unwrap_or_default();
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    match code {
        "no such element" | "stale element reference" => SessionError::NoSuchElement(message),
        "unknown command" | "unsupported operation" | "unknown method" => {
            SessionError::UnsupportedCommand(message)
        }
        "timeout" | "script timeout" => SessionError::Timeout,
        "invalid session id" => SessionError::NotConnected,
        "" => SessionError::CommandFailed(format!("HTTP {status}")),
        _ => SessionError::CommandFailed(format!("{code}: {message}")),
    }
}

/// Reads an element reference in either the W3C or the legacy form.
fn element_from(value: &Value) -> Result<ElementHandle, SessionError> {
    value
        .get(ELEMENT_KEY)
        .or_else(|| value.get(LEGACY_ELEMENT_KEY))
        .and_then(Value::as_str)
        .map(ElementHandle::new)
        .ok_or_else(|| SessionError::JsonParse(format!("not an element reference: {value}")))
}

fn rect_from(value: &Value) -> Result<Rectangle, SessionError> {
    let field = |name: &str| -> Result<i32, SessionError> {
        value
            .get(name)
            .and_then(Value::as_f64)
            .map(|v| v.round() as i32)
            .ok_or_else(|| SessionError::JsonParse(format!("rect without {name}: {value}")))
    };
    Ok(Rectangle::new(field("x")?, field("y")?, field("width")?, field("height")?))
}

#[async_trait]
impl Session for WebDriverSession {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementHandle>, SessionError> {
        let value = self
            .post("/elements", json!({ "using": locator.using.as_str(), "value": locator.value }))
            .await?;
        value
            .as_array()
            .ok_or_else(|| SessionError::JsonParse(format!("expected element list: {value}")))?
            .iter()
            .map(element_from)
            .collect()
    }

    async fn element_rect(&self, element: &ElementHandle) -> Result<Rectangle, SessionError> {
        let value = self.get(&format!("/element/{}/rect", element.id)).await?;
        rect_from(&value)
    }

    async fn element_text(&self, element: &ElementHandle) -> Result<String, SessionError> {
        let value = self.get(&format!("/element/{}/text", element.id)).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn element_attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, SessionError> {
        let value = self
            .get(&format!("/element/{}/attribute/{name}", element.id))
            .await?;
        Ok(match value {
            Value::Null => None,
            Value::String(s) => Some(s),
            other => Some(other.to_string()),
        })
    }

    async fn click(&self, element: &ElementHandle) -> Result<(), SessionError> {
        self.post(&format!("/element/{}/click", element.id), json!({}))
            .await
            .map(|_| ())
    }

    async fn window_size(&self) -> Result<Rectangle, SessionError> {
        let value = self.get("/window/rect").await?;
        rect_from(&value)
    }

    async fn screenshot(&self) -> Result<Vec<u8>, SessionError> {
        let value = self.get("/screenshot").await?;
        let encoded = value
            .as_str()
            .ok_or_else(|| SessionError::JsonParse("screenshot is not a string".into()))?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| SessionError::JsonParse(format!("screenshot is not base64: {e}")))
    }

    async fn perform_actions(&self, actions: &[ActionSequence]) -> Result<(), SessionError> {
        let actions = serde_json::to_value(actions).map_err(|e| SessionError::JsonParse(e.to_string()))?;
        self.post("/actions", json!({ "actions": actions })).await.map(|_| ())
    }

    async fn release_actions(&self) -> Result<(), SessionError> {
        self.command(Method::DELETE, "/actions", None).await.map(|_| ())
    }

    async fn execute_script(&self, script: &str, args: Vec<Value>) -> Result<Value, SessionError> {
        self.post("/execute/sync", json!({ "script": script, "args": args }))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_map_to_session_errors() {
        let err = map_error(404, &json!({"error": "no such element", "message": "gone"}));
        assert!(matches!(err, SessionError::NoSuchElement(m) if m == "gone"));

        let err = map_error(404, &json!({"error": "unknown command", "message": "mobile: x"}));
        assert!(matches!(err, SessionError::UnsupportedCommand(_)));

        let err = map_error(500, &json!({"error": "unsupported operation", "message": ""}));
        assert!(matches!(err, SessionError::UnsupportedCommand(_)));

        let err = map_error(500, &json!({"error": "javascript error", "message": "boom"}));
        assert!(matches!(err, SessionError::CommandFailed(m) if m == "javascript error: boom"));
    }

    #[test]
    fn element_reference_accepts_both_keys() {
        let w3c = json!({ "element-6066-11e4-a52e-4f735466cecf": "a1" });
        assert_eq!(element_from(&w3c).unwrap().id, "a1");
        let legacy = json!({ "ELEMENT": "b2" });
        assert_eq!(element_from(&legacy).unwrap().id, "b2");
        assert!(element_from(&json!({})).is_err());
    }

    #[test]
    fn rect_rounds_fractional_pixels() {
        let rect = rect_from(&json!({"x": 10.6, "y": 0, "width": 300.2, "height": 599.5})).unwrap();
        assert_eq!(rect, Rectangle::new(11, 0, 300, 600));
    }

    #[test]
    fn url_joins_session_path() {
        let session = WebDriverSession::new("http://127.0.0.1:4723/", "abc", Platform::Android).unwrap();
        assert_eq!(session.url("/elements"), "http://127.0.0.1:4723/session/abc/elements");
        assert_eq!(session.session_id(), "abc");
    }
}
