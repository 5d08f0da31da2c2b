//! Gesture and discovery operations with pass/fail reporting.
//!
//! [`TouchActions`] is the entry point test code talks to. Each public method
//! runs inside an `info_span!`, performs one gesture or search against the
//! session, and hands exactly one report to the [`ActionReporter`] before
//! returning, whether it passed or failed.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use scrollhound_core::config::TouchConfig;
//! use scrollhound_core::geometry::SwipeDirection;
//! use scrollhound_core::locator::{Locator, Target};
//! use scrollhound_core::report::ReportLog;
//! use scrollhound_core::touch::TouchActions;
//! use scrollhound_core::webdriver::WebDriverSession;
//!
//! #[tokio::main]
//! async fn main() {
//!     let session = WebDriverSession::attach("http://127.0.0.1:4723", "session-id")
//!         .await
//!         .unwrap();
//!     let touch = TouchActions::new(Arc::new(session), Arc::new(ReportLog::new()), TouchConfig::load());
//!
//!     let row = Target::from(Locator::accessibility_id("settings-row"));
//!     touch.swipe_into_view(None, &row, SwipeDirection::Up).await.unwrap();
//!     touch.tap(&row).await.unwrap();
//! }
//! ```
//!
//! # Cancellation
//!
//! Operations await their session calls one after another and have no
//! cancellation point of their own. If a caller drops one of these futures,
//! for instance under `tokio::time::timeout`, a pointer sequence may be left
//! half dispatched and a finger or button may still be pressed on the
//! device. Call [`TouchActions::release_pointers`] before reusing the
//! session in that case.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info_span, Instrument};

use crate::capability::{Capability, MobileOs};
use crate::config::TouchConfig;
use crate::discovery::{DiscoveryEngine, DiscoveryOutcome, REFERENCE_NOT_FOUND, SCROLL_ATTEMPTS_CAP};
use crate::error::TouchError;
use crate::gesture::GestureBuilder;
use crate::geometry::{GeometryProvider, Rectangle, ScreenPoint, SwipeDirection, ZoomDirection};
use crate::locator::{Locator, LocatorResolver, ResolveError, SessionResolver, Target};
use crate::report::{ActionReporter, Attachment};
use crate::scroll::ScrollDriver;
use crate::session::{ElementHandle, Session};
use crate::visual::{ReferenceImage, VisualMatch, VisualMatcher};

/// Delay between visibility polls in [`TouchActions::wait_until_visible`].
pub const VISIBILITY_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Soft keyboard editor actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyboardKey {
    Go,
    Done,
    Search,
    Send,
    Next,
    Previous,
    Normal,
    Unspecified,
    None,
}

impl KeyboardKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyboardKey::Go => "go",
            KeyboardKey::Done => "done",
            KeyboardKey::Search => "search",
            KeyboardKey::Send => "send",
            KeyboardKey::Next => "next",
            KeyboardKey::Previous => "previous",
            KeyboardKey::Normal => "normal",
            KeyboardKey::Unspecified => "unspecified",
            KeyboardKey::None => "none",
        }
    }
}

/// A passed operation: its value plus what goes into the report.
struct Done<T> {
    value: T,
    detail: String,
    attachments: Vec<Attachment>,
}

impl<T> Done<T> {
    fn new(value: T, detail: impl Into<String>) -> Self {
        Self {
            value,
            detail: detail.into(),
            attachments: Vec::new(),
        }
    }

    fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }
}

/// A failed operation. Without a detail the error message is reported.
struct Failed {
    error: TouchError,
    detail: Option<String>,
    attachments: Vec<Attachment>,
}

impl Failed {
    fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments.extend(attachments);
        self
    }

    fn with_evidence(error: TouchError, detail: impl Into<String>, attachments: Vec<Attachment>) -> Self {
        Self {
            error,
            detail: Some(detail.into()),
            attachments,
        }
    }
}

impl From<TouchError> for Failed {
    fn from(error: TouchError) -> Self {
        Self {
            error,
            detail: None,
            attachments: Vec::new(),
        }
    }
}

impl From<ResolveError> for Failed {
    fn from(error: ResolveError) -> Self {
        TouchError::from(error).into()
    }
}

/// Touch gestures and element discovery over one session.
pub struct TouchActions {
    session: Arc<dyn Session>,
    resolver: Arc<dyn LocatorResolver>,
    matcher: Option<Arc<dyn VisualMatcher>>,
    capability: Arc<Capability>,
    reporter: Arc<dyn ActionReporter>,
    config: TouchConfig,
}

impl TouchActions {
    /// Creates the facade, picking the capability from the session's platform.
    pub fn new(session: Arc<dyn Session>, reporter: Arc<dyn ActionReporter>, config: TouchConfig) -> Self {
        let capability = Arc::new(Capability::for_platform(session.platform(), &config));
        let resolver = Arc::new(SessionResolver::new(session.clone()));
        Self {
            session,
            resolver,
            matcher: None,
            capability,
            reporter,
            config,
        }
    }

    /// Enables visual targets.
    pub fn with_matcher(mut self, matcher: Arc<dyn VisualMatcher>) -> Self {
        self.matcher = Some(matcher);
        self
    }

    /// Replaces the default session-backed resolver.
    pub fn with_resolver(mut self, resolver: Arc<dyn LocatorResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn session(&self) -> &Arc<dyn Session> {
        &self.session
    }

    pub fn capability(&self) -> &Capability {
        &self.capability
    }

    fn engine(&self) -> DiscoveryEngine {
        let scroller: Arc<dyn ScrollDriver> = self.capability.clone();
        let engine = DiscoveryEngine::new(
            self.session.clone(),
            self.resolver.clone(),
            scroller,
            self.reporter.clone(),
        );
        match &self.matcher {
            Some(matcher) => engine.with_matcher(matcher.clone()),
            None => engine,
        }
    }

    async fn perform<T, F>(&self, action: &'static str, body: F) -> Result<T, TouchError>
    where
        F: Future<Output = Result<Done<T>, Failed>>,
    {
        let span = info_span!("touch_action", action);
        async {
            let start = Instant::now();
            let result = body.await;
            debug!(
                elapsed_ms = start.elapsed().as_millis() as u64,
                success = result.is_ok(),
                "action complete"
            );
            match result {
                Ok(done) => {
                    self.reporter.report_success(action, &done.detail, done.attachments);
                    Ok(done.value)
                }
                Err(failed) => {
                    let detail = failed.detail.unwrap_or_else(|| failed.error.to_string());
                    self.reporter
                        .report_failure(action, &detail, failed.attachments, Some(&failed.error));
                    Err(failed.error)
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Tap a target once.
    ///
    /// Structural targets are clicked through the session. Visual targets are
    /// matched once against the current screen and tapped at the match.
    pub async fn tap(&self, target: &Target) -> Result<(), TouchError> {
        self.perform("tap", async {
            if !target.is_well_formed() {
                return Err(TouchError::InvalidTarget(target.to_string()).into());
            }
            match target {
                Target::Structural(locator) => {
                    self.with_screenshot("tap", async {
                        let element = self.resolver.resolve_unique(locator).await?;
                        let detail = self.element_detail(&element, locator).await;
                        self.session
                            .click(&element)
                            .await
                            .map_err(TouchError::GestureExecution)?;
                        Ok(Done::new((), detail))
                    })
                    .await
                }
                Target::Visual(reference) => {
                    let found = self.match_once(reference).await?;
                    let attachments = visual_attachments("tap", &found);
                    let Some(point) = found.point else {
                        return Err(Failed::with_evidence(
                            TouchError::NotFound(reference.to_string()),
                            format!("{REFERENCE_NOT_FOUND} under this path {reference}."),
                            attachments,
                        ));
                    };
                    let viewport = self.viewport().await?;
                    let sequences = self.capability.tap(point, viewport)?;
                    self.session
                        .perform_actions(&sequences)
                        .await
                        .map_err(TouchError::GestureExecution)?;
                    Ok(Done::new((), format!("Tapped {reference} at {point}")).with_attachments(attachments))
                }
            }
        })
        .await
    }

    /// Tap an element twice in quick succession at its center.
    pub async fn double_tap(&self, locator: &Locator) -> Result<(), TouchError> {
        self.perform("double_tap", self.with_screenshot("double_tap", async {
            let element = self.resolver.resolve_unique(locator).await?;
            let detail = self.element_detail(&element, locator).await;
            let center = GeometryProvider::new(self.session.as_ref())
                .element_rect(&element)
                .await
                .map_err(TouchError::Session)?
                .center();
            let viewport = self.viewport().await?;
            let sequences = self.capability.double_tap(center, viewport)?;
            self.session
                .perform_actions(&sequences)
                .await
                .map_err(TouchError::GestureExecution)?;
            Ok(Done::new((), detail))
        }))
        .await
    }

    /// Press an element and keep it pressed.
    ///
    /// The pointer is not released; a following gesture or
    /// [`release_pointers`](Self::release_pointers) lifts it.
    pub async fn long_tap(&self, locator: &Locator) -> Result<(), TouchError> {
        self.perform("long_tap", self.with_screenshot("long_tap", async {
            let element = self.resolver.resolve_unique(locator).await?;
            let detail = self.element_detail(&element, locator).await;
            self.session
                .click_and_hold(&element)
                .await
                .map_err(TouchError::GestureExecution)?;
            Ok(Done::new((), detail))
        }))
        .await
    }

    /// Drag an element by a pixel offset.
    ///
    /// Fails with [`TouchError::NoMovement`] if the element reports the same
    /// location before and after the drag.
    pub async fn swipe_by_offset(&self, locator: &Locator, x_offset: i32, y_offset: i32) -> Result<(), TouchError> {
        self.perform("swipe_by_offset", async {
            let element = self.resolver.resolve_unique(locator).await?;
            let start = self.location_of(&element).await?;
            self.session
                .drag_and_drop_by(&element, x_offset, y_offset)
                .await
                .map_err(TouchError::GestureExecution)?;
            let end = self.relocate(locator).await?;
            moved(start, end)
        })
        .await
    }

    /// Drag one element onto another.
    ///
    /// Succeeds only if the source element's location changed.
    pub async fn swipe_to_element(&self, source: &Locator, destination: &Locator) -> Result<(), TouchError> {
        self.perform("swipe_to_element", async {
            let source_element = self.resolver.resolve_unique(source).await?;
            let destination_element = self.resolver.resolve_unique(destination).await?;
            let start = self.location_of(&source_element).await?;
            self.session
                .drag_and_drop(&source_element, &destination_element)
                .await
                .map_err(TouchError::GestureExecution)?;
            let end = self.relocate(source).await?;
            moved(start, end)
        })
        .await
    }

    /// Scroll `container` (or the whole screen) until `target` is visible.
    ///
    /// See [`crate::discovery`] for the search loop. The outcome is reported
    /// once under `swipe_into_view`.
    pub async fn swipe_into_view(
        &self,
        container: Option<&Locator>,
        target: &Target,
        direction: SwipeDirection,
    ) -> Result<DiscoveryOutcome, TouchError> {
        let span = info_span!("touch_action", action = "swipe_into_view");
        self.engine()
            .discover(container, target, direction)
            .instrument(span)
            .await
    }

    /// Poll the screen until a reference image appears, without scrolling.
    pub async fn wait_until_visible(&self, reference: &ReferenceImage) -> Result<ScreenPoint, TouchError> {
        self.perform("wait_until_visible", async {
            if reference.is_empty() {
                return Err(TouchError::InvalidTarget(reference.to_string()).into());
            }
            let mut last = None;
            for poll in 1..=SCROLL_ATTEMPTS_CAP {
                match self.match_once(reference).await {
                    Ok(found) => match found.point {
                        Some(point) => {
                            let attachments = visual_attachments("wait_until_visible", &found);
                            return Ok(Done::new(point, format!("{reference} visible at {point}"))
                                .with_attachments(attachments));
                        }
                        None => last = Some(found),
                    },
                    Err(err) => debug!(error = %err.error, poll, "visibility poll failed"),
                }
                if poll < SCROLL_ATTEMPTS_CAP {
                    tokio::time::sleep(VISIBILITY_POLL_INTERVAL).await;
                }
            }
            let attachments = last
                .map(|found| visual_attachments("wait_until_visible", &found))
                .unwrap_or_default();
            Err(Failed::with_evidence(
                TouchError::NotFound(reference.to_string()),
                format!("{REFERENCE_NOT_FOUND} under this path {reference}."),
                attachments,
            ))
        })
        .await
    }

    /// Zoom the current screen in or out with a two-finger pinch.
    pub async fn pinch_to_zoom(&self, direction: ZoomDirection) -> Result<(), TouchError> {
        self.perform("pinch_to_zoom", async {
            self.require_native("pinch_to_zoom")?;
            let viewport = self.viewport().await?;
            let sequences = self.capability.pinch(viewport, direction)?;
            self.session
                .perform_actions(&sequences)
                .await
                .map_err(TouchError::GestureExecution)?;
            Ok(Done::new((), format!("Zoomed {direction}")))
        })
        .await
    }

    /// Dismiss the soft keyboard.
    pub async fn hide_keyboard(&self) -> Result<(), TouchError> {
        self.perform("hide_keyboard", async {
            self.require_native("hide_keyboard")?;
            self.mobile("hideKeyboard", Map::new()).await?;
            Ok(Done::new((), "Keyboard hidden"))
        })
        .await
    }

    /// Press an editor action key on the soft keyboard.
    pub async fn keyboard_key_press(&self, key: KeyboardKey) -> Result<(), TouchError> {
        self.perform("keyboard_key_press", async {
            self.require_native("keyboard_key_press")?;
            let mut params = Map::new();
            params.insert("action".into(), key.as_str().into());
            self.mobile("performEditorAction", params).await?;
            Ok(Done::new((), key.as_str()))
        })
        .await
    }

    /// Send the app under test to the background.
    ///
    /// With `Some(seconds)` the app comes back after that time; with `None`
    /// it stays deactivated.
    pub async fn send_app_to_background(&self, seconds: Option<u32>) -> Result<(), TouchError> {
        self.perform("send_app_to_background", async {
            self.require_native("send_app_to_background")?;
            let mut params = Map::new();
            let seconds = seconds.map_or(-1, i64::from);
            params.insert("seconds".into(), seconds.into());
            self.mobile("backgroundApp", params).await?;
            Ok(Done::new((), format!("Sent app to background for {seconds}s")))
        })
        .await
    }

    /// Bring a backgrounded app to the foreground.
    ///
    /// `app_id` is the Android package name or the iOS bundle identifier.
    pub async fn activate_app(&self, app_id: &str) -> Result<(), TouchError> {
        self.perform("activate_app", async {
            let os = self.require_native("activate_app")?;
            let key = match os {
                MobileOs::Android => "appId",
                MobileOs::Ios => "bundleId",
            };
            let mut params = Map::new();
            params.insert(key.into(), app_id.into());
            self.mobile("activateApp", params).await?;
            Ok(Done::new((), format!("Activated {app_id}")))
        })
        .await
    }

    /// Release every pressed pointer and key on the session.
    pub async fn release_pointers(&self) -> Result<(), TouchError> {
        self.perform("release_pointers", async {
            self.session
                .release_actions()
                .await
                .map_err(TouchError::GestureExecution)?;
            Ok(Done::new((), "Released all input sources"))
        })
        .await
    }

    /// Runs `body` after capturing the screen, and attaches that capture to
    /// the outcome either way.
    async fn with_screenshot<T, F>(&self, action: &str, body: F) -> Result<Done<T>, Failed>
    where
        F: Future<Output = Result<Done<T>, Failed>>,
    {
        let shot = match self.session.screenshot().await {
            Ok(png) => vec![Attachment::image(format!("{action} - Screenshot"), png)],
            Err(err) => {
                debug!(error = %err, action, "evidence screenshot failed");
                Vec::new()
            }
        };
        match body.await {
            Ok(done) => Ok(done.with_attachments(shot)),
            Err(failed) => Err(failed.with_attachments(shot)),
        }
    }

    fn require_native(&self, gesture: &'static str) -> Result<MobileOs, TouchError> {
        match self.capability.as_ref() {
            Capability::NativeMobile(native) => Ok(native.os),
            Capability::WebEmulated(_) => Err(TouchError::UnsupportedPlatform {
                gesture,
                platform: self.session.platform(),
            }),
        }
    }

    async fn mobile(&self, command: &str, params: Map<String, Value>) -> Result<Value, TouchError> {
        self.session
            .execute_mobile(command, params)
            .await
            .map_err(TouchError::GestureExecution)
    }

    async fn viewport(&self) -> Result<Rectangle, TouchError> {
        Ok(GeometryProvider::new(self.session.as_ref()).viewport().await?)
    }

    async fn location_of(&self, element: &ElementHandle) -> Result<ScreenPoint, TouchError> {
        Ok(GeometryProvider::new(self.session.as_ref())
            .element_location(element)
            .await?)
    }

    /// Resolves the locator again, since the drag may have replaced the element.
    async fn relocate(&self, locator: &Locator) -> Result<ScreenPoint, TouchError> {
        let element = self.resolver.resolve_unique(locator).await?;
        self.location_of(&element).await
    }

    async fn match_once(&self, reference: &ReferenceImage) -> Result<VisualMatch, Failed> {
        let matcher = self.matcher.as_ref().ok_or_else(|| {
            TouchError::InvalidTarget(format!("{reference}: no visual matcher configured"))
        })?;
        Ok(matcher.locate(reference).await.map_err(TouchError::from)?)
    }

    /// The report detail for an element gesture: its text when configured
    /// and available, otherwise the locator.
    async fn element_detail(&self, element: &ElementHandle, locator: &Locator) -> String {
        if !self.config.capture_element_text {
            return locator.to_string();
        }
        let text = if self.session.platform().is_native_mobile() {
            self.session.element_attribute(element, "text").await.ok().flatten()
        } else {
            self.session.element_text(element).await.ok()
        };
        match text {
            Some(text) if !text.trim().is_empty() => text.replace('\n', " "),
            _ => locator.to_string(),
        }
    }
}

fn moved(start: ScreenPoint, end: ScreenPoint) -> Result<Done<()>, Failed> {
    if start != end {
        Ok(Done::new((), format!("Start point: {start}, End point: {end}")))
    } else {
        Err(TouchError::NoMovement { start, end }.into())
    }
}

fn visual_attachments(action: &str, found: &VisualMatch) -> Vec<Attachment> {
    vec![
        Attachment::image(format!("{action} - Reference Screenshot"), found.reference_image.clone()),
        Attachment::image(format!("{action} - Current Screen Image"), found.screen_capture.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyboard_keys_use_editor_action_names() {
        assert_eq!(KeyboardKey::Go.as_str(), "go");
        assert_eq!(KeyboardKey::Unspecified.as_str(), "unspecified");
        assert_eq!(serde_json::to_value(KeyboardKey::Previous).unwrap(), "previous");
    }

    #[test]
    fn unchanged_location_is_no_movement() {
        let p = ScreenPoint::new(10, 20);
        let failed = moved(p, p).err().unwrap();
        assert!(matches!(failed.error, TouchError::NoMovement { .. }));
        assert_eq!(failed.error.to_string(), "Start point: (10, 20), End point: (10, 20)");
    }

    #[test]
    fn changed_location_passes_with_both_points() {
        let done = moved(ScreenPoint::new(10, 20), ScreenPoint::new(60, 20)).ok().unwrap();
        assert_eq!(done.detail, "Start point: (10, 20), End point: (60, 20)");
    }
}
