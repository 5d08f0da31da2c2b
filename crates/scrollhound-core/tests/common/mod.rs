//! Shared test helpers for scrollhound-core integration tests.
//!
//! Provides an in-memory session, scripted resolver/matcher/scroll driver
//! stubs with call counters, a recording reporter, and the reply envelope
//! used by the mockito-backed WebDriver tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use scrollhound_core::actions::ActionSequence;
use scrollhound_core::error::TouchError;
use scrollhound_core::geometry::{Rectangle, ScreenPoint, SwipeDirection};
use scrollhound_core::locator::{expect_unique, Locator, LocatorResolver, ResolveError};
use scrollhound_core::report::{ActionReporter, Attachment};
use scrollhound_core::scroll::{ScrollDriver, ScrollRequest, ScrollRoom, ScrollTarget};
use scrollhound_core::session::{ElementHandle, Platform, Session, SessionError};
use scrollhound_core::visual::{MatchError, ReferenceImage, VisualMatch, VisualMatcher};

/// Install a fmt subscriber honoring `RUST_LOG`. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ---------------------------------------------------------------------------
// In-memory session
// ---------------------------------------------------------------------------

/// A session backed by canned element data that records what it is asked
/// to do.
pub struct StubSession {
    platform: Platform,
    viewport: Rectangle,
    /// Locator value -> element ids.
    elements: Mutex<HashMap<String, Vec<String>>>,
    /// Element id -> successive rects; the last one repeats.
    rects: Mutex<HashMap<String, VecDeque<Rectangle>>>,
    attributes: Mutex<HashMap<(String, String), String>>,
    script_result: Mutex<Value>,
    fail_actions: bool,
    pub performed: Mutex<Vec<Vec<ActionSequence>>>,
    pub scripts: Mutex<Vec<(String, Vec<Value>)>>,
    pub clicks: Mutex<Vec<String>>,
    pub screenshots: AtomicUsize,
    pub releases: AtomicUsize,
}

impl StubSession {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            viewport: Rectangle::viewport(400, 800),
            elements: Mutex::new(HashMap::new()),
            rects: Mutex::new(HashMap::new()),
            attributes: Mutex::new(HashMap::new()),
            script_result: Mutex::new(Value::Null),
            fail_actions: false,
            performed: Mutex::new(Vec::new()),
            scripts: Mutex::new(Vec::new()),
            clicks: Mutex::new(Vec::new()),
            screenshots: AtomicUsize::new(0),
            releases: AtomicUsize::new(0),
        }
    }

    /// Register elements matched by a locator value.
    pub fn with_element(self, locator_value: &str, ids: &[&str]) -> Self {
        self.elements
            .lock()
            .unwrap()
            .insert(locator_value.to_string(), ids.iter().map(|s| s.to_string()).collect());
        self
    }

    /// Rects returned by successive `element_rect` calls for `id`.
    pub fn with_rects(self, id: &str, rects: &[Rectangle]) -> Self {
        self.rects
            .lock()
            .unwrap()
            .insert(id.to_string(), rects.iter().copied().collect());
        self
    }

    pub fn with_attribute(self, id: &str, name: &str, value: &str) -> Self {
        self.attributes
            .lock()
            .unwrap()
            .insert((id.to_string(), name.to_string()), value.to_string());
        self
    }

    pub fn with_script_result(self, value: Value) -> Self {
        *self.script_result.lock().unwrap() = value;
        self
    }

    /// Make every `perform_actions` call fail as an unsupported command.
    pub fn failing_actions(mut self) -> Self {
        self.fail_actions = true;
        self
    }

    pub fn performed(&self) -> Vec<Vec<ActionSequence>> {
        self.performed.lock().unwrap().clone()
    }

    pub fn scripts(&self) -> Vec<(String, Vec<Value>)> {
        self.scripts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Session for StubSession {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementHandle>, SessionError> {
        Ok(self
            .elements
            .lock()
            .unwrap()
            .get(&locator.value)
            .map(|ids| ids.iter().map(ElementHandle::new).collect())
            .unwrap_or_default())
    }

    async fn element_rect(&self, element: &ElementHandle) -> Result<Rectangle, SessionError> {
        let mut rects = self.rects.lock().unwrap();
        let queue = rects
            .get_mut(&element.id)
            .ok_or_else(|| SessionError::NoSuchElement(element.id.clone()))?;
        let rect = if queue.len() > 1 { queue.pop_front() } else { queue.front().copied() };
        rect.ok_or_else(|| SessionError::NoSuchElement(element.id.clone()))
    }

    async fn element_text(&self, element: &ElementHandle) -> Result<String, SessionError> {
        Ok(self
            .attributes
            .lock()
            .unwrap()
            .get(&(element.id.clone(), "innerText".to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn element_attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, SessionError> {
        Ok(self
            .attributes
            .lock()
            .unwrap()
            .get(&(element.id.clone(), name.to_string()))
            .cloned())
    }

    async fn click(&self, element: &ElementHandle) -> Result<(), SessionError> {
        self.clicks.lock().unwrap().push(element.id.clone());
        Ok(())
    }

    async fn window_size(&self) -> Result<Rectangle, SessionError> {
        Ok(self.viewport)
    }

    async fn screenshot(&self) -> Result<Vec<u8>, SessionError> {
        let n = self.screenshots.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("shot-{n}").into_bytes())
    }

    async fn perform_actions(&self, actions: &[ActionSequence]) -> Result<(), SessionError> {
        if self.fail_actions {
            return Err(SessionError::UnsupportedCommand("actions".into()));
        }
        self.performed.lock().unwrap().push(actions.to_vec());
        Ok(())
    }

    async fn release_actions(&self) -> Result<(), SessionError> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn execute_script(&self, script: &str, args: Vec<Value>) -> Result<Value, SessionError> {
        self.scripts.lock().unwrap().push((script.to_string(), args));
        Ok(self.script_result.lock().unwrap().clone())
    }
}

// ---------------------------------------------------------------------------
// Scripted collaborators
// ---------------------------------------------------------------------------

/// What a scripted resolver answers on a given call.
#[derive(Debug, Clone, Copy)]
pub enum Presence {
    /// This many elements match.
    Matches(usize),
    /// The session fails during the query.
    Error,
}

type PresenceScript = Box<dyn Fn(usize) -> Presence + Send + Sync>;

/// A resolver whose answer depends on the 1-based call number.
pub struct ScriptedResolver {
    script: PresenceScript,
    pub calls: AtomicUsize,
}

impl ScriptedResolver {
    pub fn new(script: impl Fn(usize) -> Presence + Send + Sync + 'static) -> Self {
        Self {
            script: Box::new(script),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn absent() -> Self {
        Self::new(|_| Presence::Matches(0))
    }

    /// Absent until call `n`, present from then on.
    pub fn present_from(n: usize) -> Self {
        Self::new(move |call| Presence::Matches(usize::from(call >= n)))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LocatorResolver for ScriptedResolver {
    async fn resolve_unique(&self, locator: &Locator) -> Result<ElementHandle, ResolveError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        match (self.script)(call) {
            Presence::Matches(count) => {
                let handles = (0..count).map(|i| ElementHandle::new(format!("el-{i}"))).collect();
                expect_unique(locator, handles)
            }
            Presence::Error => Err(SessionError::CommandFailed("stale tree".into()).into()),
        }
    }
}

/// A matcher that finds the reference from call `found_on` onwards, returning
/// a distinct screen capture per call (`screen-{n}`).
pub struct ScriptedMatcher {
    found_on: Option<usize>,
    point: ScreenPoint,
    pub calls: AtomicUsize,
}

impl ScriptedMatcher {
    pub fn found_on(call: usize, point: ScreenPoint) -> Self {
        Self {
            found_on: Some(call),
            point,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn never() -> Self {
        Self {
            found_on: None,
            point: ScreenPoint::new(0, 0),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VisualMatcher for ScriptedMatcher {
    async fn locate(&self, _reference: &ReferenceImage) -> Result<VisualMatch, MatchError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let found = self.found_on.is_some_and(|n| call >= n);
        Ok(VisualMatch {
            screen_capture: format!("screen-{call}").into_bytes(),
            reference_image: b"reference".to_vec(),
            point: found.then_some(self.point),
        })
    }
}

type StepScript = Box<dyn Fn(usize) -> Result<ScrollRoom, TouchError> + Send + Sync>;

/// A scroll driver answering from a script keyed by the 1-based step number.
pub struct ScriptedScroller {
    script: StepScript,
    pub steps: AtomicUsize,
    /// Direction of each step and whether it was for a visual target.
    pub requests: Mutex<Vec<(SwipeDirection, bool)>>,
    /// Points passed to `reveal_point`.
    pub revealed: Mutex<Vec<ScreenPoint>>,
}

impl ScriptedScroller {
    pub fn new(script: impl Fn(usize) -> Result<ScrollRoom, TouchError> + Send + Sync + 'static) -> Self {
        Self {
            script: Box::new(script),
            steps: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            revealed: Mutex::new(Vec::new()),
        }
    }

    pub fn always(room: ScrollRoom) -> Self {
        Self::new(move |_| Ok(room))
    }

    pub fn steps(&self) -> usize {
        self.steps.load(Ordering::SeqCst)
    }

    pub fn revealed(&self) -> Vec<ScreenPoint> {
        self.revealed.lock().unwrap().clone()
    }
}

#[async_trait]
impl ScrollDriver for ScriptedScroller {
    async fn step(
        &self,
        _session: &dyn Session,
        _resolver: &dyn LocatorResolver,
        request: &ScrollRequest<'_>,
    ) -> Result<ScrollRoom, TouchError> {
        let step = self.steps.fetch_add(1, Ordering::SeqCst) + 1;
        let visual = matches!(request.target, ScrollTarget::Visual);
        self.requests.lock().unwrap().push((request.direction, visual));
        (self.script)(step)
    }

    async fn reveal_point(&self, _session: &dyn Session, point: ScreenPoint) -> Result<(), TouchError> {
        self.revealed.lock().unwrap().push(point);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Recording reporter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Recorded {
    pub action: String,
    pub detail: String,
    pub passed: bool,
    pub attachments: Vec<Attachment>,
    pub cause: Option<String>,
}

#[derive(Default)]
pub struct RecordingReporter {
    reports: Mutex<Vec<Recorded>>,
}

impl RecordingReporter {
    pub fn reports(&self) -> Vec<Recorded> {
        self.reports.lock().unwrap().clone()
    }

    /// The only report; panics unless exactly one was made.
    pub fn single(&self) -> Recorded {
        let reports = self.reports();
        assert_eq!(reports.len(), 1, "expected exactly one report, got {reports:?}");
        reports[0].clone()
    }
}

impl ActionReporter for RecordingReporter {
    fn report_success(&self, action: &str, detail: &str, attachments: Vec<Attachment>) {
        self.reports.lock().unwrap().push(Recorded {
            action: action.to_string(),
            detail: detail.to_string(),
            passed: true,
            attachments,
            cause: None,
        });
    }

    fn report_failure(
        &self,
        action: &str,
        detail: &str,
        attachments: Vec<Attachment>,
        cause: Option<&TouchError>,
    ) {
        self.reports.lock().unwrap().push(Recorded {
            action: action.to_string(),
            detail: detail.to_string(),
            passed: false,
            attachments,
            cause: cause.map(|e| e.to_string()),
        });
    }
}

// ---------------------------------------------------------------------------
// WebDriver replies
// ---------------------------------------------------------------------------

/// The JSON body of a WebDriver reply carrying `value`.
pub fn reply(value: Value) -> String {
    json!({ "value": value }).to_string()
}
