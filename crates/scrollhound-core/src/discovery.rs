//! Bounded search for a target inside a scrollable area.
//!
//! [`DiscoveryEngine::discover`] alternates presence checks and single
//! scroll steps until the target shows up or the [`ScrollBudget`] runs out:
//!
//! ```text
//! Searching --absent--> Scrolling --step--> Searching --present--> Found
//!     \
//!      `--budget spent--> Exhausted
//! ```
//!
//! The loop keeps going while fewer than `attempts_cap` scroll steps were
//! made, or while the platform positively reports more room. A platform that
//! cannot tell ([`ScrollRoom::Unknown`]) is bounded by the cap alone. When a
//! step first reports that the end of content was reached, one extra presence
//! check runs before the budget is evaluated, since the last step may have
//! revealed the target.
//!
//! A found target is handed to [`ScrollDriver::reveal`] (elements) or
//! [`ScrollDriver::reveal_point`] (visual matches) so the capability can
//! bring it into view before the outcome is reported.
//!
//! Resolver and matcher failures during a check count as "absent this time".
//! A failing scroll step ends the search with [`DiscoveryOutcome::NotFound`]
//! carrying the error. Ambiguous structural matches are never retried.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::TouchError;
use crate::geometry::{ScreenPoint, SwipeDirection};
use crate::locator::{Locator, LocatorResolver, ResolveError, Target};
use crate::report::{ActionReporter, Attachment};
use crate::scroll::{ScrollDriver, ScrollRequest, ScrollRoom, ScrollTarget};
use crate::session::{ElementHandle, Session};
use crate::visual::{ReferenceImage, VisualMatcher};

/// Scroll steps allowed before the platform's room signal takes over.
pub const SCROLL_ATTEMPTS_CAP: u32 = 5;

/// Action name under which discovery outcomes are reported.
pub const DISCOVERY_ACTION: &str = "swipe_into_view";

/// Message for a reference image that never appeared.
pub(crate) const REFERENCE_NOT_FOUND: &str = "Couldn't find reference element on the current screen. \
If you can see it in the attached image then kindly consider cropping it and updating your reference image";

/// Loop state for one discovery call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollBudget {
    pub attempts_made: u32,
    pub attempts_cap: u32,
    /// Last room signal; `Unknown` until the first step.
    pub room: ScrollRoom,
}

impl ScrollBudget {
    pub fn new(attempts_cap: u32) -> Self {
        Self {
            attempts_made: 0,
            attempts_cap,
            room: ScrollRoom::Unknown,
        }
    }

    /// Whether the platform may still have content in the scroll direction.
    pub fn can_still_scroll(&self) -> bool {
        self.room.can_still_scroll()
    }

    /// Whether another iteration may run.
    pub fn should_continue(&self) -> bool {
        self.attempts_made < self.attempts_cap || self.room == ScrollRoom::More
    }

    /// Records a step's signal and counts the attempt.
    ///
    /// Returns true when this step is the first to report the end of content.
    pub fn record_step(&mut self, room: ScrollRoom) -> bool {
        let newly_exhausted = room == ScrollRoom::Exhausted && self.room != ScrollRoom::Exhausted;
        self.room = room;
        self.attempts_made += 1;
        newly_exhausted
    }
}

impl Default for ScrollBudget {
    fn default() -> Self {
        Self::new(SCROLL_ATTEMPTS_CAP)
    }
}

/// Where the search loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryState {
    Searching,
    Scrolling,
    Found,
    Exhausted,
}

/// Images substantiating a discovery outcome.
///
/// `reference` and `screen` come from the most recent presence check;
/// `progress` holds the screenshot taken before each scroll step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Evidence {
    pub reference: Option<Attachment>,
    pub screen: Option<Attachment>,
    pub progress: Vec<Attachment>,
}

impl Evidence {
    /// All attachments, reference and current screen first.
    pub fn attachments(&self) -> Vec<Attachment> {
        self.reference
            .iter()
            .chain(self.screen.iter())
            .chain(self.progress.iter())
            .cloned()
            .collect()
    }
}

/// What a successful search located.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Located {
    Element(ElementHandle),
    Point(ScreenPoint),
}

impl fmt::Display for Located {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Located::Element(element) => write!(f, "element {}", element.id),
            Located::Point(point) => write!(f, "point {point}"),
        }
    }
}

/// Result of a search that ran to a terminal state.
#[derive(Debug)]
pub enum DiscoveryOutcome {
    Found {
        location: Located,
        evidence: Evidence,
    },
    NotFound {
        evidence: Evidence,
        /// The scroll-step error that aborted the search, if any.
        cause: Option<TouchError>,
    },
}

impl DiscoveryOutcome {
    pub fn is_found(&self) -> bool {
        matches!(self, DiscoveryOutcome::Found { .. })
    }

    pub fn evidence(&self) -> &Evidence {
        match self {
            DiscoveryOutcome::Found { evidence, .. } | DiscoveryOutcome::NotFound { evidence, .. } => evidence,
        }
    }

    /// The located element or point, or the reason the search failed.
    pub fn into_located(self, target: &Target) -> Result<Located, TouchError> {
        match self {
            DiscoveryOutcome::Found { location, .. } => Ok(location),
            DiscoveryOutcome::NotFound { cause: Some(cause), .. } => Err(cause),
            DiscoveryOutcome::NotFound { cause: None, .. } => Err(TouchError::NotFound(target.to_string())),
        }
    }
}

/// Drives presence checks and scroll steps for one session.
pub struct DiscoveryEngine {
    session: Arc<dyn Session>,
    resolver: Arc<dyn LocatorResolver>,
    matcher: Option<Arc<dyn VisualMatcher>>,
    scroller: Arc<dyn ScrollDriver>,
    reporter: Arc<dyn ActionReporter>,
    attempts_cap: u32,
}

impl DiscoveryEngine {
    pub fn new(
        session: Arc<dyn Session>,
        resolver: Arc<dyn LocatorResolver>,
        scroller: Arc<dyn ScrollDriver>,
        reporter: Arc<dyn ActionReporter>,
    ) -> Self {
        Self {
            session,
            resolver,
            matcher: None,
            scroller,
            reporter,
            attempts_cap: SCROLL_ATTEMPTS_CAP,
        }
    }

    /// Enables visual targets.
    pub fn with_matcher(mut self, matcher: Arc<dyn VisualMatcher>) -> Self {
        self.matcher = Some(matcher);
        self
    }

    pub fn with_attempts_cap(mut self, attempts_cap: u32) -> Self {
        self.attempts_cap = attempts_cap;
        self
    }

    /// Search for `target`, scrolling `container` (or the viewport) in
    /// `direction` between checks, and report the outcome once.
    ///
    /// Returns `Err` only for a malformed target or an ambiguous structural
    /// match. A target that never appeared is `Ok(NotFound)`.
    pub async fn discover(
        &self,
        container: Option<&Locator>,
        target: &Target,
        direction: SwipeDirection,
    ) -> Result<DiscoveryOutcome, TouchError> {
        let result = self.search(container, target, direction).await;
        self.report(target, direction, &result);
        result
    }

    async fn search(
        &self,
        container: Option<&Locator>,
        target: &Target,
        direction: SwipeDirection,
    ) -> Result<DiscoveryOutcome, TouchError> {
        if !target.is_well_formed() {
            return Err(TouchError::InvalidTarget(target.to_string()));
        }
        if matches!(target, Target::Visual(_)) && self.matcher.is_none() {
            return Err(TouchError::InvalidTarget(format!("{target}: no visual matcher configured")));
        }
        if container.is_some_and(Locator::is_empty) {
            return Err(TouchError::InvalidTarget("empty scroll container locator".into()));
        }

        let mut budget = ScrollBudget::new(self.attempts_cap);
        let mut state = DiscoveryState::Searching;
        let mut evidence = Evidence::default();

        loop {
            if let Some(location) = self.check(target, &mut evidence).await? {
                return self.found(&mut state, container, location, evidence).await;
            }

            transition(&mut state, DiscoveryState::Scrolling, &budget);
            self.capture_progress(&mut evidence, budget.attempts_made + 1).await;

            let request = ScrollRequest {
                container,
                direction,
                target: match target {
                    Target::Structural(locator) => ScrollTarget::Element(locator),
                    Target::Visual(_) => ScrollTarget::Visual,
                },
            };
            let room = match self.scroller.step(self.session.as_ref(), self.resolver.as_ref(), &request).await {
                Ok(room) => room,
                Err(err @ TouchError::AmbiguousMatch { .. }) => return Err(err),
                Err(err) => {
                    debug!(error = %err, attempt = budget.attempts_made + 1, "scroll step failed");
                    transition(&mut state, DiscoveryState::Exhausted, &budget);
                    return Ok(DiscoveryOutcome::NotFound {
                        evidence,
                        cause: Some(err),
                    });
                }
            };

            let newly_exhausted = budget.record_step(room);
            debug!(attempt = budget.attempts_made, ?room, "scroll step done");
            transition(&mut state, DiscoveryState::Searching, &budget);

            if newly_exhausted {
                if let Some(location) = self.check(target, &mut evidence).await? {
                    return self.found(&mut state, container, location, evidence).await;
                }
            }

            if !budget.should_continue() {
                transition(&mut state, DiscoveryState::Exhausted, &budget);
                return Ok(DiscoveryOutcome::NotFound { evidence, cause: None });
            }
        }
    }

    /// One presence check. `Ok(None)` means absent for now.
    async fn check(
        &self,
        target: &Target,
        evidence: &mut Evidence,
    ) -> Result<Option<Located>, TouchError> {
        match target {
            Target::Structural(locator) => match self.resolver.resolve_unique(locator).await {
                Ok(element) => Ok(Some(Located::Element(element))),
                Err(ResolveError::NotFound(_)) => Ok(None),
                Err(err @ ResolveError::Ambiguous { .. }) => Err(err.into()),
                Err(err) => {
                    debug!(error = %err, %locator, "presence check failed");
                    Ok(None)
                }
            },
            Target::Visual(reference) => self.check_visual(reference, evidence).await,
        }
    }

    async fn check_visual(
        &self,
        reference: &ReferenceImage,
        evidence: &mut Evidence,
    ) -> Result<Option<Located>, TouchError> {
        let Some(matcher) = &self.matcher else {
            return Ok(None);
        };
        match matcher.locate(reference).await {
            Ok(found) => {
                evidence.reference = Some(Attachment::image("Reference Screenshot", found.reference_image));
                evidence.screen = Some(Attachment::image("Current Screen Image", found.screen_capture));
                Ok(found.point.map(Located::Point))
            }
            Err(err) => {
                debug!(error = %err, %reference, "visual match failed");
                Ok(None)
            }
        }
    }

    async fn found(
        &self,
        state: &mut DiscoveryState,
        container: Option<&Locator>,
        location: Located,
        mut evidence: Evidence,
    ) -> Result<DiscoveryOutcome, TouchError> {
        let revealed = match &location {
            Located::Element(element) => {
                self.scroller
                    .reveal(self.session.as_ref(), self.resolver.as_ref(), container, element)
                    .await
            }
            Located::Point(point) => self.scroller.reveal_point(self.session.as_ref(), *point).await,
        };
        if let Err(err) = revealed {
            debug!(error = %err, %location, "could not bring target into view");
            *state = DiscoveryState::Exhausted;
            return Ok(DiscoveryOutcome::NotFound {
                evidence,
                cause: Some(err),
            });
        }
        if evidence.screen.is_none() {
            if let Ok(png) = self.session.screenshot().await {
                evidence.screen = Some(Attachment::image("Current Screen Image", png));
            }
        }
        debug!(from = ?state, to = ?DiscoveryState::Found, %location, "discovery state");
        *state = DiscoveryState::Found;
        Ok(DiscoveryOutcome::Found { location, evidence })
    }

    async fn capture_progress(&self, evidence: &mut Evidence, attempt: u32) {
        match self.session.screenshot().await {
            Ok(png) => evidence
                .progress
                .push(Attachment::image(format!("Scroll Attempt {attempt}"), png)),
            Err(err) => debug!(error = %err, attempt, "progress screenshot failed"),
        }
    }

    fn report(&self, target: &Target, direction: SwipeDirection, result: &Result<DiscoveryOutcome, TouchError>) {
        match result {
            Ok(DiscoveryOutcome::Found { location, evidence }) => {
                self.reporter.report_success(
                    DISCOVERY_ACTION,
                    &format!("Swiped {direction} until {target} was visible at {location}"),
                    evidence.attachments(),
                );
            }
            Ok(DiscoveryOutcome::NotFound { evidence, cause }) => {
                let detail = match target {
                    Target::Visual(_) => format!("{REFERENCE_NOT_FOUND}."),
                    Target::Structural(_) => format!("Couldn't find {target} after swiping {direction}"),
                };
                self.reporter
                    .report_failure(DISCOVERY_ACTION, &detail, evidence.attachments(), cause.as_ref());
            }
            Err(err) => {
                self.reporter
                    .report_failure(DISCOVERY_ACTION, &err.to_string(), Vec::new(), Some(err));
            }
        }
    }
}

fn transition(state: &mut DiscoveryState, next: DiscoveryState, budget: &ScrollBudget) {
    debug!(
        from = ?state,
        to = ?next,
        attempts = budget.attempts_made,
        room = ?budget.room,
        "discovery state"
    );
    *state = next;
}
