//! Platform capability variants.
//!
//! A [`Capability`] is chosen once per session from its [`Platform`] and
//! answers both scrolling ([`ScrollDriver`]) and gesture construction
//! ([`GestureBuilder`]). Callers never branch on the platform themselves.
//!
//! | Variant        | Scroll step                              | Room signal |
//! |----------------|------------------------------------------|-------------|
//! | `NativeMobile` | `mobile: scrollGesture` / `mobile: scroll` | reliable (Android) |
//! | `WebEmulated`  | scroll-to-element or wheel               | always unknown |

use async_trait::async_trait;
use tracing::debug;

use crate::actions::{ActionSequence, Origin, PointerKind, WheelScroll};
use crate::config::TouchConfig;
use crate::error::TouchError;
use crate::gesture::{GestureBuilder, GestureTimings};
use crate::geometry::{GeometryProvider, Rectangle, ScreenPoint, SwipeDirection, ZoomDirection};
use crate::locator::{Locator, LocatorResolver, ResolveError};
use crate::scroll::{scroll_params, ScrollDriver, ScrollRequest, ScrollRoom, ScrollTarget, SCROLL_PERCENT};
use crate::session::{ElementHandle, Platform, Session, DEFAULT_MOVE_DURATION};

/// Native mobile operating systems with a scroll-gesture primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MobileOs {
    Android,
    Ios,
}

impl MobileOs {
    /// The `mobile:` command that performs one scroll gesture.
    pub fn scroll_command(&self) -> &'static str {
        match self {
            MobileOs::Android => "scrollGesture",
            MobileOs::Ios => "scroll",
        }
    }

    pub fn platform(&self) -> Platform {
        match self {
            MobileOs::Android => Platform::Android,
            MobileOs::Ios => Platform::Ios,
        }
    }
}

/// Scrolls with the platform's native gesture and reads back its room signal.
#[derive(Debug, Clone)]
pub struct NativeMobile {
    pub os: MobileOs,
    pub timings: GestureTimings,
}

impl NativeMobile {
    pub fn new(os: MobileOs, timings: GestureTimings) -> Self {
        Self { os, timings }
    }

    async fn scroll_area(
        &self,
        session: &dyn Session,
        resolver: &dyn LocatorResolver,
        container: Option<&Locator>,
    ) -> Result<Rectangle, TouchError> {
        let geometry = GeometryProvider::new(session);
        match container {
            Some(locator) => {
                let element = resolver.resolve_unique(locator).await?;
                Ok(geometry.element_rect(&element).await.map_err(TouchError::TransientStep)?)
            }
            None => Ok(geometry.viewport().await.map_err(TouchError::TransientStep)?),
        }
    }
}

#[async_trait]
impl ScrollDriver for NativeMobile {
    async fn step(
        &self,
        session: &dyn Session,
        resolver: &dyn LocatorResolver,
        request: &ScrollRequest<'_>,
    ) -> Result<ScrollRoom, TouchError> {
        let area = self.scroll_area(session, resolver, request.container).await?;
        let params = scroll_params(area, request.direction);
        let signal = session
            .execute_mobile(self.os.scroll_command(), params.to_map())
            .await
            .map_err(TouchError::TransientStep)?;
        let room = ScrollRoom::from_signal(&signal);
        debug!(command = self.os.scroll_command(), ?params, ?room, "native scroll step");
        Ok(room)
    }
}

impl GestureBuilder for NativeMobile {
    fn timings(&self) -> &GestureTimings {
        &self.timings
    }
}

/// Emulates scrolling with W3C pointer and wheel input.
///
/// There is no way to learn whether the page moved, so every step reports
/// [`ScrollRoom::Unknown`] and the attempt cap bounds the search.
#[derive(Debug, Clone, Default)]
pub struct WebEmulated {
    pub timings: GestureTimings,
}

impl WebEmulated {
    pub fn new(timings: GestureTimings) -> Self {
        Self { timings }
    }

    async fn resolve_container(
        resolver: &dyn LocatorResolver,
        container: Option<&Locator>,
    ) -> Result<Option<ElementHandle>, TouchError> {
        match container {
            Some(locator) => Ok(Some(resolver.resolve_unique(locator).await?)),
            None => Ok(None),
        }
    }

    /// One wheel step, centered on the container when there is one.
    async fn wheel(
        &self,
        session: &dyn Session,
        direction: SwipeDirection,
        container: Option<&ElementHandle>,
    ) -> Result<(), TouchError> {
        let geometry = GeometryProvider::new(session);
        let viewport = geometry.viewport().await.map_err(TouchError::TransientStep)?;
        let anchor = match container {
            Some(element) => Some(
                geometry
                    .element_rect(element)
                    .await
                    .map_err(TouchError::TransientStep)?
                    .center(),
            ),
            None => None,
        };
        let scroll = wheel_scroll(viewport, direction, anchor);
        debug!(?direction, x = scroll.x, y = scroll.y, "wheel scroll step");
        session.scroll_wheel(scroll).await.map_err(TouchError::TransientStep)
    }
}

/// A wheel scroll covering most of the viewport in `direction`, centered on
/// `anchor` (the container's center) or on the viewport center.
///
/// `Up` brings content from below into view, matching a finger travelling
/// toward the top of the screen.
pub fn wheel_scroll(viewport: Rectangle, direction: SwipeDirection, anchor: Option<ScreenPoint>) -> WheelScroll {
    let at = anchor.unwrap_or_else(|| viewport.center());
    let dy = (f64::from(viewport.height) * SCROLL_PERCENT) as i32;
    let dx = (f64::from(viewport.width) * SCROLL_PERCENT) as i32;
    let (delta_x, delta_y) = match direction {
        SwipeDirection::Up => (0, dy),
        SwipeDirection::Down => (0, -dy),
        SwipeDirection::Left => (dx, 0),
        SwipeDirection::Right => (-dx, 0),
    };
    WheelScroll {
        origin: Origin::Viewport,
        x: at.x,
        y: at.y,
        delta_x,
        delta_y,
        duration: DEFAULT_MOVE_DURATION,
    }
}

/// A wheel scroll from `point` that moves it to the viewport center.
pub fn wheel_to_point(viewport: Rectangle, point: ScreenPoint) -> WheelScroll {
    let center = viewport.center();
    WheelScroll {
        origin: Origin::Viewport,
        x: point.x,
        y: point.y,
        delta_x: point.x - center.x,
        delta_y: point.y - center.y,
        duration: DEFAULT_MOVE_DURATION,
    }
}

#[async_trait]
impl ScrollDriver for WebEmulated {
    async fn step(
        &self,
        session: &dyn Session,
        resolver: &dyn LocatorResolver,
        request: &ScrollRequest<'_>,
    ) -> Result<ScrollRoom, TouchError> {
        let container = Self::resolve_container(resolver, request.container).await?;
        match request.target {
            ScrollTarget::Element(locator) => match resolver.resolve_unique(locator).await {
                Ok(target) => {
                    session
                        .scroll_to_element(container.as_ref(), &target)
                        .await
                        .map_err(TouchError::TransientStep)?;
                }
                // Not attached yet, e.g. lazily rendered lists.
                Err(ResolveError::NotFound(_)) => {
                    self.wheel(session, request.direction, container.as_ref()).await?;
                }
                Err(e) => return Err(e.into()),
            },
            ScrollTarget::Visual => {
                self.wheel(session, request.direction, container.as_ref()).await?;
            }
        }
        Ok(ScrollRoom::Unknown)
    }

    async fn reveal(
        &self,
        session: &dyn Session,
        resolver: &dyn LocatorResolver,
        container: Option<&Locator>,
        element: &ElementHandle,
    ) -> Result<(), TouchError> {
        let container = Self::resolve_container(resolver, container).await?;
        session
            .scroll_to_element(container.as_ref(), element)
            .await
            .map_err(TouchError::TransientStep)
    }

    async fn reveal_point(&self, session: &dyn Session, point: ScreenPoint) -> Result<(), TouchError> {
        let viewport = GeometryProvider::new(session)
            .viewport()
            .await
            .map_err(TouchError::TransientStep)?;
        let scroll = wheel_to_point(viewport, point);
        debug!(%point, delta_x = scroll.delta_x, delta_y = scroll.delta_y, "wheel toward visual match");
        session.scroll_wheel(scroll).await.map_err(TouchError::TransientStep)
    }
}

impl GestureBuilder for WebEmulated {
    fn timings(&self) -> &GestureTimings {
        &self.timings
    }

    fn pinch(
        &self,
        _viewport: Rectangle,
        _direction: ZoomDirection,
    ) -> Result<Vec<ActionSequence>, TouchError> {
        Err(TouchError::UnsupportedPlatform {
            gesture: "pinch_to_zoom",
            platform: Platform::Web,
        })
    }
}

/// The capability matching a session's platform.
#[derive(Debug, Clone)]
pub enum Capability {
    NativeMobile(NativeMobile),
    WebEmulated(WebEmulated),
}

impl Capability {
    /// Selects the variant for `platform`, with timings from `config`.
    pub fn for_platform(platform: Platform, config: &TouchConfig) -> Self {
        let timings = GestureTimings::from(config);
        match platform {
            Platform::Android => Capability::NativeMobile(NativeMobile::new(MobileOs::Android, timings)),
            Platform::Ios => Capability::NativeMobile(NativeMobile::new(MobileOs::Ios, timings)),
            Platform::Web => Capability::WebEmulated(WebEmulated::new(timings)),
        }
    }

    pub fn platform(&self) -> Platform {
        match self {
            Capability::NativeMobile(native) => native.os.platform(),
            Capability::WebEmulated(_) => Platform::Web,
        }
    }
}

#[async_trait]
impl ScrollDriver for Capability {
    async fn step(
        &self,
        session: &dyn Session,
        resolver: &dyn LocatorResolver,
        request: &ScrollRequest<'_>,
    ) -> Result<ScrollRoom, TouchError> {
        match self {
            Capability::NativeMobile(native) => native.step(session, resolver, request).await,
            Capability::WebEmulated(web) => web.step(session, resolver, request).await,
        }
    }

    async fn reveal(
        &self,
        session: &dyn Session,
        resolver: &dyn LocatorResolver,
        container: Option<&Locator>,
        element: &ElementHandle,
    ) -> Result<(), TouchError> {
        match self {
            Capability::NativeMobile(native) => native.reveal(session, resolver, container, element).await,
            Capability::WebEmulated(web) => web.reveal(session, resolver, container, element).await,
        }
    }

    async fn reveal_point(&self, session: &dyn Session, point: ScreenPoint) -> Result<(), TouchError> {
        match self {
            Capability::NativeMobile(native) => native.reveal_point(session, point).await,
            Capability::WebEmulated(web) => web.reveal_point(session, point).await,
        }
    }
}

impl GestureBuilder for Capability {
    fn timings(&self) -> &GestureTimings {
        match self {
            Capability::NativeMobile(native) => native.timings(),
            Capability::WebEmulated(web) => web.timings(),
        }
    }

    fn pointer_kind(&self) -> PointerKind {
        match self {
            Capability::NativeMobile(native) => native.pointer_kind(),
            Capability::WebEmulated(web) => web.pointer_kind(),
        }
    }

    fn pinch(
        &self,
        viewport: Rectangle,
        direction: ZoomDirection,
    ) -> Result<Vec<ActionSequence>, TouchError> {
        match self {
            Capability::NativeMobile(native) => native.pinch(viewport, direction),
            Capability::WebEmulated(web) => web.pinch(viewport, direction),
        }
    }
}
