//! Single scroll steps and the scroll-capacity signal.
//!
//! A [`ScrollDriver`] performs exactly one platform-appropriate scroll per
//! [`step`](ScrollDriver::step) and says whether more scrolling is possible,
//! when the platform can tell. Native mobile platforms report it through
//! their scroll-gesture primitive; pointer emulation cannot and answers
//! [`ScrollRoom::Unknown`].
//!
//! # Scroll rectangle convention
//!
//! [`scroll_params`] derives the native gesture area from the container (or
//! the viewport): the extent along the scroll axis is 90% of the area, the
//! gesture covers 80% of it (`percent = 0.8`), and the leading edge sits
//! 100px inside the side the finger starts from.
//!
//! ```
//! use scrollhound_core::geometry::{Rectangle, SwipeDirection};
//! use scrollhound_core::scroll::scroll_params;
//!
//! let params = scroll_params(Rectangle::new(0, 0, 300, 600), SwipeDirection::Up);
//! assert_eq!((params.left, params.top, params.width, params.height), (0, 440, 300, 540));
//! ```

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::TouchError;
use crate::geometry::{Rectangle, ScreenPoint, SwipeDirection};
use crate::locator::{Locator, LocatorResolver};
use crate::session::{ElementHandle, Session};

/// Distance between the gesture's leading edge and the area's edge.
pub const EDGE_OFFSET: i32 = 100;

/// Fraction of the scroll area a single native gesture covers.
pub const SCROLL_PERCENT: f64 = 0.8;

/// Share of the area, in percent, used along the scroll axis.
pub const SCROLL_EXTENT_PERCENT: i32 = 90;

/// Whether further scrolling is possible after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollRoom {
    /// The platform reported more content in the scroll direction.
    More,
    /// The platform reported the end of the content.
    Exhausted,
    /// The platform cannot tell.
    Unknown,
}

impl ScrollRoom {
    /// Interprets the result of a native scroll primitive.
    ///
    /// Anything other than a boolean (iOS returns `null`) is `Unknown`.
    pub fn from_signal(value: &Value) -> Self {
        match value {
            Value::Bool(true) => ScrollRoom::More,
            Value::Bool(false) => ScrollRoom::Exhausted,
            _ => ScrollRoom::Unknown,
        }
    }

    /// False only when the platform positively reported the end of content.
    pub fn can_still_scroll(&self) -> bool {
        !matches!(self, ScrollRoom::Exhausted)
    }
}

/// What the scroll is trying to reveal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollTarget<'a> {
    /// A structural target; pointer emulation can scroll straight to it.
    Element(&'a Locator),
    /// A visual target; only its absence is known while scrolling.
    Visual,
}

/// Arguments of one scroll step.
#[derive(Debug, Clone, Copy)]
pub struct ScrollRequest<'a> {
    pub container: Option<&'a Locator>,
    pub direction: SwipeDirection,
    pub target: ScrollTarget<'a>,
}

/// Parameters of a native scroll gesture.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollParams {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
    pub percent: f64,
    pub direction: SwipeDirection,
}

impl ScrollParams {
    /// The argument map passed to the `mobile:` scroll command.
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("left".into(), self.left.into());
        map.insert("top".into(), self.top.into());
        map.insert("width".into(), self.width.into());
        map.insert("height".into(), self.height.into());
        map.insert("percent".into(), self.percent.into());
        map.insert("direction".into(), self.direction.as_str().into());
        map
    }
}

/// Computes the native gesture area for scrolling inside `area`.
pub fn scroll_params(area: Rectangle, direction: SwipeDirection) -> ScrollParams {
    if direction.is_vertical() {
        let height = area.height * SCROLL_EXTENT_PERCENT / 100;
        let top = match direction {
            SwipeDirection::Up => area.y + height - EDGE_OFFSET,
            _ => area.y + EDGE_OFFSET,
        };
        ScrollParams {
            left: area.x,
            top,
            width: area.width,
            height,
            percent: SCROLL_PERCENT,
            direction,
        }
    } else {
        let width = area.width * SCROLL_EXTENT_PERCENT / 100;
        let left = match direction {
            SwipeDirection::Left => area.x + width - EDGE_OFFSET,
            _ => area.x + EDGE_OFFSET,
        };
        ScrollParams {
            left,
            top: area.y,
            width,
            height: area.height,
            percent: SCROLL_PERCENT,
            direction,
        }
    }
}

/// Performs one scroll step on a session.
#[async_trait]
pub trait ScrollDriver: Send + Sync {
    /// Perform exactly one scroll action and report the remaining room.
    async fn step(
        &self,
        session: &dyn Session,
        resolver: &dyn LocatorResolver,
        request: &ScrollRequest<'_>,
    ) -> Result<ScrollRoom, TouchError>;

    /// Bring an element that is already present into the visible area.
    ///
    /// Native element queries only return on-screen elements, so the
    /// default does nothing.
    async fn reveal(
        &self,
        _session: &dyn Session,
        _resolver: &dyn LocatorResolver,
        _container: Option<&Locator>,
        _element: &ElementHandle,
    ) -> Result<(), TouchError> {
        Ok(())
    }

    /// Bring a visually matched point toward the middle of the viewport.
    ///
    /// Native screens already show whatever the matcher saw, so the default
    /// does nothing.
    async fn reveal_point(&self, _session: &dyn Session, _point: ScreenPoint) -> Result<(), TouchError> {
        Ok(())
    }
}
