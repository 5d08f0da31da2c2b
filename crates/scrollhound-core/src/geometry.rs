//! Screen geometry types and live geometry queries.
//!
//! All coordinates are viewport pixels with the origin at the top-left corner
//! of the screen. [`GeometryProvider`] reads the current viewport and element
//! rectangles from a live [`Session`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::session::{ElementHandle, Session, SessionError};

/// A point in viewport pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScreenPoint {
    /// Horizontal offset from the left edge of the viewport.
    pub x: i32,
    /// Vertical offset from the top edge of the viewport.
    pub y: i32,
}

impl ScreenPoint {
    /// Creates a new point.
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns true if both coordinates are non-negative.
    pub fn is_non_negative(&self) -> bool {
        self.x >= 0 && self.y >= 0
    }
}

impl fmt::Display for ScreenPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// An axis-aligned rectangle with its origin at the top-left corner.
///
/// Used both for element bounding boxes and for viewport dimensions (where
/// `x` and `y` are zero).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rectangle {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rectangle {
    /// Creates a new rectangle.
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// A viewport-sized rectangle anchored at the origin.
    pub fn viewport(width: i32, height: i32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// The top-left corner of the rectangle.
    pub fn location(&self) -> ScreenPoint {
        ScreenPoint::new(self.x, self.y)
    }

    /// The center of the rectangle, rounded toward the origin.
    pub fn center(&self) -> ScreenPoint {
        ScreenPoint::new(self.x + self.width / 2, self.y + self.height / 2)
    }

    /// Returns true if the point lies inside the rectangle.
    ///
    /// The right and bottom edges are inclusive so that a viewport of width
    /// `w` accepts `x == w`, matching how drivers clamp edge taps.
    pub fn contains(&self, point: ScreenPoint) -> bool {
        point.x >= self.x
            && point.y >= self.y
            && point.x <= self.x + self.width
            && point.y <= self.y + self.height
    }
}

/// Direction of a swipe or scroll gesture.
///
/// `Up` means the finger travels toward the top of the screen, so the visible
/// content moves and content further down the page is revealed. This is
/// touch-scroll semantics, not camera semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwipeDirection {
    Up,
    Down,
    Left,
    Right,
}

impl SwipeDirection {
    /// The lowercase name used by the native scroll primitives.
    pub fn as_str(&self) -> &'static str {
        match self {
            SwipeDirection::Up => "up",
            SwipeDirection::Down => "down",
            SwipeDirection::Left => "left",
            SwipeDirection::Right => "right",
        }
    }

    /// Returns true for `Up` and `Down`.
    pub fn is_vertical(&self) -> bool {
        matches!(self, SwipeDirection::Up | SwipeDirection::Down)
    }
}

impl fmt::Display for SwipeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a two-finger pinch gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoomDirection {
    /// Fingers spread apart from the center.
    In,
    /// Fingers close in on the center.
    Out,
}

impl fmt::Display for ZoomDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZoomDirection::In => f.write_str("in"),
            ZoomDirection::Out => f.write_str("out"),
        }
    }
}

/// Reads viewport and element rectangles from a live session.
pub struct GeometryProvider<'a> {
    session: &'a dyn Session,
}

impl<'a> GeometryProvider<'a> {
    pub fn new(session: &'a dyn Session) -> Self {
        Self { session }
    }

    /// The current viewport size as a rectangle anchored at the origin.
    pub async fn viewport(&self) -> Result<Rectangle, SessionError> {
        let size = self.session.window_size().await?;
        Ok(Rectangle::viewport(size.width, size.height))
    }

    /// The bounding box of a resolved element.
    pub async fn element_rect(&self, element: &ElementHandle) -> Result<Rectangle, SessionError> {
        self.session.element_rect(element).await
    }

    /// The top-left corner of a resolved element.
    pub async fn element_location(&self, element: &ElementHandle) -> Result<ScreenPoint, SessionError> {
        Ok(self.element_rect(element).await?.location())
    }
}
