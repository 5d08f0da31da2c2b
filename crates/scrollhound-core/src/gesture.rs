//! Touch gestures expressed as W3C pointer-action sequences.
//!
//! [`GestureBuilder`] turns resolved coordinates into the
//! [`ActionSequence`]s a session dispatches. The default methods build touch
//! gestures; capability variants override what their platform cannot do.
//!
//! Gestures that start from a resolved element rather than a point
//! (long-press, drag-and-drop) go through the session's high-level
//! primitives instead, see [`Session`](crate::session::Session).

use std::time::Duration;

use crate::actions::{ActionSequence, Origin, PointerKind, SequenceBuilder};
use crate::config::TouchConfig;
use crate::error::TouchError;
use crate::geometry::{Rectangle, ScreenPoint, ZoomDirection};

/// Timing parameters shared by the gesture builders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GestureTimings {
    pub tap_pause: Duration,
    pub double_tap_gap: Duration,
    pub pinch_hold: Duration,
    pub pinch_move: Duration,
}

impl Default for GestureTimings {
    fn default() -> Self {
        Self::from(&TouchConfig::default())
    }
}

impl From<&TouchConfig> for GestureTimings {
    fn from(config: &TouchConfig) -> Self {
        Self {
            tap_pause: config.tap_pause(),
            double_tap_gap: config.double_tap_gap(),
            pinch_hold: config.pinch_hold(),
            pinch_move: config.pinch_move(),
        }
    }
}

/// Builds pointer sequences for point-based gestures.
pub trait GestureBuilder: Send + Sync {
    /// Timings used by the builders.
    fn timings(&self) -> &GestureTimings;

    /// The pointer device the gestures emulate.
    fn pointer_kind(&self) -> PointerKind {
        PointerKind::Touch
    }

    /// A single tap: move, press, hold briefly, release.
    fn tap(&self, point: ScreenPoint, viewport: Rectangle) -> Result<Vec<ActionSequence>, TouchError> {
        ensure_in_viewport(point, viewport)?;
        Ok(vec![tap_sequence("finger1", self.pointer_kind(), point, self.timings().tap_pause)])
    }

    /// Two rapid taps on the same point with one pointer.
    fn double_tap(
        &self,
        point: ScreenPoint,
        viewport: Rectangle,
    ) -> Result<Vec<ActionSequence>, TouchError> {
        ensure_in_viewport(point, viewport)?;
        let sequence = SequenceBuilder::pointer("finger1", self.pointer_kind())
            .move_to(Duration::ZERO, Origin::Viewport, point.x, point.y)
            .down()
            .up()
            .pause(self.timings().double_tap_gap)
            .down()
            .up()
            .build();
        Ok(vec![sequence])
    }

    /// Two fingers moving symmetrically about the viewport center.
    fn pinch(
        &self,
        viewport: Rectangle,
        direction: ZoomDirection,
    ) -> Result<Vec<ActionSequence>, TouchError> {
        Ok(pinch_sequences(viewport, direction, self.timings()))
    }
}

/// Fails with [`TouchError::OutOfBounds`] unless the point is a
/// non-negative coordinate inside the viewport.
pub fn ensure_in_viewport(point: ScreenPoint, viewport: Rectangle) -> Result<(), TouchError> {
    if point.is_non_negative() && viewport.contains(point) {
        Ok(())
    } else {
        Err(TouchError::OutOfBounds { point })
    }
}

/// A single-pointer tap at `point`.
pub fn tap_sequence(id: &str, kind: PointerKind, point: ScreenPoint, pause: Duration) -> ActionSequence {
    SequenceBuilder::pointer(id, kind)
        .move_to(Duration::ZERO, Origin::Viewport, point.x, point.y)
        .down()
        .pause(pause)
        .up()
        .build()
}

/// The two finger sequences of a pinch.
///
/// Zooming in starts both fingers at the center and spreads them a quarter
/// of the viewport apart on each axis; zooming out runs the same path in
/// reverse. Both fingers hold for the same time so their ticks stay aligned.
pub fn pinch_sequences(
    viewport: Rectangle,
    direction: ZoomDirection,
    timings: &GestureTimings,
) -> Vec<ActionSequence> {
    let center = viewport.center();
    let (dx, dy) = (viewport.width / 4, viewport.height / 4);
    let near_origin = ScreenPoint::new(center.x - dx, center.y - dy);
    let far_origin = ScreenPoint::new(center.x + dx, center.y + dy);

    [("finger1", near_origin), ("finger2", far_origin)]
        .into_iter()
        .map(|(id, outer)| {
            let (from, to) = match direction {
                ZoomDirection::In => (center, outer),
                ZoomDirection::Out => (outer, center),
            };
            SequenceBuilder::pointer(id, PointerKind::Touch)
                .move_to(Duration::ZERO, Origin::Viewport, from.x, from.y)
                .down()
                .pause(timings.pinch_hold)
                .move_to(timings.pinch_move, Origin::Viewport, to.x, to.y)
                .up()
                .build()
        })
        .collect()
}
