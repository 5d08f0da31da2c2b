//! Error taxonomy for gesture and discovery operations.

use thiserror::Error;

use crate::geometry::ScreenPoint;
use crate::locator::ResolveError;
use crate::session::{Platform, SessionError};
use crate::visual::MatchError;

/// Errors surfaced by gesture and discovery operations.
///
/// Every public operation reports its outcome exactly once before returning
/// one of these; callers use the variant to decide between retrying at a
/// higher level ([`TouchError::NotFound`]) and aborting.
#[derive(Error, Debug)]
pub enum TouchError {
    /// The target was absent after the discovery budget was spent.
    #[error("target not found: {0}")]
    NotFound(String),

    /// A structural locator matched more than one element.
    #[error("{count} elements match {locator}; expected exactly one")]
    AmbiguousMatch { locator: String, count: usize },

    /// The gesture needs a native mobile capability the session lacks.
    #[error("{gesture} is not supported on {platform} sessions")]
    UnsupportedPlatform {
        gesture: &'static str,
        platform: Platform,
    },

    /// A single presence check or scroll step failed.
    #[error("transient step failure: {0}")]
    TransientStep(#[source] SessionError),

    /// Dispatching the pointer sequence or gesture primitive failed.
    #[error("gesture execution failed: {0}")]
    GestureExecution(#[source] SessionError),

    /// The request was malformed (empty locator or reference image).
    #[error("invalid target: {0}")]
    InvalidTarget(String),

    /// A drag completed but the element did not move.
    #[error("Start point: {start}, End point: {end}")]
    NoMovement { start: ScreenPoint, end: ScreenPoint },

    /// A coordinate fell outside the last known viewport.
    #[error("point {point} is outside the viewport")]
    OutOfBounds { point: ScreenPoint },

    /// The visual matcher could not run.
    #[error(transparent)]
    Match(#[from] MatchError),

    /// A session query outside gesture dispatch failed.
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl From<ResolveError> for TouchError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::NotFound(locator) => TouchError::NotFound(locator.to_string()),
            ResolveError::Ambiguous { locator, count } => TouchError::AmbiguousMatch {
                locator: locator.to_string(),
                count,
            },
            ResolveError::Session(e) => TouchError::Session(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::Locator;

    #[test]
    fn ambiguous_resolution_maps_to_ambiguous_match() {
        let err: TouchError = ResolveError::Ambiguous {
            locator: Locator::css(".row"),
            count: 3,
        }
        .into();
        match err {
            TouchError::AmbiguousMatch { locator, count } => {
                assert_eq!(count, 3);
                assert!(locator.contains(".row"));
            }
            other => panic!("expected AmbiguousMatch, got {other:?}"),
        }
    }

    #[test]
    fn unsupported_platform_display() {
        let err = TouchError::UnsupportedPlatform {
            gesture: "pinch_to_zoom",
            platform: Platform::Web,
        };
        assert_eq!(err.to_string(), "pinch_to_zoom is not supported on web sessions");
    }

    #[test]
    fn gesture_execution_keeps_source() {
        use std::error::Error as _;
        let err = TouchError::GestureExecution(SessionError::UnsupportedCommand("actions".into()));
        assert!(err.source().is_some());
    }
}
