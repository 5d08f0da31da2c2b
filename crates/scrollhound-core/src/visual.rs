//! Visual (reference-image) target matching.
//!
//! The pixel-matching algorithm itself lives outside this crate. A
//! [`VisualMatcher`] is handed a [`ReferenceImage`], captures the current
//! screen, and reports where (if anywhere) the reference appears.

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use crate::geometry::ScreenPoint;

/// Identifier of a reference image, typically a path into an image repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReferenceImage(String);

impl ReferenceImage {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for ReferenceImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.0)
    }
}

/// The result of one matching attempt.
///
/// Both images are always returned so that a miss can still be reported with
/// evidence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisualMatch {
    /// The screen capture the reference was matched against (PNG).
    pub screen_capture: Vec<u8>,
    /// The reference image bytes (PNG).
    pub reference_image: Vec<u8>,
    /// Center of the matched region, if the reference was found.
    pub point: Option<ScreenPoint>,
}

/// Errors raised by a visual matcher.
#[derive(Error, Debug)]
pub enum MatchError {
    /// The reference image could not be loaded.
    #[error("reference image {0} is unavailable: {1}")]
    ReferenceUnavailable(String, String),

    /// The current screen could not be captured.
    #[error("screen capture failed: {0}")]
    Capture(String),

    /// The matching backend failed.
    #[error("matcher failed: {0}")]
    Backend(String),
}

/// Locates a reference image on the current screen.
#[async_trait]
pub trait VisualMatcher: Send + Sync {
    /// Capture the screen and look for the reference image on it.
    async fn locate(&self, reference: &ReferenceImage) -> Result<VisualMatch, MatchError>;
}
