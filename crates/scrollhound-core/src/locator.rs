//! Structural locators, discovery targets and unique-element resolution.
//!
//! A [`Locator`] is a structural query (XPath, CSS selector, accessibility
//! id, ...) that may match zero, one or many elements. Gestures and
//! discovery always go through [`LocatorResolver::resolve_unique`], which
//! refuses to pick one of several matches.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::session::{ElementHandle, Session, SessionError};
use crate::visual::ReferenceImage;

/// Element location strategies understood by WebDriver and Appium servers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strategy {
    #[serde(rename = "css selector")]
    Css,
    #[serde(rename = "xpath")]
    XPath,
    #[serde(rename = "link text")]
    LinkText,
    #[serde(rename = "partial link text")]
    PartialLinkText,
    #[serde(rename = "tag name")]
    TagName,
    #[serde(rename = "id")]
    Id,
    #[serde(rename = "class name")]
    ClassName,
    #[serde(rename = "accessibility id")]
    AccessibilityId,
    #[serde(rename = "-android uiautomator")]
    AndroidUiAutomator,
    #[serde(rename = "-ios predicate string")]
    IosPredicate,
    #[serde(rename = "-ios class chain")]
    IosClassChain,
}

impl Strategy {
    /// The `using` value sent to the server.
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Css => "css selector",
            Strategy::XPath => "xpath",
            Strategy::LinkText => "link text",
            Strategy::PartialLinkText => "partial link text",
            Strategy::TagName => "tag name",
            Strategy::Id => "id",
            Strategy::ClassName => "class name",
            Strategy::AccessibilityId => "accessibility id",
            Strategy::AndroidUiAutomator => "-android uiautomator",
            Strategy::IosPredicate => "-ios predicate string",
            Strategy::IosClassChain => "-ios class chain",
        }
    }
}

/// A structural element query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locator {
    pub using: Strategy,
    pub value: String,
}

impl Locator {
    pub fn new(using: Strategy, value: impl Into<String>) -> Self {
        Self {
            using,
            value: value.into(),
        }
    }

    pub fn css(selector: impl Into<String>) -> Self {
        Self::new(Strategy::Css, selector)
    }

    pub fn xpath(expression: impl Into<String>) -> Self {
        Self::new(Strategy::XPath, expression)
    }

    pub fn id(id: impl Into<String>) -> Self {
        Self::new(Strategy::Id, id)
    }

    pub fn accessibility_id(id: impl Into<String>) -> Self {
        Self::new(Strategy::AccessibilityId, id)
    }

    /// Returns true if the query has no content.
    pub fn is_empty(&self) -> bool {
        self.value.trim().is_empty()
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.using.as_str(), self.value)
    }
}

/// What a discovery or tap request is looking for.
///
/// Exactly one variant is active per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// An element in the UI tree, resolved to exactly one live element.
    Structural(Locator),
    /// A region of the screen identified by a reference image.
    Visual(ReferenceImage),
}

impl Target {
    /// Returns true if the target carries a non-empty locator or image id.
    pub fn is_well_formed(&self) -> bool {
        match self {
            Target::Structural(locator) => !locator.is_empty(),
            Target::Visual(reference) => !reference.is_empty(),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Structural(locator) => write!(f, "{locator}"),
            Target::Visual(reference) => write!(f, "reference image {reference}"),
        }
    }
}

impl From<Locator> for Target {
    fn from(locator: Locator) -> Self {
        Target::Structural(locator)
    }
}

impl From<ReferenceImage> for Target {
    fn from(reference: ReferenceImage) -> Self {
        Target::Visual(reference)
    }
}

/// Errors from unique-element resolution.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// No element matched the locator.
    #[error("no element matches {0}")]
    NotFound(Locator),

    /// More than one element matched the locator.
    #[error("{count} elements match {locator}; expected exactly one")]
    Ambiguous { locator: Locator, count: usize },

    /// The session failed while querying.
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Resolves a structural locator to a single live element.
#[async_trait]
pub trait LocatorResolver: Send + Sync {
    /// Resolve the locator to exactly one element.
    ///
    /// Fails with [`ResolveError::Ambiguous`] when several elements match;
    /// implementations must never silently pick one of them.
    async fn resolve_unique(&self, locator: &Locator) -> Result<ElementHandle, ResolveError>;
}

/// Checks a raw match list against the uniqueness invariant.
pub fn expect_unique(
    locator: &Locator,
    mut elements: Vec<ElementHandle>,
) -> Result<ElementHandle, ResolveError> {
    match elements.len() {
        0 => Err(ResolveError::NotFound(locator.clone())),
        1 => Ok(elements.remove(0)),
        count => Err(ResolveError::Ambiguous {
            locator: locator.clone(),
            count,
        }),
    }
}

/// A [`LocatorResolver`] that queries the session directly.
pub struct SessionResolver {
    session: Arc<dyn Session>,
}

impl SessionResolver {
    pub fn new(session: Arc<dyn Session>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl LocatorResolver for SessionResolver {
    async fn resolve_unique(&self, locator: &Locator) -> Result<ElementHandle, ResolveError> {
        let elements = self.session.find_elements(locator).await?;
        debug!(%locator, count = elements.len(), "resolved locator");
        expect_unique(locator, elements)
    }
}
