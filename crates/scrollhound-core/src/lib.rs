//! # scrollhound-core
//!
//! Retry-tolerant element discovery and touch gestures for browsers and
//! mobile apps driven through a WebDriver/Appium session.
//!
//! The crate finds a target on screen, either by a structural locator or by
//! matching a reference image, scrolling a container in a bounded loop until
//! the target shows up. It expresses taps, double taps, long presses, drags
//! and pinches as W3C pointer-action sequences, and reports every operation's
//! outcome exactly once with screenshot evidence.
//!
//! ## Modules
//!
//! - [`touch`] - The [`TouchActions`](touch::TouchActions) facade test code calls
//! - [`discovery`] - The scroll-and-check search loop
//! - [`scroll`] - Single scroll steps and the "more room" signal
//! - [`capability`] - Native mobile vs. web-emulated platform behavior
//! - [`gesture`] - Pointer sequences for taps and pinches
//! - [`actions`] - W3C action sequence model
//! - [`session`] - The session abstraction gestures run against
//! - [`webdriver`] - A [`Session`](session::Session) over the WebDriver HTTP wire
//! - [`locator`] - Structural locators and unique resolution
//! - [`visual`] - Reference-image matching interface
//! - [`geometry`] - Points, rectangles and directions
//! - [`report`] - Pass/fail reporters and attachments
//! - [`config`] - Timing configuration in `~/.scrollhound/config.json`
//! - [`error`] - Error taxonomy
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use scrollhound_core::config::TouchConfig;
//! use scrollhound_core::geometry::SwipeDirection;
//! use scrollhound_core::locator::{Locator, Target};
//! use scrollhound_core::report::TracingReporter;
//! use scrollhound_core::touch::TouchActions;
//! use scrollhound_core::webdriver::WebDriverSession;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let session = WebDriverSession::attach("http://127.0.0.1:4723", "2f1c").await?;
//! let touch = TouchActions::new(Arc::new(session), Arc::new(TracingReporter), TouchConfig::load());
//!
//! let list = Locator::id("results");
//! let item = Target::from(Locator::xpath("//*[@text='Item 40']"));
//! let outcome = touch.swipe_into_view(Some(&list), &item, SwipeDirection::Up).await?;
//! if outcome.is_found() {
//!     touch.tap(&item).await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod actions;
pub mod capability;
pub mod config;
pub mod discovery;
pub mod error;
pub mod geometry;
pub mod gesture;
pub mod locator;
pub mod report;
pub mod scroll;
pub mod session;
pub mod touch;
pub mod visual;
pub mod webdriver;
