//! W3C input source sequences.
//!
//! A gesture is expressed as one [`ActionSequence`] per input source (a touch
//! finger, a mouse, a wheel). Sequences dispatched together in one
//! [`perform_actions`](crate::session::Session::perform_actions) call advance
//! tick by tick in lockstep, which is what makes multi-finger gestures such
//! as pinch work.
//!
//! The types serialize directly into the JSON body of the W3C
//! `POST /session/{id}/actions` command:
//!
//! ```
//! use std::time::Duration;
//! use scrollhound_core::actions::{Origin, PointerKind, SequenceBuilder};
//!
//! let tap = SequenceBuilder::pointer("finger1", PointerKind::Touch)
//!     .move_to(Duration::ZERO, Origin::Viewport, 120, 300)
//!     .down()
//!     .pause(Duration::from_millis(200))
//!     .up()
//!     .build();
//!
//! let json = serde_json::to_value(&tap).unwrap();
//! assert_eq!(json["type"], "pointer");
//! assert_eq!(json["actions"][0]["type"], "pointerMove");
//! ```

use std::time::Duration;

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::session::{ElementHandle, ELEMENT_KEY};

/// The primary (left) pointer button.
pub const PRIMARY_BUTTON: u32 = 0;

/// The kind of pointer device a sequence emulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerKind {
    Mouse,
    Pen,
    Touch,
}

/// The coordinate origin of a pointer move or wheel scroll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// Absolute viewport coordinates.
    Viewport,
    /// Offset from the pointer's current position.
    Pointer,
    /// Offset from the center of an element.
    Element(ElementHandle),
}

impl Serialize for Origin {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Origin::Viewport => serializer.serialize_str("viewport"),
            Origin::Pointer => serializer.serialize_str("pointer"),
            Origin::Element(element) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(ELEMENT_KEY, &element.id)?;
                map.end()
            }
        }
    }
}

/// A single tick of a pointer input source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PointerAction {
    PointerMove {
        /// Milliseconds the move takes.
        duration: u64,
        origin: Origin,
        x: i32,
        y: i32,
    },
    PointerDown {
        button: u32,
    },
    PointerUp {
        button: u32,
    },
    Pause {
        /// Milliseconds to wait.
        duration: u64,
    },
}

/// A single tick of a wheel input source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WheelAction {
    Scroll {
        x: i32,
        y: i32,
        #[serde(rename = "deltaX")]
        delta_x: i32,
        #[serde(rename = "deltaY")]
        delta_y: i32,
        duration: u64,
        origin: Origin,
    },
    Pause {
        duration: u64,
    },
}

/// Parameters of a pointer input source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PointerParameters {
    pub pointer_type: PointerKind,
}

/// The ordered actions of one input source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ActionSequence {
    Pointer {
        /// Identity of the pointer; distinct ids are distinct fingers.
        id: String,
        parameters: PointerParameters,
        actions: Vec<PointerAction>,
    },
    Wheel {
        id: String,
        actions: Vec<WheelAction>,
    },
}

/// Arguments of a single wheel scroll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WheelScroll {
    pub origin: Origin,
    pub x: i32,
    pub y: i32,
    pub delta_x: i32,
    pub delta_y: i32,
    pub duration: Duration,
}

impl ActionSequence {
    /// A wheel source performing exactly one scroll.
    pub fn wheel(id: impl Into<String>, scroll: WheelScroll) -> Self {
        ActionSequence::Wheel {
            id: id.into(),
            actions: vec![WheelAction::Scroll {
                x: scroll.x,
                y: scroll.y,
                delta_x: scroll.delta_x,
                delta_y: scroll.delta_y,
                duration: millis(scroll.duration),
                origin: scroll.origin,
            }],
        }
    }

    /// The source id.
    pub fn id(&self) -> &str {
        match self {
            ActionSequence::Pointer { id, .. } | ActionSequence::Wheel { id, .. } => id,
        }
    }

    /// The pointer actions, or an empty slice for wheel sources.
    pub fn pointer_actions(&self) -> &[PointerAction] {
        match self {
            ActionSequence::Pointer { actions, .. } => actions,
            ActionSequence::Wheel { .. } => &[],
        }
    }
}

/// Fluent builder for a pointer [`ActionSequence`].
#[derive(Debug, Clone)]
pub struct SequenceBuilder {
    id: String,
    kind: PointerKind,
    actions: Vec<PointerAction>,
}

impl SequenceBuilder {
    pub fn pointer(id: impl Into<String>, kind: PointerKind) -> Self {
        Self {
            id: id.into(),
            kind,
            actions: Vec::new(),
        }
    }

    pub fn move_to(mut self, duration: Duration, origin: Origin, x: i32, y: i32) -> Self {
        self.actions.push(PointerAction::PointerMove {
            duration: millis(duration),
            origin,
            x,
            y,
        });
        self
    }

    pub fn down(mut self) -> Self {
        self.actions.push(PointerAction::PointerDown {
            button: PRIMARY_BUTTON,
        });
        self
    }

    pub fn up(mut self) -> Self {
        self.actions.push(PointerAction::PointerUp {
            button: PRIMARY_BUTTON,
        });
        self
    }

    pub fn pause(mut self, duration: Duration) -> Self {
        self.actions.push(PointerAction::Pause {
            duration: millis(duration),
        });
        self
    }

    pub fn build(self) -> ActionSequence {
        ActionSequence::Pointer {
            id: self.id,
            parameters: PointerParameters {
                pointer_type: self.kind,
            },
            actions: self.actions,
        }
    }
}

fn millis(duration: Duration) -> u64 {
    duration.as_millis().min(u64::MAX as u128) as u64
}
