//! Folds pointer, touch, wheel and keyboard input into one interaction stream.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::sentinel::{InteractionEvent, InteractionKind, Position};

/// Browsers replay a touch as mouse events a little later at the same spot.
const COMPAT_MOUSE_WINDOW_MS: i64 = 500;
const COMPAT_MOUSE_RADIUS_PX: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PointerKind {
    Mouse,
    Pen,
    Touch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RawInput {
    PointerDown {
        pointer: PointerKind,
        position: Position,
        timestamp: DateTime<Utc>,
        target: Option<String>,
    },
    PointerUp {
        pointer: PointerKind,
        position: Position,
        timestamp: DateTime<Utc>,
    },
    TouchStart {
        touches: Vec<Position>,
        timestamp: DateTime<Utc>,
        target: Option<String>,
    },
    TouchMove {
        touches: Vec<Position>,
        timestamp: DateTime<Utc>,
    },
    TouchEnd {
        timestamp: DateTime<Utc>,
    },
    Wheel {
        delta_y: f64,
        timestamp: DateTime<Utc>,
    },
    KeyDown {
        key: String,
        timestamp: DateTime<Utc>,
        repeat: bool,
    },
}

#[derive(Debug, Default)]
pub struct InputNormalizer {
    last_touch: Option<(Position, DateTime<Utc>)>,
    touch_scrolling: bool,
}

impl InputNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps one raw event onto the unified stream. Releases, auto-repeated
    /// keys and mouse events replayed from a touch yield `None`.
    pub fn normalize(&mut self, raw: RawInput) -> Option<InteractionEvent> {
        match raw {
            RawInput::PointerDown {
                pointer,
                position,
                timestamp,
                target,
            } => {
                if pointer != PointerKind::Touch && self.is_touch_replay(position, timestamp) {
                    return None;
                }
                if pointer == PointerKind::Touch {
                    self.last_touch = Some((position, timestamp));
                }
                Some(click(position, timestamp, target))
            }
            RawInput::TouchStart {
                touches,
                timestamp,
                target,
            } => {
                let first = *touches.first()?;
                self.last_touch = Some((first, timestamp));
                self.touch_scrolling = false;
                Some(click(first, timestamp, target))
            }
            RawInput::TouchMove { touches, timestamp } => {
                // one scroll per gesture, not one per move frame
                if self.touch_scrolling {
                    return None;
                }
                self.touch_scrolling = true;
                Some(InteractionEvent {
                    kind: InteractionKind::Scroll,
                    timestamp,
                    position: touches.first().copied(),
                    target: None,
                })
            }
            RawInput::Wheel { delta_y, timestamp } => {
                if delta_y == 0.0 {
                    return None;
                }
                Some(InteractionEvent {
                    kind: InteractionKind::Scroll,
                    timestamp,
                    position: None,
                    target: None,
                })
            }
            RawInput::KeyDown {
                key,
                timestamp,
                repeat,
            } => {
                if repeat {
                    return None;
                }
                Some(InteractionEvent {
                    kind: InteractionKind::Keypress,
                    timestamp,
                    position: None,
                    target: Some(key),
                })
            }
            RawInput::PointerUp { .. } => None,
            RawInput::TouchEnd { .. } => {
                self.touch_scrolling = false;
                None
            }
        }
    }

    fn is_touch_replay(&self, position: Position, timestamp: DateTime<Utc>) -> bool {
        match self.last_touch {
            Some((touch_at, touch_time)) => {
                let elapsed = timestamp - touch_time;
                elapsed >= Duration::zero()
                    && elapsed <= Duration::milliseconds(COMPAT_MOUSE_WINDOW_MS)
                    && touch_at.distance_to(&position) <= COMPAT_MOUSE_RADIUS_PX
            }
            None => false,
        }
    }
}

fn click(position: Position, timestamp: DateTime<Utc>, target: Option<String>) -> InteractionEvent {
    InteractionEvent {
        kind: InteractionKind::Click,
        timestamp,
        position: Some(position),
        target,
    }
}
