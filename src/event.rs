use embedded_hal::digital::v2::PinState;

use crate::platform::PinId;

/// What a monitored input did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Settled at the active level
    ActivatedShort,
    /// Settled at the inactive level
    DeactivatedShort,
    /// Held at the active level past the long press threshold
    ActivatedLong,
    /// Held at the inactive level past the long press threshold
    DeactivatedLong,
}

impl EventKind {
    /// Short event for a settled `level`
    pub fn from_level(level: PinState, active_level: PinState) -> Self {
        if level == active_level {
            EventKind::ActivatedShort
        } else {
            EventKind::DeactivatedShort
        }
    }

    /// The long variant of this event
    pub fn long(self) -> Self {
        match self {
            EventKind::ActivatedShort | EventKind::ActivatedLong => EventKind::ActivatedLong,
            EventKind::DeactivatedShort | EventKind::DeactivatedLong => EventKind::DeactivatedLong,
        }
    }

    pub fn is_activated(self) -> bool {
        matches!(self, EventKind::ActivatedShort | EventKind::ActivatedLong)
    }

    pub fn is_long(self) -> bool {
        matches!(self, EventKind::ActivatedLong | EventKind::DeactivatedLong)
    }
}

/// A classified input event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InputEvent {
    pub pin: PinId,
    pub kind: EventKind,
}

/// Receives classified events.
///
/// Called synchronously from the polling task for every event, and from the
/// caller of [`read_once`](crate::DebouncedInputs::read_once). There is no queue:
/// a slow handler delays the next poll and can make a long press go unseen.
/// Handlers must not block and must not re-initialize the inputs they are
/// registered with.
pub trait EventHandler: Send + Sync + 'static {
    fn on_event(&self, event: InputEvent);
}

impl<F> EventHandler for F
where
    F: Fn(InputEvent) + Send + Sync + 'static,
{
    fn on_event(&self, event: InputEvent) {
        self(event)
    }
}
