use embedded_hal::digital::v2::PinState;
use log::debug;

use crate::config::DebounceConfig;
use crate::event::{EventHandler, EventKind, InputEvent};
use crate::long_press;
use crate::platform::{Platform, TickCount};
use crate::record::PinRecord;

/// Promote a bouncing pin to a stable short event.
///
/// The pin is stable once it had unresolved edges, has been quiet for more
/// than the debounce window and still reads the level its last edge left it
/// at. A burst of edges therefore collapses into one event carrying the
/// level the pin settled at.
pub(crate) fn check_stable(
    record: &PinRecord,
    current: PinState,
    now: TickCount,
    config: &DebounceConfig,
) -> Option<EventKind> {
    let snapshot = record.snapshot();

    if snapshot.pending_edges == 0
        || snapshot.level != current
        || PinRecord::quiet_for(snapshot.last_edge, now) <= config.debounce_ticks
    {
        return None;
    }

    // an edge slipped in since the snapshot, keep bouncing
    if !record.settle(snapshot.pending_edges) {
        return None;
    }

    Some(EventKind::from_level(current, config.active_level))
}

/// One wake of the polling task: every record, in registration order
pub(crate) fn poll<P: Platform>(
    platform: &P,
    records: &[impl AsRef<PinRecord>],
    config: &DebounceConfig,
    handler: &dyn EventHandler,
) {
    for record in records {
        let record = record.as_ref();
        let current = platform.read_level(record.pin());
        let now = platform.now();

        if let Some(kind) = check_stable(record, current, now, config) {
            debug!("gpio {} appears to be stable in state {:?}", record.pin(), current);
            handler.on_event(InputEvent {
                pin: record.pin(),
                kind,
            });
        }

        if let Some(kind) = long_press::check_held(record, current, now, config) {
            debug!("gpio {} held in state {:?}", record.pin(), current);
            handler.on_event(InputEvent {
                pin: record.pin(),
                kind,
            });
        }
    }
}
