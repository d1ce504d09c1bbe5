//! Long press detection on top of the debounce bookkeeping.
//!
//! There is no timer per pin. A hold is reported when a poll lands in the
//! half-open window `[long_press_ticks, long_press_ticks + poll_period_ticks)`
//! after the last edge. With polls exactly one period apart exactly one poll
//! falls inside it, so a hold is reported at most once. A poll delayed by more
//! than a period across the window opening skips it, and that hold is never
//! reported.

use embedded_hal::digital::v2::PinState;

use crate::config::DebounceConfig;
use crate::event::EventKind;
use crate::platform::TickCount;
use crate::record::PinRecord;

pub(crate) fn check_held(
    record: &PinRecord,
    current: PinState,
    now: TickCount,
    config: &DebounceConfig,
) -> Option<EventKind> {
    let snapshot = record.snapshot();
    if snapshot.pending_edges != 0 {
        return None;
    }

    let held = PinRecord::quiet_for(snapshot.last_edge, now);
    let window_end = config.long_press_ticks.saturating_add(config.poll_period_ticks);
    if held < config.long_press_ticks || held >= window_end {
        return None;
    }

    Some(EventKind::from_level(current, config.active_level).long())
}
