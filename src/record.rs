use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use embedded_hal::digital::v2::PinState;

use crate::platform::{PinId, TickCount};

/// Bookkeeping of one monitored input, shared between its edge interrupt and
/// the polling task.
///
/// The interrupt is the only writer of the level and edge timestamp, the
/// polling task only ever clears the pending edge count. Every field is an
/// atomic so neither side needs a critical section.
#[derive(Debug)]
pub struct PinRecord {
    pin: PinId,
    level: AtomicBool,
    pending_edges: AtomicU32,
    last_edge: AtomicU32,
}

/// A consistent-enough view of a record taken by the polling task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Snapshot {
    pub pending_edges: u32,
    pub level: PinState,
    pub last_edge: TickCount,
}

impl PinRecord {
    /// A stable record, as if the last edge happened at `now`
    pub fn new(pin: PinId, level: PinState, now: TickCount) -> Self {
        Self {
            pin,
            level: AtomicBool::new(level == PinState::High),
            pending_edges: AtomicU32::new(0),
            last_edge: AtomicU32::new(now),
        }
    }

    pub fn pin(&self) -> PinId {
        self.pin
    }

    /// Record a raw edge. Called from interrupt context: never blocks, never
    /// allocates.
    ///
    /// The count is bumped last, so a reader that sees it non-zero also sees
    /// the level and timestamp of at least this edge.
    #[inline(always)]
    pub fn capture(&self, level: PinState, now: TickCount) {
        self.level.store(level == PinState::High, Ordering::Relaxed);
        self.last_edge.store(now, Ordering::Relaxed);
        self.pending_edges.fetch_add(1, Ordering::Release);
    }

    pub(crate) fn snapshot(&self) -> Snapshot {
        let pending_edges = self.pending_edges.load(Ordering::Acquire);
        Snapshot {
            pending_edges,
            level: PinState::from(self.level.load(Ordering::Relaxed)),
            last_edge: self.last_edge.load(Ordering::Relaxed),
        }
    }

    /// Mark the `observed` edges as resolved.
    ///
    /// Fails when another edge arrived after `observed` was read, in which case
    /// the pin is still bouncing.
    pub(crate) fn settle(&self, observed: u32) -> bool {
        self.pending_edges
            .compare_exchange(observed, 0, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Ticks elapsed since the last edge, tolerant of tick counter wrap
    pub(crate) fn quiet_for(last_edge: TickCount, now: TickCount) -> TickCount {
        now.wrapping_sub(last_edge)
    }
}
