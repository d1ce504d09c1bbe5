use core::fmt;
use std::sync::Arc;
use std::time::Duration;

use embedded_hal::digital::v2::PinState;

use crate::config::{OutputConfig, Pull, TaskConfig};
use crate::record::PinRecord;

/// Hardware gpio number
pub type PinId = u8;

/// Monotonic scheduler tick count, wraps around
pub type TickCount = u32;

/// Work run on every wake of a periodic task
pub type PeriodicJob = Box<dyn FnMut() + Send + 'static>;

/// Work run once when a one-shot timer expires
pub type OneshotJob = Box<dyn FnOnce() + Send + 'static>;

/// Everything the debounced inputs and pulse outputs need from the chip and its RTOS.
///
/// Three execution contexts call into a platform:
/// - the interrupt path, which only ever touches the [`PinRecord`] handed to
///   [`attach_edge_isr`](Platform::attach_edge_isr)
/// - the periodic task spawned by [`spawn_periodic`](Platform::spawn_periodic)
/// - the timer service running [`oneshot`](Platform::oneshot) jobs
pub trait Platform: Send + Sync + 'static {
    type Error: fmt::Debug + fmt::Display + Send + 'static;

    /// Handle to a running periodic task
    type Task: Send + 'static;

    /// Current tick count. Safe to call from task context only.
    fn now(&self) -> TickCount;

    /// Convert a wall-clock duration into scheduler ticks, rounding up
    fn ticks(&self, duration: Duration) -> TickCount;

    /// Instantaneous logic level of a pin
    fn read_level(&self, pin: PinId) -> PinState;

    fn write_level(&self, pin: PinId, level: PinState) -> Result<(), Self::Error>;

    /// Configure pins as inputs interrupting on both edges
    fn configure_inputs(&self, pins: &[PinId], pull: Pull) -> Result<(), Self::Error>;

    fn configure_output(&self, pin: PinId, config: &OutputConfig) -> Result<(), Self::Error>;

    /// Return a pin to its power-on configuration
    fn reset_pin(&self, pin: PinId);

    /// Route edge interrupts of `pin` into `record`.
    ///
    /// The platform keeps the record alive until [`detach_edge_isr`](Platform::detach_edge_isr)
    /// and calls [`PinRecord::capture`] with the freshly sampled level and the
    /// interrupt-time tick count on every edge.
    fn attach_edge_isr(&self, pin: PinId, record: Arc<PinRecord>) -> Result<(), Self::Error>;

    /// Stop routing interrupts of `pin`. No-op for pins that were never attached.
    fn detach_edge_isr(&self, pin: PinId);

    /// Run `job` forever, sleeping `period` ticks between runs
    fn spawn_periodic(
        &self,
        task: &TaskConfig,
        period: TickCount,
        job: PeriodicJob,
    ) -> Result<Self::Task, Self::Error>;

    /// Stop a periodic task. Once this returns, `job` will not start again.
    fn stop_periodic(&self, task: Self::Task);

    /// Arm a new one-shot timer running `job` after `after` on the timer service
    fn oneshot(&self, after: Duration, job: OneshotJob) -> Result<(), Self::Error>;
}
