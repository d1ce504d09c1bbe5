use embedded_hal::digital::v2::PinState;

use crate::platform::TickCount;

/// Most inputs a single session can monitor
pub const MAX_INPUTS: usize = 8;

/// Most pulse outputs one `PulseOutputs` can drive
pub const MAX_OUTPUTS: usize = 4;

/// Internal resistor applied to monitored inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pull {
    Up,
    Down,
    Floating,
}

/// Stack and priority of the polling task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskConfig {
    pub stack_size: u32,
    pub priority: u32,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            stack_size: 4096,
            priority: 10,
        }
    }
}

/// Timing and electrical settings of a debounced input session.
///
/// All durations are in scheduler ticks. The defaults assume the esp-idf
/// default tick rate of 100 Hz:
/// - a transition is trusted once the pin has been quiet for more than 250 ms
/// - a hold is reported as long after 2 s
/// - pins are polled every 50 ms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceConfig {
    pub debounce_ticks: TickCount,
    pub long_press_ticks: TickCount,
    pub poll_period_ticks: TickCount,
    /// Level that reads as "activated". Inputs are pulled up by default, so
    /// a closed contact pulls the pin low.
    pub active_level: PinState,
    pub pull: Pull,
    pub task: TaskConfig,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            debounce_ticks: 25,
            long_press_ticks: 200,
            poll_period_ticks: 5,
            active_level: PinState::Low,
            pull: Pull::Up,
            task: TaskConfig::default(),
        }
    }
}

impl DebounceConfig {
    /// Build a config from millisecond settings for a given tick rate
    pub fn from_millis(tick_rate_hz: u32, debounce_ms: u32, long_press_ms: u32, poll_ms: u32) -> Self {
        let to_ticks = |ms: u32| ((ms as u64 * tick_rate_hz as u64 + 999) / 1000) as TickCount;

        Self {
            debounce_ticks: to_ticks(debounce_ms),
            long_press_ticks: to_ticks(long_press_ms),
            poll_period_ticks: to_ticks(poll_ms),
            ..Self::default()
        }
    }

    pub(crate) fn validate(&self) -> Result<(), &'static str> {
        if self.poll_period_ticks == 0 {
            return Err("poll period must be at least one tick");
        }
        if self.long_press_ticks <= self.debounce_ticks {
            return Err("long press threshold must exceed the debounce window");
        }
        Ok(())
    }
}

/// Electrical settings of a pulse output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputConfig {
    /// Level driven for the duration of a pulse
    pub active_level: PinState,
    /// Drive open-drain with the internal pull-up instead of push-pull
    pub open_drain: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            active_level: PinState::Low,
            open_drain: true,
        }
    }
}

impl OutputConfig {
    pub fn inactive_level(&self) -> PinState {
        !self.active_level
    }
}
