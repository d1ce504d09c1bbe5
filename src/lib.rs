// Debounced digital inputs and timed output pulses for esp32.
// Edge interrupts only timestamp a pin, a polling task turns quiet pins into short
// and long press events, and outputs can be pulsed active for a fixed time.

mod config;
mod debounce;
mod debounced_input;
mod error;
mod event;
mod long_press;
mod platform;
mod pulse;
mod record;

#[cfg(target_os = "espidf")]
mod esp;

#[cfg(test)]
mod mock;

pub use config::*;
pub use debounced_input::*;
pub use error::*;
pub use event::*;
pub use platform::*;
pub use pulse::*;
pub use record::PinRecord;

#[cfg(target_os = "espidf")]
pub use esp::*;

pub use embedded_hal::digital::v2::PinState;
