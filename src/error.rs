use core::fmt;

use crate::platform::PinId;

/// An error that arose while setting up inputs or outputs.
///
/// Nothing stays configured when `init` fails: pins set up before the
/// failure are rolled back.
#[derive(Debug)]
pub enum ConfigError<E> {
    /// The pin list was empty
    NoPins,

    /// More pins than [`MAX_INPUTS`](crate::MAX_INPUTS) were requested
    TooManyPins { requested: usize, max: usize },

    /// A pin appeared twice in the list
    DuplicatePin(PinId),

    /// The timing settings are inconsistent
    InvalidConfig(&'static str),

    /// The platform refused a pin mode, interrupt or task
    Platform(E),
}

impl<E: fmt::Display> fmt::Display for ConfigError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NoPins => write!(f, "no input pins given"),
            ConfigError::TooManyPins { requested, max } => {
                write!(f, "{} input pins requested, at most {} supported", requested, max)
            }
            ConfigError::DuplicatePin(pin) => write!(f, "gpio {} listed more than once", pin),
            ConfigError::InvalidConfig(reason) => write!(f, "invalid config: {}", reason),
            ConfigError::Platform(err) => write!(f, "platform error: {}", err),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for ConfigError<E> {}

/// An error that arose while scheduling a pulse.
#[derive(Debug)]
pub enum ScheduleError<E> {
    /// The pin was never set up with `init_output`
    NotConfigured(PinId),

    /// Driving the pin active failed. The pin level is unchanged.
    Drive(E),

    /// The pin is active but its revert timer could not be armed.
    ///
    /// The pin stays active until the caller drives it back.
    RevertNotArmed { pin: PinId, source: E },
}

impl<E> ScheduleError<E> {
    /// Whether the failed call left the pin at its active level
    pub fn left_active(&self) -> bool {
        matches!(self, ScheduleError::RevertNotArmed { .. })
    }
}

impl<E: fmt::Display> fmt::Display for ScheduleError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleError::NotConfigured(pin) => write!(f, "gpio {} is not a pulse output", pin),
            ScheduleError::Drive(err) => write!(f, "unable to drive pulse: {}", err),
            ScheduleError::RevertNotArmed { pin, source } => {
                write!(f, "gpio {} left active, cannot schedule revert: {}", pin, source)
            }
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for ScheduleError<E> {}
