use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info};

use crate::config::{OutputConfig, MAX_OUTPUTS};
use crate::error::{ConfigError, ScheduleError};
use crate::platform::{PinId, Platform};

/// Outputs that can be pulsed active for a fixed time.
///
/// Every pulse arms its own one-shot timer. Overlapping pulses on the same
/// pin are not merged: each timer reverts the pin when it fires, so the first
/// one to expire ends the pulse early and the pin always ends up inactive.
pub struct PulseOutputs<P: Platform> {
    platform: Arc<P>,
    outputs: heapless::Vec<(PinId, OutputConfig), MAX_OUTPUTS>,
}

impl<P: Platform> PulseOutputs<P> {
    pub fn new(platform: Arc<P>) -> Self {
        Self {
            platform,
            outputs: heapless::Vec::new(),
        }
    }

    /// Configure `pin` as a pulse output and drive it inactive
    pub fn init_output(&mut self, pin: PinId, config: OutputConfig) -> Result<(), ConfigError<P::Error>> {
        let known = self.outputs.iter().position(|(output, _)| *output == pin);
        if known.is_none() && self.outputs.is_full() {
            return Err(ConfigError::TooManyPins {
                requested: self.outputs.len() + 1,
                max: MAX_OUTPUTS,
            });
        }

        let configured = self
            .platform
            .configure_output(pin, &config)
            .and_then(|_| self.platform.write_level(pin, config.inactive_level()));
        if let Err(err) = configured {
            self.platform.reset_pin(pin);
            if let Some(index) = known {
                self.outputs.swap_remove(index);
            }
            return Err(ConfigError::Platform(err));
        }

        match known {
            Some(index) => self.outputs[index].1 = config,
            None => {
                let _ = self.outputs.push((pin, config));
            }
        }

        info!("gpio {} configured as pulse output, active {:?}", pin, config.active_level);
        Ok(())
    }

    /// Drive `pin` active now and schedule it back to inactive after `duration`.
    ///
    /// On [`ScheduleError::RevertNotArmed`] the pin is left active.
    pub fn pulse(&self, pin: PinId, duration: Duration) -> Result<(), ScheduleError<P::Error>> {
        let config = self
            .outputs
            .iter()
            .find(|(output, _)| *output == pin)
            .map(|(_, config)| *config)
            .ok_or(ScheduleError::NotConfigured(pin))?;

        self.platform
            .write_level(pin, config.active_level)
            .map_err(ScheduleError::Drive)?;

        let platform = Arc::clone(&self.platform);
        let inactive = config.inactive_level();
        self.platform
            .oneshot(
                duration,
                Box::new(move || match platform.write_level(pin, inactive) {
                    Ok(()) => debug!("gpio {} pulse ended", pin),
                    Err(err) => error!("gpio {} could not be reverted: {}", pin, err),
                }),
            )
            .map_err(|source| ScheduleError::RevertNotArmed { pin, source })
    }

    pub fn is_output(&self, pin: PinId) -> bool {
        self.outputs.iter().any(|(output, _)| *output == pin)
    }
}
