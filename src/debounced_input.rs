use std::sync::Arc;

use log::{info, warn};

use crate::config::{DebounceConfig, MAX_INPUTS};
use crate::debounce;
use crate::error::ConfigError;
use crate::event::{EventHandler, EventKind, InputEvent};
use crate::platform::{PinId, Platform};
use crate::record::PinRecord;

/// State reached by both the polling task and `read_once`
struct Shared {
    records: heapless::Vec<Arc<PinRecord>, MAX_INPUTS>,
    handler: Box<dyn EventHandler>,
    config: DebounceConfig,
}

/// One `init` worth of pins, interrupts and polling task.
///
/// Dropping a session stops the task, detaches the interrupts and resets the
/// pins, in that order. A half-built session rolls back the same way.
struct Session<P: Platform> {
    platform: Arc<P>,
    shared: Arc<Shared>,
    task: Option<P::Task>,
}

impl<P: Platform> Session<P> {
    fn start(
        platform: &Arc<P>,
        pins: &[PinId],
        config: DebounceConfig,
        handler: Box<dyn EventHandler>,
    ) -> Result<Self, ConfigError<P::Error>> {
        if let Err(err) = platform.configure_inputs(pins, config.pull) {
            pins.iter().for_each(|&pin| platform.reset_pin(pin));
            return Err(ConfigError::Platform(err));
        }

        let now = platform.now();
        let mut records = heapless::Vec::new();
        for &pin in pins {
            let record = Arc::new(PinRecord::new(pin, platform.read_level(pin), now));
            if records.push(record).is_err() {
                pins.iter().for_each(|&pin| platform.reset_pin(pin));
                return Err(ConfigError::TooManyPins {
                    requested: pins.len(),
                    max: MAX_INPUTS,
                });
            }
        }

        let mut session = Session {
            platform: Arc::clone(platform),
            shared: Arc::new(Shared {
                records,
                handler,
                config,
            }),
            task: None,
        };

        for record in &session.shared.records {
            platform
                .attach_edge_isr(record.pin(), Arc::clone(record))
                .map_err(ConfigError::Platform)?;
        }

        let job_platform = Arc::clone(platform);
        let job_shared = Arc::clone(&session.shared);
        let task = platform
            .spawn_periodic(
                &config.task,
                config.poll_period_ticks,
                Box::new(move || {
                    debounce::poll(
                        &*job_platform,
                        job_shared.records.as_slice(),
                        &job_shared.config,
                        &*job_shared.handler,
                    )
                }),
            )
            .map_err(ConfigError::Platform)?;
        session.task = Some(task);

        Ok(session)
    }

    fn pins(&self) -> impl Iterator<Item = PinId> + '_ {
        self.shared.records.iter().map(|record| record.pin())
    }
}

impl<P: Platform> Drop for Session<P> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            self.platform.stop_periodic(task);
        }
        for record in &self.shared.records {
            self.platform.detach_edge_isr(record.pin());
        }
        for record in &self.shared.records {
            self.platform.reset_pin(record.pin());
        }
    }
}

/// Debounced digital inputs reporting short and long presses.
///
/// Edge interrupts only stamp the pin's record. A polling task wakes every
/// `poll_period_ticks`, promotes pins that have been quiet for longer than
/// the debounce window to a short event, and reports holds past the long
/// press threshold once.
///
/// # Example - report presses on gpio 18 and 19
/// ```ignore
/// use esp_debounced_input::{DebounceConfig, DebouncedInputs, EspPlatform, InputEvent};
/// use std::sync::Arc;
///
/// let platform = Arc::new(EspPlatform::new()?);
/// let mut inputs = DebouncedInputs::new(platform, DebounceConfig::default());
///
/// //handler runs on the polling task.. beware of blocking
/// inputs.init(&[18, 19], |event: InputEvent| {
///     log::info!("gpio {} is now {:?}", event.pin, event.kind);
/// })?;
/// ```
pub struct DebouncedInputs<P: Platform> {
    platform: Arc<P>,
    config: DebounceConfig,
    session: Option<Session<P>>,
}

impl<P: Platform> DebouncedInputs<P> {
    pub fn new(platform: Arc<P>, config: DebounceConfig) -> Self {
        Self {
            platform,
            config,
            session: None,
        }
    }

    pub fn config(&self) -> &DebounceConfig {
        &self.config
    }

    /// Start monitoring `pins`, in this order, reporting to `handler`.
    ///
    /// Any previous session is released first. On error nothing stays
    /// mounted and the previous session is gone too.
    pub fn init<H: EventHandler>(
        &mut self,
        pins: &[PinId],
        handler: H,
    ) -> Result<(), ConfigError<P::Error>> {
        self.deinit();

        if let Err(reason) = self.config.validate() {
            return Err(ConfigError::InvalidConfig(reason));
        }
        Self::validate_pins(pins)?;

        info!("Configuring {} pins for input", pins.len());
        match Session::start(&self.platform, pins, self.config, Box::new(handler)) {
            Ok(session) => {
                self.session = Some(session);
                Ok(())
            }
            Err(err) => {
                warn!("Input configuration rolled back: {}", err);
                Err(err)
            }
        }
    }

    /// Report the current raw level of every pin to the handler, once.
    ///
    /// This bypasses debouncing: a pin caught mid-bounce is reported at
    /// whatever level it reads right now. Pending debounce and long press
    /// bookkeeping is left untouched. Does nothing without a session.
    pub fn read_once(&self) {
        let Some(session) = &self.session else {
            return;
        };

        let shared = &session.shared;
        for record in &shared.records {
            let level = self.platform.read_level(record.pin());
            shared.handler.on_event(InputEvent {
                pin: record.pin(),
                kind: EventKind::from_level(level, shared.config.active_level),
            });
        }
    }

    /// Stop monitoring and release every pin of the current session
    pub fn deinit(&mut self) {
        if let Some(session) = self.session.take() {
            info!("Releasing {} input pins", session.shared.records.len());
        }
    }

    /// Pins of the current session, in registration order
    pub fn pins(&self) -> Vec<PinId> {
        self.session
            .as_ref()
            .map(|session| session.pins().collect())
            .unwrap_or_default()
    }

    fn validate_pins(pins: &[PinId]) -> Result<(), ConfigError<P::Error>> {
        if pins.is_empty() {
            return Err(ConfigError::NoPins);
        }
        if pins.len() > MAX_INPUTS {
            return Err(ConfigError::TooManyPins {
                requested: pins.len(),
                max: MAX_INPUTS,
            });
        }
        for (index, pin) in pins.iter().enumerate() {
            if pins[..index].contains(pin) {
                return Err(ConfigError::DuplicatePin(*pin));
            }
        }
        Ok(())
    }
}
