#![cfg_attr(not(target_os = "espidf"), allow(dead_code))]

//! Front-end of a two channel USB switch.
//!
//! gpio 18 and 19 sense which channel the switch is on, gpio 9 is the boot
//! button, and gpio 20 pulses the switch's own toggle button.

use esp_debounced_input::{EventKind, InputEvent, PinId};

const BOOT_BUTTON: PinId = 9;
const CHANNEL_2_SENSE: PinId = 18;
const CHANNEL_1_SENSE: PinId = 19;
const TOGGLE_OUTPUT: PinId = 20;

const INPUTS: [PinId; 3] = [BOOT_BUTTON, CHANNEL_2_SENSE, CHANNEL_1_SENSE];
const TOGGLE_PULSE_MS: u64 = 200;

/// Presses on the channel inputs needed to request a reset
const RESET_PRESSES: u8 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Channel {
    One,
    Two,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Switched(Channel),
    Toggle,
    Reset,
}

/// Turns input events into switch actions.
///
/// Flipping the switch back and forth quickly is a reset gesture: more than
/// [`RESET_PRESSES`] activations on the channel inputs without a long hold
/// in between request a reset.
#[derive(Debug, Default)]
struct SwitchFrontend {
    channel: Option<Channel>,
    presses: u8,
}

impl SwitchFrontend {
    fn handle(&mut self, event: InputEvent) -> Vec<Action> {
        let mut actions = Vec::new();
        let is_channel_input = matches!(event.pin, CHANNEL_1_SENSE | CHANNEL_2_SENSE);

        if is_channel_input {
            match event.kind {
                EventKind::ActivatedLong => self.presses = 0,
                EventKind::ActivatedShort => {
                    self.presses += 1;
                    if self.presses > RESET_PRESSES {
                        self.presses = 0;
                        actions.push(Action::Reset);
                    }
                }
                _ => {}
            }
        }

        if event.kind == EventKind::ActivatedShort {
            match event.pin {
                CHANNEL_1_SENSE => self.switched(Channel::One, &mut actions),
                CHANNEL_2_SENSE => self.switched(Channel::Two, &mut actions),
                BOOT_BUTTON => actions.push(Action::Toggle),
                _ => {}
            }
        }

        actions
    }

    fn switched(&mut self, channel: Channel, actions: &mut Vec<Action>) {
        self.channel = Some(channel);
        actions.push(Action::Switched(channel));
    }
}

#[cfg(target_os = "espidf")]
fn main() -> Result<(), esp_idf_sys::EspError> {
    use std::sync::{mpsc, Arc};
    use std::time::Duration;

    use esp_debounced_input::{DebounceConfig, DebouncedInputs, EspPlatform, OutputConfig, PulseOutputs};
    use log::{info, warn};

    esp_idf_sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    let platform = Arc::new(EspPlatform::new()?);

    let (events, received) = mpsc::sync_channel::<InputEvent>(16);
    let mut inputs = DebouncedInputs::new(Arc::clone(&platform), DebounceConfig::default());
    if let Err(err) = inputs.init(&INPUTS, move |event: InputEvent| {
        // never block the polling task
        let _ = events.try_send(event);
    }) {
        warn!("Failed to initialize debounced inputs: {}", err);
        return Ok(());
    }

    let mut outputs = PulseOutputs::new(Arc::clone(&platform));
    if let Err(err) = outputs.init_output(TOGGLE_OUTPUT, OutputConfig::default()) {
        warn!("Failed to initialize toggle output: {}", err);
    }

    // report where the switch stands before the first edge
    inputs.read_once();

    let mut frontend = SwitchFrontend::default();
    for event in received {
        info!("GPIO {} is now {:?}", event.pin, event.kind);

        for action in frontend.handle(event) {
            match action {
                Action::Switched(channel) => info!("USB Switch state is now {:?}", channel),
                Action::Toggle => {
                    if let Err(err) = outputs.pulse(TOGGLE_OUTPUT, Duration::from_millis(TOGGLE_PULSE_MS)) {
                        warn!("Cannot toggle switch: {}", err);
                    }
                }
                Action::Reset => info!("Resetting device."),
            }
        }
    }

    Ok(())
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    eprintln!("usb_switch runs on esp-idf targets only");
}
