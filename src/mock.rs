//! A simulated chip for host tests: a tick clock driven by the test, input
//! levels that raise edges into attached records, a periodic task that can be
//! stalled, a one-shot timer queue and failure injection.

use core::fmt;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use embedded_hal::digital::v2::PinState;

use crate::config::{OutputConfig, Pull, TaskConfig};
use crate::event::{EventHandler, InputEvent};
use crate::platform::{OneshotJob, PeriodicJob, PinId, Platform, TickCount};
use crate::record::PinRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MockError(pub &'static str);

impl fmt::Display for MockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

#[derive(Debug)]
pub(crate) struct MockTask(u32);

struct Periodic {
    id: u32,
    period: TickCount,
    next_due: TickCount,
    job: Option<PeriodicJob>,
}

struct Timer {
    due: TickCount,
    seq: u64,
    job: OneshotJob,
}

/// Which platform calls should fail
#[derive(Debug, Default, Clone)]
pub(crate) struct Failures {
    pub configure_inputs: bool,
    pub attach: Option<PinId>,
    pub spawn: bool,
    pub configure_output: bool,
    pub write: bool,
    pub oneshot: bool,
}

#[derive(Default)]
struct State {
    now: TickCount,
    levels: BTreeMap<PinId, PinState>,
    inputs: BTreeSet<PinId>,
    outputs: BTreeMap<PinId, OutputConfig>,
    isrs: BTreeMap<PinId, Arc<PinRecord>>,
    periodic: Vec<Periodic>,
    next_task: u32,
    timers: Vec<Timer>,
    next_timer: u64,
    resets: Vec<PinId>,
    stalled: bool,
    fail: Failures,
}

/// 100 Hz, like the esp-idf default
pub(crate) struct MockPlatform {
    state: Mutex<State>,
}

impl MockPlatform {
    pub const TICK_RATE_HZ: u32 = 100;

    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(State::default()),
        })
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("mock state poisoned")
    }

    pub fn fail(&self, fail: Failures) {
        self.state().fail = fail;
    }

    pub fn set_now(&self, now: TickCount) {
        self.state().now = now;
    }

    /// Drive an input. Edges reach the attached record, like the gpio interrupt would.
    pub fn set_level(&self, pin: PinId, level: PinState) {
        let (record, now) = {
            let mut state = self.state();
            let previous = state.levels.insert(pin, level).unwrap_or(PinState::High);
            if previous == level {
                return;
            }
            (state.isrs.get(&pin).cloned(), state.now)
        };

        if let Some(record) = record {
            record.capture(level, now);
        }
    }

    /// Set a level without raising an interrupt, as if the edge was missed
    pub fn set_level_silently(&self, pin: PinId, level: PinState) {
        self.state().levels.insert(pin, level);
    }

    /// Let `ticks` ticks pass, running due timers and periodic jobs
    pub fn advance(&self, ticks: TickCount) {
        for _ in 0..ticks {
            self.step();
        }
    }

    /// Let `ticks` ticks pass without the periodic task getting to run
    pub fn stall(&self, ticks: TickCount) {
        self.state().stalled = true;
        self.advance(ticks);
        self.state().stalled = false;
    }

    fn step(&self) {
        let now = {
            let mut state = self.state();
            state.now = state.now.wrapping_add(1);
            state.now
        };

        loop {
            let job = {
                let mut state = self.state();
                let due = state
                    .timers
                    .iter()
                    .enumerate()
                    .filter(|(_, timer)| is_due(timer.due, now))
                    .min_by_key(|(_, timer)| timer.seq)
                    .map(|(index, _)| index);
                match due {
                    Some(index) => state.timers.remove(index).job,
                    None => break,
                }
            };
            job();
        }

        if self.state().stalled {
            return;
        }

        let due: Vec<u32> = self
            .state()
            .periodic
            .iter()
            .filter(|task| is_due(task.next_due, now))
            .map(|task| task.id)
            .collect();

        for id in due {
            let job = {
                let mut state = self.state();
                state
                    .periodic
                    .iter_mut()
                    .find(|task| task.id == id)
                    .and_then(|task| task.job.take())
            };
            let Some(mut job) = job else { continue };

            job();

            let mut state = self.state();
            if let Some(task) = state.periodic.iter_mut().find(|task| task.id == id) {
                task.job = Some(job);
                task.next_due = now.wrapping_add(task.period);
            }
        }
    }

    pub fn level(&self, pin: PinId) -> PinState {
        self.read_level(pin)
    }

    pub fn attached(&self) -> Vec<PinId> {
        self.state().isrs.keys().copied().collect()
    }

    pub fn configured_inputs(&self) -> Vec<PinId> {
        self.state().inputs.iter().copied().collect()
    }

    pub fn output_config(&self, pin: PinId) -> Option<OutputConfig> {
        self.state().outputs.get(&pin).copied()
    }

    pub fn resets(&self) -> Vec<PinId> {
        self.state().resets.clone()
    }

    pub fn running_tasks(&self) -> usize {
        self.state().periodic.len()
    }

    pub fn pending_timers(&self) -> usize {
        self.state().timers.len()
    }
}

fn is_due(due: TickCount, now: TickCount) -> bool {
    (now.wrapping_sub(due) as i32) >= 0
}

impl Platform for MockPlatform {
    type Error = MockError;
    type Task = MockTask;

    fn now(&self) -> TickCount {
        self.state().now
    }

    fn ticks(&self, duration: Duration) -> TickCount {
        let ms = duration.as_millis() as u64;
        ((ms * Self::TICK_RATE_HZ as u64 + 999) / 1000) as TickCount
    }

    fn read_level(&self, pin: PinId) -> PinState {
        self.state().levels.get(&pin).copied().unwrap_or(PinState::High)
    }

    fn write_level(&self, pin: PinId, level: PinState) -> Result<(), Self::Error> {
        let mut state = self.state();
        if state.fail.write {
            return Err(MockError("write rejected"));
        }
        state.levels.insert(pin, level);
        Ok(())
    }

    fn configure_inputs(&self, pins: &[PinId], _pull: Pull) -> Result<(), Self::Error> {
        let mut state = self.state();
        if state.fail.configure_inputs {
            return Err(MockError("input config rejected"));
        }
        state.inputs.extend(pins.iter().copied());
        Ok(())
    }

    fn configure_output(&self, pin: PinId, config: &OutputConfig) -> Result<(), Self::Error> {
        let mut state = self.state();
        if state.fail.configure_output {
            return Err(MockError("output config rejected"));
        }
        state.outputs.insert(pin, *config);
        Ok(())
    }

    fn reset_pin(&self, pin: PinId) {
        let mut state = self.state();
        state.inputs.remove(&pin);
        state.outputs.remove(&pin);
        state.resets.push(pin);
    }

    fn attach_edge_isr(&self, pin: PinId, record: Arc<PinRecord>) -> Result<(), Self::Error> {
        let mut state = self.state();
        if state.fail.attach == Some(pin) {
            return Err(MockError("isr rejected"));
        }
        state.isrs.insert(pin, record);
        Ok(())
    }

    fn detach_edge_isr(&self, pin: PinId) {
        self.state().isrs.remove(&pin);
    }

    fn spawn_periodic(
        &self,
        _task: &TaskConfig,
        period: TickCount,
        job: PeriodicJob,
    ) -> Result<Self::Task, Self::Error> {
        let mut state = self.state();
        if state.fail.spawn {
            return Err(MockError("task rejected"));
        }
        state.next_task += 1;
        let id = state.next_task;
        let next_due = state.now;
        state.periodic.push(Periodic {
            id,
            period,
            next_due,
            job: Some(job),
        });
        Ok(MockTask(id))
    }

    fn stop_periodic(&self, task: Self::Task) {
        self.state().periodic.retain(|periodic| periodic.id != task.0);
    }

    fn oneshot(&self, after: Duration, job: OneshotJob) -> Result<(), Self::Error> {
        let ticks = self.ticks(after);
        let mut state = self.state();
        if state.fail.oneshot {
            return Err(MockError("timer rejected"));
        }
        state.next_timer += 1;
        let timer = Timer {
            due: state.now.wrapping_add(ticks),
            seq: state.next_timer,
            job,
        };
        state.timers.push(timer);
        Ok(())
    }
}

/// Collects every event it is handed
#[derive(Default)]
pub(crate) struct Recorder {
    events: Mutex<Vec<InputEvent>>,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A handler feeding this recorder
    pub fn handler(self: &Arc<Self>) -> impl EventHandler {
        let recorder = Arc::clone(self);
        move |event: InputEvent| recorder.on_event(event)
    }

    pub fn take(&self) -> Vec<InputEvent> {
        core::mem::take(&mut *self.events.lock().expect("recorder poisoned"))
    }
}

impl EventHandler for Recorder {
    fn on_event(&self, event: InputEvent) {
        self.events.lock().expect("recorder poisoned").push(event);
    }
}
