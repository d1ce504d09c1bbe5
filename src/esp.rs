use core::ptr;
use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use embedded_hal::digital::v2::PinState;
use esp_idf_hal::gpio::InterruptType;
use esp_idf_sys::c_types::c_void;
use esp_idf_sys::*;

use crate::config::{OutputConfig, Pull, TaskConfig};
use crate::platform::{OneshotJob, PeriodicJob, PinId, Platform, TickCount};
use crate::record::PinRecord;

const TASK_NAME: &[u8] = b"gpio_input_debounce\0";
const TIMER_NAME: &[u8] = b"pulse_revert\0";
const PD_PASS: BaseType_t = 1;

/// [`Platform`] on top of esp-idf: gpio driver, FreeRTOS tasks and esp_timer
pub struct EspPlatform {
    /// Records handed to the gpio isr service, as raw `Arc` pointers
    isr_records: Mutex<Vec<(PinId, usize)>>,
}

impl EspPlatform {
    /// Install the shared gpio interrupt service, if nobody did yet
    pub fn new() -> Result<Self, EspError> {
        unsafe {
            match gpio_install_isr_service(0) {
                ESP_OK | ESP_ERR_INVALID_STATE => {}
                err => esp!(err)?,
            }
        }

        Ok(Self {
            isr_records: Mutex::new(Vec::new()),
        })
    }

    fn records(&self) -> std::sync::MutexGuard<'_, Vec<(PinId, usize)>> {
        // a poisoned list is still a valid list of pointers
        self.isr_records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Runs on each edge of a monitored pin, from the gpio isr service
    #[link_section = ".iram1.debounced_input"]
    unsafe extern "C" fn edge_isr(arg: *mut c_void) {
        let record = &*(arg as *const PinRecord);
        let level = gpio_get_level(record.pin() as gpio_num_t) != 0;
        record.capture(PinState::from(level), xTaskGetTickCountFromISR());
    }

    unsafe extern "C" fn periodic_entry(arg: *mut c_void) {
        let mut task = Box::from_raw(arg as *mut PeriodicTask);

        while task.control.running.load(Ordering::Acquire) {
            (task.job)();
            vTaskDelay(task.period);
        }

        task.control.finished.store(true, Ordering::Release);
        drop(task);
        vTaskDelete(ptr::null_mut());
    }

    unsafe extern "C" fn oneshot_entry(arg: *mut c_void) {
        let timer = Box::from_raw(arg as *mut OneshotTimer);
        let OneshotTimer { job, handle } = *timer;

        job();

        // the timer already fired and is not armed anymore
        if esp_timer_delete(handle) != ESP_OK {
            log::warn!("unable to delete expired pulse timer");
        }
    }
}

struct Control {
    running: AtomicBool,
    finished: AtomicBool,
}

struct PeriodicTask {
    job: PeriodicJob,
    period: TickType_t,
    control: Arc<Control>,
}

struct OneshotTimer {
    job: OneshotJob,
    handle: esp_timer_handle_t,
}

/// A running polling task
pub struct EspTask {
    handle: TaskHandle_t,
    control: Arc<Control>,
}

unsafe impl Send for EspTask {}

impl Platform for EspPlatform {
    type Error = EspError;
    type Task = EspTask;

    fn now(&self) -> TickCount {
        unsafe { xTaskGetTickCount() }
    }

    fn ticks(&self, duration: Duration) -> TickCount {
        let ms = duration.as_millis() as u64;
        ((ms * configTICK_RATE_HZ as u64 + 999) / 1000) as TickCount
    }

    fn read_level(&self, pin: PinId) -> PinState {
        PinState::from(unsafe { gpio_get_level(pin as gpio_num_t) } != 0)
    }

    fn write_level(&self, pin: PinId, level: PinState) -> Result<(), Self::Error> {
        let level = match level {
            PinState::High => 1,
            PinState::Low => 0,
        };
        esp!(unsafe { gpio_set_level(pin as gpio_num_t, level) })
    }

    fn configure_inputs(&self, pins: &[PinId], pull: Pull) -> Result<(), Self::Error> {
        let pin_bit_mask = pins.iter().fold(0u64, |mask, pin| mask | (1u64 << pin));

        let (pull_up_en, pull_down_en) = match pull {
            Pull::Up => (gpio_pullup_t_GPIO_PULLUP_ENABLE, gpio_pulldown_t_GPIO_PULLDOWN_DISABLE),
            Pull::Down => (gpio_pullup_t_GPIO_PULLUP_DISABLE, gpio_pulldown_t_GPIO_PULLDOWN_ENABLE),
            Pull::Floating => (gpio_pullup_t_GPIO_PULLUP_DISABLE, gpio_pulldown_t_GPIO_PULLDOWN_DISABLE),
        };

        let io_conf = gpio_config_t {
            pin_bit_mask,
            mode: gpio_mode_t_GPIO_MODE_INPUT,
            pull_up_en,
            pull_down_en,
            intr_type: InterruptType::AnyEdge.into(),
        };

        esp!(unsafe { gpio_config(&io_conf) })
    }

    fn configure_output(&self, pin: PinId, config: &OutputConfig) -> Result<(), Self::Error> {
        let (mode, pull_up_en) = match config.open_drain {
            true => (gpio_mode_t_GPIO_MODE_OUTPUT_OD, gpio_pullup_t_GPIO_PULLUP_ENABLE),
            false => (gpio_mode_t_GPIO_MODE_OUTPUT, gpio_pullup_t_GPIO_PULLUP_DISABLE),
        };

        let io_conf = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode,
            pull_up_en,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };

        esp!(unsafe { gpio_config(&io_conf) })
    }

    fn reset_pin(&self, pin: PinId) {
        if let Err(err) = esp!(unsafe { gpio_reset_pin(pin as gpio_num_t) }) {
            log::warn!("gpio {} could not be reset: {}", pin, err);
        }
    }

    fn attach_edge_isr(&self, pin: PinId, record: Arc<PinRecord>) -> Result<(), Self::Error> {
        let raw = Arc::into_raw(record);

        let added = esp!(unsafe {
            gpio_isr_handler_add(pin as gpio_num_t, Some(Self::edge_isr), raw as *mut c_void)
        });
        if let Err(err) = added {
            drop(unsafe { Arc::from_raw(raw) });
            return Err(err);
        }

        self.records().push((pin, raw as usize));
        Ok(())
    }

    fn detach_edge_isr(&self, pin: PinId) {
        let mut records = self.records();
        let Some(index) = records.iter().position(|(attached, _)| *attached == pin) else {
            return;
        };

        // the isr service no longer calls into the record once the handler is removed
        unsafe {
            gpio_intr_disable(pin as gpio_num_t);
            gpio_isr_handler_remove(pin as gpio_num_t);
        }

        let (_, raw) = records.swap_remove(index);
        drop(unsafe { Arc::from_raw(raw as *const PinRecord) });
    }

    fn spawn_periodic(
        &self,
        task: &TaskConfig,
        period: TickCount,
        job: PeriodicJob,
    ) -> Result<Self::Task, Self::Error> {
        let control = Arc::new(Control {
            running: AtomicBool::new(true),
            finished: AtomicBool::new(false),
        });

        let periodic = Box::into_raw(Box::new(PeriodicTask {
            job,
            period,
            control: Arc::clone(&control),
        }));

        let mut handle: TaskHandle_t = ptr::null_mut();
        let created = unsafe {
            xTaskCreatePinnedToCore(
                Some(Self::periodic_entry),
                TASK_NAME.as_ptr() as *const _,
                task.stack_size,
                periodic as *mut c_void,
                task.priority,
                &mut handle,
                tskNO_AFFINITY as BaseType_t,
            )
        };

        if created != PD_PASS {
            drop(unsafe { Box::from_raw(periodic) });
            esp!(ESP_ERR_NO_MEM)?;
        }

        Ok(EspTask { handle, control })
    }

    fn stop_periodic(&self, task: Self::Task) {
        task.control.running.store(false, Ordering::Release);

        // stopping from inside the job: the task ends after this pass
        if unsafe { xTaskGetCurrentTaskHandle() } == task.handle {
            return;
        }

        while !task.control.finished.load(Ordering::Acquire) {
            unsafe { vTaskDelay(1) };
        }
    }

    fn oneshot(&self, after: Duration, job: OneshotJob) -> Result<(), Self::Error> {
        let timer = Box::into_raw(Box::new(OneshotTimer {
            job,
            handle: ptr::null_mut(),
        }));

        let args = esp_timer_create_args_t {
            callback: Some(Self::oneshot_entry),
            arg: timer as *mut c_void,
            dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
            name: TIMER_NAME.as_ptr() as *const _,
            skip_unhandled_events: false,
        };

        unsafe {
            if let Err(err) = esp!(esp_timer_create(&args, &mut (*timer).handle)) {
                drop(Box::from_raw(timer));
                return Err(err);
            }

            let handle = (*timer).handle;
            if let Err(err) = esp!(esp_timer_start_once(handle, after.as_micros() as u64)) {
                esp_timer_delete(handle);
                drop(Box::from_raw(timer));
                return Err(err);
            }
        }

        Ok(())
    }
}
