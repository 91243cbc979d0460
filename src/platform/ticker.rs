//! Timer-driven periodic wake-up for a task.
//!
//! An `EspTimer` callback notifies the owning task, which blocks in
//! [`Ticker::wait`]. Dropping the ticker cancels the timer.

use core::num::NonZeroU32;
use core::time::Duration;

use esp_idf_svc::hal::delay::BLOCK;
use esp_idf_svc::hal::task::notification::Notification;
use esp_idf_svc::sys::EspError;
use esp_idf_svc::timer::{EspTaskTimerService, EspTimer};

pub struct Ticker {
    _timer: EspTimer<'static>,
    notification: Notification,
}

impl Ticker {
    /// Start a periodic timer that wakes the *calling* task.
    pub fn every(service: &EspTaskTimerService, period: Duration) -> Result<Self, EspError> {
        let notification = Notification::new();
        let notifier = notification.notifier();

        let timer = service.timer(move || {
            // SAFETY: the notified task outlives the timer (it owns it)
            unsafe {
                notifier.notify_and_yield(NonZeroU32::MIN);
            }
        })?;
        timer.every(period)?;

        Ok(Self {
            _timer: timer,
            notification,
        })
    }

    /// Block until the next period elapses.
    pub fn wait(&self) {
        self.notification.wait(BLOCK);
    }
}
