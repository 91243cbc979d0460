//! Hall-sensor edge interrupt.
//!
//! Registers a raw GPIO ISR through the shared ESP-IDF GPIO ISR service.
//! The handler argument is the address of a `'static` [`EdgeCounter`], so
//! the ISR touches exactly one atomic and nothing else.

use core::ffi::c_void;

use esp_idf_svc::sys::{self, esp, EspError, ESP_ERR_INVALID_STATE};
use log::info;

use hall_rpm_gauge::edge::EdgeCounter;
use hall_rpm_gauge::hal::gpio::{EdgePolarity, HallSensorConfig};

/// GPIO ISR body: one atomic increment.
///
/// # Safety
///
/// `arg` is the `&'static EdgeCounter` passed to `gpio_isr_handler_add`.
unsafe extern "C" fn hall_isr(arg: *mut c_void) {
    let counter = &*(arg as *const EdgeCounter);
    counter.increment();
}

fn interrupt_type(polarity: EdgePolarity) -> sys::gpio_int_type_t {
    match polarity {
        EdgePolarity::Rising => sys::gpio_int_type_t_GPIO_INTR_POSEDGE,
        EdgePolarity::Falling => sys::gpio_int_type_t_GPIO_INTR_NEGEDGE,
        EdgePolarity::Both => sys::gpio_int_type_t_GPIO_INTR_ANYEDGE,
    }
}

/// Configure the input pin and hook `counter` to its edge interrupt.
///
/// Called once at start-up; polarity is fixed from then on.
pub fn install(counter: &'static EdgeCounter, cfg: &HallSensorConfig) -> Result<(), EspError> {
    let io_conf = sys::gpio_config_t {
        pin_bit_mask: cfg.pin_mask(),
        mode: sys::gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: if cfg.pull_up {
            sys::gpio_pullup_t_GPIO_PULLUP_ENABLE
        } else {
            sys::gpio_pullup_t_GPIO_PULLUP_DISABLE
        },
        pull_down_en: sys::gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: interrupt_type(cfg.polarity),
        ..Default::default()
    };

    // SAFETY: plain configuration calls on a pin nothing else owns
    unsafe {
        esp!(sys::gpio_config(&io_conf))?;

        // Another driver may already have installed the shared service
        let ret = sys::gpio_install_isr_service(1 << cfg.isr_level);
        if ret != ESP_ERR_INVALID_STATE {
            esp!(ret)?;
        }

        esp!(sys::gpio_isr_handler_add(
            cfg.pin,
            Some(hall_isr),
            counter as *const EdgeCounter as *mut c_void,
        ))?;
    }

    info!(
        "hall sensor on GPIO{} ({:?} edge, pull-up {})",
        cfg.pin, cfg.polarity, cfg.pull_up
    );
    Ok(())
}
