//! GPIO configuration for the hall-sensor input.

/// Which transition of the sensor output counts as one edge.
///
/// Configured once at start-up, never changed while running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgePolarity {
    Rising,
    Falling,
    Both,
}

/// Hall-sensor input pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HallSensorConfig {
    /// GPIO number.
    pub pin: i32,
    pub polarity: EdgePolarity,
    /// Enable the internal pull-up (for open-drain sensor outputs).
    pub pull_up: bool,
    /// Interrupt priority level for the shared GPIO ISR service.
    pub isr_level: u8,
}

impl HallSensorConfig {
    /// Reference wiring: GPIO13, falling edge as the magnet passes. The
    /// sensor module drives the line itself, so both internal pulls are off.
    pub const REFERENCE: Self = Self {
        pin: 13,
        polarity: EdgePolarity::Falling,
        pull_up: false,
        isr_level: 3,
    };

    /// Bit mask for `gpio_config_t::pin_bit_mask`.
    pub const fn pin_mask(&self) -> u64 {
        1u64 << self.pin
    }
}

impl Default for HallSensorConfig {
    fn default() -> Self {
        Self::REFERENCE
    }
}
