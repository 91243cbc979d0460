//! Hardware Abstraction Layer for HallRpmGauge.
//!
//! Pin and peripheral records for the reference board. Driver bring-up
//! lives in `platform` (ESP-IDF only); business logic never touches pins.

pub mod display;
pub mod gpio;

pub use display::LcdConfig;
pub use gpio::{EdgePolarity, HallSensorConfig};
