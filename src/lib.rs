//! # HallRpmGauge
//!
//! Hall-sensor rotation gauge: counts sensor edges, turns them into a
//! per-minute rate once per sample period, shows it on a round LCD and
//! streams it over MQTT.
//!
//! ## Architecture
//!
//! ```text
//! Hall ISR ──▶ EdgeCounter ──▶ RateSampler (1000 ms) ──▶ Publisher
//!                                                          ├──▶ DisplaySink  ("<n> RPM")
//!                                                          └──▶ UplinkFeed ──▶ TelemetryUplink
//!                                                                               │ latest slot
//!                                                                               ▼
//!                                                     publish tick (100 ms) ──▶ "speed/values"
//! ```
//!
//! - The ISR does one atomic increment, nothing else
//! - The sampler drains the counter every tick, consumed or not
//! - A failing sink is recorded and skipped, never propagated
//! - The uplink publishes the latest value, at most once per publish tick
//!
//! Everything in this crate is `no_std` and allocation-free. Driver
//! bring-up (GPIO ISR, Wi-Fi, MQTT, LCD) is in the firmware binary.

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod edge;
pub mod fault;
pub mod hal;
pub mod log_drain;
pub mod log_globals;
pub mod logging;
pub mod publisher;
pub mod sample;
pub mod sampler;
pub mod sink;
pub mod uplink;

pub use config::{GaugeConfig, CONFIG};
pub use edge::EdgeCounter;
pub use fault::{FaultCode, FaultState};
pub use log_globals::{TICK_LOG_STREAM, UPLINK_LOG_STREAM};
pub use publisher::Publisher;
pub use sample::RateSample;
pub use sampler::RateSampler;
pub use sink::{DisplaySink, LabelTarget, RateSink};
pub use uplink::{TelemetryChannel, TelemetryUplink, UplinkFeed};
