//! Process-wide log rings.
//!
//! One ring per producing context: each ring has a single producer and
//! the drain task as its single consumer.

use crate::logging::LogStream;

/// Sample tick: sampler and publisher (sink faults).
pub static TICK_LOG_STREAM: LogStream = LogStream::new("tick");

/// Publish tick: telemetry uplink (dropped publishes, announces).
pub static UPLINK_LOG_STREAM: LogStream = LogStream::new("uplink");
