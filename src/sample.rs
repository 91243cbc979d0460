//! Module: sample
//!
//! Purpose: RateSample, the immutable value produced once per sample tick.
//!
//! Architecture:
//! - Plain `Copy` value, never mutated after creation
//! - Rate is a pure function of `(raw_count, period_ms)`
//! - Text renderings for the display label and the telemetry payload are
//!   formatted into fixed-capacity `heapless::String`s (no heap)
//!
//! Safety: Safe. No unsafe blocks. Copy types only.

use core::fmt::Write;

use heapless::String;

/// Milliseconds per minute, the numerator of every rate conversion.
pub const MS_PER_MINUTE: f64 = 60_000.0;

/// Capacity of the display label text (`"4294967295 RPM"` fits).
pub const LABEL_CAPACITY: usize = 16;

/// Capacity of the telemetry payload text (`"4294967295"` fits).
pub const PAYLOAD_CAPACITY: usize = 12;

/// Display label text, e.g. `"300 RPM"`.
pub type LabelText = String<LABEL_CAPACITY>;

/// Telemetry payload text, e.g. `"300"`.
pub type PayloadText = String<PAYLOAD_CAPACITY>;

/// Convert an edge count over a period into a per-minute rate.
///
/// `rate = raw_count * 60000 / period_ms`. A zero period yields zero
/// rather than dividing by zero.
#[inline]
pub fn rate_per_minute(raw_count: u32, period_ms: u32) -> f64 {
    if period_ms == 0 {
        return 0.0;
    }
    raw_count as f64 * MS_PER_MINUTE / period_ms as f64
}

/// One rate measurement.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RateSample {
    /// Edges drained from the counter for this window.
    pub raw_count: u32,

    /// Measured length of the window in milliseconds.
    pub period_ms: u32,

    /// Derived rate, revolutions per minute.
    pub rate_per_minute: f64,

    /// Monotonic time (ms) at which the window closed.
    pub sampled_at_ms: u64,
}

impl RateSample {
    /// Sample with zero edges, used before the first tick.
    pub const ZERO: Self = Self {
        raw_count: 0,
        period_ms: 0,
        rate_per_minute: 0.0,
        sampled_at_ms: 0,
    };

    /// Build a sample, deriving the rate from count and period.
    pub fn new(raw_count: u32, period_ms: u32, sampled_at_ms: u64) -> Self {
        Self {
            raw_count,
            period_ms,
            rate_per_minute: rate_per_minute(raw_count, period_ms),
            sampled_at_ms,
        }
    }

    /// Rate rounded to the nearest whole RPM, saturating at `u32::MAX`.
    pub fn rpm(&self) -> u32 {
        let rate = self.rate_per_minute;
        if rate.is_nan() || rate <= 0.0 {
            return 0;
        }
        // f64 -> u32 `as` saturates; +0.5 then truncate rounds half up
        (rate + 0.5) as u32
    }

    /// Display label text: `"<integer> RPM"`.
    pub fn label_text(&self) -> LabelText {
        let mut text = LabelText::new();
        // Capacity covers u32::MAX plus suffix, cannot fail
        let _ = write!(text, "{} RPM", self.rpm());
        text
    }

    /// Telemetry payload text: `"<integer>"`.
    pub fn payload_text(&self) -> PayloadText {
        let mut text = PayloadText::new();
        let _ = write!(text, "{}", self.rpm());
        text
    }
}

impl Default for RateSample {
    fn default() -> Self {
        Self::ZERO
    }
}
