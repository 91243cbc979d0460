//! Periodic edge-to-rate sampler.
//!
//! Pure per-tick logic. The timer that calls [`RateSampler::tick`] lives
//! outside (ESP timer service on device, a thread in the simulator).
//!
//! Each tick:
//! 1. drain the [`EdgeCounter`] (resets it, always)
//! 2. measure the real elapsed time since the previous tick
//! 3. build a [`RateSample`]
//! 4. hand it to the [`Publisher`]
//!
//! The sampler never fails. A silent window is a zero-rate sample, and
//! sink failures stop at the publisher.

use crate::edge::EdgeCounter;
use crate::publisher::{DispatchReport, Publisher};
use crate::ring_debug;
use crate::sample::RateSample;

/// Reference sampling period.
pub const DEFAULT_SAMPLE_PERIOD_MS: u32 = 1000;

/// Sampler state between ticks.
pub struct RateSampler<'a> {
    counter: &'a EdgeCounter,
    nominal_period_ms: u32,
    last_tick_ms: u64,
    ticks: u32,
}

impl<'a> RateSampler<'a> {
    /// Create a sampler whose first window opens at `start_ms`.
    ///
    /// Edges counted before this call belong to no window and are
    /// discarded. `nominal_period_ms` is used only when the clock has not
    /// advanced between two ticks.
    pub fn new(counter: &'a EdgeCounter, nominal_period_ms: u32, start_ms: u64) -> Self {
        counter.drain_and_reset();
        Self {
            counter,
            nominal_period_ms,
            last_tick_ms: start_ms,
            ticks: 0,
        }
    }

    /// Close the current window and produce its sample.
    ///
    /// The counter is reset whether or not anyone ends up consuming the
    /// sample: a lost sample is acceptable, a double-counted edge is not.
    pub fn sample(&mut self, now_ms: u64) -> RateSample {
        let raw_count = self.counter.drain_and_reset();
        let period_ms = self.elapsed_ms(now_ms);

        self.last_tick_ms = now_ms.max(self.last_tick_ms);
        self.ticks = self.ticks.wrapping_add(1);

        RateSample::new(raw_count, period_ms, now_ms)
    }

    /// One full tick: sample, then fan out.
    pub fn tick<const N: usize>(
        &mut self,
        now_ms: u64,
        publisher: &mut Publisher<'_, N>,
    ) -> (RateSample, DispatchReport) {
        let sample = self.sample(now_ms);
        let report = publisher.dispatch(&sample);
        (sample, report)
    }

    /// Like [`tick`](Self::tick), with a trace line in the tick log ring.
    pub fn tick_logged<const N: usize>(
        &mut self,
        now_ms: u64,
        publisher: &mut Publisher<'_, N>,
        log: &crate::logging::LogStream,
    ) -> RateSample {
        let (sample, report) = self.tick(now_ms, publisher);
        ring_debug!(
            log,
            now_ms,
            "tick {}: {} edges / {} ms = {} RPM ({}/{} sinks)",
            self.ticks,
            sample.raw_count,
            sample.period_ms,
            sample.rpm(),
            report.delivered,
            report.delivered + report.failed
        );
        sample
    }

    /// Ticks completed so far.
    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    /// Configured nominal period.
    pub fn nominal_period_ms(&self) -> u32 {
        self.nominal_period_ms
    }

    fn elapsed_ms(&self, now_ms: u64) -> u32 {
        match now_ms.saturating_sub(self.last_tick_ms) {
            0 => self.nominal_period_ms,
            elapsed => u32::try_from(elapsed).unwrap_or(u32::MAX),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elapsed_uses_measured_period() {
        let counter = EdgeCounter::new();
        let mut sampler = RateSampler::new(&counter, 1000, 0);

        let first = sampler.sample(1010);
        assert_eq!(first.period_ms, 1010);

        let second = sampler.sample(2000);
        assert_eq!(second.period_ms, 990);
        assert_eq!(sampler.ticks(), 2);
    }

    #[test]
    fn test_stalled_clock_uses_nominal_period() {
        let counter = EdgeCounter::new();
        let mut sampler = RateSampler::new(&counter, 1000, 500);

        counter.increment();
        let sample = sampler.sample(500);
        assert_eq!(sample.period_ms, 1000);
        assert_eq!(sample.rate_per_minute, 60.0);
    }

    #[test]
    fn test_clock_going_backwards_is_not_negative() {
        let counter = EdgeCounter::new();
        let mut sampler = RateSampler::new(&counter, 1000, 5000);

        let sample = sampler.sample(4000);
        assert_eq!(sample.period_ms, 1000);

        // window start did not move backwards
        let sample = sampler.sample(6000);
        assert_eq!(sample.period_ms, 1000);
    }
}
