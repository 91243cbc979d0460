//! Fan-out of each [`RateSample`] to the registered sinks.
//!
//! # Contract
//!
//! - `dispatch` runs once per sample tick, synchronously
//! - every registered sink gets the sample, in no promised order
//! - a sink that fails is recorded and skipped; it never stops delivery to
//!   the other sinks and never propagates into the sampler
//! - fixed capacity, no allocation: the registry is a `heapless::Vec`

use heapless::Vec;

use crate::fault::FaultState;
use crate::logging::LogStream;
use crate::ring_warn;
use crate::sample::RateSample;
use crate::sink::RateSink;

/// Default number of sink slots (display + telemetry, with room to spare).
pub const MAX_SINKS: usize = 4;

/// Returned by [`Publisher::register`] when every slot is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryFull;

impl core::fmt::Display for RegistryFull {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("sink registry full")
    }
}

/// Handle to a registered sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkId(usize);

impl SinkId {
    /// Registration slot.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Outcome of one dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Sinks that accepted the sample.
    pub delivered: usize,
    /// Sinks that returned an error.
    pub failed: usize,
}

impl DispatchReport {
    /// True if no sink failed.
    pub fn all_delivered(&self) -> bool {
        self.failed == 0
    }
}

struct Registered<'a> {
    sink: &'a mut dyn RateSink,
    failures: u32,
}

/// Sink registry and dispatcher.
///
/// ```ignore
/// let mut publisher = Publisher::<2>::new(&FAULTS, &TICK_LOG_STREAM);
/// publisher.register(&mut display)?;
/// publisher.register(&mut uplink_feed)?;
///
/// // every sample tick
/// let report = publisher.dispatch(&sample);
/// ```
pub struct Publisher<'a, const N: usize = MAX_SINKS> {
    sinks: Vec<Registered<'a>, N>,
    faults: &'a FaultState,
    log: &'a LogStream,
}

impl<'a, const N: usize> Publisher<'a, N> {
    /// Create an empty registry.
    ///
    /// Sink failures are recorded in `faults` and logged to `log`, which
    /// must be the ring of the context that calls `dispatch`.
    pub fn new(faults: &'a FaultState, log: &'a LogStream) -> Self {
        Self {
            sinks: Vec::new(),
            faults,
            log,
        }
    }

    /// Add a sink to the fan-out set.
    pub fn register(&mut self, sink: &'a mut dyn RateSink) -> Result<SinkId, RegistryFull> {
        let id = SinkId(self.sinks.len());
        self.sinks
            .push(Registered { sink, failures: 0 })
            .map_err(|_| RegistryFull)?;
        Ok(id)
    }

    /// Deliver `sample` to every registered sink.
    ///
    /// Bounded by the number of sinks; each sink call is bounded by the
    /// sink's own contract.
    pub fn dispatch(&mut self, sample: &RateSample) -> DispatchReport {
        let mut report = DispatchReport::default();

        for (index, entry) in self.sinks.iter_mut().enumerate() {
            match entry.sink.accept(sample) {
                Ok(()) => report.delivered += 1,
                Err(err) => {
                    report.failed += 1;
                    entry.failures = entry.failures.saturating_add(1);
                    self.faults.set(err.into(), index as u32);
                    ring_warn!(
                        self.log,
                        sample.sampled_at_ms,
                        "sink {} ({}) dropped {} RPM: {}",
                        index,
                        entry.sink.name(),
                        sample.rpm(),
                        err
                    );
                }
            }
        }

        report
    }

    /// Failures recorded for a sink since registration.
    pub fn failures(&self, id: SinkId) -> u32 {
        self.sinks.get(id.0).map_or(0, |entry| entry.failures)
    }

    /// Name of a registered sink.
    pub fn sink_name(&self, id: SinkId) -> Option<&'static str> {
        self.sinks.get(id.0).map(|entry| entry.sink.name())
    }

    /// Number of registered sinks.
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// True if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}
