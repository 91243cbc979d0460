//! Telemetry uplink: decouples the sample cadence from the publish cadence.
//!
//! # Architecture
//!
//! ```text
//! Sample tick (1000 ms)        LatestSample           Publish tick (100 ms)
//! ─────────────────────        ────────────           ─────────────────────
//!
//! UplinkFeed::accept() ──────▶ [seq|fields] ────────▶ publish_tick()
//! store(), overwrite           single slot            load(), bounded retries
//! ```
//!
//! # Delivery semantics
//!
//! Fire-and-forget, at most once per publish tick:
//! - channel not connected: the tick's publish is dropped, not queued
//! - channel rejects the send: dropped, next tick publishes the then-latest
//! - no new sample since the last tick: the same payload is published
//!   again (keep-alive, intentional)
//!
//! No backpressure reaches the sampler: a slow network only makes the
//! published value older, never wrong.

use core::sync::atomic::{fence, AtomicBool, AtomicU32, Ordering};

use crate::fault::{FaultCode, FaultState};
use crate::logging::LogStream;
use crate::sample::RateSample;
use crate::sink::{RateSink, SinkError};
use crate::{ring_info, ring_warn};

/// Reference telemetry topic.
pub const DEFAULT_TOPIC: &str = "speed/values";

/// Reference publish period.
pub const DEFAULT_PUBLISH_PERIOD_MS: u32 = 100;

/// Reader attempts before a publish tick gives up on a slot being written.
pub const MAX_READ_ATTEMPTS: u32 = 4;

/// Outbound channel failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelError {
    /// C01: Session not established
    NotConnected,
    /// C02: Client refused or failed the send
    SendRejected,
}

impl ChannelError {
    /// Get error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotConnected => "C01",
            Self::SendRejected => "C02",
        }
    }

    /// Get error message
    pub fn message(&self) -> &'static str {
        match self {
            Self::NotConnected => "not connected",
            Self::SendRejected => "send rejected",
        }
    }
}

impl core::fmt::Display for ChannelError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

/// External message channel (the MQTT client on device).
///
/// Session, QoS and reconnect machinery belong to the implementor.
pub trait TelemetryChannel {
    /// True while a session is up.
    fn is_connected(&self) -> bool;

    /// Publish `payload` on `topic`. Should not block for long.
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), ChannelError>;
}

impl<T: TelemetryChannel + ?Sized> TelemetryChannel for &mut T {
    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), ChannelError> {
        (**self).publish(topic, payload)
    }
}

/// Reader collided with the writer on every attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotBusy;

/// A sample together with the store that produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stamped {
    /// The stored sample.
    pub sample: RateSample,
    /// 1 for the first store, +1 per store after.
    pub generation: u32,
}

/// Single-writer, overwrite-on-write latest-value slot.
///
/// Sequence lock over 32-bit atomics only (ESP32 has no 64-bit atomics).
/// The sequence is odd while a store is in progress and advances by two
/// per store, so `seq / 2` is the store generation.
///
/// # Memory Ordering
///
/// - Writer: `seq` to odd, `Release` fence, fields `Relaxed`, `seq` to
///   even with `Release`.
/// - Reader: `seq` with `Acquire`, fields `Relaxed`, `Acquire` fence,
///   `seq` again; equal and even means the fields are one store's worth.
///
/// Exactly one context may call [`store`](Self::store).
pub struct LatestSample {
    seq: AtomicU32,
    raw_count: AtomicU32,
    period_ms: AtomicU32,
    rate_lo: AtomicU32,
    rate_hi: AtomicU32,
    at_lo: AtomicU32,
    at_hi: AtomicU32,
}

impl LatestSample {
    /// Create an empty slot.
    pub const fn new() -> Self {
        Self {
            seq: AtomicU32::new(0),
            raw_count: AtomicU32::new(0),
            period_ms: AtomicU32::new(0),
            rate_lo: AtomicU32::new(0),
            rate_hi: AtomicU32::new(0),
            at_lo: AtomicU32::new(0),
            at_hi: AtomicU32::new(0),
        }
    }

    /// Overwrite the slot. O(1), never blocks.
    #[inline]
    pub fn store(&self, sample: &RateSample) {
        let seq = self.seq.load(Ordering::Relaxed);
        self.seq.store(seq.wrapping_add(1), Ordering::Relaxed);
        fence(Ordering::Release);

        let rate = sample.rate_per_minute.to_bits();
        self.raw_count.store(sample.raw_count, Ordering::Relaxed);
        self.period_ms.store(sample.period_ms, Ordering::Relaxed);
        self.rate_lo.store(rate as u32, Ordering::Relaxed);
        self.rate_hi.store((rate >> 32) as u32, Ordering::Relaxed);
        self.at_lo.store(sample.sampled_at_ms as u32, Ordering::Relaxed);
        self.at_hi.store((sample.sampled_at_ms >> 32) as u32, Ordering::Relaxed);

        self.seq.store(seq.wrapping_add(2), Ordering::Release);
    }

    /// Read a consistent copy.
    ///
    /// `Ok(None)` if nothing was ever stored. `Err(SlotBusy)` after
    /// [`MAX_READ_ATTEMPTS`] collisions with the writer.
    pub fn load(&self) -> Result<Option<Stamped>, SlotBusy> {
        for _ in 0..MAX_READ_ATTEMPTS {
            let before = self.seq.load(Ordering::Acquire);
            if before == 0 {
                return Ok(None);
            }
            if before & 1 == 1 {
                core::hint::spin_loop();
                continue;
            }

            let raw_count = self.raw_count.load(Ordering::Relaxed);
            let period_ms = self.period_ms.load(Ordering::Relaxed);
            let rate_lo = self.rate_lo.load(Ordering::Relaxed);
            let rate_hi = self.rate_hi.load(Ordering::Relaxed);
            let at_lo = self.at_lo.load(Ordering::Relaxed);
            let at_hi = self.at_hi.load(Ordering::Relaxed);

            fence(Ordering::Acquire);
            if self.seq.load(Ordering::Relaxed) != before {
                core::hint::spin_loop();
                continue;
            }

            let sample = RateSample {
                raw_count,
                period_ms,
                rate_per_minute: f64::from_bits(((rate_hi as u64) << 32) | rate_lo as u64),
                sampled_at_ms: ((at_hi as u64) << 32) | at_lo as u64,
            };
            return Ok(Some(Stamped {
                sample,
                generation: before / 2,
            }));
        }

        Err(SlotBusy)
    }

    /// Stores so far.
    pub fn generation(&self) -> u32 {
        self.seq.load(Ordering::Acquire) / 2
    }
}

impl Default for LatestSample {
    fn default() -> Self {
        Self::new()
    }
}

/// What a publish tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Latest sample published. `repeat` if it was already published before.
    Published { generation: u32, rpm: u32, repeat: bool },
    /// Connection just came up; latest rate (or 0) announced.
    Announced { rpm: u32 },
    /// Connected, but no sample produced yet.
    NoSample,
    /// Dropped: channel not connected.
    NotConnected,
    /// Dropped: slot kept changing under the reader.
    Busy,
    /// Dropped: channel refused the message.
    Failed(ChannelError),
}

/// Uplink counters, readable from any context.
pub struct UplinkStats {
    published: AtomicU32,
    republished: AtomicU32,
    announced: AtomicU32,
    dropped_not_connected: AtomicU32,
    dropped_send_failed: AtomicU32,
    dropped_busy: AtomicU32,
}

/// Copy of [`UplinkStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UplinkStatsSnapshot {
    pub published: u32,
    pub republished: u32,
    pub announced: u32,
    pub dropped_not_connected: u32,
    pub dropped_send_failed: u32,
    pub dropped_busy: u32,
}

impl UplinkStats {
    const fn new() -> Self {
        Self {
            published: AtomicU32::new(0),
            republished: AtomicU32::new(0),
            announced: AtomicU32::new(0),
            dropped_not_connected: AtomicU32::new(0),
            dropped_send_failed: AtomicU32::new(0),
            dropped_busy: AtomicU32::new(0),
        }
    }

    #[inline]
    fn bump(counter: &AtomicU32) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Current counter values.
    pub fn snapshot(&self) -> UplinkStatsSnapshot {
        UplinkStatsSnapshot {
            published: self.published.load(Ordering::Relaxed),
            republished: self.republished.load(Ordering::Relaxed),
            announced: self.announced.load(Ordering::Relaxed),
            dropped_not_connected: self.dropped_not_connected.load(Ordering::Relaxed),
            dropped_send_failed: self.dropped_send_failed.load(Ordering::Relaxed),
            dropped_busy: self.dropped_busy.load(Ordering::Relaxed),
        }
    }
}

/// Latest-value telemetry uplink.
///
/// Lives in a `static` on device, shared by the sample tick (through
/// [`UplinkFeed`]) and the publish tick.
///
/// ```ignore
/// static UPLINK: TelemetryUplink<'static> =
///     TelemetryUplink::new("speed/values", &FAULTS, &UPLINK_LOG_STREAM);
///
/// // sample tick: publisher.register(&mut UplinkFeed::new(&UPLINK))
/// // publish tick, every 100 ms:
/// UPLINK.publish_tick(&mut mqtt, now_ms);
/// ```
pub struct TelemetryUplink<'a> {
    topic: &'a str,
    slot: LatestSample,
    last_generation: AtomicU32,
    was_connected: AtomicBool,
    stats: UplinkStats,
    faults: &'a FaultState,
    log: &'a LogStream,
}

impl<'a> TelemetryUplink<'a> {
    /// Create an uplink publishing on `topic`.
    ///
    /// `log` must be the ring of the publish-tick context.
    pub const fn new(topic: &'a str, faults: &'a FaultState, log: &'a LogStream) -> Self {
        Self {
            topic,
            slot: LatestSample::new(),
            last_generation: AtomicU32::new(0),
            was_connected: AtomicBool::new(false),
            stats: UplinkStats::new(),
            faults,
            log,
        }
    }

    /// Store a new latest sample. O(1), never blocks.
    ///
    /// Single writer: only the sample tick calls this.
    #[inline]
    pub fn accept(&self, sample: &RateSample) {
        self.slot.store(sample);
    }

    /// Latest sample, if one exists and could be read.
    pub fn latest(&self) -> Option<RateSample> {
        self.slot.load().ok().flatten().map(|stamped| stamped.sample)
    }

    /// Topic published on.
    pub fn topic(&self) -> &str {
        self.topic
    }

    /// Counter snapshot.
    pub fn stats(&self) -> UplinkStatsSnapshot {
        self.stats.snapshot()
    }

    /// One publish tick.
    ///
    /// Single reader: only the publish tick calls this.
    pub fn publish_tick<C: TelemetryChannel + ?Sized>(
        &self,
        channel: &mut C,
        now_ms: u64,
    ) -> PublishOutcome {
        let connected = channel.is_connected();
        let was_connected = self.was_connected.swap(connected, Ordering::AcqRel);

        if !connected {
            UplinkStats::bump(&self.stats.dropped_not_connected);
            if was_connected {
                self.faults.set(FaultCode::UplinkNotConnected, 0);
                ring_warn!(self.log, now_ms, "{}: channel down, dropping publishes", self.topic);
            }
            return PublishOutcome::NotConnected;
        }

        if !was_connected {
            return self.announce(channel, now_ms);
        }

        let stamped = match self.slot.load() {
            Ok(Some(stamped)) => stamped,
            Ok(None) => return PublishOutcome::NoSample,
            Err(SlotBusy) => {
                UplinkStats::bump(&self.stats.dropped_busy);
                self.faults.set(FaultCode::UplinkBusy, self.slot.generation());
                return PublishOutcome::Busy;
            }
        };

        let rpm = stamped.sample.rpm();
        match self.send(channel, &stamped.sample, now_ms) {
            Ok(()) => {
                let previous = self.last_generation.swap(stamped.generation, Ordering::Relaxed);
                let repeat = previous == stamped.generation;
                UplinkStats::bump(&self.stats.published);
                if repeat {
                    UplinkStats::bump(&self.stats.republished);
                }
                PublishOutcome::Published {
                    generation: stamped.generation,
                    rpm,
                    repeat,
                }
            }
            Err(err) => PublishOutcome::Failed(err),
        }
    }

    /// Publish the latest rate, or 0 before the first sample.
    ///
    /// Called on the not-connected to connected edge.
    pub fn announce<C: TelemetryChannel + ?Sized>(
        &self,
        channel: &mut C,
        now_ms: u64,
    ) -> PublishOutcome {
        let stamped = self.slot.load().ok().flatten();
        let sample = stamped.map_or(RateSample::ZERO, |s| s.sample);

        match self.send(channel, &sample, now_ms) {
            Ok(()) => {
                if let Some(stamped) = stamped {
                    self.last_generation.store(stamped.generation, Ordering::Relaxed);
                }
                UplinkStats::bump(&self.stats.announced);
                ring_info!(self.log, now_ms, "{}: connected, announced {}", self.topic, sample.rpm());
                PublishOutcome::Announced { rpm: sample.rpm() }
            }
            Err(err) => PublishOutcome::Failed(err),
        }
    }

    fn send<C: TelemetryChannel + ?Sized>(
        &self,
        channel: &mut C,
        sample: &RateSample,
        now_ms: u64,
    ) -> Result<(), ChannelError> {
        let payload = sample.payload_text();
        channel
            .publish(self.topic, payload.as_bytes())
            .inspect_err(|err| {
                let counter = match err {
                    ChannelError::NotConnected => &self.stats.dropped_not_connected,
                    ChannelError::SendRejected => &self.stats.dropped_send_failed,
                };
                UplinkStats::bump(counter);
                self.faults.set((*err).into(), sample.rpm());
                ring_warn!(self.log, now_ms, "{}: dropped {}: {}", self.topic, payload.as_str(), err);
            })
    }
}

/// Sink adapter feeding the sample tick into a [`TelemetryUplink`].
pub struct UplinkFeed<'u, 'a> {
    uplink: &'u TelemetryUplink<'a>,
}

impl<'u, 'a> UplinkFeed<'u, 'a> {
    /// Feed samples into `uplink`'s latest slot.
    pub fn new(uplink: &'u TelemetryUplink<'a>) -> Self {
        Self { uplink }
    }
}

impl RateSink for UplinkFeed<'_, '_> {
    fn name(&self) -> &'static str {
        "telemetry"
    }

    #[inline]
    fn accept(&mut self, sample: &RateSample) -> Result<(), SinkError> {
        self.uplink.accept(sample);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_empty_then_stored() {
        let slot = LatestSample::new();
        assert_eq!(slot.load(), Ok(None));
        assert_eq!(slot.generation(), 0);

        let sample = RateSample::new(5, 1000, 1234);
        slot.store(&sample);

        let stamped = slot.load().unwrap().unwrap();
        assert_eq!(stamped.sample, sample);
        assert_eq!(stamped.generation, 1);
    }

    #[test]
    fn test_slot_overwrites() {
        let slot = LatestSample::new();
        slot.store(&RateSample::new(1, 1000, 1000));
        slot.store(&RateSample::new(2, 1000, 2000));

        let stamped = slot.load().unwrap().unwrap();
        assert_eq!(stamped.sample.raw_count, 2);
        assert_eq!(stamped.generation, 2);
    }

    #[test]
    fn test_slot_preserves_wide_fields() {
        let slot = LatestSample::new();
        let sample = RateSample::new(7, 333, (1u64 << 40) + 17);
        slot.store(&sample);

        let read = slot.load().unwrap().unwrap().sample;
        assert_eq!(read.sampled_at_ms, (1u64 << 40) + 17);
        assert_eq!(read.rate_per_minute.to_bits(), sample.rate_per_minute.to_bits());
    }

    #[test]
    fn test_slot_busy_while_write_in_progress() {
        let slot = LatestSample::new();
        slot.store(&RateSample::new(1, 1000, 0));
        // writer parked mid-store
        slot.seq.store(3, Ordering::Release);

        assert_eq!(slot.load(), Err(SlotBusy));
    }

    #[test]
    fn test_channel_error_display() {
        let mut buf = [0u8; 32];
        let len = crate::logging::format_to_buffer(
            &mut buf,
            format_args!("{}", ChannelError::SendRejected),
        );
        assert_eq!(&buf[..len], b"C02: send rejected");
    }
}
