//! Desktop simulator for the gauge pipeline.
//!
//! Runs the same sampler, publisher and uplink as the firmware with host
//! stand-ins for the hardware:
//!
//! | Device part   | Stand-in                                              |
//! |---------------|-------------------------------------------------------|
//! | hall ISR      | thread ticking an `EdgeCounter` at a swinging RPM     |
//! | GC9A01 label  | `ConsoleLabel`, logs the text, glitches now and then  |
//! | MQTT client   | `ConsoleChannel`, goes offline for a while each cycle |
//!
//! Run time comes from `GAUGE_SIM_SECONDS` (default 30). Log level from
//! `RUST_LOG` (default `info`; `debug` shows every publish).

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, error, info};

use hall_rpm_gauge::config::CONFIG;
use hall_rpm_gauge::edge::EdgeCounter;
use hall_rpm_gauge::fault::FaultState;
use hall_rpm_gauge::log_drain::LogDrain;
use hall_rpm_gauge::log_globals::{TICK_LOG_STREAM, UPLINK_LOG_STREAM};
use hall_rpm_gauge::publisher::Publisher;
use hall_rpm_gauge::sampler::RateSampler;
use hall_rpm_gauge::sink::{DisplaySink, LabelTarget, SinkError};
use hall_rpm_gauge::uplink::{ChannelError, TelemetryChannel, TelemetryUplink, UplinkFeed};

// ---------------------------------------------------------------------------
// Simulation constants
// ---------------------------------------------------------------------------

const DEFAULT_RUN_SECS: u64 = 30;

/// Centre of the synthetic speed swing.
const BASE_RPM: f64 = 240.0;

/// Swing amplitude. Larger than `BASE_RPM`, so the wheel stalls part of
/// each cycle.
const SWING_RPM: f64 = 300.0;

/// Period of the speed swing, seconds.
const SWING_PERIOD_SECS: f64 = 20.0;

/// Poll interval while the wheel is stalled.
const STALL_POLL: Duration = Duration::from_millis(50);

/// Every n-th label update fails.
const LABEL_GLITCH_EVERY: u32 = 7;

/// Channel cycle: up for `CHANNEL_UP_SECS`, then down for `CHANNEL_DOWN_SECS`.
const CHANNEL_UP_SECS: u64 = 8;
const CHANNEL_DOWN_SECS: u64 = 2;

const LOG_DRAIN_PERIOD: Duration = Duration::from_millis(50);

// ---------------------------------------------------------------------------
// Hardware stand-ins
// ---------------------------------------------------------------------------

/// One magnet, one edge per revolution.
struct SyntheticWheel {
    start: Instant,
}

impl SyntheticWheel {
    fn new(start: Instant) -> Self {
        Self { start }
    }

    fn rpm_at(&self, secs: f64) -> f64 {
        BASE_RPM + SWING_RPM * (secs * core::f64::consts::TAU / SWING_PERIOD_SECS).sin()
    }

    fn run(&self, counter: &EdgeCounter, stop: &AtomicBool) {
        while !stop.load(Ordering::Acquire) {
            let rpm = self.rpm_at(self.start.elapsed().as_secs_f64());
            if rpm < 1.0 {
                thread::sleep(STALL_POLL);
                continue;
            }
            counter.increment();
            thread::sleep(Duration::from_secs_f64(60.0 / rpm));
        }
    }
}

/// LCD label stand-in.
struct ConsoleLabel {
    updates: u32,
}

impl LabelTarget for ConsoleLabel {
    fn set_text(&mut self, text: &str) -> Result<(), SinkError> {
        self.updates += 1;
        if self.updates % LABEL_GLITCH_EVERY == 0 {
            return Err(SinkError::RenderFailed);
        }
        info!("[lcd] {}", text);
        Ok(())
    }
}

/// MQTT stand-in with a scripted outage.
struct ConsoleChannel {
    start: Instant,
}

impl TelemetryChannel for ConsoleChannel {
    fn is_connected(&self) -> bool {
        self.start.elapsed().as_secs() % (CHANNEL_UP_SECS + CHANNEL_DOWN_SECS) < CHANNEL_UP_SECS
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), ChannelError> {
        if !self.is_connected() {
            return Err(ChannelError::NotConnected);
        }
        debug!("[mqtt] {} <- {}", topic, String::from_utf8_lossy(payload));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Loops
// ---------------------------------------------------------------------------

/// Fixed-rate sleeper. Deadlines advance by whole periods, so a late
/// wake-up does not shift later ones.
struct Pacer {
    period: Duration,
    next: Instant,
}

impl Pacer {
    fn new(period: Duration) -> Self {
        Self {
            period,
            next: Instant::now() + period,
        }
    }

    fn wait(&mut self) {
        let now = Instant::now();
        if self.next > now {
            thread::sleep(self.next - now);
        }
        self.next += self.period;
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

fn sampler_loop(
    start: Instant,
    edges: &EdgeCounter,
    faults: &FaultState,
    uplink: &TelemetryUplink<'_>,
    stop: &AtomicBool,
) {
    let mut display = DisplaySink::new(ConsoleLabel { updates: 0 });
    if let Err(err) = display.show_initial() {
        error!("initial label: {}", err);
    }
    let mut feed = UplinkFeed::new(uplink);

    let mut publisher: Publisher = Publisher::new(faults, &TICK_LOG_STREAM);
    let registered = publisher
        .register(&mut display)
        .and_then(|_| publisher.register(&mut feed));
    if let Err(err) = registered {
        error!("{}", err);
    }

    let mut sampler = RateSampler::new(edges, CONFIG.sample_period_ms, elapsed_ms(start));
    let mut pacer = Pacer::new(Duration::from_millis(CONFIG.sample_period_ms as u64));
    while !stop.load(Ordering::Acquire) {
        pacer.wait();
        sampler.tick_logged(elapsed_ms(start), &mut publisher, &TICK_LOG_STREAM);
    }
}

fn uplink_loop(start: Instant, uplink: &TelemetryUplink<'_>, stop: &AtomicBool) {
    let mut channel = ConsoleChannel { start };
    let mut pacer = Pacer::new(Duration::from_millis(CONFIG.publish_period_ms as u64));
    while !stop.load(Ordering::Acquire) {
        pacer.wait();
        uplink.publish_tick(&mut channel, elapsed_ms(start));
    }
}

/// Run the simulation for the configured time, then print a summary.
pub fn run() {
    if let Err(err) = CONFIG.validate() {
        error!("invalid configuration: {}", err);
        return;
    }

    let run_secs = std::env::var("GAUGE_SIM_SECONDS")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(DEFAULT_RUN_SECS);
    info!("{} simulator, running {} s", env!("VERSION_STRING"), run_secs);

    let start = Instant::now();
    let edges = EdgeCounter::new();
    let faults = FaultState::new();
    let uplink = TelemetryUplink::new(CONFIG.topic, &faults, &UPLINK_LOG_STREAM);
    let stop = AtomicBool::new(false);
    let mut drain = LogDrain::new();

    thread::scope(|s| {
        s.spawn(|| SyntheticWheel::new(start).run(&edges, &stop));
        s.spawn(|| sampler_loop(start, &edges, &faults, &uplink, &stop));
        s.spawn(|| uplink_loop(start, &uplink, &stop));

        let deadline = start + Duration::from_secs(run_secs);
        let mut pacer = Pacer::new(LOG_DRAIN_PERIOD);
        while Instant::now() < deadline {
            pacer.wait();
            drain.drain_streams(&[&TICK_LOG_STREAM, &UPLINK_LOG_STREAM], elapsed_ms(start));
        }
        stop.store(true, Ordering::Release);
    });
    drain.drain_streams(&[&TICK_LOG_STREAM, &UPLINK_LOG_STREAM], elapsed_ms(start));

    let stats = uplink.stats();
    let fault = faults.snapshot();
    info!(
        "done: published={} (repeat {}) announced={} dropped offline={} rejected={} busy={}",
        stats.published,
        stats.republished,
        stats.announced,
        stats.dropped_not_connected,
        stats.dropped_send_failed,
        stats.dropped_busy
    );
    info!("faults recorded: {} (last {:?})", fault.count, fault.code);
}
