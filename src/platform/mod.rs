//! ESP-IDF firmware bring-up.
//!
//! Task layout:
//!
//! | Task      | Wakes every        | Does                                        |
//! |-----------|--------------------|---------------------------------------------|
//! | hall ISR  | sensor edge        | `EDGES.increment()`                         |
//! | `sampler` | sample period      | drain, sample, fan out to LCD + uplink slot |
//! | `uplink`  | publish period     | `UPLINK.publish_tick()` on the MQTT channel |
//! | main      | `LOG_DRAIN_PERIOD` | log rings to `EspLogger`, periodic stats    |
//!
//! The sampler and uplink tasks only write to the lock-free log rings; the
//! main task is the only one that blocks on the UART.

mod hall;
mod lcd;
mod mqtt;
mod ticker;
mod wifi;

use core::fmt;
use core::time::Duration;
use std::thread;

use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::hal::spi::SPI2;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::sys::{self, EspError};
use esp_idf_svc::timer::EspTaskTimerService;
use log::{error, info, warn};

use hall_rpm_gauge::config::{ConfigError, CONFIG};
use hall_rpm_gauge::edge::EdgeCounter;
use hall_rpm_gauge::fault::FaultState;
use hall_rpm_gauge::log_drain::LogDrain;
use hall_rpm_gauge::log_globals::{TICK_LOG_STREAM, UPLINK_LOG_STREAM};
use hall_rpm_gauge::publisher::Publisher;
use hall_rpm_gauge::sampler::RateSampler;
use hall_rpm_gauge::sink::{DisplaySink, RateSink};
use hall_rpm_gauge::uplink::{TelemetryUplink, UplinkFeed};

use self::ticker::Ticker;

/// How often the log rings are drained.
const LOG_DRAIN_PERIOD: Duration = Duration::from_millis(50);

/// Drain passes between two stats lines (10 s).
const STATS_EVERY: u32 = 200;

const TASK_STACK_SIZE: usize = 8 * 1024;

static EDGES: EdgeCounter = EdgeCounter::new();
static FAULTS: FaultState = FaultState::new();
static UPLINK: TelemetryUplink<'static> =
    TelemetryUplink::new(CONFIG.topic, &FAULTS, &UPLINK_LOG_STREAM);

/// Start-up failure.
#[derive(Debug)]
pub enum PlatformError {
    Esp(EspError),
    Config(ConfigError),
    Wifi(&'static str),
    Display,
    Spawn,
}

impl fmt::Display for PlatformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Esp(err) => write!(f, "ESP-IDF: {}", err),
            Self::Config(err) => write!(f, "config {}", err),
            Self::Wifi(msg) => write!(f, "Wi-Fi: {}", msg),
            Self::Display => f.write_str("LCD init failed"),
            Self::Spawn => f.write_str("task spawn failed"),
        }
    }
}

impl From<EspError> for PlatformError {
    fn from(err: EspError) -> Self {
        Self::Esp(err)
    }
}

impl From<ConfigError> for PlatformError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

impl From<std::io::Error> for PlatformError {
    fn from(_: std::io::Error) -> Self {
        Self::Spawn
    }
}

/// Milliseconds since boot.
fn now_ms() -> u64 {
    // SAFETY: reads the monotonic ESP timer, no preconditions
    let us = unsafe { sys::esp_timer_get_time() };
    us as u64 / 1000
}

/// Bring everything up, then drain logs forever.
///
/// Returns only if start-up fails.
pub fn run() -> Result<(), PlatformError> {
    CONFIG.validate()?;
    info!("{} starting", env!("VERSION_STRING"));

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;
    let timers = EspTaskTimerService::new()?;

    hall::install(&EDGES, &CONFIG.hall)?;

    let sampler_timers = timers.clone();
    let spi = peripherals.spi2;
    thread::Builder::new()
        .name("sampler".into())
        .stack_size(TASK_STACK_SIZE)
        .spawn(move || {
            if let Err(err) = sampler_task(spi, &sampler_timers) {
                error!("sampler task stopped: {}", err);
            }
        })?;

    let _wifi = wifi::connect(peripherals.modem, sysloop, nvs, &CONFIG.network)?;

    let uplink_timers = timers.clone();
    thread::Builder::new()
        .name("uplink".into())
        .stack_size(TASK_STACK_SIZE)
        .spawn(move || {
            if let Err(err) = uplink_task(&uplink_timers) {
                error!("uplink task stopped: {}", err);
            }
        })?;

    let ticker = Ticker::every(&timers, LOG_DRAIN_PERIOD)?;
    let mut drain = LogDrain::new();
    let mut passes: u32 = 0;

    loop {
        ticker.wait();
        drain.drain_streams(&[&TICK_LOG_STREAM, &UPLINK_LOG_STREAM], now_ms());

        passes = passes.wrapping_add(1);
        if passes % STATS_EVERY == 0 {
            log_stats();
        }
    }
}

fn log_stats() {
    let stats = UPLINK.stats();
    info!(
        "uplink: published={} (repeat {}) announced={} dropped: offline={} rejected={} busy={}",
        stats.published,
        stats.republished,
        stats.announced,
        stats.dropped_not_connected,
        stats.dropped_send_failed,
        stats.dropped_busy
    );

    let fault = FAULTS.snapshot();
    if fault.active {
        warn!("last fault {:?} (data {}), {} total", fault.code, fault.data, fault.count);
        FAULTS.clear();
    }
}

/// Sample tick: LCD and uplink slot. Runs without the LCD if it fails.
fn sampler_task(spi: SPI2, timers: &EspTaskTimerService) -> Result<(), PlatformError> {
    let mut display = match lcd::init(spi, &CONFIG.lcd) {
        Ok(label) => {
            let mut display = DisplaySink::new(label);
            if let Err(err) = display.show_initial() {
                warn!("LCD initial text: {}", err);
            }
            Some(display)
        }
        Err(err) => {
            error!("{}, continuing without display", err);
            None
        }
    };
    let mut feed = UplinkFeed::new(&UPLINK);

    let mut publisher: Publisher = Publisher::new(&FAULTS, &TICK_LOG_STREAM);
    if let Some(display) = display.as_mut() {
        register(&mut publisher, display);
    }
    register(&mut publisher, &mut feed);

    let period = Duration::from_millis(CONFIG.sample_period_ms as u64);
    let ticker = Ticker::every(timers, period)?;
    let mut sampler = RateSampler::new(&EDGES, CONFIG.sample_period_ms, now_ms());

    info!("sampler running every {} ms", CONFIG.sample_period_ms);
    loop {
        ticker.wait();
        sampler.tick_logged(now_ms(), &mut publisher, &TICK_LOG_STREAM);
    }
}

fn register<'a>(publisher: &mut Publisher<'a>, sink: &'a mut dyn RateSink) {
    let name = sink.name();
    match publisher.register(sink) {
        Ok(id) => info!("sink '{}' registered in slot {}", name, id.index()),
        Err(err) => error!("sink '{}' not registered: {}", name, err),
    }
}

/// Publish tick: latest value to MQTT.
fn uplink_task(timers: &EspTaskTimerService) -> Result<(), PlatformError> {
    let mut channel = mqtt::MqttChannel::connect(&CONFIG.network)?;

    let period = Duration::from_millis(CONFIG.publish_period_ms as u64);
    let ticker = Ticker::every(timers, period)?;

    info!(
        "uplink publishing on '{}' every {} ms",
        UPLINK.topic(),
        CONFIG.publish_period_ms
    );
    loop {
        ticker.wait();
        UPLINK.publish_tick(&mut channel, now_ms());
    }
}
