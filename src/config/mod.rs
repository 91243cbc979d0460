//! Module: config
//!
//! Purpose: Build-time configuration for HallRpmGauge.
//!
//! Architecture:
//! - `CONFIG` is a `const`: nothing here is runtime-reconfigurable
//! - Board wiring and cadences are constants in this module
//! - Broker, client id and Wi-Fi credentials come from the build
//!   environment (`GAUGE_*`, see build.rs) through `option_env!`
//! - `validate()` is called once at start-up before anything is spawned
//!
//! Safety: Safe. Plain data.

use crate::edge::EdgeCounter;
use crate::hal::display::LcdConfig;
use crate::hal::gpio::HallSensorConfig;
use crate::sampler::DEFAULT_SAMPLE_PERIOD_MS;
use crate::uplink::{DEFAULT_PUBLISH_PERIOD_MS, DEFAULT_TOPIC};

/// Highest edge rate the gauge is specified for (edges per second).
///
/// A hall sensor with one magnet on a 60 000 RPM spindle gives 1 kHz;
/// this leaves two orders of magnitude of headroom.
pub const MAX_EDGE_RATE_HZ: u64 = 100_000;

/// Default MQTT broker when `GAUGE_BROKER_URL` is unset.
pub const DEFAULT_BROKER_URL: &str = "mqtt://mqtt.eclipseprojects.io";

/// Default MQTT client id when `GAUGE_MQTT_CLIENT_ID` is unset.
pub const DEFAULT_CLIENT_ID: &str = "hall-rpm-gauge";

const fn env_or(value: Option<&'static str>, default: &'static str) -> &'static str {
    match value {
        Some(v) => v,
        None => default,
    }
}

/// Network settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkConfig {
    pub broker_url: &'static str,
    pub client_id: &'static str,
    pub wifi_ssid: &'static str,
    pub wifi_password: &'static str,
}

/// Complete gauge configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GaugeConfig {
    /// Sample tick period.
    pub sample_period_ms: u32,
    /// Publish tick period.
    pub publish_period_ms: u32,
    /// Telemetry topic.
    pub topic: &'static str,
    pub network: NetworkConfig,
    pub hall: HallSensorConfig,
    pub lcd: LcdConfig,
}

/// Configuration rejected by [`GaugeConfig::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// K01: Sample period is zero
    ZeroSamplePeriod,
    /// K02: Publish period is zero
    ZeroPublishPeriod,
    /// K03: Edge counter could overflow within one sample period
    SamplePeriodTooLong,
    /// K04: Empty telemetry topic
    EmptyTopic,
    /// K05: Empty broker URL
    EmptyBrokerUrl,
}

impl ConfigError {
    /// Get error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ZeroSamplePeriod => "K01",
            Self::ZeroPublishPeriod => "K02",
            Self::SamplePeriodTooLong => "K03",
            Self::EmptyTopic => "K04",
            Self::EmptyBrokerUrl => "K05",
        }
    }

    /// Get error message
    pub fn message(&self) -> &'static str {
        match self {
            Self::ZeroSamplePeriod => "sample period is zero",
            Self::ZeroPublishPeriod => "publish period is zero",
            Self::SamplePeriodTooLong => "sample period overflows edge counter",
            Self::EmptyTopic => "telemetry topic is empty",
            Self::EmptyBrokerUrl => "broker URL is empty",
        }
    }
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

impl GaugeConfig {
    /// Reference configuration plus build-environment overrides.
    pub const fn from_build_env() -> Self {
        Self {
            sample_period_ms: DEFAULT_SAMPLE_PERIOD_MS,
            publish_period_ms: DEFAULT_PUBLISH_PERIOD_MS,
            topic: DEFAULT_TOPIC,
            network: NetworkConfig {
                broker_url: env_or(option_env!("GAUGE_BROKER_URL"), DEFAULT_BROKER_URL),
                client_id: env_or(option_env!("GAUGE_MQTT_CLIENT_ID"), DEFAULT_CLIENT_ID),
                wifi_ssid: env_or(option_env!("GAUGE_WIFI_SSID"), ""),
                wifi_password: env_or(option_env!("GAUGE_WIFI_PASS"), ""),
            },
            hall: HallSensorConfig::REFERENCE,
            lcd: LcdConfig::GC9A01_REFERENCE,
        }
    }

    /// Longest sample period that cannot overflow the edge counter at
    /// [`MAX_EDGE_RATE_HZ`].
    pub const fn max_sample_period_ms() -> u32 {
        let ms = (u32::MAX as u64) * 1000 / MAX_EDGE_RATE_HZ;
        if ms > u32::MAX as u64 {
            u32::MAX
        } else {
            ms as u32
        }
    }

    /// Check the configuration before anything is started.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_period_ms == 0 {
            return Err(ConfigError::ZeroSamplePeriod);
        }
        if self.publish_period_ms == 0 {
            return Err(ConfigError::ZeroPublishPeriod);
        }
        if EdgeCounter::max_sustained_rate_hz(self.sample_period_ms) < MAX_EDGE_RATE_HZ {
            return Err(ConfigError::SamplePeriodTooLong);
        }
        if self.topic.is_empty() {
            return Err(ConfigError::EmptyTopic);
        }
        if self.network.broker_url.is_empty() {
            return Err(ConfigError::EmptyBrokerUrl);
        }
        Ok(())
    }
}

impl Default for GaugeConfig {
    fn default() -> Self {
        Self::from_build_env()
    }
}

/// The configuration the firmware runs with.
pub const CONFIG: GaugeConfig = GaugeConfig::from_build_env();
