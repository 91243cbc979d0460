//! Configuration tests

use hall_rpm_gauge::config::{ConfigError, GaugeConfig, CONFIG, DEFAULT_BROKER_URL};
use hall_rpm_gauge::hal::{EdgePolarity, HallSensorConfig, LcdConfig};

#[test]
fn test_reference_configuration() {
    assert_eq!(CONFIG.sample_period_ms, 1000);
    assert_eq!(CONFIG.publish_period_ms, 100);
    assert_eq!(CONFIG.topic, "speed/values");
    assert_eq!(CONFIG.validate(), Ok(()));
}

#[test]
fn test_default_matches_const() {
    assert_eq!(GaugeConfig::default(), CONFIG);
}

#[test]
fn test_broker_falls_back_to_default() {
    if option_env!("GAUGE_BROKER_URL").is_none() {
        assert_eq!(CONFIG.network.broker_url, DEFAULT_BROKER_URL);
    }
    assert!(!CONFIG.network.client_id.is_empty());
}

#[test]
fn test_zero_periods_rejected() {
    let mut cfg = CONFIG;
    cfg.sample_period_ms = 0;
    assert_eq!(cfg.validate(), Err(ConfigError::ZeroSamplePeriod));

    let mut cfg = CONFIG;
    cfg.publish_period_ms = 0;
    assert_eq!(cfg.validate(), Err(ConfigError::ZeroPublishPeriod));
}

#[test]
fn test_sample_period_bounded_by_counter_width() {
    let max = GaugeConfig::max_sample_period_ms();
    assert!(max >= 1000);

    let mut cfg = CONFIG;
    cfg.sample_period_ms = max;
    assert_eq!(cfg.validate(), Ok(()));

    cfg.sample_period_ms = max + 1;
    assert_eq!(cfg.validate(), Err(ConfigError::SamplePeriodTooLong));
}

#[test]
fn test_empty_strings_rejected() {
    let mut cfg = CONFIG;
    cfg.topic = "";
    assert_eq!(cfg.validate(), Err(ConfigError::EmptyTopic));

    let mut cfg = CONFIG;
    cfg.network.broker_url = "";
    assert_eq!(cfg.validate(), Err(ConfigError::EmptyBrokerUrl));
}

#[test]
fn test_config_error_codes() {
    assert_eq!(ConfigError::ZeroSamplePeriod.code(), "K01");
    assert_eq!(ConfigError::EmptyBrokerUrl.code(), "K05");
    assert_eq!(
        ConfigError::EmptyTopic.to_string(),
        "K04: telemetry topic is empty"
    );
}

#[test]
fn test_board_wiring() {
    let hall = HallSensorConfig::REFERENCE;
    assert_eq!(hall.pin, 13);
    assert_eq!(hall.polarity, EdgePolarity::Falling);
    assert!(!hall.pull_up);
    assert_eq!(hall.pin_mask(), 1 << 13);

    let lcd = LcdConfig::GC9A01_REFERENCE;
    assert_eq!(lcd.center(), (120, 120));
    assert_eq!(lcd.label_channels(), (0x90, 0x27, 0xff));
}
