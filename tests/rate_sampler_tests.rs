//! Rate sampler tests

use hall_rpm_gauge::edge::EdgeCounter;
use hall_rpm_gauge::fault::FaultState;
use hall_rpm_gauge::logging::{LogLevel, LogStream};
use hall_rpm_gauge::publisher::Publisher;
use hall_rpm_gauge::sample::RateSample;
use hall_rpm_gauge::sampler::{RateSampler, DEFAULT_SAMPLE_PERIOD_MS};
use hall_rpm_gauge::sink::{RateSink, SinkError};

/// Sink that keeps everything it is given.
struct RecordingSink {
    samples: Vec<RateSample>,
}

impl RecordingSink {
    fn new() -> Self {
        Self { samples: Vec::new() }
    }
}

impl RateSink for RecordingSink {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn accept(&mut self, sample: &RateSample) -> Result<(), SinkError> {
        self.samples.push(*sample);
        Ok(())
    }
}

#[test]
fn test_five_edges_in_one_second_is_300_rpm() {
    let counter = EdgeCounter::new();
    let mut sampler = RateSampler::new(&counter, DEFAULT_SAMPLE_PERIOD_MS, 0);

    for _ in 0..5 {
        counter.increment();
    }
    let sample = sampler.sample(1000);

    assert_eq!(sample.raw_count, 5);
    assert_eq!(sample.period_ms, 1000);
    assert_eq!(sample.rate_per_minute, 300.0);
    assert_eq!(sample.rpm(), 300);
    assert_eq!(sample.label_text().as_str(), "300 RPM");
    assert_eq!(sample.payload_text().as_str(), "300");
}

#[test]
fn test_silent_window_is_zero_sample() {
    let counter = EdgeCounter::new();
    let mut sampler = RateSampler::new(&counter, 1000, 0);

    let sample = sampler.sample(1000);

    assert_eq!(sample.raw_count, 0);
    assert_eq!(sample.rpm(), 0);
    assert_eq!(sample.label_text().as_str(), "0 RPM");
    assert_eq!(sample.payload_text().as_str(), "0");
}

#[test]
fn test_counter_reset_even_without_sinks() {
    let counter = EdgeCounter::new();
    let faults = FaultState::new();
    let log: LogStream = LogStream::new("tick");
    let mut publisher: Publisher = Publisher::new(&faults, &log);
    let mut sampler = RateSampler::new(&counter, 1000, 0);

    counter.increment();
    counter.increment();
    let (sample, report) = sampler.tick(1000, &mut publisher);

    assert_eq!(sample.raw_count, 2);
    assert_eq!(report.delivered, 0);
    assert_eq!(counter.peek(), 0);

    let (sample, _) = sampler.tick(2000, &mut publisher);
    assert_eq!(sample.raw_count, 0);
}

#[test]
fn test_consecutive_windows_are_independent() {
    let counter = EdgeCounter::new();
    let mut sampler = RateSampler::new(&counter, 1000, 0);

    for _ in 0..10 {
        counter.increment();
    }
    assert_eq!(sampler.sample(1000).rpm(), 600);

    counter.increment();
    assert_eq!(sampler.sample(2000).rpm(), 60);

    assert_eq!(sampler.sample(3000).rpm(), 0);
    assert_eq!(sampler.ticks(), 3);
}

#[test]
fn test_edges_before_start_not_counted_in_first_window() {
    let counter = EdgeCounter::new();

    // ISR already live while the rest of the device comes up
    for _ in 0..5 {
        counter.increment();
    }

    let mut sampler = RateSampler::new(&counter, 1000, 500);
    assert_eq!(counter.peek(), 0);

    for _ in 0..5 {
        counter.increment();
    }
    let sample = sampler.sample(1500);

    assert_eq!(sample.raw_count, 5);
    assert_eq!(sample.period_ms, 1000);
    assert_eq!(sample.rpm(), 300);
}

#[test]
fn test_late_tick_uses_measured_period() {
    let counter = EdgeCounter::new();
    let mut sampler = RateSampler::new(&counter, 1000, 0);

    // Tick 200 ms late: 6 edges over 1200 ms is still 300 RPM
    for _ in 0..6 {
        counter.increment();
    }
    let sample = sampler.sample(1200);
    assert_eq!(sample.period_ms, 1200);
    assert_eq!(sample.rpm(), 300);
}

#[test]
fn test_tick_hands_sample_to_every_sink() {
    let counter = EdgeCounter::new();
    let faults = FaultState::new();
    let log: LogStream = LogStream::new("tick");
    let mut first = RecordingSink::new();
    let mut second = RecordingSink::new();

    {
        let mut publisher: Publisher = Publisher::new(&faults, &log);
        publisher.register(&mut first).unwrap();
        publisher.register(&mut second).unwrap();

        let mut sampler = RateSampler::new(&counter, 1000, 0);
        counter.increment();
        let (_, report) = sampler.tick(1000, &mut publisher);
        assert!(report.all_delivered());
        assert_eq!(report.delivered, 2);
    }

    assert_eq!(first.samples.len(), 1);
    assert_eq!(first.samples, second.samples);
    assert_eq!(first.samples[0].rpm(), 60);
}

#[test]
fn test_tick_logged_writes_debug_line() {
    let counter = EdgeCounter::new();
    let faults = FaultState::new();
    let log: LogStream = LogStream::new("tick");
    let mut publisher: Publisher = Publisher::new(&faults, &log);
    let mut sampler = RateSampler::new(&counter, 1000, 0);

    for _ in 0..5 {
        counter.increment();
    }
    let sample = sampler.tick_logged(1000, &mut publisher, &log);
    assert_eq!(sample.rpm(), 300);

    let entry = log.drain().expect("tick line");
    assert_eq!(entry.level, LogLevel::Debug);
    assert_eq!(entry.timestamp_ms, 1000);
    assert!(entry.text().contains("300 RPM"));
}
