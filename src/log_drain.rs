//! Log ring drain.
//!
//! Moves entries out of the tick-context [`LogStream`]s into the `log`
//! facade (`EspLogger` on device, `env_logger` in the simulator). Runs in
//! a background context where blocking on the logger is fine.
//!
//! ```text
//! TICK_LOG_STREAM ───┐
//!                    ├──▶ drain_streams() ──▶ log::log!(level, "[ts] LEVEL tick: ...")
//! UPLINK_LOG_STREAM ─┘
//! ```

use core::fmt::Write;

use heapless::String;

use crate::logging::{LogEntry, LogStream};

/// How often dropped-message counts are reported.
pub const DROP_REPORT_INTERVAL_MS: u64 = 10_000;

/// Formatted line capacity.
pub const LINE_CAPACITY: usize = 128;

/// Format an entry as `[timestamp_ms] LEVEL origin: message`.
pub fn format_log_entry(origin: &str, entry: &LogEntry) -> String<LINE_CAPACITY> {
    let mut line = String::new();
    // Truncation on a full line is acceptable
    let _ = write!(
        line,
        "[{:10}] {} {}: {}",
        entry.timestamp_ms,
        entry.level.as_str(),
        origin,
        entry.text()
    );
    line
}

/// Drain state kept by the background task.
pub struct LogDrain {
    last_drop_report_ms: u64,
}

impl LogDrain {
    /// Create a drain; the first drop report is due one interval after boot.
    pub const fn new() -> Self {
        Self {
            last_drop_report_ms: 0,
        }
    }

    /// Forward every pending entry of `streams` to the `log` facade.
    ///
    /// Streams are drained in the order given. Every
    /// [`DROP_REPORT_INTERVAL_MS`] any dropped counts are reported and reset.
    /// Returns the number of entries forwarded.
    pub fn drain_streams<const N: usize>(
        &mut self,
        streams: &[&LogStream<N>],
        now_ms: u64,
    ) -> usize {
        let mut forwarded = 0;

        for stream in streams {
            while let Some(entry) = stream.drain() {
                let line = format_log_entry(stream.name(), &entry);
                log::log!(entry.level.to_log(), "{}", line.as_str());
                forwarded += 1;
            }
        }

        if now_ms.saturating_sub(self.last_drop_report_ms) >= DROP_REPORT_INTERVAL_MS {
            for stream in streams {
                let dropped = stream.take_dropped();
                if dropped > 0 {
                    log::warn!("log ring '{}' dropped {} messages", stream.name(), dropped);
                }
            }
            self.last_drop_report_ms = now_ms;
        }

        forwarded
    }
}

impl Default for LogDrain {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{LogLevel, MAX_MSG_LEN};

    fn entry(timestamp_ms: u64, level: LogLevel, text: &[u8]) -> LogEntry {
        let mut msg = [0u8; MAX_MSG_LEN];
        msg[..text.len()].copy_from_slice(text);
        LogEntry {
            timestamp_ms,
            level,
            len: text.len() as u8,
            msg,
        }
    }

    #[test]
    fn test_format_log_entry() {
        let line = format_log_entry("tick", &entry(1234567, LogLevel::Warn, b"sink 0 failed"));

        assert!(line.contains("1234567"));
        assert!(line.contains("WARN"));
        assert!(line.contains("tick"));
        assert!(line.ends_with("sink 0 failed"));
    }

    #[test]
    fn test_format_respects_len() {
        let mut e = entry(999, LogLevel::Error, b"TEST12345X");
        e.len = 5;

        let line = format_log_entry("uplink", &e);
        assert!(line.contains("TEST1"));
        assert!(!line.contains('X'));
    }

    #[test]
    fn test_drain_empties_all_streams() {
        let tick = LogStream::<4>::new("tick");
        let uplink = LogStream::<4>::new("uplink");
        let mut drain = LogDrain::new();

        for i in 0..6 {
            tick.push(i, LogLevel::Info, b"t");
        }
        uplink.push(0, LogLevel::Warn, b"u");
        assert_eq!(tick.dropped(), 2);

        assert_eq!(drain.drain_streams(&[&tick, &uplink], 0), 5);
        assert_eq!(tick.pending(), 0);
        assert_eq!(uplink.pending(), 0);
        assert_eq!(drain.drain_streams(&[&tick, &uplink], 1), 0);
    }

    #[test]
    fn test_drop_report_resets_counter() {
        let stream: LogStream = LogStream::new("tick");
        let mut drain = LogDrain::new();

        for i in 0..70 {
            stream.push(i, LogLevel::Info, b"x");
        }
        assert!(stream.dropped() > 0);

        // Before the interval: drained but drops kept
        drain.drain_streams(&[&stream], 1);
        assert!(stream.dropped() > 0);

        drain.drain_streams(&[&stream], DROP_REPORT_INTERVAL_MS);
        assert_eq!(stream.dropped(), 0);
    }
}
