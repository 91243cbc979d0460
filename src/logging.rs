//! Non-blocking logging for the tick contexts.
//!
//! # Architecture
//!
//! ```text
//! Sample tick / publish tick      LogStream            Drain task
//! ──────────────────────────      ─────────            ──────────
//!
//! ring_warn!() ─────────────────▶ [E0][E1][E2] ──────▶ log::warn!()
//! bounded, no alloc               SPSC ring            may block
//! ```
//!
//! # Rules
//!
//! - The ISR never logs, not even through a ring.
//! - Tick contexts never call the `log` facade directly: the backing
//!   logger may block on a UART.
//! - One ring per producing context (see `log_globals`).
//! - A full ring drops the message and counts the drop.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicU32, Ordering};

/// Maximum message length.
pub const MAX_MSG_LEN: usize = 96;

/// Default ring size (entries).
pub const LOG_BUFFER_SIZE: usize = 64;

/// Log level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl LogLevel {
    /// Convert to string for output.
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
        }
    }

    /// Matching `log` facade level.
    pub fn to_log(self) -> log::Level {
        match self {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Trace => log::Level::Trace,
        }
    }
}

/// A single log entry.
#[derive(Clone, Copy)]
pub struct LogEntry {
    /// Monotonic timestamp in milliseconds.
    pub timestamp_ms: u64,
    pub level: LogLevel,
    /// Message length.
    pub len: u8,
    /// Message bytes, `len` of them valid.
    pub msg: [u8; MAX_MSG_LEN],
}

impl LogEntry {
    /// Empty entry used to fill the ring.
    pub const EMPTY: Self = Self {
        timestamp_ms: 0,
        level: LogLevel::Info,
        len: 0,
        msg: [0; MAX_MSG_LEN],
    };

    /// Message as text.
    pub fn text(&self) -> &str {
        core::str::from_utf8(&self.msg[..self.len as usize]).unwrap_or("<invalid utf8>")
    }
}

impl Default for LogEntry {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Lock-free single-producer single-consumer log ring.
pub struct LogStream<const N: usize = LOG_BUFFER_SIZE> {
    name: &'static str,
    entries: [UnsafeCell<LogEntry>; N],
    write_idx: AtomicU32,
    read_idx: AtomicU32,
    dropped: AtomicU32,
}

// SAFETY: One producer writes slot `write & MASK` only while it is outside
// `[read, write)`; one consumer reads slot `read & MASK` only while it is
// inside. The Release/Acquire pairs on the indices hand each slot over.
unsafe impl<const N: usize> Sync for LogStream<N> {}
unsafe impl<const N: usize> Send for LogStream<N> {}

impl<const N: usize> LogStream<N> {
    const MASK: usize = N - 1;

    /// Create a new empty log stream.
    pub const fn new(name: &'static str) -> Self {
        assert!(N.is_power_of_two(), "Log buffer size must be power of 2");

        Self {
            name,
            entries: [const { UnsafeCell::new(LogEntry::EMPTY) }; N],
            write_idx: AtomicU32::new(0),
            read_idx: AtomicU32::new(0),
            dropped: AtomicU32::new(0),
        }
    }

    /// Name of the producing context.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Push an entry. Never blocks.
    ///
    /// Returns `false` (and counts a drop) if the ring is full.
    #[inline]
    pub fn push(&self, timestamp_ms: u64, level: LogLevel, msg: &[u8]) -> bool {
        let write = self.write_idx.load(Ordering::Relaxed);
        let read = self.read_idx.load(Ordering::Acquire);

        if write.wrapping_sub(read) >= N as u32 {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        let len = msg.len().min(MAX_MSG_LEN);

        // SAFETY: single producer, slot is not visible to the consumer
        // until write_idx is published below
        unsafe {
            let entry = &mut *self.entries[(write as usize) & Self::MASK].get();
            entry.timestamp_ms = timestamp_ms;
            entry.level = level;
            entry.len = len as u8;
            entry.msg[..len].copy_from_slice(&msg[..len]);
        }

        self.write_idx.store(write.wrapping_add(1), Ordering::Release);
        true
    }

    /// Take the oldest entry, if any.
    #[inline]
    pub fn drain(&self) -> Option<LogEntry> {
        let read = self.read_idx.load(Ordering::Relaxed);
        let write = self.write_idx.load(Ordering::Acquire);

        if read == write {
            return None;
        }

        // SAFETY: single consumer, producer does not touch this slot
        // until read_idx moves past it
        let entry = unsafe { *self.entries[(read as usize) & Self::MASK].get() };

        self.read_idx.store(read.wrapping_add(1), Ordering::Release);
        Some(entry)
    }

    /// Get count of dropped messages.
    #[inline]
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Read and reset the dropped counter in one step.
    #[inline]
    pub fn take_dropped(&self) -> u32 {
        self.dropped.swap(0, Ordering::Relaxed)
    }

    /// Number of entries waiting to be drained.
    #[inline]
    pub fn pending(&self) -> u32 {
        let read = self.read_idx.load(Ordering::Relaxed);
        let write = self.write_idx.load(Ordering::Acquire);
        write.wrapping_sub(read)
    }
}

/// Format into a byte buffer, truncating at its end.
///
/// Returns the number of bytes written.
#[inline]
pub fn format_to_buffer(buf: &mut [u8], args: core::fmt::Arguments<'_>) -> usize {
    use core::fmt::Write;

    struct BufWriter<'a> {
        buf: &'a mut [u8],
        pos: usize,
        truncated: bool,
    }

    impl Write for BufWriter<'_> {
        fn write_str(&mut self, s: &str) -> core::fmt::Result {
            if self.truncated {
                return Ok(());
            }
            let room = self.buf.len() - self.pos;
            let mut to_write = s.len().min(room);
            // Never split a UTF-8 sequence
            while !s.is_char_boundary(to_write) {
                to_write -= 1;
            }
            self.buf[self.pos..self.pos + to_write].copy_from_slice(&s.as_bytes()[..to_write]);
            self.pos += to_write;
            self.truncated = to_write < s.len();
            Ok(())
        }
    }

    let mut writer = BufWriter {
        buf,
        pos: 0,
        truncated: false,
    };
    let _ = core::fmt::write(&mut writer, args);
    writer.pos
}

/// Log into a [`LogStream`] without blocking.
///
/// ```ignore
/// ring_log!(LogLevel::Warn, TICK_LOG_STREAM, now_ms, "sink {} failed: {}", name, err);
/// ```
#[macro_export]
macro_rules! ring_log {
    ($level:expr, $stream:expr, $timestamp:expr, $($arg:tt)*) => {{
        let mut buf = [0u8; $crate::logging::MAX_MSG_LEN];
        let len = $crate::logging::format_to_buffer(&mut buf, format_args!($($arg)*));
        $stream.push($timestamp, $level, &buf[..len]);
    }};
}

#[macro_export]
macro_rules! ring_info {
    ($stream:expr, $timestamp:expr, $($arg:tt)*) => {
        $crate::ring_log!($crate::logging::LogLevel::Info, $stream, $timestamp, $($arg)*)
    };
}

#[macro_export]
macro_rules! ring_warn {
    ($stream:expr, $timestamp:expr, $($arg:tt)*) => {
        $crate::ring_log!($crate::logging::LogLevel::Warn, $stream, $timestamp, $($arg)*)
    };
}

#[macro_export]
macro_rules! ring_error {
    ($stream:expr, $timestamp:expr, $($arg:tt)*) => {
        $crate::ring_log!($crate::logging::LogLevel::Error, $stream, $timestamp, $($arg)*)
    };
}

#[macro_export]
macro_rules! ring_debug {
    ($stream:expr, $timestamp:expr, $($arg:tt)*) => {
        $crate::ring_log!($crate::logging::LogLevel::Debug, $stream, $timestamp, $($arg)*)
    };
}

#[macro_export]
macro_rules! ring_trace {
    ($stream:expr, $timestamp:expr, $($arg:tt)*) => {
        $crate::ring_log!($crate::logging::LogLevel::Trace, $stream, $timestamp, $($arg)*)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_stream_basic() {
        let stream = LogStream::<16>::new("test");

        assert!(stream.push(1000, LogLevel::Info, b"test message"));
        assert_eq!(stream.pending(), 1);

        let entry = stream.drain().unwrap();
        assert_eq!(entry.timestamp_ms, 1000);
        assert_eq!(entry.level, LogLevel::Info);
        assert_eq!(entry.text(), "test message");

        assert_eq!(stream.pending(), 0);
        assert!(stream.drain().is_none());
    }

    #[test]
    fn test_log_stream_full_drops() {
        let stream = LogStream::<4>::new("test");

        for i in 0..4 {
            assert!(stream.push(i, LogLevel::Info, b"x"));
        }
        assert!(!stream.push(5, LogLevel::Info, b"y"));
        assert_eq!(stream.dropped(), 1);
        assert_eq!(stream.pending(), 4);

        // Drain one, room again
        assert_eq!(stream.drain().unwrap().timestamp_ms, 0);
        assert!(stream.push(6, LogLevel::Info, b"z"));

        assert_eq!(stream.take_dropped(), 1);
        assert_eq!(stream.dropped(), 0);
    }

    #[test]
    fn test_long_message_truncated() {
        let stream = LogStream::<4>::new("test");
        let long = [b'a'; MAX_MSG_LEN + 20];

        assert!(stream.push(0, LogLevel::Warn, &long));
        assert_eq!(stream.drain().unwrap().len as usize, MAX_MSG_LEN);
    }

    #[test]
    fn test_format_to_buffer() {
        let mut buf = [0u8; 32];
        let len = format_to_buffer(&mut buf, format_args!("{} RPM", 300));
        assert_eq!(&buf[..len], b"300 RPM");

        let mut small = [0u8; 3];
        let len = format_to_buffer(&mut small, format_args!("{} RPM", 300));
        assert_eq!(&small[..len], b"300");
    }

    #[test]
    fn test_truncation_keeps_utf8_intact() {
        let stream = LogStream::<4>::new("test");
        let pad = "a".repeat(MAX_MSG_LEN - 1);
        crate::ring_info!(stream, 0, "{}é tail", pad);

        let entry = stream.drain().unwrap();
        assert_eq!(entry.len as usize, MAX_MSG_LEN - 1);
        assert_eq!(entry.text(), pad.as_str());
    }

    #[test]
    fn test_format_stops_after_first_cut() {
        let mut buf = [0u8; 4];
        let len = format_to_buffer(&mut buf, format_args!("{}{}", "abcé", "x"));
        assert_eq!(&buf[..len], b"abc");
    }

    #[test]
    fn test_take_dropped_reads_and_resets() {
        let stream = LogStream::<4>::new("test");
        for i in 0..7 {
            stream.push(i, LogLevel::Info, b"x");
        }

        assert_eq!(stream.take_dropped(), 3);
        assert_eq!(stream.take_dropped(), 0);

        stream.push(8, LogLevel::Info, b"y");
        assert_eq!(stream.take_dropped(), 1);
    }

    #[test]
    fn test_ring_macro() {
        let stream = LogStream::<4>::new("test");
        crate::ring_warn!(stream, 42, "sink {} failed", "display");

        let entry = stream.drain().unwrap();
        assert_eq!(entry.level, LogLevel::Warn);
        assert_eq!(entry.text(), "sink display failed");
    }

    #[test]
    fn test_spsc_producer_consumer_threads() {
        use std::sync::Arc;
        use std::thread;

        let stream = Arc::new(LogStream::<16>::new("test"));
        let producer = {
            let stream = Arc::clone(&stream);
            thread::spawn(move || {
                for i in 0..500u64 {
                    while !stream.push(i, LogLevel::Info, b"m") {
                        thread::yield_now();
                    }
                }
            })
        };

        let mut expected = 0u64;
        while expected < 500 {
            if let Some(entry) = stream.drain() {
                assert_eq!(entry.timestamp_ms, expected, "entries arrive in order");
                expected += 1;
            } else {
                thread::yield_now();
            }
        }
        producer.join().unwrap();
    }
}
