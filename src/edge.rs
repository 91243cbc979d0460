//! Interrupt-fed edge counter.
//!
//! The only datum shared between interrupt context and task context.
//!
//! # Contexts
//!
//! ```text
//! GPIO ISR                EdgeCounter             Sample tick
//! ────────                ───────────             ───────────
//!
//! increment() ──────────▶ [AtomicU32] ──────────▶ drain_and_reset()
//! fetch_add(1)             no lock                swap(0)
//! ```
//!
//! # Rules
//!
//! - `increment()` is the ISR body: one atomic RMW, nothing else.
//!   No logging, no allocation, no sink dispatch.
//! - `drain_and_reset()` is called from exactly one task context.
//! - Every edge lands in exactly one drain.
//!
//! # Overflow budget
//!
//! The counter is a `u32`. Between two drains at most `u32::MAX` edges can
//! be held, so the maximum sustained edge rate is
//! `u32::MAX / period_s`: about 4.29 GHz at the 1000 ms reference period,
//! orders of magnitude above anything a hall sensor on a rotating part can
//! produce. See [`EdgeCounter::max_sustained_rate_hz`].

use core::sync::atomic::{AtomicU32, Ordering};

/// Edge counter shared between the hall-sensor ISR and the sampler.
///
/// # Memory Ordering
///
/// - ISR uses `Relaxed` for `fetch_add()`: the count is the only payload,
///   there is nothing else to publish.
/// - Sampler uses `AcqRel` for `swap(0)`: the read and the reset are a
///   single indivisible step, so an increment racing the drain is either
///   before the swap (counted now) or after it (counted next time).
pub struct EdgeCounter {
    edges: AtomicU32,
}

impl EdgeCounter {
    /// Create a counter at zero.
    pub const fn new() -> Self {
        Self {
            edges: AtomicU32::new(0),
        }
    }

    /// Count one edge.
    ///
    /// ISR-safe: bounded time, lock-free, never allocates.
    #[inline(always)]
    pub fn increment(&self) {
        self.edges.fetch_add(1, Ordering::Relaxed);
    }

    /// Take the edges accumulated since the previous drain and reset to zero.
    #[inline]
    pub fn drain_and_reset(&self) -> u32 {
        self.edges.swap(0, Ordering::AcqRel)
    }

    /// Current count without resetting (diagnostics only).
    #[inline]
    pub fn peek(&self) -> u32 {
        self.edges.load(Ordering::Relaxed)
    }

    /// Highest sustained edge rate (edges per second) that cannot overflow
    /// the counter when drained every `period_ms`.
    ///
    /// Returns `u64::MAX` for a zero period.
    pub const fn max_sustained_rate_hz(period_ms: u32) -> u64 {
        if period_ms == 0 {
            return u64::MAX;
        }
        (u32::MAX as u64) * 1000 / period_ms as u64
    }
}

impl Default for EdgeCounter {
    fn default() -> Self {
        Self::new()
    }
}
