//! Fault bookkeeping for the sample and publish paths.
//!
//! Nothing in the pipeline is fatal. A failing sink or a dropped publish
//! is recorded here and the pipeline carries on; the record exists so the
//! device can report *that* something degraded, and what.
//!
//! Written from both tick contexts, never from the ISR.

use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

use crate::sink::SinkError;
use crate::uplink::ChannelError;

/// Fault codes for degraded (never stopped) operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum FaultCode {
    /// No fault.
    None = 0,

    /// A sink failed to render the sample (display).
    SinkRender = 1,

    /// A sink had no room for the sample.
    SinkFull = 2,

    /// A sink's backing collaborator is gone.
    SinkUnavailable = 3,

    /// Publish tick skipped: channel not connected.
    UplinkNotConnected = 4,

    /// Publish tick skipped: channel rejected the message.
    UplinkSendFailed = 5,

    /// Publish tick skipped: latest slot kept changing under the reader.
    UplinkBusy = 6,
}

impl FaultCode {
    /// Convert from raw u8 value.
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => FaultCode::SinkRender,
            2 => FaultCode::SinkFull,
            3 => FaultCode::SinkUnavailable,
            4 => FaultCode::UplinkNotConnected,
            5 => FaultCode::UplinkSendFailed,
            6 => FaultCode::UplinkBusy,
            _ => FaultCode::None,
        }
    }
}

impl From<SinkError> for FaultCode {
    fn from(err: SinkError) -> Self {
        match err {
            SinkError::RenderFailed => FaultCode::SinkRender,
            SinkError::Full => FaultCode::SinkFull,
            SinkError::Unavailable => FaultCode::SinkUnavailable,
        }
    }
}

impl From<ChannelError> for FaultCode {
    fn from(err: ChannelError) -> Self {
        match err {
            ChannelError::NotConnected => FaultCode::UplinkNotConnected,
            ChannelError::SendRejected => FaultCode::UplinkSendFailed,
        }
    }
}

/// Lock-free fault record.
///
/// ```ignore
/// static FAULTS: FaultState = FaultState::new();
///
/// // sample tick, a sink returned Err
/// FAULTS.set(FaultCode::SinkRender, sink_index);
///
/// // diagnostics
/// let snap = FAULTS.snapshot();
/// ```
pub struct FaultState {
    /// True while a fault is unacknowledged.
    active: AtomicBool,

    /// Most recent fault code.
    code: AtomicU8,

    /// Datum attached to the most recent fault (sink index, generation...).
    data: AtomicU32,

    /// Total faults since boot (never cleared).
    count: AtomicU32,
}

impl FaultState {
    /// Create new fault state (no fault).
    pub const fn new() -> Self {
        Self {
            active: AtomicBool::new(false),
            code: AtomicU8::new(0),
            data: AtomicU32::new(0),
            count: AtomicU32::new(0),
        }
    }

    /// Record a fault. Bounded time, never blocks.
    #[inline]
    pub fn set(&self, code: FaultCode, data: u32) {
        self.code.store(code as u8, Ordering::Release);
        self.data.store(data, Ordering::Release);
        self.count.fetch_add(1, Ordering::Relaxed);
        self.active.store(true, Ordering::Release);
    }

    /// Check if fault is currently active.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Most recent fault code (meaningful only if `is_active()`).
    #[inline]
    pub fn code(&self) -> FaultCode {
        FaultCode::from_u8(self.code.load(Ordering::Acquire))
    }

    /// Datum of the most recent fault.
    #[inline]
    pub fn data(&self) -> u32 {
        self.data.load(Ordering::Acquire)
    }

    /// Total fault count since boot.
    #[inline]
    pub fn count(&self) -> u32 {
        self.count.load(Ordering::Relaxed)
    }

    /// Acknowledge the fault. The count is kept.
    #[inline]
    pub fn clear(&self) {
        self.active.store(false, Ordering::Release);
    }

    /// Get a snapshot of the current fault state.
    #[inline]
    pub fn snapshot(&self) -> FaultSnapshot {
        FaultSnapshot {
            active: self.is_active(),
            code: self.code(),
            data: self.data(),
            count: self.count(),
        }
    }
}

impl Default for FaultState {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of fault state at a point in time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaultSnapshot {
    pub active: bool,
    pub code: FaultCode,
    pub data: u32,
    pub count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_state_basic() {
        let fault = FaultState::new();

        assert!(!fault.is_active());
        assert_eq!(fault.code(), FaultCode::None);
        assert_eq!(fault.count(), 0);

        fault.set(FaultCode::SinkRender, 1);

        assert!(fault.is_active());
        assert_eq!(fault.code(), FaultCode::SinkRender);
        assert_eq!(fault.data(), 1);
        assert_eq!(fault.count(), 1);

        fault.clear();

        assert!(!fault.is_active());
        assert_eq!(fault.count(), 1);
    }

    #[test]
    fn test_fault_codes_from_errors() {
        assert_eq!(FaultCode::from(SinkError::Full), FaultCode::SinkFull);
        assert_eq!(
            FaultCode::from(ChannelError::NotConnected),
            FaultCode::UplinkNotConnected
        );
        assert_eq!(FaultCode::from_u8(FaultCode::UplinkBusy as u8), FaultCode::UplinkBusy);
        assert_eq!(FaultCode::from_u8(200), FaultCode::None);
    }
}
