//! Rate sinks: anything that accepts a [`RateSample`].
//!
//! Two sinks exist on the device:
//! - [`DisplaySink`]: renders `"<integer> RPM"` onto a label
//! - [`UplinkFeed`](crate::uplink::UplinkFeed): stores the sample in the
//!   telemetry uplink's latest slot
//!
//! A sink's `accept` must be bounded-time and must not block the sample
//! tick. Failures are returned, never panicked, so the publisher can
//! isolate them.

use crate::sample::{LabelText, RateSample};

/// Sink failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkError {
    /// S01: Rendering the value failed
    RenderFailed,
    /// S02: No room to take the value
    Full,
    /// S03: Backing collaborator not available
    Unavailable,
}

impl SinkError {
    /// Get error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::RenderFailed => "S01",
            Self::Full => "S02",
            Self::Unavailable => "S03",
        }
    }

    /// Get error message
    pub fn message(&self) -> &'static str {
        match self {
            Self::RenderFailed => "render failed",
            Self::Full => "sink full",
            Self::Unavailable => "sink unavailable",
        }
    }
}

impl core::fmt::Display for SinkError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

/// Capability: accept a rate sample.
pub trait RateSink {
    /// Short name for diagnostics.
    fn name(&self) -> &'static str;

    /// Take one sample. Must not block.
    fn accept(&mut self, sample: &RateSample) -> Result<(), SinkError>;
}

/// Something that can show a short line of text (an LCD label).
///
/// Fonts, colours and layout belong to the implementor.
pub trait LabelTarget {
    /// Replace the label text.
    fn set_text(&mut self, text: &str) -> Result<(), SinkError>;
}

impl<T: LabelTarget + ?Sized> LabelTarget for &mut T {
    fn set_text(&mut self, text: &str) -> Result<(), SinkError> {
        (**self).set_text(text)
    }
}

/// Display sink: formats the rate and hands it to a [`LabelTarget`].
pub struct DisplaySink<T: LabelTarget> {
    target: T,
    shown: LabelText,
}

impl<T: LabelTarget> DisplaySink<T> {
    /// Wrap a label target.
    pub fn new(target: T) -> Self {
        Self {
            target,
            shown: LabelText::new(),
        }
    }

    /// Show the start-up text (`"0 RPM"`) before the first sample.
    pub fn show_initial(&mut self) -> Result<(), SinkError> {
        self.render(RateSample::ZERO.label_text())
    }

    /// Text most recently handed to the target successfully.
    pub fn shown(&self) -> &str {
        self.shown.as_str()
    }

    /// Borrow the wrapped target.
    pub fn target(&self) -> &T {
        &self.target
    }

    /// Give back the wrapped target.
    pub fn into_inner(self) -> T {
        self.target
    }

    fn render(&mut self, text: LabelText) -> Result<(), SinkError> {
        self.target.set_text(text.as_str())?;
        self.shown = text;
        Ok(())
    }
}

impl<T: LabelTarget> RateSink for DisplaySink<T> {
    fn name(&self) -> &'static str {
        "display"
    }

    #[inline]
    fn accept(&mut self, sample: &RateSample) -> Result<(), SinkError> {
        self.render(sample.label_text())
    }
}
