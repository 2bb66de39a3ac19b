//! Errors raised by the output device layer.

/// Failure while acquiring, configuring, or writing to the output device.
///
/// Payloads are rendered strings so backends with unrelated error types (cpal,
/// test doubles) can report through the same enum.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    /// The audio subsystem could not be acquired.
    #[error("initialize audio subsystem: {0}")]
    Initialize(String),

    /// No output device matched the selection.
    #[error("no output device: {0}")]
    NoDevice(String),

    /// The device cannot play the requested channel count / sample rate.
    #[error("unsupported output format: {channels} ch @ {sample_rate} Hz")]
    UnsupportedFormat { channels: u16, sample_rate: u32 },

    #[error("open output stream: {0}")]
    Open(String),

    #[error("start output stream: {0}")]
    Start(String),

    #[error("stop output stream: {0}")]
    Stop(String),

    #[error("close output stream: {0}")]
    Close(String),

    #[error("write output stream: {0}")]
    Write(String),

    /// `write` was called before any stream was configured.
    #[error("output stream not configured")]
    NotConfigured,

    /// The device manager has already been closed.
    #[error("output device closed")]
    Closed,
}
