//! Device stream manager.
//!
//! Owns the output backend and at most one open stream. The stream is bound to a
//! channel count and sample rate; when a chunk arrives in a different format the
//! stream is stopped, closed and reopened. Matching formats are a no-op, which is
//! the common case while a track plays.
//!
//! The backend's subsystem is acquired lazily with the first stream and released
//! exactly once by [`DeviceStream::close`]; reconfiguring never re-initializes it.

use crate::error::DeviceError;
use crate::output::{OutputBackend, OutputStream, StreamSpec};

/// Single-owner manager of the output device. Not shared across threads.
pub struct DeviceStream<B: OutputBackend> {
    backend: B,
    stream: Option<B::Stream>,
    channels: u16,
    sample_rate: u32,
    initialized: bool,
    closed: bool,
}

impl<B: OutputBackend> DeviceStream<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            stream: None,
            channels: 0,
            sample_rate: 0,
            initialized: false,
            closed: false,
        }
    }

    /// Make sure an open, started stream matches `channels`/`sample_rate`.
    ///
    /// Returns `true` when a stream was (re)opened and `false` when the current one
    /// already matched.
    pub fn ensure_configured(
        &mut self,
        channels: u16,
        sample_rate: u32,
        buffer_frames: usize,
    ) -> Result<bool, DeviceError> {
        if self.closed {
            return Err(DeviceError::Closed);
        }
        if self.stream.is_some() && self.channels == channels && self.sample_rate == sample_rate {
            return Ok(false);
        }

        self.reset()?;

        if !self.initialized {
            self.backend.initialize()?;
            self.initialized = true;
        }

        let spec = StreamSpec {
            channels,
            sample_rate,
            buffer_frames,
        };
        let mut stream = self.backend.open_stream(&spec)?;
        if let Err(e) = stream.start() {
            if let Err(close_err) = stream.close() {
                tracing::warn!(error = %close_err, "close after failed start");
            }
            return Err(e);
        }

        self.stream = Some(stream);
        self.channels = channels;
        self.sample_rate = sample_rate;
        Ok(true)
    }

    /// Blocking write of every sample in `samples` to the active stream.
    pub fn write(&mut self, samples: &[i16]) -> Result<(), DeviceError> {
        if self.closed {
            return Err(DeviceError::Closed);
        }
        match self.stream.as_mut() {
            Some(stream) => stream.write(samples),
            None => Err(DeviceError::NotConfigured),
        }
    }

    /// Stop and close the active stream, then release the subsystem.
    ///
    /// The subsystem is released even if closing the stream failed; the first
    /// error is returned. Later calls are no-ops.
    pub fn close(&mut self) -> Result<(), DeviceError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let reset = self.reset();
        let released = self.backend.release();
        self.initialized = false;
        reset.and(released)
    }

    /// `(channels, sample_rate)` of the open stream, if any.
    pub fn current_format(&self) -> Option<(u16, u32)> {
        self.stream
            .as_ref()
            .map(|_| (self.channels, self.sample_rate))
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Stop and close the open stream. The stream is closed even when stopping
    /// fails; the first error wins.
    fn reset(&mut self) -> Result<(), DeviceError> {
        match self.stream.take() {
            Some(mut stream) => {
                let stopped = stream.stop();
                let closed = stream.close();
                stopped.and(closed)
            }
            None => Ok(()),
        }
    }
}
