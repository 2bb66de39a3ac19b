//! Output backend seam and the CPAL implementation.
//!
//! [`crate::stream::DeviceStream`] drives any [`OutputBackend`]: the backend owns the
//! audio subsystem (acquired by `initialize`, given back by `release`) and opens
//! format-bound [`OutputStream`]s on demand.
//!
//! CPAL pulls samples from a real-time callback, so [`CpalStream`] puts a
//! [`SampleRing`] between the blocking `write` and that callback. The callback:
//! - drains the ring without blocking
//! - fills any shortfall with silence
//! - converts `i16` samples to the device sample format

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::device;
use crate::error::DeviceError;
use crate::ring::SampleRing;

/// Format a stream is opened with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamSpec {
    pub channels: u16,
    pub sample_rate: u32,
    /// Period size requested from the device, in frames.
    pub buffer_frames: usize,
}

/// A live, format-bound output stream.
pub trait OutputStream {
    fn start(&mut self) -> Result<(), DeviceError>;

    /// Block until every sample has been handed to the device.
    fn write(&mut self, samples: &[i16]) -> Result<(), DeviceError>;

    fn stop(&mut self) -> Result<(), DeviceError>;

    fn close(self) -> Result<(), DeviceError>
    where
        Self: Sized;
}

/// Audio subsystem capable of opening output streams.
pub trait OutputBackend: Send + 'static {
    type Stream: OutputStream;

    /// Acquire the subsystem. Called once, before the first stream is opened.
    fn initialize(&mut self) -> Result<(), DeviceError>;

    fn open_stream(&mut self, spec: &StreamSpec) -> Result<Self::Stream, DeviceError>;

    /// Give the subsystem back. Called exactly once when the device manager closes,
    /// whether or not `initialize` ever ran.
    fn release(&mut self) -> Result<(), DeviceError>;
}

/// CPAL output on the default host.
pub struct CpalBackend {
    needle: Option<String>,
    device: Option<cpal::Device>,
}

impl CpalBackend {
    /// `needle` selects a device by case-insensitive substring; `None` uses the
    /// host default.
    pub fn new(needle: Option<String>) -> Self {
        Self {
            needle,
            device: None,
        }
    }
}

impl OutputBackend for CpalBackend {
    type Stream = CpalStream;

    fn initialize(&mut self) -> Result<(), DeviceError> {
        let host = cpal::default_host();
        let device = device::pick_device(&host, self.needle.as_deref())
            .map_err(|e| DeviceError::NoDevice(format!("{e:#}")))?;
        match device.description() {
            Ok(desc) => tracing::info!(host = ?host.id(), device = %desc, "output device acquired"),
            Err(_) => tracing::info!(host = ?host.id(), "output device acquired"),
        }
        self.device = Some(device);
        Ok(())
    }

    fn open_stream(&mut self, spec: &StreamSpec) -> Result<CpalStream, DeviceError> {
        let device = self
            .device
            .as_ref()
            .ok_or_else(|| DeviceError::Initialize("output device not acquired".to_string()))?;

        let supported = device::pick_stream_config(device, spec.channels, spec.sample_rate)
            .map_err(|e| DeviceError::Open(format!("{e:#}")))?
            .ok_or(DeviceError::UnsupportedFormat {
                channels: spec.channels,
                sample_rate: spec.sample_rate,
            })?;
        let requested = u32::try_from(spec.buffer_frames).unwrap_or(u32::MAX);
        let mut stream_config: cpal::StreamConfig = supported.clone().into();
        stream_config.buffer_size = device::pick_buffer_size(supported.buffer_size(), requested);

        let ring_samples = spec
            .buffer_frames
            .max(1)
            .saturating_mul(usize::from(spec.channels.max(1)))
            .saturating_mul(2);
        let ring = Arc::new(SampleRing::new(ring_samples));
        let lost = Arc::new(AtomicBool::new(false));

        let stream = match supported.sample_format() {
            cpal::SampleFormat::I16 => build_stream::<i16>(device, &stream_config, &ring, &lost),
            cpal::SampleFormat::F32 => build_stream::<f32>(device, &stream_config, &ring, &lost),
            cpal::SampleFormat::I32 => build_stream::<i32>(device, &stream_config, &ring, &lost),
            cpal::SampleFormat::U16 => build_stream::<u16>(device, &stream_config, &ring, &lost),
            _ => {
                return Err(DeviceError::UnsupportedFormat {
                    channels: spec.channels,
                    sample_rate: spec.sample_rate,
                });
            }
        }
        .map_err(|e| DeviceError::Open(e.to_string()))?;

        tracing::info!(
            channels = spec.channels,
            rate_hz = spec.sample_rate,
            sample_format = ?supported.sample_format(),
            buffer_size = ?stream_config.buffer_size,
            ring_samples,
            "output stream opened"
        );
        Ok(CpalStream { stream, ring, lost })
    }

    fn release(&mut self) -> Result<(), DeviceError> {
        if self.device.take().is_some() {
            tracing::info!("output device released");
        }
        Ok(())
    }
}

/// CPAL stream plus the ring feeding its callback.
pub struct CpalStream {
    stream: cpal::Stream,
    ring: Arc<SampleRing>,
    lost: Arc<AtomicBool>,
}

impl OutputStream for CpalStream {
    fn start(&mut self) -> Result<(), DeviceError> {
        self.stream
            .play()
            .map_err(|e| DeviceError::Start(e.to_string()))
    }

    fn write(&mut self, samples: &[i16]) -> Result<(), DeviceError> {
        push_samples(&self.ring, &self.lost, samples)
    }

    fn stop(&mut self) -> Result<(), DeviceError> {
        self.ring.close();
        self.stream
            .pause()
            .map_err(|e| DeviceError::Stop(e.to_string()))
    }

    fn close(self) -> Result<(), DeviceError> {
        let underruns = self.ring.underrun_events();
        if underruns > 0 {
            tracing::debug!(underrun_events = underruns, "output stream closed");
        }
        drop(self.stream);
        Ok(())
    }
}

/// Blocking push into the callback ring. Fails once the device is lost, including
/// when the loss is reported while the writer is waiting for room.
fn push_samples(ring: &SampleRing, lost: &AtomicBool, samples: &[i16]) -> Result<(), DeviceError> {
    let device_lost = || DeviceError::Write("output device no longer available".to_string());
    if lost.load(Ordering::Acquire) {
        return Err(device_lost());
    }
    let pushed = ring.push_blocking(samples);
    if pushed < samples.len() {
        if lost.load(Ordering::Acquire) {
            return Err(device_lost());
        }
        return Err(DeviceError::Write(format!(
            "stream closed after {pushed} of {} samples",
            samples.len()
        )));
    }
    Ok(())
}

/// Error callback body. A vanished device never drains the ring again, so the
/// ring is closed to release a writer blocked in [`SampleRing::push_blocking`].
fn on_stream_error(err: &cpal::StreamError, ring: &SampleRing, lost: &AtomicBool) {
    tracing::warn!("stream error: {err}");
    if matches!(err, cpal::StreamError::DeviceNotAvailable) {
        lost.store(true, Ordering::Release);
        ring.close();
    }
}

/// Type-specialized stream builder for CPAL sample formats.
fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    ring: &Arc<SampleRing>,
    lost: &Arc<AtomicBool>,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: cpal::SizedSample + cpal::FromSample<i16>,
{
    let ring_cb = ring.clone();
    let ring_err = ring.clone();
    let lost_err = lost.clone();
    let mut scratch: Vec<i16> = Vec::with_capacity(ring.capacity());

    let err_fn = move |err: cpal::StreamError| on_stream_error(&err, &ring_err, &lost_err);

    device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            if scratch.len() < data.len() {
                scratch.resize(data.len(), 0);
            }
            let filled = ring_cb.pop_into(&mut scratch[..data.len()]);
            for (out, sample) in data.iter_mut().zip(&scratch[..filled]) {
                *out = <T as cpal::Sample>::from_sample::<i16>(*sample);
            }
            for out in &mut data[filled..] {
                *out = <T as cpal::Sample>::EQUILIBRIUM;
            }
        },
        err_fn,
        None,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::{Duration, Instant};

    fn wait_finished<T>(handle: &thread::JoinHandle<T>) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !handle.is_finished() {
            assert!(Instant::now() < deadline, "writer still blocked");
            thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn device_loss_releases_blocked_write() {
        let ring = Arc::new(SampleRing::new(4));
        let lost = Arc::new(AtomicBool::new(false));
        let (ring_w, lost_w) = (ring.clone(), lost.clone());
        let handle =
            thread::spawn(move || push_samples(&ring_w, &lost_w, &[1, 2, 3, 4, 5, 6, 7, 8]));

        thread::sleep(Duration::from_millis(30));
        assert!(!handle.is_finished());

        on_stream_error(&cpal::StreamError::DeviceNotAvailable, &ring, &lost);
        wait_finished(&handle);
        assert_eq!(
            handle.join().unwrap(),
            Err(DeviceError::Write("output device no longer available".to_string()))
        );
    }

    #[test]
    fn write_after_device_loss_fails_immediately() {
        let ring = SampleRing::new(4);
        let lost = AtomicBool::new(false);
        on_stream_error(&cpal::StreamError::DeviceNotAvailable, &ring, &lost);
        assert!(ring.is_closed());
        assert_eq!(
            push_samples(&ring, &lost, &[1]),
            Err(DeviceError::Write("output device no longer available".to_string()))
        );
    }

    #[test]
    fn transient_stream_error_keeps_ring_open() {
        let ring = SampleRing::new(4);
        let lost = AtomicBool::new(false);
        on_stream_error(&cpal::StreamError::BufferUnderrun, &ring, &lost);
        assert!(!ring.is_closed());
        assert_eq!(push_samples(&ring, &lost, &[1, 2]), Ok(()));
    }

    #[test]
    fn closed_ring_reports_short_write() {
        let ring = SampleRing::new(4);
        let lost = AtomicBool::new(false);
        ring.close();
        assert_eq!(
            push_samples(&ring, &lost, &[1, 2]),
            Err(DeviceError::Write("stream closed after 0 of 2 samples".to_string()))
        );
    }
}
