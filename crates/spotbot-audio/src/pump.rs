//! Delivery pump: queue → repacker → device.
//!
//! [`AudioWriter`] is the pipeline handle given to the session. It owns:
//! - the producer half of the bounded chunk queue (used by [`AudioSink::deliver`])
//! - a single-slot quit signal
//! - the pump thread, which exclusively owns the [`DeviceStream`]
//!
//! The pump waits for either a chunk or quit. Each chunk reconfigures the device if
//! its format changed, then is written in buffer-sized pieces. Quit is only
//! observed between chunks; a write in flight always completes. Device errors end
//! the pump: the device is still closed and the failure lands in
//! [`PipelineHealth`].

use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crossbeam_channel::Receiver;

use crate::config::PipelineConfig;
use crate::delivery::{AudioChunk, AudioFormat, AudioSink, DeliveryQueue};
use crate::error::DeviceError;
use crate::output::OutputBackend;
use crate::repack::Repacker;
use crate::shutdown::ShutdownSignal;
use crate::status::{PipelineHealth, PumpState};
use crate::stream::DeviceStream;

/// Handle to a running audio pipeline.
pub struct AudioWriter {
    queue: DeliveryQueue,
    quit: ShutdownSignal,
    health: Arc<PipelineHealth>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl AudioWriter {
    /// Spawn the pump thread over `backend`.
    ///
    /// The backend is moved into the pump thread; the device itself is only
    /// acquired once the first chunk arrives.
    pub fn spawn<B: OutputBackend>(backend: B, config: PipelineConfig) -> std::io::Result<Self> {
        let config = config.normalized();
        let (queue, input) = DeliveryQueue::bounded(config.input_chunks);
        let quit = ShutdownSignal::new();
        let health = PipelineHealth::shared();

        let quit_rx = quit.receiver().clone();
        let health_pump = health.clone();
        let buffer_samples = config.output_buffer_samples;
        let handle = std::thread::Builder::new()
            .name("audio-pump".to_string())
            .spawn(move || pump_thread_main(backend, input, quit_rx, buffer_samples, health_pump))?;

        tracing::info!(
            input_chunks = config.input_chunks,
            output_buffer_samples = config.output_buffer_samples,
            "audio pipeline started"
        );
        Ok(Self {
            queue,
            quit,
            health,
            pump: Mutex::new(Some(handle)),
        })
    }

    pub fn health(&self) -> Arc<PipelineHealth> {
        self.health.clone()
    }

    /// Stop the pump and wait for it to release the device.
    ///
    /// Chunks still queued may or may not be played. Safe to call more than once,
    /// also concurrently: every call returns only after the device is released.
    pub fn close(&self) {
        // Held across the join so a concurrent caller waits for the teardown.
        let mut pump = self.pump.lock().unwrap_or_else(|e| e.into_inner());
        let Some(handle) = pump.take() else {
            return;
        };
        if !self.quit.fire() {
            tracing::debug!("audio pump quit already pending");
        }
        if handle.join().is_err() {
            tracing::error!("audio pump thread panicked");
        }
        tracing::info!("audio pipeline closed");
    }
}

impl AudioSink for AudioWriter {
    fn deliver(&self, format: AudioFormat, frames: &[u8]) -> usize {
        if frames.is_empty() {
            return 0;
        }
        let chunk = AudioChunk {
            format,
            frames: frames.to_vec(),
        };
        if self.queue.try_enqueue(chunk) {
            self.health.record_accepted();
            frames.len()
        } else {
            let dropped = self.health.record_dropped();
            tracing::debug!(bytes = frames.len(), dropped_total = dropped, "delivery rejected");
            0
        }
    }
}

impl Drop for AudioWriter {
    fn drop(&mut self) {
        self.close();
    }
}

fn pump_thread_main<B: OutputBackend>(
    backend: B,
    input: Receiver<AudioChunk>,
    quit: Receiver<()>,
    buffer_samples: usize,
    health: Arc<PipelineHealth>,
) {
    let mut device = DeviceStream::new(backend);
    let mut buffer = vec![0i16; buffer_samples];

    let result = run_pump(&mut device, &input, &quit, &mut buffer, &health);
    let closed = device.close();

    match result {
        Ok(()) => {
            if let Err(e) = closed {
                tracing::warn!(error = %e, "output device close failed");
            }
            health.set_state(PumpState::Stopped);
            tracing::info!("audio pump stopped");
        }
        Err(e) => {
            if let Err(close_err) = closed {
                tracing::warn!(error = %close_err, "output device close failed");
            }
            tracing::error!(error = %e, "audio pump failed");
            health.set_state(PumpState::Failed(e.to_string()));
        }
    }
}

/// Drain `input` into `device` until quit fires or every producer is gone.
///
/// Returns the first device error; the caller is responsible for closing the
/// device either way.
pub fn run_pump<B: OutputBackend>(
    device: &mut DeviceStream<B>,
    input: &Receiver<AudioChunk>,
    quit: &Receiver<()>,
    buffer: &mut [i16],
    health: &PipelineHealth,
) -> Result<(), DeviceError> {
    let mut running = false;
    loop {
        let chunk = crossbeam_channel::select! {
            recv(input) -> msg => match msg {
                Ok(chunk) => chunk,
                Err(_) => return Ok(()),
            },
            recv(quit) -> _ => return Ok(()),
        };

        let AudioFormat {
            channels,
            sample_rate,
        } = chunk.format;
        if device.ensure_configured(channels, sample_rate, buffer.len())? {
            health.record_reconfiguration();
            tracing::info!(channels, rate_hz = sample_rate, "output stream configured");
        }

        let mut repacker = Repacker::new(&chunk.frames);
        while let Some(samples) = repacker.fill(buffer) {
            device.write(samples)?;
            health.record_written(samples.len());
        }

        if !running {
            running = true;
            health.set_state(PumpState::Running);
        }
    }
}
