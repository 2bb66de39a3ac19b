use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Where the pump thread is in its life.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PumpState {
    /// Spawned, waiting for its first chunk.
    Starting,
    /// At least one chunk reached the device.
    Running,
    /// Exited through the quit signal.
    Stopped,
    /// Exited on a device error; the reason is the rendered error.
    Failed(String),
}

impl PumpState {
    pub fn label(&self) -> &'static str {
        match self {
            PumpState::Starting => "starting",
            PumpState::Running => "running",
            PumpState::Stopped => "stopped",
            PumpState::Failed(_) => "failed",
        }
    }
}

/// Shared pipeline health, written by the pump and the delivery callback.
#[derive(Debug)]
pub struct PipelineHealth {
    state: Mutex<PumpState>,
    chunks_accepted: AtomicU64,
    chunks_dropped: AtomicU64,
    samples_written: AtomicU64,
    reconfigurations: AtomicU64,
}

/// Point-in-time copy of [`PipelineHealth`] for status payloads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HealthSnapshot {
    pub state: PumpState,
    pub chunks_accepted: u64,
    pub chunks_dropped: u64,
    pub samples_written: u64,
    pub reconfigurations: u64,
}

impl Default for PipelineHealth {
    fn default() -> Self {
        Self {
            state: Mutex::new(PumpState::Starting),
            chunks_accepted: AtomicU64::new(0),
            chunks_dropped: AtomicU64::new(0),
            samples_written: AtomicU64::new(0),
            reconfigurations: AtomicU64::new(0),
        }
    }
}

impl PipelineHealth {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn state(&self) -> PumpState {
        self.state
            .lock()
            .map(|s| s.clone())
            .unwrap_or_else(|e| e.into_inner().clone())
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.state(), PumpState::Failed(_))
    }

    pub fn set_state(&self, state: PumpState) {
        match self.state.lock() {
            Ok(mut g) => *g = state,
            Err(e) => *e.into_inner() = state,
        }
    }

    pub(crate) fn record_accepted(&self) {
        self.chunks_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) -> u64 {
        self.chunks_dropped.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn record_written(&self, samples: usize) {
        self.samples_written
            .fetch_add(samples as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_reconfiguration(&self) {
        self.reconfigurations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        HealthSnapshot {
            state: self.state(),
            chunks_accepted: self.chunks_accepted.load(Ordering::Relaxed),
            chunks_dropped: self.chunks_dropped.load(Ordering::Relaxed),
            samples_written: self.samples_written.load(Ordering::Relaxed),
            reconfigurations: self.reconfigurations.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_in_starting_state_with_zero_counters() {
        let health = PipelineHealth::default();
        let snap = health.snapshot();
        assert_eq!(snap.state, PumpState::Starting);
        assert_eq!(snap.chunks_accepted, 0);
        assert_eq!(snap.chunks_dropped, 0);
        assert!(!health.is_failed());
    }

    #[test]
    fn failed_state_carries_reason() {
        let health = PipelineHealth::default();
        health.set_state(PumpState::Failed("write output stream: gone".to_string()));
        assert!(health.is_failed());
        assert_eq!(health.state().label(), "failed");
    }

    #[test]
    fn counters_accumulate() {
        let health = PipelineHealth::default();
        health.record_accepted();
        health.record_accepted();
        assert_eq!(health.record_dropped(), 1);
        health.record_written(512);
        health.record_written(10);
        health.record_reconfiguration();

        let snap = health.snapshot();
        assert_eq!(snap.chunks_accepted, 2);
        assert_eq!(snap.chunks_dropped, 1);
        assert_eq!(snap.samples_written, 522);
        assert_eq!(snap.reconfigurations, 1);
    }
}
