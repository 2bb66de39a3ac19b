//! Decoder-facing side of the pipeline.
//!
//! The session's decoder calls [`AudioSink::deliver`] from its own thread and must
//! never be blocked, so chunks go into a bounded [`DeliveryQueue`] with a
//! non-blocking push. A full queue rejects the chunk and the decoder is told that
//! nothing was accepted; it is expected to re-deliver later.

use crossbeam_channel::{Receiver, Sender, TrySendError};

/// Channel layout and rate of a delivered chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AudioFormat {
    pub channels: u16,
    pub sample_rate: u32,
}

/// One decoder delivery: interleaved 16-bit little-endian PCM bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioChunk {
    pub format: AudioFormat,
    pub frames: Vec<u8>,
}

/// Producer interface exposed to the session.
pub trait AudioSink: Send + Sync {
    /// Offer one chunk. Returns `frames.len()` when accepted and `0` when rejected;
    /// acceptance is all-or-nothing.
    fn deliver(&self, format: AudioFormat, frames: &[u8]) -> usize;
}

/// Producer half of the bounded chunk queue.
#[derive(Clone, Debug)]
pub struct DeliveryQueue {
    tx: Sender<AudioChunk>,
}

impl DeliveryQueue {
    /// Create a queue holding at most `capacity` chunks (minimum one) and return
    /// the producer half along with the consumer receiver.
    pub fn bounded(capacity: usize) -> (Self, Receiver<AudioChunk>) {
        let (tx, rx) = crossbeam_channel::bounded(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Push without blocking. `false` means the queue is full (or the consumer is
    /// gone) and the chunk was dropped.
    pub fn try_enqueue(&self, chunk: AudioChunk) -> bool {
        match self.tx.try_send(chunk) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => false,
        }
    }

    pub fn len(&self) -> usize {
        self.tx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.tx.capacity().unwrap_or(0)
    }
}
