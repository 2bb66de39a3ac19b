//! Bounded sample ring between a blocking writer and the cpal callback.
//!
//! cpal only offers a pull-style callback, so the output stream keeps a small ring
//! of interleaved `i16` samples:
//! - the pump thread pushes with [`SampleRing::push_blocking`], which waits for room
//!   and therefore paces the writer to the device clock
//! - the cpal callback drains with [`SampleRing::pop_into`], which never waits
//!
//! Closing the ring wakes a blocked writer so stream teardown cannot hang.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard};

/// Thread-safe bounded FIFO of interleaved samples.
pub struct SampleRing {
    inner: Mutex<RingInner>,
    cv: Condvar,
    capacity: usize,
    underrun_events: AtomicU64,
}

struct RingInner {
    queue: VecDeque<i16>,
    closed: bool,
}

impl SampleRing {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(RingInner {
                queue: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            cv: Condvar::new(),
            capacity,
            underrun_events: AtomicU64::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Buffered samples (best-effort snapshot).
    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Number of callbacks that ran out of samples.
    pub fn underrun_events(&self) -> u64 {
        self.underrun_events.load(Ordering::Relaxed)
    }

    /// Mark the ring closed and wake all waiters. Idempotent.
    pub fn close(&self) {
        self.lock().closed = true;
        self.cv.notify_all();
    }

    /// Push every sample, waiting for room as needed.
    ///
    /// Returns the number of samples pushed; fewer than `samples.len()` only when
    /// the ring was closed while waiting.
    pub fn push_blocking(&self, samples: &[i16]) -> usize {
        let mut offset = 0;
        while offset < samples.len() {
            let mut g = self.lock();
            while g.queue.len() >= self.capacity && !g.closed {
                g = self.cv.wait(g).unwrap_or_else(|e| e.into_inner());
            }
            if g.closed {
                return offset;
            }
            let room = self.capacity - g.queue.len();
            let take = room.min(samples.len() - offset);
            g.queue.extend(&samples[offset..offset + take]);
            offset += take;
            drop(g);
            self.cv.notify_all();
        }
        offset
    }

    /// Drain up to `out.len()` samples into `out` without waiting.
    ///
    /// Returns how many samples were copied. A short read counts as an underrun
    /// unless the ring is closed.
    pub fn pop_into(&self, out: &mut [i16]) -> usize {
        let mut g = self.lock();
        let take = g.queue.len().min(out.len());
        for (slot, sample) in out.iter_mut().zip(g.queue.drain(..take)) {
            *slot = sample;
        }
        let closed = g.closed;
        drop(g);
        if take > 0 {
            self.cv.notify_all();
        }
        if take < out.len() && !closed {
            self.underrun_events.fetch_add(1, Ordering::Relaxed);
        }
        take
    }

    fn lock(&self) -> MutexGuard<'_, RingInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn pop_into_empty_ring_counts_underrun() {
        let ring = SampleRing::new(8);
        let mut out = [0i16; 4];
        assert_eq!(ring.pop_into(&mut out), 0);
        assert_eq!(ring.underrun_events(), 1);
    }

    #[test]
    fn push_then_pop_preserves_order() {
        let ring = SampleRing::new(8);
        assert_eq!(ring.push_blocking(&[1, 2, 3, 4, 5]), 5);

        let mut out = [0i16; 3];
        assert_eq!(ring.pop_into(&mut out), 3);
        assert_eq!(out, [1, 2, 3]);
        assert_eq!(ring.len(), 2);
    }

    #[test]
    fn push_blocks_until_callback_drains() {
        let ring = Arc::new(SampleRing::new(4));
        let writer = ring.clone();
        let handle = thread::spawn(move || writer.push_blocking(&[1, 2, 3, 4, 5, 6, 7, 8]));

        thread::sleep(Duration::from_millis(30));
        assert!(!handle.is_finished());

        let mut out = [0i16; 4];
        let mut collected = Vec::new();
        while collected.len() < 8 {
            let n = ring.pop_into(&mut out);
            collected.extend_from_slice(&out[..n]);
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(handle.join().unwrap(), 8);
        assert_eq!(collected, vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn close_releases_blocked_writer() {
        let ring = Arc::new(SampleRing::new(2));
        let writer = ring.clone();
        let handle = thread::spawn(move || writer.push_blocking(&[1, 2, 3, 4]));

        thread::sleep(Duration::from_millis(20));
        ring.close();
        assert_eq!(handle.join().unwrap(), 2);
        assert!(ring.is_closed());
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let ring = SampleRing::new(0);
        assert_eq!(ring.capacity(), 1);
    }
}
