//! Single-slot cooperative shutdown signal.
//!
//! A bounded(1) channel: firing is a non-blocking `try_send`, so a signal that is
//! already pending swallows any further fires. Consumers wait on
//! [`ShutdownSignal::receiver`] inside a `select!` next to their other sources.

use crossbeam_channel::{Receiver, Sender, TrySendError};

/// Cloneable handle; every clone fires into and listens on the same slot.
#[derive(Clone, Debug)]
pub struct ShutdownSignal {
    tx: Sender<()>,
    rx: Receiver<()>,
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::bounded(1);
        Self { tx, rx }
    }

    /// Request shutdown without blocking.
    ///
    /// Returns `true` if this call pended the signal, `false` if one was already
    /// pending.
    pub fn fire(&self) -> bool {
        match self.tx.try_send(()) {
            Ok(()) => true,
            Err(TrySendError::Full(())) => false,
            // Unreachable while `self` holds the receiver.
            Err(TrySendError::Disconnected(())) => false,
        }
    }

    /// Receiver to select on. Receiving consumes the pending signal.
    pub fn receiver(&self) -> &Receiver<()> {
        &self.rx
    }

    /// Whether a signal is waiting to be consumed.
    pub fn is_pending(&self) -> bool {
        !self.rx.is_empty()
    }
}
