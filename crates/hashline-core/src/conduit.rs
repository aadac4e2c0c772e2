//! Rendezvous conduits connecting pipeline stages
//!
//! A conduit is a zero-capacity channel: `emit` blocks until the downstream
//! stage takes the envelope, so backpressure is implicit. Both ends re-check
//! the run's [`CancelToken`] while blocked.

use crossbeam_channel::{Receiver, RecvTimeoutError, SendTimeoutError, Sender};
use indicatif::ProgressBar;

use crate::cancel::{CancelToken, POLL_INTERVAL};
use crate::error::{ItemFailure, StageError};

/// Per-item result carried between stages.
pub type Envelope<T> = Result<T, ItemFailure>;

/// Create a connected emitter/inbox pair.
///
/// `progress` is advanced once per delivered envelope (pass
/// `ProgressBar::hidden()` when no display is wanted).
pub fn conduit<T>(cancel: &CancelToken, progress: ProgressBar) -> (Emitter<T>, Inbox<T>) {
    let (tx, rx) = crossbeam_channel::bounded(0);
    (
        Emitter {
            tx,
            cancel: cancel.clone(),
            progress,
        },
        Inbox {
            rx,
            cancel: cancel.clone(),
        },
    )
}

/// Sending half of a conduit. Dropping the last clone closes the conduit.
#[derive(Debug)]
pub struct Emitter<T> {
    tx: Sender<Envelope<T>>,
    cancel: CancelToken,
    progress: ProgressBar,
}

impl<T> Clone for Emitter<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            cancel: self.cancel.clone(),
            progress: self.progress.clone(),
        }
    }
}

impl<T> Emitter<T> {
    /// Hand one envelope to the downstream stage, blocking until it is taken.
    pub fn emit(&self, envelope: Envelope<T>) -> Result<(), StageError> {
        let mut pending = envelope;
        loop {
            if self.cancel.is_cancelled() {
                return Err(StageError::Cancelled);
            }
            match self.tx.send_timeout(pending, POLL_INTERVAL) {
                Ok(()) => {
                    self.progress.inc(1);
                    return Ok(());
                }
                Err(SendTimeoutError::Timeout(back)) => pending = back,
                Err(SendTimeoutError::Disconnected(_)) => return Err(StageError::DownstreamClosed),
            }
        }
    }

    pub fn emit_ok(&self, value: T) -> Result<(), StageError> {
        self.emit(Ok(value))
    }

    pub fn progress(&self) -> &ProgressBar {
        &self.progress
    }
}

/// Receiving half of a conduit.
#[derive(Debug)]
pub struct Inbox<T> {
    rx: Receiver<Envelope<T>>,
    cancel: CancelToken,
}

impl<T> Inbox<T> {
    /// Next envelope, or `None` once upstream has closed or the run is cancelled.
    pub fn recv(&self) -> Option<Envelope<T>> {
        loop {
            if self.cancel.is_cancelled() {
                return None;
            }
            match self.rx.recv_timeout(POLL_INTERVAL) {
                Ok(envelope) => return Some(envelope),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return None,
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Envelope<T>> + '_ {
        std::iter::from_fn(move || self.recv())
    }
}
