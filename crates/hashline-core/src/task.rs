//! Structured fan-out: sub-tasks that report back to a joining parent
//!
//! Every task runs on its own thread and sends its `Result` to the group's
//! channel. The parent joins with a deadline taken from the
//! [`StageContext`], so a stalled digest call surfaces as
//! [`StageError::JoinTimeout`] instead of blocking the stage forever. A task
//! that panics drops its sender without reporting and is detected as
//! [`StageError::TaskLost`].

use std::time::Instant;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::cancel::POLL_INTERVAL;
use crate::digest::Digest;
use crate::error::StageError;
use crate::stage::StageContext;

type Report<T> = (usize, Result<T, StageError>);

/// Call an external digest under the stage's digest permit pool.
///
/// Cancellation is checked before waiting for a permit and again right
/// before the call.
///
/// The permit is held until the digest returns, even when the joining parent
/// has already given up on the task with [`StageError::JoinTimeout`]. A call
/// that never returns therefore keeps one of the stage's `max_digest_calls`
/// slots for the rest of the run; with a pool of one, every later call in
/// that stage waits on it until its own join deadline.
pub fn call_digest(
    digest: &dyn Digest,
    data: &str,
    ctx: &StageContext,
) -> Result<String, StageError> {
    if ctx.cancel.is_cancelled() {
        return Err(StageError::Cancelled);
    }
    let _permit = ctx
        .digest_permits()
        .acquire(&ctx.cancel)
        .ok_or(StageError::Cancelled)?;
    if ctx.cancel.is_cancelled() {
        return Err(StageError::Cancelled);
    }
    Ok(digest.digest(data)?)
}

/// A group of sub-tasks joined together by their parent.
pub struct TaskGroup<T> {
    tx: Sender<Report<T>>,
    rx: Receiver<Report<T>>,
    labels: Vec<String>,
    ctx: StageContext,
}

impl<T: Send + 'static> TaskGroup<T> {
    pub fn new(ctx: &StageContext) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            tx,
            rx,
            labels: Vec::new(),
            ctx: ctx.clone(),
        }
    }

    /// Start `f` on a new thread named `label`.
    pub fn spawn<F>(&mut self, label: impl Into<String>, f: F) -> Result<(), StageError>
    where
        F: FnOnce() -> Result<T, StageError> + Send + 'static,
    {
        let label = label.into();
        let idx = self.labels.len();
        let tx = self.tx.clone();
        std::thread::Builder::new()
            .name(label.clone())
            .spawn(move || {
                // Parent may have given up already; nothing to do then.
                let _ = tx.send((idx, f()));
            })
            .map_err(StageError::Spawn)?;
        self.labels.push(label);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Wait for every spawned task, in completion order.
    ///
    /// Fails fast on the first task error, on timeout, on cancellation, or
    /// when a task exits without reporting.
    pub fn join(self) -> Result<Vec<T>, StageError> {
        let Self {
            tx,
            rx,
            labels,
            ctx,
        } = self;
        drop(tx);

        let expected = labels.len();
        let start = Instant::now();
        let deadline = start + ctx.join_timeout;
        let mut reported = vec![false; expected];
        let mut results = Vec::with_capacity(expected);

        while results.len() < expected {
            if ctx.cancel.is_cancelled() {
                return Err(StageError::Cancelled);
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(StageError::JoinTimeout {
                    completed: results.len(),
                    expected,
                    waited: start.elapsed(),
                });
            }
            match rx.recv_timeout(POLL_INTERVAL.min(deadline - now)) {
                Ok((idx, Ok(value))) => {
                    reported[idx] = true;
                    results.push(value);
                }
                Ok((_, Err(e))) => return Err(e),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    let missing = reported.iter().position(|r| !r).unwrap_or(0);
                    return Err(StageError::TaskLost {
                        label: labels[missing].clone(),
                    });
                }
            }
        }
        Ok(results)
    }
}

/// Handle to a single sub-task.
pub struct TaskHandle<T>(TaskGroup<T>);

impl<T: Send + 'static> TaskHandle<T> {
    pub fn join(self) -> Result<T, StageError> {
        let label = self.0.labels.first().cloned().unwrap_or_default();
        self.0
            .join()?
            .into_iter()
            .next()
            .ok_or(StageError::TaskLost { label })
    }
}

/// Spawn one sub-task whose result is joined explicitly.
pub fn spawn_one<T, F>(
    ctx: &StageContext,
    label: impl Into<String>,
    f: F,
) -> Result<TaskHandle<T>, StageError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, StageError> + Send + 'static,
{
    let mut group = TaskGroup::new(ctx);
    group.spawn(label, f)?;
    Ok(TaskHandle(group))
}
