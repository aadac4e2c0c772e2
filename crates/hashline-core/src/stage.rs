//! Stage interface and the per-stage execution context

use std::sync::Arc;
use std::time::Duration;

use crate::cancel::CancelToken;
use crate::conduit::{Emitter, Inbox};
use crate::semaphore::Semaphore;

/// Concurrency limits and deadlines applied to every stage of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Items a single stage may process at once.
    pub max_in_flight: usize,
    /// Simultaneous external digest calls per stage.
    pub max_digest_calls: usize,
    /// Upper bound on any join wait for sub-tasks of one item.
    pub join_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        Self {
            max_in_flight: 64,
            max_digest_calls: cpus * 4,
            join_timeout: Duration::from_secs(30),
        }
    }
}

/// Shared state handed to a running stage.
///
/// Each stage gets its own permit pools; the cancel token is shared by the
/// whole run. Clones share everything.
#[derive(Debug, Clone)]
pub struct StageContext {
    pub cancel: CancelToken,
    pub join_timeout: Duration,
    digest_permits: Arc<Semaphore>,
    item_permits: Arc<Semaphore>,
}

impl StageContext {
    pub fn new(config: &PipelineConfig, cancel: CancelToken) -> Self {
        Self {
            cancel,
            join_timeout: config.join_timeout,
            digest_permits: Arc::new(Semaphore::new(config.max_digest_calls)),
            item_permits: Arc::new(Semaphore::new(config.max_in_flight)),
        }
    }

    pub fn digest_permits(&self) -> &Semaphore {
        &self.digest_permits
    }

    pub fn item_permits(&self) -> &Semaphore {
        &self.item_permits
    }
}

/// One step of a linear pipeline, consuming `In` and producing [`Stage::Out`].
///
/// `run` owns the output emitter; returning from `run` drops it, which closes
/// the stage's output exactly once. Implementations must not return before
/// every item they received has been emitted (as a value or a failure).
pub trait Stage<In>: Send + 'static {
    type Out: Send + 'static;

    /// Stage name, used for thread names, logs and failure reports.
    fn name(&self) -> &'static str;

    fn run(self, input: Inbox<In>, output: Emitter<Self::Out>, ctx: &StageContext);
}
