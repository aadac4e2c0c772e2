//! Pipeline engine: wires stages together with conduits and joins them
//!
//! ```text
//! source ──▶ SingleHash ──▶ MultiHash ──▶ CombineResults ──▶ run()
//!        in0            in1           in2                in3
//! ```
//!
//! Each `then` call creates the next conduit and starts the stage on its own
//! thread, so stages run pipelined from the moment they are added. Stage
//! types are checked at composition time: `then` only accepts a stage whose
//! input type is the previous stage's output type.

use std::fmt::Display;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use indicatif::ProgressBar;

use crate::cancel::CancelToken;
use crate::conduit::{Inbox, conduit};
use crate::digest::SharedDigest;
use crate::error::{ItemFailure, PipelineError};
use crate::progress::{SharedProgress, fmt_num};
use crate::stage::{PipelineConfig, Stage, StageContext};
use crate::stages::{CombineResults, MultiHash, SingleHash};

/// Name of the worker feeding external input into the first conduit.
pub const SOURCE_STAGE: &str = "Source";

/// Options shared by every stage of a run; produces the source stage.
#[derive(Clone, Default)]
pub struct PipelineBuilder {
    config: PipelineConfig,
    cancel: CancelToken,
    progress: Option<SharedProgress>,
}

impl PipelineBuilder {
    pub fn new(config: PipelineConfig, cancel: CancelToken) -> Self {
        Self {
            config,
            cancel,
            progress: None,
        }
    }

    /// Show a status line per stage.
    pub fn with_progress(mut self, progress: SharedProgress) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Start the source worker and return a pipeline whose tail yields `items`.
    pub fn source<I>(self, items: I) -> Result<Pipeline<I::Item>, PipelineError>
    where
        I: IntoIterator,
        I::IntoIter: Send + 'static,
        I::Item: Send + 'static,
    {
        let items = items.into_iter();
        let pb = self.stage_bar(SOURCE_STAGE);
        let (emitter, inbox) = conduit(&self.cancel, pb.clone());
        let worker = StageWorker::spawn(SOURCE_STAGE, pb, move || {
            for item in items {
                if emitter.emit_ok(item).is_err() {
                    break;
                }
            }
        })?;
        Ok(Pipeline {
            builder: self,
            tail: inbox,
            workers: vec![worker],
            started: Instant::now(),
        })
    }

    fn stage_bar(&self, name: &str) -> ProgressBar {
        match &self.progress {
            Some(progress) => progress.stage_line(name),
            None => ProgressBar::hidden(),
        }
    }
}

struct StageWorker {
    name: &'static str,
    handle: JoinHandle<()>,
}

impl StageWorker {
    fn spawn(
        name: &'static str,
        pb: ProgressBar,
        body: impl FnOnce() + Send + 'static,
    ) -> Result<Self, PipelineError> {
        let handle = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let start = Instant::now();
                log::debug!("{name}: started");
                body();
                let elapsed = start.elapsed();
                log::debug!("{name}: finished in {}ms", elapsed.as_millis());
                pb.finish_with_message(format!(
                    "{} emitted in {:.1}s",
                    fmt_num(pb.position() as usize),
                    elapsed.as_secs_f64()
                ));
            })
            .map_err(|source| PipelineError::Spawn {
                stage: name,
                source,
            })?;
        Ok(Self { name, handle })
    }
}

/// A running chain of stages whose last output is of type `T`.
pub struct Pipeline<T> {
    builder: PipelineBuilder,
    tail: Inbox<T>,
    workers: Vec<StageWorker>,
    started: Instant,
}

/// Everything the last stage emitted, split into values and failures.
#[derive(Debug)]
pub struct PipelineRun<T> {
    pub outputs: Vec<T>,
    pub failures: Vec<ItemFailure>,
    pub elapsed: Duration,
}

impl<T: Send + 'static> Pipeline<T> {
    /// Append `stage`, bound to the current tail and a fresh output conduit.
    pub fn then<S: Stage<T>>(self, stage: S) -> Result<Pipeline<S::Out>, PipelineError> {
        let Self {
            builder,
            tail,
            mut workers,
            started,
        } = self;

        let name = stage.name();
        let pb = builder.stage_bar(name);
        let (emitter, inbox) = conduit(&builder.cancel, pb.clone());
        let ctx = StageContext::new(&builder.config, builder.cancel.clone());
        workers.push(StageWorker::spawn(name, pb, move || {
            stage.run(tail, emitter, &ctx)
        })?);

        Ok(Pipeline {
            builder,
            tail: inbox,
            workers,
            started,
        })
    }

    /// Number of workers started so far, including the source.
    pub fn stage_count(&self) -> usize {
        self.workers.len()
    }

    /// Drain the last conduit, then join every stage.
    pub fn run(self) -> Result<PipelineRun<T>, PipelineError> {
        let Self {
            builder,
            tail,
            workers,
            started,
        } = self;

        let mut outputs = Vec::new();
        let mut failures = Vec::new();
        for envelope in tail.iter() {
            match envelope {
                Ok(value) => outputs.push(value),
                Err(failure) => failures.push(failure),
            }
        }
        drop(tail);

        let mut panicked = None;
        for worker in workers {
            if worker.handle.join().is_err() {
                log::error!("{}: stage panicked", worker.name);
                panicked.get_or_insert(worker.name);
            }
        }
        if let Some(stage) = panicked {
            return Err(PipelineError::StagePanicked { stage });
        }
        if builder.cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        Ok(PipelineRun {
            outputs,
            failures,
            elapsed: started.elapsed(),
        })
    }
}

/// Result of the SingleHash → MultiHash → CombineResults pipeline.
#[derive(Debug)]
pub struct Fingerprint {
    pub value: String,
    /// Number of input items fed to the pipeline.
    pub items: usize,
    pub failures: Vec<ItemFailure>,
    pub elapsed: Duration,
}

impl Fingerprint {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Fingerprint `items` with the fixed three-stage topology.
pub fn fingerprint<I>(
    items: I,
    hash1: SharedDigest,
    hash2: SharedDigest,
    builder: PipelineBuilder,
) -> Result<Fingerprint, PipelineError>
where
    I: IntoIterator,
    I::Item: Display + Send + 'static,
{
    let items: Vec<I::Item> = items.into_iter().collect();
    let count = items.len();
    log::info!("Fingerprinting {} items", fmt_num(count));

    let run = builder
        .source(items)?
        .then(SingleHash::new(hash1.clone(), hash2))?
        .then(MultiHash::new(hash1))?
        .then(CombineResults)?
        .run()?;

    let value = run
        .outputs
        .into_iter()
        .next()
        .ok_or(PipelineError::MissingOutput)?;

    if !run.failures.is_empty() {
        log::warn!("{} of {} items failed", run.failures.len(), count);
    }
    log::info!("Done in {:.1}s", run.elapsed.as_secs_f64());

    Ok(Fingerprint {
        value,
        items: count,
        failures: run.failures,
        elapsed: run.elapsed,
    })
}
