//! Error types for digests, round groups, stages and whole pipeline runs

use std::time::Duration;

use crate::fragment::FragmentError;

/// Failure reported by an external digest function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestError {
    pub algorithm: String,
    pub message: String,
}

impl DigestError {
    pub fn new(algorithm: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            algorithm: algorithm.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for DigestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} digest failed: {}", self.algorithm, self.message)
    }
}

impl std::error::Error for DigestError {}

/// Error from processing a single item inside a stage.
///
/// Every variant is scoped to one item: the stage keeps running and the
/// failure travels downstream as an [`ItemFailure`].
#[derive(Debug)]
pub enum StageError {
    Digest(DigestError),
    Fragments(FragmentError),
    /// A sub-task group did not report back within the join timeout.
    JoinTimeout {
        completed: usize,
        expected: usize,
        waited: Duration,
    },
    /// A sub-task exited without reporting (it panicked).
    TaskLost { label: String },
    Spawn(std::io::Error),
    Cancelled,
    DownstreamClosed,
}

impl std::fmt::Display for StageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Digest(e) => write!(f, "{e}"),
            Self::Fragments(e) => write!(f, "fragments: {e}"),
            Self::JoinTimeout {
                completed,
                expected,
                waited,
            } => write!(
                f,
                "join timed out after {:.1}s ({completed}/{expected} tasks reported)",
                waited.as_secs_f64()
            ),
            Self::TaskLost { label } => write!(f, "task {label} exited without reporting"),
            Self::Spawn(e) => write!(f, "failed to spawn task: {e}"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::DownstreamClosed => write!(f, "downstream stage closed"),
        }
    }
}

impl std::error::Error for StageError {}

impl StageError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::JoinTimeout { .. })
    }

    /// Whether the stage itself should stop (as opposed to only this item failing).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DownstreamClosed)
    }
}

impl From<DigestError> for StageError {
    fn from(e: DigestError) -> Self {
        Self::Digest(e)
    }
}

impl From<FragmentError> for StageError {
    fn from(e: FragmentError) -> Self {
        Self::Fragments(e)
    }
}

/// A failed item, threaded through the pipeline alongside successful values.
#[derive(Debug)]
pub struct ItemFailure {
    /// Stage that produced the failure.
    pub stage: &'static str,
    /// Text form of the item as the failing stage received it.
    pub item: String,
    pub error: StageError,
}

impl ItemFailure {
    pub fn new(stage: &'static str, item: impl Into<String>, error: StageError) -> Self {
        Self {
            stage,
            item: item.into(),
            error,
        }
    }
}

impl std::fmt::Display for ItemFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{:?}]: {}", self.stage, self.item, self.error)
    }
}

impl std::error::Error for ItemFailure {}

/// Error that aborts a whole pipeline run.
#[derive(Debug)]
pub enum PipelineError {
    Spawn {
        stage: &'static str,
        source: std::io::Error,
    },
    StagePanicked { stage: &'static str },
    Cancelled,
    /// The final stage closed without emitting the expected value.
    MissingOutput,
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Spawn { stage, source } => write!(f, "failed to start {stage}: {source}"),
            Self::StagePanicked { stage } => write!(f, "stage {stage} panicked"),
            Self::Cancelled => write!(f, "pipeline cancelled"),
            Self::MissingOutput => write!(f, "pipeline produced no output"),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Spawn { source, .. } => Some(source),
            _ => None,
        }
    }
}
