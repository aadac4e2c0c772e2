//! Hashline Core - concurrent fan-out/fan-in fingerprinting pipeline
//!
//! Items flow through a linear chain of stages connected by rendezvous
//! conduits: `SingleHash` combines two digests per item, `MultiHash` fans
//! each item out into six rounds and restores their order through a
//! [`FragmentSet`], and `CombineResults` sorts and joins everything into one
//! deterministic fingerprint.

pub mod cancel;
pub mod conduit;
pub mod digest;
pub mod error;
pub mod fragment;
pub mod logging;
pub mod pipeline;
pub mod progress;
pub mod semaphore;
pub mod stage;
pub mod stages;
pub mod task;

// Re-exports for convenience
pub use cancel::CancelToken;
pub use conduit::{Emitter, Envelope, Inbox};
pub use digest::{Digest, DigestKind, SharedDigest};
pub use error::{DigestError, ItemFailure, PipelineError, StageError};
pub use fragment::{Fragment, FragmentError, FragmentSet, ROUNDS};
pub use logging::{IndicatifLogger, Verbosity, init_logging};
pub use pipeline::{Fingerprint, Pipeline, PipelineBuilder, PipelineRun, fingerprint};
pub use progress::{ProgressContext, SharedProgress};
pub use stage::{PipelineConfig, Stage, StageContext};
pub use stages::{CombineResults, MultiHash, SingleHash};
