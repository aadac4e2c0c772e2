//! The three hashing stages and their shared per-item dispatch loop

mod combine;
mod multi_hash;
mod single_hash;

pub use combine::{CombineResults, SEPARATOR, combine};
pub use multi_hash::MultiHash;
pub use single_hash::SingleHash;

use std::fmt::Display;

use crate::conduit::{Emitter, Inbox};
use crate::error::{ItemFailure, StageError};
use crate::stage::StageContext;

/// Run `work` for every received item on its own scoped worker.
///
/// The loop never waits for an item's result before taking the next one;
/// concurrency is capped by the stage's item permits. Upstream failures are
/// forwarded unchanged. Returns only after every worker has emitted.
pub(crate) fn dispatch<T, F>(
    stage: &'static str,
    input: Inbox<T>,
    output: &Emitter<String>,
    ctx: &StageContext,
    work: F,
) where
    T: Display,
    F: Fn(&str) -> Result<String, StageError> + Sync,
{
    let work = &work;
    std::thread::scope(|s| {
        for (seq, envelope) in input.iter().enumerate() {
            let item = match envelope {
                Ok(item) => item.to_string(),
                Err(failure) => {
                    if output.emit(Err(failure)).is_err() {
                        break;
                    }
                    continue;
                }
            };

            let Some(permit) = ctx.item_permits().acquire(&ctx.cancel) else {
                break;
            };

            let spawned = std::thread::Builder::new()
                .name(format!("{stage}-{seq}"))
                .spawn_scoped(s, {
                    let item = item.clone();
                    move || {
                        let result = work(&item);
                        drop(permit);
                        let envelope = result.map_err(|e| {
                            let failure = ItemFailure::new(stage, item, e);
                            if !failure.error.is_terminal() {
                                log::warn!("{failure}");
                            }
                            failure
                        });
                        if let Err(e) = output.emit(envelope) {
                            log::debug!("{stage}: dropping result: {e}");
                        }
                    }
                });

            if let Err(e) = spawned {
                let failure = ItemFailure::new(stage, item, StageError::Spawn(e));
                log::warn!("{failure}");
                if output.emit(Err(failure)).is_err() {
                    break;
                }
            }
        }
    });
}
