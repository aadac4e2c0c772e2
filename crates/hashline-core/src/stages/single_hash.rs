//! SingleHash: `Hash1(x) + "~" + Hash1(Hash2(x))` per item

use std::fmt::Display;
use std::sync::Arc;

use crate::conduit::{Emitter, Inbox};
use crate::digest::SharedDigest;
use crate::error::StageError;
use crate::stage::{Stage, StageContext};
use crate::task::{call_digest, spawn_one};

/// First stage: formats each item as text and combines two checksums of it.
pub struct SingleHash {
    hash1: SharedDigest,
    hash2: SharedDigest,
}

impl SingleHash {
    pub const NAME: &'static str = "SingleHash";

    pub fn new(hash1: SharedDigest, hash2: SharedDigest) -> Self {
        Self { hash1, hash2 }
    }

    /// Hash one item.
    ///
    /// `Hash2(text)` and `Hash1(text)` start as sub-tasks together; once
    /// `Hash2` is joined, `Hash1(Hash2(text))` runs as a third. Every digest
    /// call sits behind a timed join, and each side of the `~` is fixed by
    /// its handle, not by which finished first.
    pub fn hash_item(&self, text: &str, ctx: &StageContext) -> Result<String, StageError> {
        let inner = {
            let digest = Arc::clone(&self.hash2);
            let (task_ctx, text) = (ctx.clone(), text.to_string());
            spawn_one(ctx, "single-inner", move || {
                call_digest(digest.as_ref(), &text, &task_ctx)
            })?
        };
        let left = {
            let digest = Arc::clone(&self.hash1);
            let (task_ctx, text) = (ctx.clone(), text.to_string());
            spawn_one(ctx, "single-left", move || {
                call_digest(digest.as_ref(), &text, &task_ctx)
            })?
        };

        let inner = inner.join()?;
        let right = {
            let (digest, task_ctx) = (Arc::clone(&self.hash1), ctx.clone());
            spawn_one(ctx, "single-right", move || {
                call_digest(digest.as_ref(), &inner, &task_ctx)
            })?
        };

        let left = left.join()?;
        let right = right.join()?;
        Ok(format!("{left}~{right}"))
    }
}

impl<T: Display + Send + 'static> Stage<T> for SingleHash {
    type Out = String;

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn run(self, input: Inbox<T>, output: Emitter<String>, ctx: &StageContext) {
        super::dispatch(Self::NAME, input, &output, ctx, |text| {
            self.hash_item(text, ctx)
        });
    }
}
