//! MultiHash: six-round fan-out per item, concatenated in round order

use std::sync::Arc;

use crate::conduit::{Emitter, Inbox};
use crate::digest::SharedDigest;
use crate::error::StageError;
use crate::fragment::{Fragment, FragmentSet, ROUNDS};
use crate::stage::{Stage, StageContext};
use crate::task::{TaskGroup, call_digest};

/// Second stage: `Hash1("0"+x) ++ Hash1("1"+x) ++ ... ++ Hash1("5"+x)`.
pub struct MultiHash {
    hash1: SharedDigest,
}

impl MultiHash {
    pub const NAME: &'static str = "MultiHash";

    pub fn new(hash1: SharedDigest) -> Self {
        Self { hash1 }
    }

    /// Hash one item with one sub-task per round.
    ///
    /// Fragments are collected in completion order into a fresh
    /// [`FragmentSet`]; only after the whole round group has joined is the
    /// set finalized, which restores ascending round order.
    pub fn hash_item(&self, text: &str, ctx: &StageContext) -> Result<String, StageError> {
        let mut rounds = TaskGroup::new(ctx);
        for round in 0..ROUNDS {
            let digest = Arc::clone(&self.hash1);
            let task_ctx = ctx.clone();
            let data = format!("{round}{text}");
            rounds.spawn(format!("multi-round-{round}"), move || {
                call_digest(digest.as_ref(), &data, &task_ctx)
                    .map(|payload| Fragment::new(round, payload))
            })?;
        }

        let mut set = FragmentSet::new();
        for fragment in rounds.join()? {
            set.add(fragment);
        }
        Ok(set.finalize()?)
    }
}

impl Stage<String> for MultiHash {
    type Out = String;

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn run(self, input: Inbox<String>, output: Emitter<String>, ctx: &StageContext) {
        super::dispatch(Self::NAME, input, &output, ctx, |text| {
            self.hash_item(text, ctx)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    use crate::cancel::CancelToken;
    use crate::stage::PipelineConfig;
    use crate::stages::testing::run_stage;

    fn identity() -> SharedDigest {
        Arc::new(|s: &str| s.to_string())
    }

    fn ctx_with(config: PipelineConfig) -> StageContext {
        StageContext::new(&config, CancelToken::new())
    }

    /// Rounds with a lower index take longer, so they finish in reverse order.
    fn reversed_latency() -> SharedDigest {
        Arc::new(|s: &str| {
            let round: u64 = s[..1].parse().unwrap();
            std::thread::sleep(Duration::from_millis((5 - round) * 15));
            format!("[{s}]")
        })
    }

    #[test]
    fn identity_scenario() {
        let stage = MultiHash::new(identity());
        let out = stage
            .hash_item("a", &ctx_with(PipelineConfig::default()))
            .unwrap();
        assert_eq!(out, "0a1a2a3a4a5a");
    }

    #[test]
    fn round_order_ignores_completion_order() {
        let stage = MultiHash::new(reversed_latency());
        let out = stage
            .hash_item("x", &ctx_with(PipelineConfig::default()))
            .unwrap();
        assert_eq!(out, "[0x][1x][2x][3x][4x][5x]");
    }

    #[test]
    fn stalled_round_times_out_instead_of_hanging() {
        let stalled: SharedDigest = Arc::new(|s: &str| {
            if s.starts_with('4') {
                std::thread::sleep(Duration::from_secs(2));
            }
            s.to_string()
        });
        let config = PipelineConfig {
            join_timeout: Duration::from_millis(100),
            ..Default::default()
        };
        let stage = MultiHash::new(stalled);
        let start = Instant::now();
        let err = stage.hash_item("x", &ctx_with(config)).unwrap_err();
        assert!(err.is_timeout(), "got {err}");
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn panicking_round_fails_item() {
        let flaky: SharedDigest = Arc::new(|s: &str| {
            if s.starts_with('2') {
                panic!("round 2 exploded");
            }
            s.to_string()
        });
        let stage = MultiHash::new(flaky);
        let err = stage
            .hash_item("x", &ctx_with(PipelineConfig::default()))
            .unwrap_err();
        assert!(matches!(err, StageError::TaskLost { ref label } if label == "multi-round-2"));
    }

    #[test]
    fn items_run_concurrently() {
        // Each round sleeps 50ms; serialized items would need >= 200ms.
        let slow: SharedDigest = Arc::new(|s: &str| {
            std::thread::sleep(Duration::from_millis(50));
            s.to_string()
        });
        let config = PipelineConfig {
            max_in_flight: 4,
            max_digest_calls: 24,
            ..Default::default()
        };
        let items: Vec<_> = ["a", "b", "c", "d"]
            .iter()
            .map(|s| Ok(s.to_string()))
            .collect();
        let start = Instant::now();
        let results = run_stage(MultiHash::new(slow), items, config);
        assert_eq!(results.len(), 4);
        assert!(results.iter().all(|r| r.is_ok()));
        assert!(start.elapsed() < Duration::from_millis(190));
    }

    #[test]
    fn stage_emits_one_value_per_item() {
        let items: Vec<_> = (1..=3).map(|n| Ok(format!("{n}~{n}"))).collect();
        let stage = MultiHash::new(identity());
        let mut out: Vec<String> = run_stage(stage, items, PipelineConfig::default())
            .into_iter()
            .map(|r| r.unwrap())
            .collect();
        out.sort();
        assert_eq!(
            out,
            vec![
                "01~111~121~131~141~151~1",
                "02~212~222~232~242~252~2",
                "03~313~323~333~343~353~3",
            ]
        );
    }
}
