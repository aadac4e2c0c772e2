//! CombineResults: full-barrier sort-and-join of every upstream value

use rayon::prelude::*;

use crate::conduit::{Emitter, Inbox};
use crate::stage::{Stage, StageContext};

/// Separator placed between sorted values.
pub const SEPARATOR: &str = "_";

/// Sort values by byte order and join them with [`SEPARATOR`].
pub fn combine(mut values: Vec<String>) -> String {
    values.par_sort();
    values.join(SEPARATOR)
}

/// Final stage: buffers its whole input, then emits exactly one value.
///
/// Upstream failures are buffered too and re-emitted after the combined
/// value, so nothing leaves the stage before its input is exhausted.
#[derive(Debug, Default, Clone, Copy)]
pub struct CombineResults;

impl CombineResults {
    pub const NAME: &'static str = "CombineResults";
}

impl Stage<String> for CombineResults {
    type Out = String;

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn run(self, input: Inbox<String>, output: Emitter<String>, ctx: &StageContext) {
        let mut values = Vec::new();
        let mut failures = Vec::new();
        for envelope in input.iter() {
            match envelope {
                Ok(value) => values.push(value),
                Err(failure) => failures.push(failure),
            }
        }

        if ctx.cancel.is_cancelled() {
            log::debug!("{}: cancelled with {} values buffered", Self::NAME, values.len());
            return;
        }

        log::debug!(
            "{}: combining {} values ({} failed upstream)",
            Self::NAME,
            values.len(),
            failures.len()
        );
        if output.emit_ok(combine(values)).is_err() {
            return;
        }
        for failure in failures {
            if output.emit(Err(failure)).is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ItemFailure, StageError};
    use crate::stage::PipelineConfig;
    use crate::stages::testing::run_stage;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn scenario() {
        assert_eq!(combine(strings(&["x", "y", "a"])), "a_x_y");
    }

    #[test]
    fn permutation_invariant() {
        let expected = combine(strings(&["b", "c", "a", "d"]));
        for perm in [
            ["a", "b", "c", "d"],
            ["d", "c", "b", "a"],
            ["c", "a", "d", "b"],
            ["b", "d", "a", "c"],
        ] {
            assert_eq!(combine(strings(&perm)), expected);
        }
        assert_eq!(expected, "a_b_c_d");
    }

    #[test]
    fn case_sensitive_byte_order() {
        assert_eq!(combine(strings(&["b", "B", "a", "A"])), "A_B_a_b");
    }

    #[test]
    fn duplicates_kept() {
        assert_eq!(combine(strings(&["z", "z", "m"])), "m_z_z");
    }

    #[test]
    fn empty_input_is_empty_string() {
        assert_eq!(combine(Vec::new()), "");
    }

    #[test]
    fn stage_emits_single_value_then_failures() {
        let items = vec![
            Ok("y".to_string()),
            Err(ItemFailure::new("MultiHash", "q", StageError::Cancelled)),
            Ok("x".to_string()),
            Ok("a".to_string()),
        ];
        let results = run_stage(CombineResults, items, PipelineConfig::default());
        assert_eq!(results.len(), 2);
        assert!(matches!(&results[0], Ok(v) if v == "a_x_y"));
        assert!(matches!(&results[1], Err(f) if f.item == "q"));
    }

    #[test]
    fn stage_with_no_input_emits_empty_value() {
        let results = run_stage(CombineResults, Vec::new(), PipelineConfig::default());
        assert_eq!(results.len(), 1);
        assert!(matches!(&results[0], Ok(v) if v.is_empty()));
    }
}
