//! Completion Mergers (C13): four binary operators combining two
//! `Completion` records that share a `SuggestionId`, used both by the
//! Algorithm Group's per-child merge and the Rescorer Group's score
//! combination.

use crate::model::Completion;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergeOp {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "*")]
    Multiply,
    #[serde(rename = ">")]
    Max,
    #[serde(rename = "<")]
    Min,
}

impl MergeOp {
    pub fn symbol(self) -> &'static str {
        match self {
            MergeOp::Add => "+",
            MergeOp::Multiply => "*",
            MergeOp::Max => ">",
            MergeOp::Min => "<",
        }
    }

    pub fn parse(symbol: &str) -> Option<Self> {
        match symbol {
            "+" => Some(MergeOp::Add),
            "*" => Some(MergeOp::Multiply),
            ">" => Some(MergeOp::Max),
            "<" => Some(MergeOp::Min),
            _ => None,
        }
    }
}

/// Merges `incoming` into `existing` in place. All four operators append a
/// structured trace line to the resulting completion's `debug_info`.
pub fn merge(op: MergeOp, existing: &mut Completion, incoming: Completion) {
    let trace = format!(
        "merge[{}] {}(score={:.4}) with {}(score={:.4})",
        op.symbol(),
        existing.suggestion_id,
        existing.score,
        incoming.suggestion_id,
        incoming.score
    );
    match op {
        MergeOp::Add => {
            existing.score += incoming.score;
            existing.algo_type |= incoming.algo_type;
        }
        MergeOp::Multiply => {
            existing.score *= incoming.score;
            existing.algo_type |= incoming.algo_type;
        }
        MergeOp::Max => {
            if incoming.score > existing.score {
                *existing = incoming;
            }
        }
        MergeOp::Min => {
            if incoming.score < existing.score {
                *existing = incoming;
            }
        }
    }
    existing.trace(trace);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ALGO_PREFIX;

    fn completion(id: &str, score: f64, algo_type: u32) -> Completion {
        let mut c = Completion::new(id);
        c.score = score;
        c.algo_type = algo_type;
        c
    }

    #[test]
    fn add_sums_scores_and_unions_algo_type() {
        let mut left = completion("h1", 1.0, ALGO_PREFIX);
        merge(MergeOp::Add, &mut left, completion("h1", 0.5, 16));
        assert_eq!(left.score, 1.5);
        assert_eq!(left.algo_type, ALGO_PREFIX | 16);
    }

    #[test]
    fn multiply_multiplies_scores_and_unions_algo_type() {
        let mut left = completion("h1", 2.0, ALGO_PREFIX);
        merge(MergeOp::Multiply, &mut left, completion("h1", 3.0, 16));
        assert_eq!(left.score, 6.0);
        assert_eq!(left.algo_type, ALGO_PREFIX | 16);
    }

    #[test]
    fn max_is_right_biased_only_when_strictly_greater() {
        let mut left = completion("h1", 5.0, ALGO_PREFIX);
        merge(MergeOp::Max, &mut left, completion("h1", 3.0, 16));
        assert_eq!(left.score, 5.0, "right not strictly greater, left kept");

        let mut left = completion("h1", 5.0, ALGO_PREFIX);
        merge(MergeOp::Max, &mut left, completion("h1", 9.0, 16));
        assert_eq!(left.score, 9.0);
        assert_eq!(left.algo_type, 16, "replaced wholesale, not unioned");
    }

    #[test]
    fn min_is_right_biased_only_when_strictly_less() {
        let mut left = completion("h1", 5.0, ALGO_PREFIX);
        merge(MergeOp::Min, &mut left, completion("h1", 9.0, 16));
        assert_eq!(left.score, 5.0);

        let mut left = completion("h1", 5.0, ALGO_PREFIX);
        merge(MergeOp::Min, &mut left, completion("h1", 2.0, 16));
        assert_eq!(left.score, 2.0);
    }

    #[test]
    fn every_op_appends_a_debug_trace() {
        for op in [MergeOp::Add, MergeOp::Multiply, MergeOp::Max, MergeOp::Min] {
            let mut left = completion("h1", 1.0, ALGO_PREFIX);
            merge(op, &mut left, completion("h1", 1.0, 16));
            assert!(left.debug_info.contains("merge["));
        }
    }
}
