//! Rescorer Group (C10, continued): runs N twiddlers concurrently under the
//! same required/optional latch discipline as the Algorithm Group (C6), then
//! combines their per-completion score streams.

use super::{CompletionScore, TwiddleResult, Twiddler};
use crate::model::{SuggestRequest, SuggestResponse};
use crate::pool::{CompletionLatch, WorkerPool};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombineOp {
    Add,
    Multiply,
}

impl CombineOp {
    pub fn parse(symbol: &str) -> Option<Self> {
        match symbol {
            "+" => Some(CombineOp::Add),
            "*" => Some(CombineOp::Multiply),
            _ => None,
        }
    }
}

pub struct TwiddlerChildConfig {
    pub twiddler: Arc<dyn Twiddler>,
    pub weight: f64,
    pub op: CombineOp,
    pub required: bool,
}

pub struct RescorerGroupConfig {
    pub children: Vec<TwiddlerChildConfig>,
    pub timeout_required_ms: u64,
    pub timeout_optional_ms: u64,
}

impl Default for RescorerGroupConfig {
    fn default() -> Self {
        Self {
            children: Vec::new(),
            timeout_required_ms: 100,
            timeout_optional_ms: 30,
        }
    }
}

pub struct RescorerGroup {
    config: RescorerGroupConfig,
}

impl RescorerGroup {
    pub fn new(config: RescorerGroupConfig) -> Self {
        Self { config }
    }

    /// Runs every configured twiddler concurrently on `pool`, waits for
    /// required children first (then optional ones with their own
    /// timeout), and folds the surviving score streams in configured
    /// order: the first successful child's scores seed the combined
    /// stream, each subsequent one is weighted then folded in with its
    /// operator. `success` is true iff the combined stream ends up exactly
    /// `len(completions)` long.
    pub fn run(
        &self,
        request: &SuggestRequest,
        response: &SuggestResponse,
        pool: &Arc<WorkerPool>,
    ) -> TwiddleResult {
        let len = response.completions.len();
        if self.config.children.is_empty() {
            return TwiddleResult {
                success: false,
                completion_scores: Vec::new(),
            };
        }

        let num_required = self.config.children.iter().filter(|c| c.required).count();
        let num_optional = self.config.children.len() - num_required;

        let required_latch = CompletionLatch::new(num_required.max(1));
        let optional_latch = CompletionLatch::new(num_optional.max(1));
        let slots: Vec<Arc<Mutex<Option<TwiddleResult>>>> = (0..self.config.children.len())
            .map(|_| Arc::new(Mutex::new(None)))
            .collect();

        for (i, child) in self.config.children.iter().enumerate() {
            let twiddler = Arc::clone(&child.twiddler);
            let request = request.clone();
            let response = response.clone();
            let slot = Arc::clone(&slots[i]);
            let latch = if child.required {
                Arc::clone(&required_latch)
            } else {
                Arc::clone(&optional_latch)
            };
            pool.add(move || {
                let _guard = latch.guard();
                let result = twiddler.get_score(&request, &response);
                *slot.lock().unwrap() = Some(result);
            });
        }

        if num_required > 0 {
            required_latch.wait_timeout(Duration::from_millis(self.config.timeout_required_ms));
        }
        if num_optional > 0 {
            optional_latch.wait_timeout(Duration::from_millis(self.config.timeout_optional_ms));
        }

        let mut combined: Option<Vec<CompletionScore>> = None;
        for (i, child) in self.config.children.iter().enumerate() {
            let Some(result) = slots[i].lock().unwrap().take() else {
                continue;
            };
            if !result.success || result.completion_scores.len() != len {
                tracing::warn!(child = i, "twiddler contribution discarded: wrong length or failure");
                continue;
            }
            combined = Some(match combined {
                None => result.completion_scores,
                Some(existing) => fold(existing, result.completion_scores, child.weight, child.op),
            });
        }

        match combined {
            Some(scores) if scores.len() == len => TwiddleResult {
                success: true,
                completion_scores: scores,
            },
            _ => TwiddleResult {
                success: false,
                completion_scores: Vec::new(),
            },
        }
    }
}

fn fold(
    existing: Vec<CompletionScore>,
    incoming: Vec<CompletionScore>,
    weight: f64,
    op: CombineOp,
) -> Vec<CompletionScore> {
    existing
        .into_iter()
        .zip(incoming)
        .map(|(a, b)| {
            let weighted = b.score * weight;
            let score = match op {
                CombineOp::Add => a.score + weighted,
                CombineOp::Multiply => a.score * weighted,
            };
            CompletionScore {
                score,
                debug_info: format!("{} {} ({weighted})", a.debug_info, op_symbol(op)),
            }
        })
        .collect()
}

fn op_symbol(op: CombineOp) -> &'static str {
    match op {
        CombineOp::Add => "+",
        CombineOp::Multiply => "*",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Completion, DeviceChannel};

    struct FixedTwiddler(f64);
    impl Twiddler for FixedTwiddler {
        fn get_score(&self, _req: &SuggestRequest, response: &SuggestResponse) -> TwiddleResult {
            TwiddleResult {
                success: true,
                completion_scores: vec![
                    CompletionScore {
                        score: self.0,
                        debug_info: String::new()
                    };
                    response.completions.len()
                ],
            }
        }
    }

    struct FailingTwiddler;
    impl Twiddler for FailingTwiddler {
        fn get_score(&self, _req: &SuggestRequest, _response: &SuggestResponse) -> TwiddleResult {
            TwiddleResult {
                success: false,
                completion_scores: Vec::new(),
            }
        }
    }

    fn request() -> SuggestRequest {
        SuggestRequest::new("sf", DeviceChannel::DesktopWeb)
    }

    fn response() -> SuggestResponse {
        SuggestResponse {
            success: true,
            completions: vec![Completion::new("a"), Completion::new("b")],
            enable_instant: false,
        }
    }

    #[test]
    fn single_required_child_scores_pass_through() {
        let pool = WorkerPool::new(2, 16);
        let group = RescorerGroup::new(RescorerGroupConfig {
            children: vec![TwiddlerChildConfig {
                twiddler: Arc::new(FixedTwiddler(2.0)),
                weight: 1.0,
                op: CombineOp::Multiply,
                required: true,
            }],
            timeout_required_ms: 200,
            timeout_optional_ms: 50,
        });
        let result = group.run(&request(), &response(), &pool);
        assert!(result.success);
        assert_eq!(result.completion_scores.len(), 2);
        assert_eq!(result.completion_scores[0].score, 2.0);
    }

    #[test]
    fn all_members_failing_yields_group_failure() {
        let pool = WorkerPool::new(2, 16);
        let group = RescorerGroup::new(RescorerGroupConfig {
            children: vec![TwiddlerChildConfig {
                twiddler: Arc::new(FailingTwiddler),
                weight: 1.0,
                op: CombineOp::Multiply,
                required: true,
            }],
            timeout_required_ms: 200,
            timeout_optional_ms: 50,
        });
        let result = group.run(&request(), &response(), &pool);
        assert!(!result.success);
    }

    #[test]
    fn combines_two_children_with_weight_and_op() {
        let pool = WorkerPool::new(2, 16);
        let group = RescorerGroup::new(RescorerGroupConfig {
            children: vec![
                TwiddlerChildConfig {
                    twiddler: Arc::new(FixedTwiddler(2.0)),
                    weight: 1.0,
                    op: CombineOp::Multiply,
                    required: true,
                },
                TwiddlerChildConfig {
                    twiddler: Arc::new(FixedTwiddler(3.0)),
                    weight: 1.0,
                    op: CombineOp::Add,
                    required: true,
                },
            ],
            timeout_required_ms: 200,
            timeout_optional_ms: 50,
        });
        let result = group.run(&request(), &response(), &pool);
        assert!(result.success);
        // first child seeds with 2.0, second folds in with `+`: 2.0 + 3.0*1.0 = 5.0
        assert_eq!(result.completion_scores[0].score, 5.0);
    }
}
