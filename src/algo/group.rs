//! Algorithm Group (C6): runs N child retrievers concurrently under a
//! two-phase required/then-optional deadline and merges their outputs into
//! one response, keyed by `SuggestionId`.

use super::{Context, RetrievalAlgorithm};
use crate::merge::{merge, MergeOp};
use crate::model::{Completion, SuggestRequest, SuggestResponse, SuggestionId};
use crate::pool::CompletionLatch;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub struct AlgoChildConfig {
    pub algo: Arc<dyn RetrievalAlgorithm>,
    pub weight: f64,
    pub op: MergeOp,
    pub required: bool,
}

pub struct AlgorithmGroupConfig {
    pub children: Vec<AlgoChildConfig>,
    pub timeout_required_ms: u64,
    pub timeout_optional_ms: u64,
}

impl Default for AlgorithmGroupConfig {
    fn default() -> Self {
        Self {
            children: Vec::new(),
            timeout_required_ms: 100,
            timeout_optional_ms: 30,
        }
    }
}

pub struct AlgorithmGroup {
    config: AlgorithmGroupConfig,
}

impl AlgorithmGroup {
    pub fn new(config: AlgorithmGroupConfig) -> Self {
        Self { config }
    }
}

impl RetrievalAlgorithm for AlgorithmGroup {
    fn get_completions(&self, request: &SuggestRequest, context: &Context) -> SuggestResponse {
        if self.config.children.is_empty() {
            return SuggestResponse {
                success: true,
                completions: Vec::new(),
                enable_instant: false,
            };
        }

        let num_required = self.config.children.iter().filter(|c| c.required).count();
        let num_optional = self.config.children.len() - num_required;

        let required_latch = CompletionLatch::new(num_required.max(1));
        let optional_latch = CompletionLatch::new(num_optional.max(1));
        let slots: Vec<Arc<Mutex<Option<SuggestResponse>>>> = (0..self.config.children.len())
            .map(|_| Arc::new(Mutex::new(None)))
            .collect();

        for (i, child) in self.config.children.iter().enumerate() {
            let algo = Arc::clone(&child.algo);
            let request = request.clone();
            let child_context = context.clone();
            let slot = Arc::clone(&slots[i]);
            let latch = if child.required {
                Arc::clone(&required_latch)
            } else {
                Arc::clone(&optional_latch)
            };
            context.pool.add(move || {
                let _guard = latch.guard();
                let response = algo.get_completions(&request, &child_context);
                *slot.lock().unwrap() = Some(response);
            });
        }

        if num_required > 0 {
            required_latch.wait_timeout(Duration::from_millis(self.config.timeout_required_ms));
        }

        let mut merged: HashMap<SuggestionId, Completion> = HashMap::new();
        merge_finished_required(&self.config, &slots, &mut merged);

        if num_optional > 0 && merged.len() < request.num_suggestions {
            optional_latch.wait_timeout(Duration::from_millis(self.config.timeout_optional_ms));
        }
        merge_finished_optional(&self.config, &slots, &mut merged);

        SuggestResponse {
            success: true,
            completions: merged.into_values().collect(),
            enable_instant: false,
        }
    }
}

fn merge_finished_required(
    config: &AlgorithmGroupConfig,
    slots: &[Arc<Mutex<Option<SuggestResponse>>>],
    merged: &mut HashMap<SuggestionId, Completion>,
) {
    for (i, child) in config.children.iter().enumerate() {
        if !child.required {
            continue;
        }
        merge_child(child, &slots[i], merged);
    }
}

fn merge_finished_optional(
    config: &AlgorithmGroupConfig,
    slots: &[Arc<Mutex<Option<SuggestResponse>>>],
    merged: &mut HashMap<SuggestionId, Completion>,
) {
    for (i, child) in config.children.iter().enumerate() {
        if child.required {
            continue;
        }
        merge_child(child, &slots[i], merged);
    }
}

fn merge_child(
    child: &AlgoChildConfig,
    slot: &Arc<Mutex<Option<SuggestResponse>>>,
    merged: &mut HashMap<SuggestionId, Completion>,
) {
    let Some(response) = slot.lock().unwrap().take() else {
        return;
    };
    if !response.success {
        return;
    }
    for mut completion in response.completions {
        completion.score *= child.weight;
        match merged.get_mut(&completion.suggestion_id) {
            None => {
                merged.insert(completion.suggestion_id.clone(), completion);
            }
            Some(existing) => merge(child.op, existing, completion),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DeviceChannel;
    use std::thread;
    use std::time::Duration as StdDuration;

    struct DelayedAlgo {
        delay: StdDuration,
        id: &'static str,
        score: f64,
    }

    impl RetrievalAlgorithm for DelayedAlgo {
        fn get_completions(&self, _request: &SuggestRequest, _context: &Context) -> SuggestResponse {
            thread::sleep(self.delay);
            let mut completion = Completion::new(self.id);
            completion.score = self.score;
            SuggestResponse {
                success: true,
                completions: vec![completion],
                enable_instant: false,
            }
        }
    }

    fn request() -> SuggestRequest {
        let mut r = SuggestRequest::new("sf", DeviceChannel::DesktopWeb);
        r.num_suggestions = 10;
        r
    }

    #[test]
    fn optional_timeout_drops_laggard_contribution() {
        let pool = crate::pool::WorkerPool::new(4, 16);
        let group = AlgorithmGroup::new(AlgorithmGroupConfig {
            children: vec![
                AlgoChildConfig {
                    algo: Arc::new(DelayedAlgo {
                        delay: StdDuration::from_millis(5),
                        id: "a",
                        score: 1.0,
                    }),
                    weight: 1.0,
                    op: MergeOp::Max,
                    required: true,
                },
                AlgoChildConfig {
                    algo: Arc::new(DelayedAlgo {
                        delay: StdDuration::from_millis(500),
                        id: "b",
                        score: 1.0,
                    }),
                    weight: 1.0,
                    op: MergeOp::Max,
                    required: false,
                },
            ],
            timeout_required_ms: 100,
            timeout_optional_ms: 30,
        });

        let context = Context::new(pool);
        let response = group.get_completions(&request(), &context);
        assert!(response.success);
        assert_eq!(response.completions.len(), 1);
        assert_eq!(response.completions[0].suggestion_id, "a");
    }

    #[test]
    fn merges_across_algorithms_with_add_operator() {
        let pool = crate::pool::WorkerPool::new(4, 16);
        let group = AlgorithmGroup::new(AlgorithmGroupConfig {
            children: vec![
                AlgoChildConfig {
                    algo: Arc::new(DelayedAlgo {
                        delay: StdDuration::ZERO,
                        id: "h1",
                        score: 1.0,
                    }),
                    weight: 100.0,
                    op: MergeOp::Max,
                    required: true,
                },
                AlgoChildConfig {
                    algo: Arc::new(DelayedAlgo {
                        delay: StdDuration::ZERO,
                        id: "h1",
                        score: 0.5,
                    }),
                    weight: 2.0,
                    op: MergeOp::Add,
                    required: false,
                },
            ],
            timeout_required_ms: 100,
            timeout_optional_ms: 100,
        });

        let context = Context::new(pool);
        let response = group.get_completions(&request(), &context);
        assert_eq!(response.completions.len(), 1);
        assert!((response.completions[0].score - 101.0).abs() < 1e-9);
    }
}
