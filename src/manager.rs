//! Suggestion Manager (C11): the process-wide singleton holding the
//! configured primary/fallback/secondary algorithms, the dedup chain, the
//! primary/secondary rescorer groups, and the one shared worker pool. Built
//! once in `main`/`AppState::new` and threaded through as an `Arc` dependency
//! rather than a `static`, per the design notes' own preferred translation
//! of "process-wide singleton" into a systems language.

use crate::algo::{Context, RetrievalAlgorithm};
use crate::dedup::DedupChain;
use crate::model::{SuggestRequest, SuggestResponse};
use crate::pool::WorkerPool;
use crate::rescore::RescorerGroup;
use std::sync::Arc;

pub struct SuggestionManagerConfig {
    pub threadpool_size: usize,
    pub threadpool_capacity: usize,
    pub top_suggestion_min_freq_for_instant: f64,
    pub top_suggestion_min_selection_probability_for_instant: f64,
    pub max_suggestions_multiplier: usize,
    pub min_secondary_suggestions: usize,
}

impl Default for SuggestionManagerConfig {
    fn default() -> Self {
        Self {
            threadpool_size: 512,
            threadpool_capacity: 256,
            top_suggestion_min_freq_for_instant: 10.0,
            top_suggestion_min_selection_probability_for_instant: 0.4,
            max_suggestions_multiplier: 6,
            min_secondary_suggestions: 6,
        }
    }
}

/// Everything a request's pipeline run needs that outlives the request
/// itself: the algorithms it calls into, the worker pool they run on, and
/// the dedup/rescore stages applied between phases.
pub struct SuggestionManager {
    pub pool: Arc<WorkerPool>,
    pub primary_algo: Arc<dyn RetrievalAlgorithm>,
    pub fallback_algo: Arc<dyn RetrievalAlgorithm>,
    pub secondary_algo: Arc<dyn RetrievalAlgorithm>,
    pub dedupers: DedupChain,
    pub primary_rescorer: RescorerGroup,
    pub secondary_rescorer: RescorerGroup,
    pub config: SuggestionManagerConfig,
}

impl SuggestionManager {
    pub fn new(
        primary_algo: Arc<dyn RetrievalAlgorithm>,
        fallback_algo: Arc<dyn RetrievalAlgorithm>,
        secondary_algo: Arc<dyn RetrievalAlgorithm>,
        dedupers: DedupChain,
        primary_rescorer: RescorerGroup,
        secondary_rescorer: RescorerGroup,
        config: SuggestionManagerConfig,
    ) -> Arc<Self> {
        let pool = WorkerPool::new(config.threadpool_size, config.threadpool_capacity);
        Arc::new(Self {
            pool,
            primary_algo,
            fallback_algo,
            secondary_algo,
            dedupers,
            primary_rescorer,
            secondary_rescorer,
            config,
        })
    }

    /// A fresh `Context` bound to this manager's pool, with no latch and no
    /// carried-over response — what stage 2 of the pipeline starts from.
    pub fn context(&self) -> Context {
        Context::new(Arc::clone(&self.pool))
    }

    pub fn run_primary(&self, request: &SuggestRequest) -> SuggestResponse {
        self.primary_algo.get_completions(request, &self.context())
    }

    pub fn run_fallback(&self, request: &SuggestRequest) -> SuggestResponse {
        self.fallback_algo.get_completions(request, &self.context())
    }

    pub fn run_secondary(&self, request: &SuggestRequest, current_response: Arc<SuggestResponse>) -> SuggestResponse {
        let context = self.context().with_current_response(current_response);
        self.secondary_algo.get_completions(request, &context)
    }
}
