//! Retrieval Algorithm (C5): the abstract capability every concrete
//! retriever implements, plus the shared `Context` threaded through a
//! request's algorithm tree.

mod attribute;
mod bag_of_words;
mod group;
mod keyvalue;
mod stub;

pub use attribute::{AttributeRetriever, AttributeRetrieverConfig};
pub use bag_of_words::{BagOfWordsAlgorithm, BagOfWordsConfig};
pub use group::{AlgoChildConfig, AlgorithmGroup, AlgorithmGroupConfig};
pub use keyvalue::KeyValueAlgorithm;
pub use stub::StubAlgorithm;

use crate::model::{SuggestRequest, SuggestResponse};
use crate::pool::{CompletionLatch, WorkerPool};
use std::sync::Arc;

/// Shared between the orchestrator and the child tasks it schedules. Leaf
/// algorithms read `pool` to fan further work out (bag-of-words, attribute),
/// notify `latch` on return if one is set, and — in the secondary phase —
/// consult `current_response` for the primary phase's already-ranked
/// parents.
#[derive(Clone)]
pub struct Context {
    pub pool: Arc<WorkerPool>,
    pub latch: Option<Arc<CompletionLatch>>,
    pub current_response: Option<Arc<SuggestResponse>>,
}

impl Context {
    pub fn new(pool: Arc<WorkerPool>) -> Self {
        Self {
            pool,
            latch: None,
            current_response: None,
        }
    }

    pub fn with_latch(mut self, latch: Arc<CompletionLatch>) -> Self {
        self.latch = Some(latch);
        self
    }

    pub fn with_current_response(mut self, response: Arc<SuggestResponse>) -> Self {
        self.current_response = Some(response);
        self
    }
}

/// `GetCompletions(request, response, context) -> int` from spec §4.5: fills
/// in candidates, sets `success`, and (via whatever latch the context
/// carries) signals completion exactly once on return including on failure.
/// Implementations that schedule no sub-tasks of their own simply don't
/// touch `context.latch`; the caller that placed this algorithm on the pool
/// owns notifying it (see `AlgorithmGroup`, which wraps each child's
/// invocation in a `LatchGuard`).
pub trait RetrievalAlgorithm: Send + Sync {
    fn get_completions(&self, request: &SuggestRequest, context: &Context) -> SuggestResponse;
}
