//! Template expansion and fallback retrievers: reserved variants that always
//! return `success=false` in this release. Kept as explicit stubs so their
//! hooks in the registry and in the pipeline's fallback flow stay wired.

use super::{Context, RetrievalAlgorithm};
use crate::model::{SuggestRequest, SuggestResponse};

pub struct StubAlgorithm {
    name: &'static str,
}

impl StubAlgorithm {
    pub fn template_expansion() -> Self {
        Self {
            name: "template_expansion",
        }
    }

    pub fn fallback() -> Self {
        Self { name: "fallback" }
    }
}

impl RetrievalAlgorithm for StubAlgorithm {
    fn get_completions(&self, _request: &SuggestRequest, _context: &Context) -> SuggestResponse {
        tracing::debug!(algo = self.name, "stub algorithm invoked, returning no results");
        SuggestResponse::default()
    }
}
