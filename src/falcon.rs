//! Falcon (C4): a read-only `SuggestionId -> CompleteSuggestion` store. This
//! crate treats population of a falcon (deserialising a persisted binary
//! file) as an external concern per spec §1; `MapFalcon` is handed a
//! ready-built map at construction time instead.

use crate::model::{CompleteSuggestion, SuggestResponse, SuggestionId};
use crate::pool::CompletionLatch;
use std::collections::HashMap;
use std::sync::Arc;

pub trait Falcon: Send + Sync {
    fn find(&self, id: &str) -> Option<Arc<CompleteSuggestion>>;

    /// For each completion in `response` missing its `suggestion` ref,
    /// resolves it; completions that fail to resolve are dropped. A
    /// completion whose score is still exactly zero is seeded from
    /// `base_score`. Notifies `latch` exactly once on return, if given.
    fn add_complete_suggestions(&self, response: &mut SuggestResponse, latch: Option<&Arc<CompletionLatch>>) {
        response.completions.retain_mut(|completion| {
            if completion.suggestion.is_some() {
                return true;
            }
            match self.find(&completion.suggestion_id) {
                Some(suggestion) => {
                    if completion.score == 0.0 {
                        completion.score = suggestion.base_score;
                    }
                    completion.suggestion = Some(suggestion);
                    true
                }
                None => false,
            }
        });
        if let Some(latch) = latch {
            latch.notify();
        }
    }
}

pub struct MapFalcon {
    records: HashMap<SuggestionId, Arc<CompleteSuggestion>>,
}

impl MapFalcon {
    pub fn new(records: HashMap<SuggestionId, Arc<CompleteSuggestion>>) -> Self {
        Self { records }
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (SuggestionId, CompleteSuggestion)>) -> Self {
        let records = entries
            .into_iter()
            .map(|(id, suggestion)| (id, Arc::new(suggestion)))
            .collect();
        Self { records }
    }
}

impl Falcon for MapFalcon {
    fn find(&self, id: &str) -> Option<Arc<CompleteSuggestion>> {
        self.records.get(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Completion, SrcType};

    fn suggestion(base_score: f64) -> CompleteSuggestion {
        CompleteSuggestion {
            src_type: SrcType::City,
            src_id: "3103989074".into(),
            country: "US".into(),
            base_score,
            latitude: 0.0,
            longitude: 0.0,
            normalized: "san francisco".into(),
            display: "San Francisco, CA".into(),
            annotations: vec!["CA".into(), "US".into()],
            freq: 100.0,
        }
    }

    #[test]
    fn resolves_suggestion_and_seeds_zero_score_from_base_score() {
        let falcon = MapFalcon::from_entries([("c/US:1".to_string(), suggestion(42.0))]);
        let mut response = SuggestResponse {
            success: true,
            completions: vec![Completion::new("c/US:1")],
            enable_instant: false,
        };
        falcon.add_complete_suggestions(&mut response, None);
        assert_eq!(response.completions.len(), 1);
        assert_eq!(response.completions[0].score, 42.0);
        assert!(response.completions[0].suggestion.is_some());
    }

    #[test]
    fn drops_completions_with_no_matching_record() {
        let falcon = MapFalcon::from_entries(Vec::new());
        let mut response = SuggestResponse {
            success: true,
            completions: vec![Completion::new("missing")],
            enable_instant: false,
        };
        falcon.add_complete_suggestions(&mut response, None);
        assert!(response.completions.is_empty());
    }

    #[test]
    fn preserves_nonzero_score_already_set_by_index_item() {
        let falcon = MapFalcon::from_entries([("c/US:1".to_string(), suggestion(42.0))]);
        let mut completion = Completion::new("c/US:1");
        completion.score = 9.0;
        let mut response = SuggestResponse {
            success: true,
            completions: vec![completion],
            enable_instant: false,
        };
        falcon.add_complete_suggestions(&mut response, None);
        assert_eq!(response.completions[0].score, 9.0);
    }

    #[test]
    fn notifies_latch_exactly_once() {
        let falcon = MapFalcon::from_entries(Vec::new());
        let mut response = SuggestResponse::default();
        let latch = CompletionLatch::new(1);
        falcon.add_complete_suggestions(&mut response, Some(&latch));
        assert!(latch.wait_timeout(std::time::Duration::from_millis(50)));
    }
}
