//! Key-value retriever: the base shape for prefix and alternate-names
//! matching. Loads `normalized_string -> [index item]` at construction,
//! looks up `request.normalized_query` verbatim, and resolves the matches
//! against a bound falcon.

use super::{Context, RetrievalAlgorithm};
use crate::falcon::Falcon;
use crate::model::{Completion, CompletionIndexItemEx, SuggestRequest, SuggestResponse};
use std::collections::HashMap;
use std::sync::Arc;

pub struct KeyValueAlgorithm {
    algo_type_bit: u32,
    falcon: Arc<dyn Falcon>,
    index: HashMap<String, Vec<CompletionIndexItemEx>>,
}

impl KeyValueAlgorithm {
    pub fn new(
        algo_type_bit: u32,
        falcon: Arc<dyn Falcon>,
        index: HashMap<String, Vec<CompletionIndexItemEx>>,
    ) -> Self {
        Self {
            algo_type_bit,
            falcon,
            index,
        }
    }
}

impl RetrievalAlgorithm for KeyValueAlgorithm {
    fn get_completions(&self, request: &SuggestRequest, _context: &Context) -> SuggestResponse {
        let mut response = SuggestResponse::default();

        if let Some(items) = self.index.get(&request.normalized_query) {
            for item in items {
                let mut completion = Completion::new(item.suggestion_id.clone());
                completion.algo_type = self.algo_type_bit;
                completion.index_score = item.index_score;
                completion.score = item.index_score;
                response.completions.push(completion);
            }
        }

        self.falcon.add_complete_suggestions(&mut response, None);
        response.success = !response.completions.is_empty();
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::falcon::MapFalcon;
    use crate::model::{CompleteSuggestion, DeviceChannel, SrcType, ALGO_PREFIX};

    fn falcon_with(id: &str, base_score: f64) -> Arc<dyn Falcon> {
        Arc::new(MapFalcon::from_entries([(
            id.to_string(),
            CompleteSuggestion {
                src_type: SrcType::City,
                src_id: id.into(),
                country: "US".into(),
                base_score,
                latitude: 0.0,
                longitude: 0.0,
                normalized: "san francisco".into(),
                display: "San Francisco, CA".into(),
                annotations: vec!["CA".into(), "US".into()],
                freq: 100.0,
            },
        )]))
    }

    #[test]
    fn matches_on_exact_normalized_query() {
        let mut index = HashMap::new();
        index.insert(
            "san fr".to_string(),
            vec![CompletionIndexItemEx {
                suggestion_id: "c/US:1".into(),
                index_score: 100.0,
            }],
        );
        let algo = KeyValueAlgorithm::new(ALGO_PREFIX, falcon_with("c/US:1", 1.0), index);
        let mut request = SuggestRequest::new("san fr", DeviceChannel::DesktopWeb);
        request.normalized_query = "san fr".into();
        let context = Context::new(crate::pool::WorkerPool::new(1, 4));
        let response = algo.get_completions(&request, &context);
        assert!(response.success);
        assert_eq!(response.completions.len(), 1);
        assert_eq!(response.completions[0].score, 100.0);
        assert_eq!(response.completions[0].algo_type, ALGO_PREFIX);
    }

    #[test]
    fn no_match_yields_unsuccessful_empty_response() {
        let algo = KeyValueAlgorithm::new(ALGO_PREFIX, falcon_with("c/US:1", 1.0), HashMap::new());
        let mut request = SuggestRequest::new("nowhere", DeviceChannel::DesktopWeb);
        request.normalized_query = "nowhere".into();
        let context = Context::new(crate::pool::WorkerPool::new(1, 4));
        let response = algo.get_completions(&request, &context);
        assert!(!response.success);
        assert!(response.completions.is_empty());
    }
}
