//! Bag-of-Words Retriever (C7): splits the query into words, retrieves each
//! word independently in parallel, then boosts candidates by how well their
//! normalized text matches the word order ("mismatch extent").

use super::{Context, RetrievalAlgorithm};
use crate::model::{Completion, SuggestRequest, SuggestResponse, ALGO_BOW};
use crate::pool::CompletionLatch;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub struct BagOfWordsConfig {
    pub max_suggestions_multiplier: usize,
    pub max_boost: f64,
    pub word_timeout_ms: u64,
}

impl Default for BagOfWordsConfig {
    fn default() -> Self {
        Self {
            max_suggestions_multiplier: 4,
            max_boost: 5.0,
            word_timeout_ms: 100,
        }
    }
}

pub struct BagOfWordsAlgorithm {
    word_algo: Arc<dyn RetrievalAlgorithm>,
    config: BagOfWordsConfig,
}

impl BagOfWordsAlgorithm {
    pub fn new(word_algo: Arc<dyn RetrievalAlgorithm>, config: BagOfWordsConfig) -> Self {
        Self { word_algo, config }
    }
}

impl RetrievalAlgorithm for BagOfWordsAlgorithm {
    fn get_completions(&self, request: &SuggestRequest, context: &Context) -> SuggestResponse {
        let tokens: Vec<&str> = request.normalized_query.split_whitespace().collect();
        if tokens.is_empty() {
            return SuggestResponse::default();
        }

        let latch = CompletionLatch::new(tokens.len());
        let slots: Vec<Arc<Mutex<Option<SuggestResponse>>>> =
            (0..tokens.len()).map(|_| Arc::new(Mutex::new(None))).collect();

        for (i, token) in tokens.iter().enumerate() {
            let word_algo = Arc::clone(&self.word_algo);
            let mut word_request = request.clone();
            word_request.normalized_query = (*token).to_string();
            let word_context = Context {
                pool: Arc::clone(&context.pool),
                latch: None,
                current_response: None,
            };
            let slot = Arc::clone(&slots[i]);
            let child_latch = Arc::clone(&latch);
            context.pool.add(move || {
                let _guard = child_latch.guard();
                let response = word_algo.get_completions(&word_request, &word_context);
                *slot.lock().unwrap() = Some(response);
            });
        }

        latch.wait_timeout(Duration::from_millis(self.config.word_timeout_ms));

        let mut seen = HashSet::new();
        let mut candidates: Vec<Completion> = Vec::new();
        for slot in &slots {
            let Some(word_response) = slot.lock().unwrap().take() else {
                continue;
            };
            for completion in word_response.completions {
                if seen.insert(completion.suggestion_id.clone()) {
                    candidates.push(completion);
                }
            }
        }

        let query_len = request.normalized_query.len();
        candidates.retain_mut(|candidate| {
            let Some(suggestion) = candidate.suggestion.as_ref() else {
                return false;
            };
            let mismatch = word_mismatch_extent(&suggestion.normalized, &tokens);
            if mismatch < 0 {
                return false;
            }
            let max_mismatch = (query_len * suggestion.normalized.len()) as f64;
            let ratio = if max_mismatch > 0.0 {
                mismatch as f64 / max_mismatch
            } else {
                0.0
            };
            // No lower clamp: the source's `max(boost, 1)` is commented out,
            // so a heavily mismatched candidate can end up demoted below 1.
            let boost = self.config.max_boost * (1.0 - ratio);
            candidate.score *= boost;
            candidate.algo_type |= ALGO_BOW;
            true
        });

        candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        let limit = request.num_suggestions.max(1) * self.config.max_suggestions_multiplier;
        candidates.truncate(limit);

        let success = !candidates.is_empty();
        SuggestResponse {
            success,
            completions: candidates,
            enable_instant: false,
        }
    }
}

/// 0 when every token appears, in order, somewhere in `normalized`; -1 when
/// any token cannot be found at all. Otherwise the sum of the character
/// gaps skipped between successive token matches.
fn word_mismatch_extent(normalized: &str, tokens: &[&str]) -> i64 {
    let mut cursor = 0usize;
    let mut mismatch = 0i64;
    for token in tokens {
        if token.is_empty() {
            continue;
        }
        match normalized.get(cursor..).and_then(|rest| rest.find(token)) {
            Some(pos) => {
                mismatch += pos as i64;
                cursor += pos + token.len();
            }
            None => return -1,
        }
    }
    mismatch
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_mismatch_when_words_appear_in_order_contiguously() {
        assert_eq!(word_mismatch_extent("san francisco", &["san", "francisco"]), 0);
    }

    #[test]
    fn positive_mismatch_when_words_are_separated() {
        assert!(word_mismatch_extent("san jose francisco", &["san", "francisco"]) > 0);
    }

    #[test]
    fn negative_one_when_a_token_is_entirely_absent() {
        assert_eq!(word_mismatch_extent("san francisco", &["san", "diego"]), -1);
    }
}
