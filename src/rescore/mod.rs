//! Rescorer (Twiddler) and Rescorer Group (C10): one multiplicative score
//! per candidate, composed from multiple independently-scored children.

mod domain_boost;
mod group;
mod identity;

pub use domain_boost::DomainBoostTwiddler;
pub use group::{CombineOp, RescorerGroup, RescorerGroupConfig, TwiddlerChildConfig};
pub use identity::IdentityTwiddler;

use crate::model::{SuggestRequest, SuggestResponse};

#[derive(Debug, Clone)]
pub struct CompletionScore {
    pub score: f64,
    pub debug_info: String,
}

#[derive(Debug, Clone, Default)]
pub struct TwiddleResult {
    pub success: bool,
    pub completion_scores: Vec<CompletionScore>,
}

impl TwiddleResult {
    pub fn neutral(len: usize) -> Self {
        Self {
            success: true,
            completion_scores: vec![
                CompletionScore {
                    score: 1.0,
                    debug_info: String::new(),
                };
                len
            ],
        }
    }
}

/// A rescorer produces one score per completion, in the same order as
/// `response.completions`, interpreted multiplicatively over the
/// completion's current score.
pub trait Twiddler: Send + Sync {
    fn get_score(&self, request: &SuggestRequest, response: &SuggestResponse) -> TwiddleResult;
}
