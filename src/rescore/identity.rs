//! Identity twiddler: the neutral rescorer, used as the secondary-phase
//! default so secondary results aren't re-weighted beyond what the primary
//! pipeline already applied.

use super::{TwiddleResult, Twiddler};
use crate::model::{SuggestRequest, SuggestResponse};

pub struct IdentityTwiddler;

impl Twiddler for IdentityTwiddler {
    fn get_score(&self, _request: &SuggestRequest, response: &SuggestResponse) -> TwiddleResult {
        TwiddleResult::neutral(response.completions.len())
    }
}
