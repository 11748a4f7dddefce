//! Domain boost twiddler: promotes candidates whose backing suggestion's
//! country matches the requester's country. Grounded on the original
//! domain-boost twiddler, which is this simple on purpose: a flat 3x for a
//! country match, neutral otherwise.

use super::{CompletionScore, TwiddleResult, Twiddler};
use crate::model::{SuggestRequest, SuggestResponse};

const COUNTRY_MATCH_BOOST: f64 = 3.0;
const NEUTRAL: f64 = 1.0;

pub struct DomainBoostTwiddler;

impl Twiddler for DomainBoostTwiddler {
    fn get_score(&self, request: &SuggestRequest, response: &SuggestResponse) -> TwiddleResult {
        let completion_scores = response
            .completions
            .iter()
            .map(|completion| {
                let matches_country = completion
                    .suggestion
                    .as_ref()
                    .map(|s| s.country == request.user_country)
                    .unwrap_or(false);
                let score = if matches_country { COUNTRY_MATCH_BOOST } else { NEUTRAL };
                CompletionScore {
                    score,
                    debug_info: format!("domain_boost={score}"),
                }
            })
            .collect();
        TwiddleResult {
            success: true,
            completion_scores,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CompleteSuggestion, Completion, DeviceChannel, SrcType};

    fn completion_with_country(country: &str) -> Completion {
        let mut c = Completion::new("id");
        c.suggestion = Some(std::sync::Arc::new(CompleteSuggestion {
            src_type: SrcType::City,
            src_id: "1".into(),
            country: country.into(),
            base_score: 1.0,
            latitude: 0.0,
            longitude: 0.0,
            normalized: "x".into(),
            display: "x".into(),
            annotations: vec![],
            freq: 1.0,
        }));
        c
    }

    #[test]
    fn boosts_matching_country_by_three() {
        let mut request = SuggestRequest::new("sf", DeviceChannel::DesktopWeb);
        request.user_country = "US".into();
        let response = SuggestResponse {
            success: true,
            completions: vec![completion_with_country("US")],
            enable_instant: false,
        };
        let result = DomainBoostTwiddler.get_score(&request, &response);
        assert_eq!(result.completion_scores[0].score, 3.0);
    }

    #[test]
    fn leaves_mismatched_country_neutral() {
        let mut request = SuggestRequest::new("sf", DeviceChannel::DesktopWeb);
        request.user_country = "US".into();
        let response = SuggestResponse {
            success: true,
            completions: vec![completion_with_country("CA")],
            enable_instant: false,
        };
        let result = DomainBoostTwiddler.get_score(&request, &response);
        assert_eq!(result.completion_scores[0].score, 1.0);
    }
}
