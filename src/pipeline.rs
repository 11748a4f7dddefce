//! Request Pipeline (C12): the per-request state machine. Single-threaded
//! with respect to its own state; everything it calls into may itself
//! schedule concurrent children on the manager's worker pool.

use crate::manager::SuggestionManager;
use crate::model::{Completion, SuggestRequest, SuggestResponse};
use std::cmp::Ordering;
use std::sync::Arc;

const DEFAULT_NUM_SUGGESTIONS_MOBILE: usize = 5;
const DEFAULT_NUM_SUGGESTIONS_WEB: usize = 10;

/// Stage 1: normalises `request` in place. Returns `false` iff the
/// normalised query ends up empty, in which case the caller must reject the
/// whole request without invoking any algorithm.
pub fn prepare_request(request: &mut SuggestRequest) -> bool {
    request.last_word_complete = request.input.ends_with(' ');
    request.normalized_query = normalize(&request.input);

    if request.user_country.is_empty() {
        request.user_country = "US".to_string();
    }
    if request.user_language.is_empty() {
        request.user_language = "en".to_string();
    }
    if request.num_suggestions == 0 {
        request.num_suggestions = if request.is_mobile {
            DEFAULT_NUM_SUGGESTIONS_MOBILE
        } else {
            DEFAULT_NUM_SUGGESTIONS_WEB
        };
    }

    !request.normalized_query.is_empty()
}

/// Lower-cases and collapses runs of whitespace to single spaces, trimming
/// the ends. This is the "tokenised form" `CompleteSuggestion.normalized`
/// entries are already stored in, so queries can be compared against them
/// directly.
fn normalize(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// Runs the full PrepareRequest → Primary → (Fallback) → Secondary →
/// Finalize pipeline described in spec §4.11, returning the response that
/// should be served (possibly empty, with `success=false`, if the request
/// was rejected at stage 1).
pub fn run(manager: &SuggestionManager, mut request: SuggestRequest) -> SuggestResponse {
    if !prepare_request(&mut request) {
        return SuggestResponse::default();
    }

    let mut response = primary_flow(manager, &request);

    if !response.completions.is_empty() {
        secondary_flow(manager, &request, &mut response);
    }

    finalize(manager, &request, &mut response);
    response
}

fn primary_flow(manager: &SuggestionManager, request: &SuggestRequest) -> SuggestResponse {
    let mut response = manager.run_primary(request);

    if response.success && !response.completions.is_empty() {
        apply_rescorer(&manager.primary_rescorer, request, &mut response, &manager.pool);
        sort_and_truncate(
            &mut response.completions,
            request.num_suggestions * manager.config.max_suggestions_multiplier,
        );
        manager.dedupers.run(&mut response.completions);
        response.completions.truncate(request.num_suggestions);
        return response;
    }

    manager.run_fallback(request)
}

fn secondary_flow(manager: &SuggestionManager, request: &SuggestRequest, response: &mut SuggestResponse) {
    let current = Arc::new(response.clone());
    let mut secondary = manager.run_secondary(request, current);

    if !secondary.success || secondary.completions.is_empty() {
        return;
    }

    apply_rescorer(&manager.secondary_rescorer, request, &mut secondary, &manager.pool);

    let secondary_limit = (request.num_suggestions.saturating_sub(response.completions.len()))
        .max(manager.config.min_secondary_suggestions);
    sort_and_truncate(&mut secondary.completions, secondary_limit);

    response.completions.append(&mut secondary.completions);
    sort_and_truncate(
        &mut response.completions,
        request.num_suggestions * manager.config.max_suggestions_multiplier,
    );
    manager.dedupers.run(&mut response.completions);
    response.completions.truncate(request.num_suggestions);
}

fn apply_rescorer(
    rescorer: &crate::rescore::RescorerGroup,
    request: &SuggestRequest,
    response: &mut SuggestResponse,
    pool: &Arc<crate::pool::WorkerPool>,
) {
    let result = rescorer.run(request, response, pool);
    if !result.success {
        return;
    }
    for (completion, score) in response.completions.iter_mut().zip(result.completion_scores) {
        completion.score *= score.score;
        if !score.debug_info.is_empty() {
            completion.trace(score.debug_info);
        }
    }
}

/// Stable sort descending by score, tying on `src_type` ascending (parents
/// with no resolved suggestion sort last among ties since there's no
/// `src_type` to compare). Spec §9 notes the source's own prefix-vs-child
/// tie-break was dead code behind a disabled flag; only the score/src_type
/// comparator described in §4.11 stage 2 is implemented here.
fn sort_and_truncate(completions: &mut Vec<Completion>, limit: usize) {
    completions.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| match (&a.suggestion, &b.suggestion) {
                (Some(sa), Some(sb)) => sa.src_type.cmp(&sb.src_type),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            })
    });
    completions.truncate(limit);
}

fn finalize(manager: &SuggestionManager, request: &SuggestRequest, response: &mut SuggestResponse) {
    response.completions.truncate(request.num_suggestions);
    fix_parent_child_positions(response);
    check_instant_search_eligibility(manager, response);
    append_algo_trace(response);
}

/// §4.11.1: reorders the list so each child immediately follows its parent.
/// Children whose parent isn't present in the response are dropped.
fn fix_parent_child_positions(response: &mut SuggestResponse) {
    let original: Vec<Completion> = std::mem::take(&mut response.completions);

    let mut children_by_parent: std::collections::HashMap<String, Vec<(usize, Completion)>> =
        std::collections::HashMap::new();
    let mut parents: Vec<(usize, Completion)> = Vec::new();

    for (index, completion) in original.into_iter().enumerate() {
        match completion.parent_id.clone() {
            Some(parent_id) => children_by_parent.entry(parent_id).or_default().push((index, completion)),
            None => parents.push((index, completion)),
        }
    }

    let mut reordered = Vec::new();
    for (original_index, mut parent) in parents {
        let new_index = reordered.len();
        if new_index != original_index {
            parent.trace("position adjusted during parent/child reordering");
        }
        let parent_id = parent.suggestion_id.clone();
        reordered.push(parent);

        if let Some(children) = children_by_parent.remove(&parent_id) {
            for (child_original_index, mut child) in children {
                let child_new_index = reordered.len();
                if child_new_index != child_original_index {
                    child.trace("position adjusted during parent/child reordering");
                }
                reordered.push(child);
            }
        }
    }

    response.completions = reordered;
}

/// §4.12: whether the top completion qualifies for instant search.
fn check_instant_search_eligibility(manager: &SuggestionManager, response: &mut SuggestResponse) {
    response.enable_instant = false;

    let Some(top) = response.completions.first() else {
        return;
    };
    let Some(top_suggestion) = top.suggestion.as_ref() else {
        return;
    };
    if top_suggestion.freq < manager.config.top_suggestion_min_freq_for_instant {
        return;
    }

    let total: f64 = response
        .completions
        .iter()
        .filter(|c| c.is_parent())
        .map(|c| c.score)
        .sum();

    if top.score < total * manager.config.top_suggestion_min_selection_probability_for_instant {
        return;
    }

    response.enable_instant = true;
}

fn append_algo_trace(response: &mut SuggestResponse) {
    for completion in &mut response.completions {
        let names = crate::model::algo_type_names(completion.algo_type);
        if names.is_empty() {
            continue;
        }
        completion.trace(format!("src:{}", names.join(",")));
    }
}
