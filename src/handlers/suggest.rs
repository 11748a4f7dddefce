use crate::error::{AppError, Result};
use crate::model::{DeviceChannel, SrcType, SuggestRequest, SuggestResponse};
use crate::state::AppState;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

#[derive(Debug, Deserialize)]
pub struct SuggestionRequestBody {
    pub input: String,
    #[serde(default)]
    pub selected_id: Option<String>,
    #[serde(default)]
    pub user_language: String,
    #[serde(default)]
    pub user_country: String,
    #[serde(default)]
    pub num_suggestions: usize,
    #[serde(default = "default_device_channel")]
    pub device_channel: DeviceChannel,
}

fn default_device_channel() -> DeviceChannel {
    DeviceChannel::DesktopWeb
}

impl From<SuggestionRequestBody> for SuggestRequest {
    fn from(body: SuggestionRequestBody) -> Self {
        let mut request = SuggestRequest::new(body.input, body.device_channel);
        request.selected_id = body.selected_id;
        request.user_language = body.user_language;
        request.user_country = body.user_country;
        request.num_suggestions = body.num_suggestions;
        request
    }
}

#[derive(Debug, Serialize)]
pub struct ReleaseCompletion {
    pub suggestion_id: String,
    pub display: String,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
    pub child: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SuggestReply {
    pub success: bool,
    pub enable_instant: bool,
    pub suggestions: Vec<ReleaseCompletion>,
}

/// POST /suggest — runs the full pipeline on a blocking thread (the
/// pipeline blocks on latches and is CPU-bound, so it's wrapped in
/// `spawn_blocking` + `tokio::time::timeout` the same way `rerank_handler`
/// bounds ONNX inference) and projects the result through the release
/// reply shape (§6.2).
pub async fn suggest_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SuggestionRequestBody>,
) -> Result<Json<SuggestReply>> {
    let response = run_pipeline(&state, body.into()).await?;
    metrics::counter!("suggest_requests_total").increment(1);
    Ok(Json(build_release_reply(&response)))
}

/// POST /suggest/debug — same pipeline run, echoing the raw internal
/// response (full `debug_info` traces included) instead of projecting it.
/// Gated behind `Config::debug_enabled`.
pub async fn suggest_debug_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SuggestionRequestBody>,
) -> Result<Json<DebugReply>> {
    if !state.config.debug_enabled {
        return Err(AppError::ComponentUnavailable("debug endpoint is disabled".to_string()));
    }
    let mut request: SuggestRequest = body.into();
    request.debug = true;
    let response = run_pipeline(&state, request).await?;
    metrics::counter!("suggest_debug_requests_total").increment(1);
    Ok(Json(DebugReply::from(response)))
}

#[derive(Debug, Serialize)]
pub struct DebugCompletion {
    pub suggestion_id: String,
    pub index_score: f64,
    pub score: f64,
    pub algo_type: u32,
    pub parent_id: Option<String>,
    pub debug_info: String,
}

#[derive(Debug, Serialize)]
pub struct DebugReply {
    pub success: bool,
    pub enable_instant: bool,
    pub completions: Vec<DebugCompletion>,
}

impl From<SuggestResponse> for DebugReply {
    fn from(response: SuggestResponse) -> Self {
        Self {
            success: response.success,
            enable_instant: response.enable_instant,
            completions: response
                .completions
                .into_iter()
                .map(|c| DebugCompletion {
                    suggestion_id: c.suggestion_id,
                    index_score: c.index_score,
                    score: c.score,
                    algo_type: c.algo_type,
                    parent_id: c.parent_id,
                    debug_info: c.debug_info,
                })
                .collect(),
        }
    }
}

async fn run_pipeline(state: &Arc<AppState>, request: SuggestRequest) -> Result<SuggestResponse> {
    let correlation_id = uuid::Uuid::new_v4();
    let manager = Arc::clone(&state.manager);
    let timeout = Duration::from_millis(state.config.request_timeout_ms);
    let span = tracing::info_span!("suggest", correlation_id = %correlation_id);

    async move {
        tokio::time::timeout(timeout, tokio::task::spawn_blocking(move || crate::pipeline::run(&manager, request)))
            .await
            .map_err(|_| AppError::ComponentUnavailable("suggestion pipeline timed out".to_string()))?
            .map_err(|e| AppError::Internal(format!("pipeline task join error: {e}")))
    }
    .instrument(span)
    .await
}

/// §6.2: the full-vs-shortened annotation choice turns on how many
/// city-typed parents share the same `(normalized, last annotation)` key.
fn build_release_reply(response: &SuggestResponse) -> SuggestReply {
    let mut disambiguation_name_count: HashMap<(String, String), usize> = HashMap::new();
    for completion in &response.completions {
        if completion.parent_id.is_some() {
            continue;
        }
        let Some(suggestion) = completion.suggestion.as_ref() else {
            continue;
        };
        if suggestion.src_type != SrcType::City {
            continue;
        }
        let Some(last) = suggestion.annotations.last() else {
            continue;
        };
        *disambiguation_name_count
            .entry((suggestion.normalized.clone(), last.clone()))
            .or_insert(0) += 1;
    }

    let suggestions = response
        .completions
        .iter()
        .map(|completion| {
            let Some(suggestion) = completion.suggestion.as_ref() else {
                return ReleaseCompletion {
                    suggestion_id: completion.suggestion_id.clone(),
                    display: String::new(),
                    score: completion.score,
                    annotation: None,
                    child: completion.parent_id.is_some(),
                    query: None,
                };
            };

            if completion.parent_id.is_some() {
                return ReleaseCompletion {
                    suggestion_id: completion.suggestion_id.clone(),
                    display: suggestion.display.clone(),
                    score: completion.score,
                    annotation: None,
                    child: true,
                    query: Some(suggestion.display.clone()),
                };
            }

            let annotation = if suggestion.src_type == SrcType::City {
                suggestion.annotations.last().map(|last| {
                    let key = (suggestion.normalized.clone(), last.clone());
                    let shares_disambiguation = disambiguation_name_count.get(&key).copied().unwrap_or(0) > 1;
                    if shares_disambiguation {
                        suggestion.annotations.join(", ")
                    } else {
                        last.clone()
                    }
                })
            } else {
                None
            };

            ReleaseCompletion {
                suggestion_id: completion.suggestion_id.clone(),
                display: suggestion.display.clone(),
                score: completion.score,
                annotation,
                child: false,
                query: None,
            }
        })
        .collect();

    SuggestReply {
        success: response.success,
        enable_instant: response.enable_instant,
        suggestions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CompleteSuggestion, Completion};
    use std::sync::Arc as StdArc;

    fn city_completion(id: &str, normalized: &str, annotations: Vec<&str>) -> Completion {
        let mut completion = Completion::new(id);
        completion.score = 10.0;
        completion.suggestion = Some(StdArc::new(CompleteSuggestion {
            src_type: SrcType::City,
            src_id: id.into(),
            country: "US".into(),
            base_score: 10.0,
            latitude: 0.0,
            longitude: 0.0,
            normalized: normalized.into(),
            display: format!("{normalized} display"),
            annotations: annotations.into_iter().map(String::from).collect(),
            freq: 100.0,
        }));
        completion
    }

    #[test]
    fn unique_disambiguation_key_gets_shortened_annotation() {
        let response = SuggestResponse {
            success: true,
            completions: vec![city_completion("c/1", "springfield", vec!["IL", "US"])],
            enable_instant: false,
        };
        let reply = build_release_reply(&response);
        assert_eq!(reply.suggestions[0].annotation.as_deref(), Some("US"));
    }

    #[test]
    fn shared_disambiguation_key_gets_full_annotation() {
        let response = SuggestResponse {
            success: true,
            completions: vec![
                city_completion("c/1", "springfield", vec!["IL", "US"]),
                city_completion("c/2", "springfield", vec!["MO", "US"]),
            ],
            enable_instant: false,
        };
        let reply = build_release_reply(&response);
        // both share (normalized="springfield", last_annotation="US") even though their
        // full annotation lists differ, so both get the full joined form.
        assert_eq!(reply.suggestions[0].annotation.as_deref(), Some("IL, US"));
        assert_eq!(reply.suggestions[1].annotation.as_deref(), Some("MO, US"));
    }

    #[test]
    fn child_completion_echoes_display_into_query() {
        let mut child = city_completion("a/1", "x", vec!["US"]);
        child.parent_id = Some("c/1".to_string());
        let response = SuggestResponse {
            success: true,
            completions: vec![child],
            enable_instant: false,
        };
        let reply = build_release_reply(&response);
        assert!(reply.suggestions[0].child);
        assert_eq!(reply.suggestions[0].query, Some(reply.suggestions[0].display.clone()));
    }
}
