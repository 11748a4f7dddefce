//! Attribute Retriever (C8): for the first few parent completions of an
//! earlier phase, looks up attribute-child completions and rewrites their
//! scores and ids into the composite form attributed children use.

use super::{Context, RetrievalAlgorithm};
use crate::model::{SrcType, SuggestRequest, SuggestResponse, ALGO_ATTRIBUTE};

/// Separator used to join a composite attribute-child id's parts. Chosen to
/// be unlikely to collide with a raw suggestion id; `build_composite_id`
/// and `parse_composite_id` are an exact inverse pair regardless.
const SEP: &str = "~";
const DEFAULT_ORDER_KEY: &str = "m/default_order";
const NEIGHBORHOOD_EID: &str = "neighborhood_eid";
const DISTANCE_EID: &str = "distance_eid";

pub fn build_composite_id(parent_id: &str, child_id: &str, ranker_filter_eid: &str) -> String {
    format!("{parent_id}{SEP}({SEP}\"{child_id}\"{SEP}){SEP}{ranker_filter_eid}")
}

/// The exact inverse of [`build_composite_id`].
pub fn parse_composite_id(id: &str) -> Option<(String, String, String)> {
    let parts: Vec<&str> = id.splitn(5, SEP).collect();
    if parts.len() != 5 || parts[1] != "(" || parts[3] != ")" {
        return None;
    }
    let child_id = parts[2].strip_prefix('"')?.strip_suffix('"')?;
    Some((parts[0].to_string(), child_id.to_string(), parts[4].to_string()))
}

pub struct AttributeRetrieverConfig {
    pub max_attribute_candidates: usize,
}

impl Default for AttributeRetrieverConfig {
    fn default() -> Self {
        Self {
            max_attribute_candidates: 3,
        }
    }
}

pub struct AttributeRetriever {
    attribute_index: std::sync::Arc<dyn RetrievalAlgorithm>,
    config: AttributeRetrieverConfig,
}

impl AttributeRetriever {
    pub fn new(
        attribute_index: std::sync::Arc<dyn RetrievalAlgorithm>,
        config: AttributeRetrieverConfig,
    ) -> Self {
        Self {
            attribute_index,
            config,
        }
    }

    fn lookup(&self, key: &str, request: &SuggestRequest, context: &Context) -> SuggestResponse {
        let mut lookup_request = request.clone();
        lookup_request.normalized_query = key.to_string();
        self.attribute_index.get_completions(&lookup_request, context)
    }
}

impl RetrievalAlgorithm for AttributeRetriever {
    fn get_completions(&self, request: &SuggestRequest, context: &Context) -> SuggestResponse {
        let Some(primary) = context.current_response.as_ref() else {
            return SuggestResponse::default();
        };

        let default_order = self.lookup(DEFAULT_ORDER_KEY, request, context);

        let mut response = SuggestResponse::default();
        let parents = primary
            .completions
            .iter()
            .filter(|c| c.is_parent())
            .take(self.config.max_attribute_candidates);

        for parent in parents {
            let mut attributes = self.lookup(&parent.suggestion_id, request, context);
            if attributes.completions.is_empty() {
                attributes = default_order.clone();
            }
            for mut child in attributes.completions {
                let ranker_filter_eid = match child.suggestion.as_ref().map(|s| s.src_type) {
                    Some(SrcType::Neighborhood) => NEIGHBORHOOD_EID,
                    _ => DISTANCE_EID,
                };
                child.score *= parent.score;
                child.algo_type |= ALGO_ATTRIBUTE;
                child.parent_id = Some(parent.suggestion_id.clone());
                child.suggestion_id =
                    build_composite_id(&parent.suggestion_id, &child.suggestion_id, ranker_filter_eid);
                response.completions.push(child);
            }
        }

        response.success = !response.completions.is_empty();
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_id_round_trips() {
        let id = build_composite_id("c/US:1", "a/US:2", "distance_eid");
        let (parent, child, eid) = parse_composite_id(&id).unwrap();
        assert_eq!(parent, "c/US:1");
        assert_eq!(child, "a/US:2");
        assert_eq!(eid, "distance_eid");
    }

    #[test]
    fn parse_rejects_malformed_ids() {
        assert!(parse_composite_id("not-a-composite-id").is_none());
    }
}
