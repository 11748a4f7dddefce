//! Core data model shared by every component: the per-request working types
//! (`Completion`, `SuggestRequest`, `SuggestResponse`) and the immutable
//! backing record (`CompleteSuggestion`) they point into.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Opaque, globally unique identifier for one [`CompleteSuggestion`].
///
/// Composite ids (attribute children, see `algo::attribute`) are built by
/// joining a parent id and qualifier tokens with a registered separator; the
/// parser of a composite id is required to be the exact inverse of its
/// builder.
pub type SuggestionId = String;

pub const ALGO_PREFIX: u32 = 1;
pub const ALGO_MIDSTRING: u32 = 4;
pub const ALGO_BOW: u32 = 8;
pub const ALGO_ALT_NAMES: u32 = 16;
pub const ALGO_SYNONYMS: u32 = 32;
pub const ALGO_SPELL: u32 = 64;
pub const ALGO_TEMPLATE: u32 = 128;
pub const ALGO_ATTRIBUTE: u32 = 256;

/// Decodes an algo-type bitmask into the short names used for the
/// `src:<name>` debug trace appended during finalize (spec §4.11 stage 4).
pub fn algo_type_names(bits: u32) -> Vec<&'static str> {
    let table: &[(u32, &str)] = &[
        (ALGO_PREFIX, "prefix"),
        (ALGO_MIDSTRING, "midstring"),
        (ALGO_BOW, "bow"),
        (ALGO_ALT_NAMES, "alt_names"),
        (ALGO_SYNONYMS, "synonyms"),
        (ALGO_SPELL, "spell"),
        (ALGO_TEMPLATE, "template"),
        (ALGO_ATTRIBUTE, "attribute"),
    ];
    table
        .iter()
        .filter(|(bit, _)| bits & bit != 0)
        .map(|(_, name)| *name)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SrcType {
    Hotel,
    City,
    Neighborhood,
    Attraction,
    Filter,
    Amenity,
    Sort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceChannel {
    DesktopWeb,
    TabletWeb,
    TabletAppIos,
    TabletAppAndroid,
    TabletAppWindows,
    TabletAppOther,
    MobileWeb,
    MobileAppIos,
    MobileAppAndroid,
    MobileAppWindows,
    MobileAppOther,
}

impl DeviceChannel {
    pub fn is_mobile(self) -> bool {
        !matches!(self, DeviceChannel::DesktopWeb | DeviceChannel::TabletWeb)
            && !matches!(
                self,
                DeviceChannel::TabletAppIos
                    | DeviceChannel::TabletAppAndroid
                    | DeviceChannel::TabletAppWindows
                    | DeviceChannel::TabletAppOther
            )
    }
}

/// Immutable once loaded. Shared (via `Arc`) across every request that
/// resolves it; callers must not mutate a record reachable through a
/// [`Completion`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompleteSuggestion {
    pub src_type: SrcType,
    pub src_id: String,
    pub country: String,
    pub base_score: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub normalized: String,
    pub display: String,
    pub annotations: Vec<String>,
    pub freq: f64,
}

/// A pointer into the falcon, as stored in a retrieval index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionIndexItem {
    pub suggestion_id: SuggestionId,
}

/// [`CompletionIndexItem`] extended with a score that overrides
/// `base_score` when non-zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CompletionIndexItemEx {
    pub suggestion_id: SuggestionId,
    #[serde(default)]
    pub index_score: f64,
}

/// Per-request working record for one candidate.
#[derive(Debug, Clone)]
pub struct Completion {
    pub suggestion_id: SuggestionId,
    pub index_score: f64,
    pub score: f64,
    pub algo_type: u32,
    pub suggestion: Option<Arc<CompleteSuggestion>>,
    pub parent_id: Option<SuggestionId>,
    pub debug_info: String,
}

impl Completion {
    pub fn new(suggestion_id: impl Into<SuggestionId>) -> Self {
        Self {
            suggestion_id: suggestion_id.into(),
            index_score: 0.0,
            score: 0.0,
            algo_type: 0,
            suggestion: None,
            parent_id: None,
            debug_info: String::new(),
        }
    }

    pub fn is_parent(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn trace(&mut self, line: impl AsRef<str>) {
        if !self.debug_info.is_empty() {
            self.debug_info.push_str(" | ");
        }
        self.debug_info.push_str(line.as_ref());
    }
}

/// Interface-level request plus the internal derivations `PrepareRequest`
/// fills in (spec §4.11 stage 1).
#[derive(Debug, Clone)]
pub struct SuggestRequest {
    pub input: String,
    pub selected_id: Option<String>,
    pub user_language: String,
    pub user_country: String,
    pub num_suggestions: usize,
    pub device_channel: DeviceChannel,
    pub is_mobile: bool,
    pub debug: bool,

    pub normalized_query: String,
    pub last_word_complete: bool,
    pub alternate_queries: Vec<String>,
}

impl SuggestRequest {
    pub fn new(input: impl Into<String>, device_channel: DeviceChannel) -> Self {
        let input = input.into();
        Self {
            input,
            selected_id: None,
            user_language: String::new(),
            user_country: String::new(),
            num_suggestions: 0,
            is_mobile: device_channel.is_mobile(),
            device_channel,
            debug: false,
            normalized_query: String::new(),
            last_word_complete: false,
            alternate_queries: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SuggestResponse {
    pub success: bool,
    pub completions: Vec<Completion>,
    pub enable_instant: bool,
}
