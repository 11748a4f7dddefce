//! Deduplicator (C9): removes later duplicates from an already-sorted list,
//! by `SuggestionId`.

use crate::model::Completion;
use std::collections::HashSet;

pub trait Dedup: Send + Sync {
    /// Assumes `completions` is already ordered best-to-worst; the retained
    /// occurrence of any repeated id is the first one.
    fn dedup(&self, completions: &mut Vec<Completion>);
}

/// The one concrete deduper in this release: a seen-set walk that drops any
/// completion whose id already appeared earlier in the list.
pub struct DuplicateDedup;

impl Dedup for DuplicateDedup {
    fn dedup(&self, completions: &mut Vec<Completion>) {
        let mut seen = HashSet::with_capacity(completions.len());
        completions.retain(|c| seen.insert(c.suggestion_id.clone()));
    }
}

/// Runs a configured chain of dedupers in order; each sees the previous
/// deduper's output.
pub struct DedupChain {
    dedupers: Vec<Box<dyn Dedup>>,
}

impl DedupChain {
    pub fn new(dedupers: Vec<Box<dyn Dedup>>) -> Self {
        Self { dedupers }
    }

    pub fn run(&self, completions: &mut Vec<Completion>) {
        for deduper in &self.dedupers {
            deduper.dedup(completions);
        }
    }
}
