//! Tunable constants for the pipeline's page sizing and concurrency limits.

use serde::{Deserialize, Serialize};

/// Per-term, per-page cap on the summed `size` of chunk descriptors read
/// before the page stops advancing that term's cursor.
pub const DEFAULT_MAX_ENTRIES_PER_TERM_PER_PAGE: usize = 1000;

/// Bounded concurrency cap for `ElementData` point lookups during result
/// assembly.
pub const DEFAULT_ELEMENT_LOOKUP_CONCURRENCY: usize = 5;

/// Used when `search()`/`get_more_search_results()` is called with
/// `maxResults = None`: an internal ceiling so a single page stays bounded
/// even for an "unbounded" request.
pub const DEFAULT_MAX_RESULTS_CEILING: usize = 10_000;

/// Deployment-tunable knobs, deserializable from a deploy config file
/// alongside the rest of a host application's settings; any field left out
/// falls back to its compiled-in default.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchTunables {
    pub max_entries_per_term_per_page: usize,
    pub element_lookup_concurrency: usize,
    pub max_results_ceiling: usize,
}

impl Default for SearchTunables {
    fn default() -> Self {
        Self {
            max_entries_per_term_per_page: DEFAULT_MAX_ENTRIES_PER_TERM_PER_PAGE,
            element_lookup_concurrency: DEFAULT_ELEMENT_LOOKUP_CONCURRENCY,
            max_results_ceiling: DEFAULT_MAX_RESULTS_CEILING,
        }
    }
}
