//! Result assembler. Resolves candidate entries to `(listId, id)` pairs via
//! bounded-concurrency `ElementData` lookups, applies the `listId`
//! restriction, and caps growth at `maxResults`, carrying the rest forward
//! as `more_results_entries` for the next page.

use std::collections::HashSet;

use crypto::{DbKey, Iv};
use futures::{stream, StreamExt};
use store::ElementDataStore;

use crate::{
    error::{Result, SearchError},
    types::{Entry, SearchResult},
};

/// Merges `new_candidates` with any leftover entries from a prior page,
/// resolves them to results in id-descending order, and stops once this
/// call has appended `max_results` entries (when set) - leaving whatever's
/// left in `result.more_results_entries` without re-reading any postings.
pub async fn assemble_page(
    new_candidates: Vec<Entry>,
    result: &mut SearchResult,
    max_results: Option<usize>,
    db_key: &DbKey,
    iv: &Iv,
    element_store: &dyn ElementDataStore,
    concurrency: usize,
) -> Result<()> {
    let mut pending: Vec<Entry> = result.more_results_entries.drain(..).collect();
    pending.extend(new_candidates);
    pending.sort_by(|a, b| b.id.cmp(&a.id));

    let mut seen: HashSet<_> = result.results.iter().map(|(_, id)| *id).collect();
    let list_id_restriction = result.restriction.list_id.clone();

    let mut lookups = stream::iter(pending.into_iter().map(|entry| {
        let key = crypto::id_to_base64(&crypto::encrypt_id(db_key, iv, &entry.id.to_bytes()));
        async move {
            let element = element_store.get_element(&key).await?;
            Ok::<_, SearchError>((entry, element))
        }
    }))
    .buffered(concurrency.max(1));

    let mut added = 0usize;
    let mut leftover = Vec::new();
    let mut stopped = false;

    while let Some(item) = lookups.next().await {
        let (entry, element) = item?;
        if stopped || max_results.is_some_and(|m| added >= m) {
            stopped = true;
            leftover.push(entry);
            continue;
        }
        if seen.contains(&entry.id) {
            continue;
        }
        let Some(element) = element else {
            tracing::debug!(id = %entry.id, "posting pointed at an id with no ElementData, skipping");
            continue;
        };
        if let Some(want) = &list_id_restriction {
            if &element.list_id != want {
                continue;
            }
        }
        seen.insert(entry.id);
        result.results.push((element.list_id, entry.id));
        added += 1;
    }

    result.more_results_entries = leftover;
    Ok(())
}
