//! Search orchestrator. Owns the collaborators and stores, ties the rest of
//! the pipeline together, and is the crate's public entry point.

use std::sync::Arc;

use crypto::{DbKey, Iv};
use store::{ElementDataStore, SearchIndexMetaDataStore, SearchIndexStore};

use crate::{
    assemble,
    collaborators::{EntityLoader, Indexer, SuggestionProvider, Tokenizer},
    config::SearchTunables,
    constraint,
    error::Result,
    intersect,
    key_encoder,
    meta,
    metrics,
    model::TypeModelRegistry,
    phrase,
    posting,
    suggestion,
    types::{
        ChunkDescriptor, Cursor, EncryptedEntry, Entry, SearchRestriction, SearchResult, Term,
        TypeRef, FULL_INDEXED_TIMESTAMP,
    },
};

const MILLIS_PER_DAY: i64 = 86_400_000;

fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock is after the unix epoch")
        .as_millis() as i64
}

fn start_of_day(timestamp_ms: i64) -> i64 {
    timestamp_ms - timestamp_ms.rem_euclid(MILLIS_PER_DAY)
}

/// One term's raw read for a page: its still-encrypted entries and the
/// cursor value the next page should carry forward.
pub(crate) struct TermPage {
    pub encrypted_entries: Vec<EncryptedEntry>,
    pub cursor: Option<u64>,
}

/// Resolves a term to the chunk descriptors eligible for this page (those
/// with `key < last_read_chunk_key`, capped at `max_entries_per_page` summed
/// `size`) and fetches their framed, still-encrypted entries.
pub(crate) async fn read_term_page(
    meta_store: &dyn SearchIndexMetaDataStore,
    index_store: &dyn SearchIndexStore,
    db_key: &DbKey,
    iv: &Iv,
    term: &str,
    type_ref: TypeRef,
    last_read_chunk_key: Option<u64>,
    max_entries_per_page: usize,
) -> Result<TermPage> {
    let index_key = key_encoder::index_key(db_key, iv, &term.to_string());
    let descriptors = meta::read_meta(meta_store, db_key, iv, &index_key, type_ref).await?;

    let eligible: Vec<ChunkDescriptor> = descriptors
        .into_iter()
        .filter(|d| last_read_chunk_key.map_or(true, |last| d.key < last))
        .collect();

    let mut selected = Vec::new();
    let mut cumulative = 0usize;
    for d in eligible {
        if cumulative >= max_entries_per_page {
            break;
        }
        cumulative += d.size as usize;
        selected.push(d);
    }

    // Newest-first order (read_meta sorts descending), so the last
    // descriptor selected carries the smallest key read this page - the
    // next page's cursor.
    let cursor = selected.last().map(|d| d.key).or(last_read_chunk_key);

    let mut encrypted_entries = Vec::new();
    for d in &selected {
        encrypted_entries.extend(posting::fetch_chunk(index_store, d).await?);
    }

    Ok(TermPage {
        encrypted_entries,
        cursor,
    })
}

fn decrypt_and_filter(
    db_key: &DbKey,
    iv: &Iv,
    encrypted_entries: Vec<EncryptedEntry>,
    restriction: &SearchRestriction,
    bounds: constraint::IdBounds,
) -> Result<Vec<Entry>> {
    let mut entries = Vec::with_capacity(encrypted_entries.len());
    for enc in &encrypted_entries {
        entries.push(posting::decrypt_entry(db_key, iv, enc)?);
    }
    Ok(constraint::filter(entries, restriction, bounds))
}

pub(crate) struct AndPipelineResult {
    pub candidates: Vec<Entry>,
    pub cursors: Vec<Cursor>,
}

/// Runs the read-decrypt-filter-intersect pipeline over a list of terms,
/// AND-combined: the shared pipeline behind both the normal search path and
/// the suggestion path's except-the-last-term AND search.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn run_and_pipeline(
    meta_store: &dyn SearchIndexMetaDataStore,
    index_store: &dyn SearchIndexStore,
    db_key: &DbKey,
    iv: &Iv,
    terms: &[Term],
    restriction: &SearchRestriction,
    bounds: constraint::IdBounds,
    match_word_order: bool,
    existing_cursors: &[Cursor],
    max_entries_per_term_per_page: usize,
) -> Result<AndPipelineResult> {
    let mut term_pages = Vec::with_capacity(terms.len());
    for term in terms {
        let last_read = existing_cursors
            .iter()
            .find(|c| &c.term == term)
            .and_then(|c| c.last_read_chunk_key);
        term_pages.push(
            read_term_page(
                meta_store,
                index_store,
                db_key,
                iv,
                term,
                restriction.type_ref,
                last_read,
                max_entries_per_term_per_page,
            )
            .await?,
        );
    }

    let cursors: Vec<Cursor> = terms
        .iter()
        .zip(term_pages.iter())
        .map(|(term, page)| Cursor {
            term: term.clone(),
            last_read_chunk_key: page.cursor,
        })
        .collect();

    let encrypted_lists: Vec<Vec<EncryptedEntry>> =
        term_pages.into_iter().map(|p| p.encrypted_entries).collect();
    let hash_filtered = intersect::intersect_by_hash(&encrypted_lists);

    let mut decrypted_lists = Vec::with_capacity(hash_filtered.len());
    for list in hash_filtered {
        decrypted_lists.push(decrypt_and_filter(db_key, iv, list, restriction, bounds)?);
    }

    let id_filtered = intersect::intersect_by_id(&decrypted_lists);
    let candidates = phrase::reduce(&id_filtered, match_word_order);

    Ok(AndPipelineResult { candidates, cursors })
}

/// Owns the collaborators and stores a search needs, and is the crate's
/// public entry point.
pub struct SearchCore {
    pub tokenizer: Arc<dyn Tokenizer>,
    pub indexer: Arc<dyn Indexer>,
    pub suggestions: Arc<dyn SuggestionProvider>,
    pub entity_loader: Arc<dyn EntityLoader>,
    pub type_models: Arc<dyn TypeModelRegistry>,
    pub meta_store: Arc<dyn SearchIndexMetaDataStore>,
    pub index_store: Arc<dyn SearchIndexStore>,
    pub element_store: Arc<dyn ElementDataStore>,
    pub db_key: DbKey,
    pub iv: Iv,
    /// The mailbox owner the index-extension protocol extends on behalf of.
    pub user: String,
    pub tunables: SearchTunables,
}

impl SearchCore {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tokenizer: Arc<dyn Tokenizer>,
        indexer: Arc<dyn Indexer>,
        suggestions: Arc<dyn SuggestionProvider>,
        entity_loader: Arc<dyn EntityLoader>,
        type_models: Arc<dyn TypeModelRegistry>,
        meta_store: Arc<dyn SearchIndexMetaDataStore>,
        index_store: Arc<dyn SearchIndexStore>,
        element_store: Arc<dyn ElementDataStore>,
        db_key: DbKey,
        iv: Iv,
        user: String,
        tunables: SearchTunables,
    ) -> Self {
        Self {
            tokenizer,
            indexer,
            suggestions,
            entity_loader,
            type_models,
            meta_store,
            index_store,
            element_store,
            db_key,
            iv,
            user,
            tunables,
        }
    }

    async fn extend_index_if_needed(&self, restriction: &SearchRestriction, current_index_timestamp: i64) -> Result<()> {
        let Some(end) = restriction.end else {
            return Ok(());
        };
        if !restriction.type_ref.is_mail() {
            return Ok(());
        }
        if current_index_timestamp <= FULL_INDEXED_TIMESTAMP || current_index_timestamp <= end {
            return Ok(());
        }
        match self.indexer.index_mailboxes(&self.user, start_of_day(end)).await {
            Ok(()) => Ok(()),
            Err(e) if matches!(e, errors::SearchError::Cancelled(_)) => {
                tracing::warn!(user = %self.user, "index extension cancelled, proceeding with whatever is indexed");
                metrics::inc_index_extension_cancelled();
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Runs one query and returns a page of results, resuming nothing.
    #[tracing::instrument(skip(self, restriction), fields(terms))]
    pub async fn search(
        &self,
        query: &str,
        restriction: SearchRestriction,
        min_suggestion_count: usize,
        max_results: Option<usize>,
    ) -> Result<SearchResult> {
        let start = std::time::Instant::now();
        let terms = self.tokenizer.tokenize(query);
        tracing::Span::current().record("terms", terms.len());
        let current_index_timestamp = self.indexer.current_index_timestamp();
        let mut result = SearchResult::empty(query.to_string(), restriction.clone(), current_index_timestamp, terms.len());

        if terms.is_empty() {
            return Ok(result);
        }

        self.extend_index_if_needed(&restriction, current_index_timestamp).await?;

        let now = now_ms();
        let effective_max_results = max_results.or(Some(self.tunables.max_results_ceiling));

        if min_suggestion_count > 0 {
            let candidates = if terms.len() == 1 {
                suggestion::single_term(
                    &*self.meta_store,
                    &*self.index_store,
                    &*self.suggestions,
                    &self.db_key,
                    &self.iv,
                    &terms[0],
                    &restriction,
                    current_index_timestamp,
                    now,
                    self.tunables.max_entries_per_term_per_page,
                )
                .await?
            } else {
                let (and_terms, last_term) = terms.split_at(terms.len() - 1);
                suggestion::multi_term(
                    &*self.meta_store,
                    &*self.index_store,
                    &*self.entity_loader,
                    &*self.type_models,
                    &*self.tokenizer,
                    &self.db_key,
                    &self.iv,
                    and_terms,
                    &last_term[0],
                    &restriction,
                    current_index_timestamp,
                    now,
                    min_suggestion_count,
                    self.tunables.max_entries_per_term_per_page,
                )
                .await?
            };
            assemble::assemble_page(
                candidates,
                &mut result,
                effective_max_results,
                &self.db_key,
                &self.iv,
                &*self.element_store,
                self.tunables.element_lookup_concurrency,
            )
            .await?;
        } else {
            let bounds = constraint::resolve_bounds(&restriction, current_index_timestamp, now);
            let AndPipelineResult { candidates, cursors } = run_and_pipeline(
                &*self.meta_store,
                &*self.index_store,
                &self.db_key,
                &self.iv,
                &terms,
                &restriction,
                bounds,
                result.match_word_order,
                &[],
                self.tunables.max_entries_per_term_per_page,
            )
            .await?;
            assemble::assemble_page(
                candidates,
                &mut result,
                effective_max_results,
                &self.db_key,
                &self.iv,
                &*self.element_store,
                self.tunables.element_lookup_concurrency,
            )
            .await?;
            result.last_read_search_index_row = cursors;
        }

        result.results.sort_by(|a, b| b.1.cmp(&a.1));
        let elapsed = start.elapsed();
        metrics::observe_search(elapsed.as_secs_f64());
        tracing::debug!(
            elapsed_ms = elapsed.as_millis() as u64,
            results = result.results.len(),
            "search page complete"
        );
        Ok(result)
    }

    /// Re-invokes the AND pipeline with `result`'s existing cursors and
    /// `more_result_count` as the page's `maxResults`. A no-op on a
    /// suggestion-path result, which carries no per-term cursor to resume
    /// (the union/prefix-filter passes are not incrementally resumable).
    #[tracing::instrument(skip(self, result))]
    pub async fn get_more_search_results(&self, result: &mut SearchResult, more_result_count: usize) -> Result<()> {
        if result.last_read_search_index_row.is_empty() {
            return Ok(());
        }
        let start = std::time::Instant::now();
        let terms: Vec<Term> = result
            .last_read_search_index_row
            .iter()
            .map(|c| c.term.clone())
            .collect();
        let current_index_timestamp = self.indexer.current_index_timestamp();
        let now = now_ms();
        let bounds = constraint::resolve_bounds(&result.restriction, current_index_timestamp, now);

        let AndPipelineResult { candidates, cursors } = run_and_pipeline(
            &*self.meta_store,
            &*self.index_store,
            &self.db_key,
            &self.iv,
            &terms,
            &result.restriction,
            bounds,
            result.match_word_order,
            &result.last_read_search_index_row,
            self.tunables.max_entries_per_term_per_page,
        )
        .await?;

        assemble::assemble_page(
            candidates,
            result,
            Some(more_result_count),
            &self.db_key,
            &self.iv,
            &*self.element_store,
            self.tunables.element_lookup_concurrency,
        )
        .await?;
        result.last_read_search_index_row = cursors;
        result.results.sort_by(|a, b| b.1.cmp(&a.1));
        let elapsed = start.elapsed();
        metrics::observe_pagination(elapsed.as_secs_f64());
        tracing::debug!(
            elapsed_ms = elapsed.as_millis() as u64,
            results = result.results.len(),
            "pagination page complete"
        );
        Ok(())
    }
}
