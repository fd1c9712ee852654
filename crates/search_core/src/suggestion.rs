//! Suggestion path. Complements the inverted-index AND search with prefix
//! completion: either a union-search over the suggestion collaborator's
//! expansions of a single term, or an AND-search over every term but the
//! last followed by a loaded-entity prefix check.

use std::collections::{HashMap, HashSet};

use crypto::{DbKey, Iv};
use store::{SearchIndexMetaDataStore, SearchIndexStore};

use crate::{
    collaborators::{EntityLoader, SuggestionProvider, Tokenizer},
    constraint,
    error::Result,
    model::{Entity, EntityValue, FieldKind, TypeModel, TypeModelRegistry},
    orchestrator::{read_term_page, run_and_pipeline, AndPipelineResult},
    posting,
    types::{Entry, SearchRestriction, Term, TypeRef},
};

/// Bound on aggregation-association recursion while checking an entity for
/// a prefix match: paired with a visited-type-id set so a cyclic aggregation
/// graph still terminates.
const MAX_TYPE_MODEL_DEPTH: usize = 6;

/// Single-term case: search the union of the suggestion collaborator's
/// completions, as if they were synonyms of the sole term (not an
/// intersection).
#[allow(clippy::too_many_arguments)]
pub(crate) async fn single_term(
    meta_store: &dyn SearchIndexMetaDataStore,
    index_store: &dyn SearchIndexStore,
    suggestions: &dyn SuggestionProvider,
    db_key: &DbKey,
    iv: &Iv,
    term: &Term,
    restriction: &SearchRestriction,
    current_index_timestamp: i64,
    now_ms: i64,
    max_entries_per_term_per_page: usize,
) -> Result<Vec<Entry>> {
    let expansions = suggestions.get_suggestions(restriction.type_ref, term).await?;
    let bounds = constraint::resolve_bounds(restriction, current_index_timestamp, now_ms);

    let mut by_id: HashMap<_, Entry> = HashMap::new();
    for expansion in &expansions {
        let page = read_term_page(
            meta_store,
            index_store,
            db_key,
            iv,
            expansion,
            restriction.type_ref,
            None,
            max_entries_per_term_per_page,
        )
        .await?;
        let mut entries = Vec::with_capacity(page.encrypted_entries.len());
        for enc in &page.encrypted_entries {
            entries.push(posting::decrypt_entry(db_key, iv, enc)?);
        }
        for entry in constraint::filter(entries, restriction, bounds) {
            by_id.entry(entry.id).or_insert(entry);
        }
    }

    let mut union: Vec<Entry> = by_id.into_values().collect();
    union.sort_by(|a, b| b.id.cmp(&a.id));
    Ok(union)
}

/// Multi-term case: AND-search every term but the last, then keep only
/// candidates whose loaded entity has some field matching the last term as
/// a prefix, stopping once `min_suggestion_count` have passed.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn multi_term(
    meta_store: &dyn SearchIndexMetaDataStore,
    index_store: &dyn SearchIndexStore,
    entity_loader: &dyn EntityLoader,
    type_models: &dyn TypeModelRegistry,
    tokenizer: &dyn Tokenizer,
    db_key: &DbKey,
    iv: &Iv,
    and_terms: &[Term],
    last_term: &Term,
    restriction: &SearchRestriction,
    current_index_timestamp: i64,
    now_ms: i64,
    min_suggestion_count: usize,
    max_entries_per_term_per_page: usize,
) -> Result<Vec<Entry>> {
    let bounds = constraint::resolve_bounds(restriction, current_index_timestamp, now_ms);
    let AndPipelineResult { mut candidates, .. } = run_and_pipeline(
        meta_store,
        index_store,
        db_key,
        iv,
        and_terms,
        restriction,
        bounds,
        false,
        &[],
        max_entries_per_term_per_page,
    )
    .await?;
    candidates.sort_by(|a, b| b.id.cmp(&a.id));

    let mut passing = Vec::new();
    for candidate in candidates {
        if passing.len() >= min_suggestion_count {
            break;
        }
        let entity = match entity_loader.load(restriction.type_ref, &candidate.id).await {
            Ok(entity) => entity,
            Err(e) if e.is_skippable_entity_error() => {
                crate::metrics::inc_suggestion_candidate_skipped();
                continue;
            }
            Err(e) => return Err(e),
        };
        let mut visited = HashSet::new();
        if entity_has_prefix_match(
            &entity,
            type_models,
            tokenizer,
            last_term,
            &mut visited,
            MAX_TYPE_MODEL_DEPTH,
        )? {
            passing.push(candidate);
        }
    }
    Ok(passing)
}

fn entity_has_prefix_match(
    entity: &Entity,
    type_models: &dyn TypeModelRegistry,
    tokenizer: &dyn Tokenizer,
    prefix: &str,
    visited: &mut HashSet<TypeRef>,
    depth_budget: usize,
) -> Result<bool> {
    let model = match type_models.resolve(entity.type_ref) {
        Ok(model) => model,
        Err(e) if e.is_skippable_entity_error() => return Ok(false),
        Err(e) => return Err(e),
    };
    if scalar_fields_match(entity, &model, tokenizer, prefix) {
        return Ok(true);
    }
    if depth_budget == 0 {
        return Ok(false);
    }
    for (name, assoc) in &model.associations {
        if assoc.kind != FieldKind::Aggregation {
            continue;
        }
        if !visited.insert(assoc.ref_type) {
            continue;
        }
        let matched = match entity.fields.get(name) {
            Some(EntityValue::Aggregate(nested)) => entity_has_prefix_match(
                nested,
                type_models,
                tokenizer,
                prefix,
                visited,
                depth_budget - 1,
            )?,
            Some(EntityValue::List(items)) => {
                let mut any = false;
                for item in items {
                    if let EntityValue::Aggregate(nested) = item {
                        if entity_has_prefix_match(
                            nested,
                            type_models,
                            tokenizer,
                            prefix,
                            visited,
                            depth_budget - 1,
                        )? {
                            any = true;
                            break;
                        }
                    }
                }
                any
            }
            _ => false,
        };
        visited.remove(&assoc.ref_type);
        if matched {
            return Ok(true);
        }
    }
    Ok(false)
}

fn scalar_fields_match(entity: &Entity, model: &TypeModel, tokenizer: &dyn Tokenizer, prefix: &str) -> bool {
    for (name, field) in &model.values {
        if field.kind != FieldKind::String {
            continue;
        }
        let Some(EntityValue::Str(text)) = entity.fields.get(name) else {
            continue;
        };
        if tokenizer.tokenize(text).iter().any(|word| word.starts_with(prefix)) {
            return true;
        }
    }
    false
}
