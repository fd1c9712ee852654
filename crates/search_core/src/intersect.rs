//! Intersector. Two-phase AND-merge across a multi-term query's per-term
//! entry lists: a cheap `IdHash` pre-filter before anything is decrypted,
//! then an exact filter on decrypted ids once attribute/time filtering has
//! run.

use std::collections::HashSet;

use crate::types::{EncryptedEntry, Entry, EntityId};

/// Phase A: narrows each term's encrypted entries to those whose `IdHash`
/// appears in every other term's list. Collisions are tolerated - Phase B
/// re-verifies on the decrypted id before anything is trusted.
pub fn intersect_by_hash(term_entries: &[Vec<EncryptedEntry>]) -> Vec<Vec<EncryptedEntry>> {
    if term_entries.len() <= 1 {
        return term_entries.to_vec();
    }
    let hash_sets: Vec<HashSet<u32>> = term_entries
        .iter()
        .map(|entries| entries.iter().map(crate::posting::id_hash).collect())
        .collect();
    let common = hash_sets
        .iter()
        .skip(1)
        .fold(hash_sets[0].clone(), |acc, set| {
            acc.intersection(set).copied().collect()
        });
    term_entries
        .iter()
        .map(|entries| {
            entries
                .iter()
                .filter(|e| common.contains(&crate::posting::id_hash(e)))
                .cloned()
                .collect()
        })
        .collect()
}

/// Phase B: narrows each term's decrypted entries to those whose id appears
/// in every other term's list. Run after C6 (attribute/time filtering) so
/// the intersection reflects the restriction, not just raw postings.
pub fn intersect_by_id(term_entries: &[Vec<Entry>]) -> Vec<Vec<Entry>> {
    if term_entries.len() <= 1 {
        return term_entries.to_vec();
    }
    let id_sets: Vec<HashSet<EntityId>> = term_entries
        .iter()
        .map(|entries| entries.iter().map(|e| e.id).collect())
        .collect();
    let common = id_sets
        .iter()
        .skip(1)
        .fold(id_sets[0].clone(), |acc, set| {
            acc.intersection(set).copied().collect()
        });
    term_entries
        .iter()
        .map(|entries| {
            entries
                .iter()
                .filter(|e| common.contains(&e.id))
                .cloned()
                .collect()
        })
        .collect()
}
