//! Phrase reducer. When the query is a fully-quoted multi-word phrase,
//! narrows an id-intersected multi-term match down to entries where the
//! terms also occur in order, one position apart, within the same
//! attribute.

use std::collections::HashSet;

use crate::types::Entry;

/// `term_entries` must already be id-intersected and constraint-filtered:
/// every inner `Vec<Entry>` holds one entry per common id, in query term
/// order.
///
/// When `match_word_order` is false this is just "pick a canonical
/// representative per id" - any term's list works since the id
/// intersection already narrowed every list to the same id set, so the
/// first term's list is taken by convention.
pub fn reduce(term_entries: &[Vec<Entry>], match_word_order: bool) -> Vec<Entry> {
    if !match_word_order {
        return term_entries.first().cloned().unwrap_or_default();
    }
    let Some(first) = term_entries.first() else {
        return Vec::new();
    };
    let mut result = Vec::new();
    'candidates: for e1 in first {
        let mut positions: HashSet<u32> = e1.positions.iter().copied().collect();
        for (offset, later) in term_entries.iter().enumerate().skip(1) {
            let Some(e_next) = later
                .iter()
                .find(|e| e.id == e1.id && e.attribute == e1.attribute)
            else {
                continue 'candidates;
            };
            let next_positions: HashSet<u32> = e_next.positions.iter().copied().collect();
            positions = positions
                .into_iter()
                .filter(|p| next_positions.contains(&(p + offset as u32)))
                .collect();
            if positions.is_empty() {
                continue 'candidates;
            }
        }
        result.push(e1.clone());
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use ulid::Ulid;

    fn entry(ts: u64, attribute: u8, positions: Vec<u32>) -> Entry {
        Entry {
            id: Ulid::from_parts(ts, 0),
            attribute,
            positions,
        }
    }

    #[test]
    fn keeps_only_entries_with_terms_in_adjacent_order() {
        // "good morning": good at [0, 10], morning at [1, 20] -> only id 1
        // has them adjacent (0 then 1); id 2 has 10 then 20, not adjacent.
        let good = vec![entry(1, 0, vec![0, 10]), entry(2, 0, vec![10])];
        let morning = vec![entry(1, 0, vec![1, 99]), entry(2, 0, vec![20])];
        let result = reduce(&[good, morning], true);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, Ulid::from_parts(1, 0));
    }

    #[test]
    fn entry_missing_from_a_later_term_is_dropped() {
        let a = vec![entry(1, 0, vec![0])];
        let b: Vec<Entry> = vec![];
        let result = reduce(&[a, b], true);
        assert!(result.is_empty());
    }

    #[test]
    fn non_phrase_mode_returns_first_terms_entries_unchanged() {
        let a = vec![entry(1, 0, vec![0, 5])];
        let b = vec![entry(1, 0, vec![99])];
        let result = reduce(&[a.clone(), b], false);
        assert_eq!(result, a);
    }
}
