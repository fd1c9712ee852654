//! Constraint filter. Applies `attributeIds` and the `[start, end]` time
//! window to decrypted entries, via the `timestamp → id` lower/upper-bound
//! mapping.
//!
//! `endTimestamp` defaults to the indexer's current horizon for `Mail`,
//! `FULL_INDEXED_TIMESTAMP` for every other type, with
//! `NOTHING_INDEXED_TIMESTAMP` read as "now" wherever it would otherwise
//! bound a query (an unindexed mailbox should see no mail, not see
//! everything).

use crate::types::{ts_to_id, Entry, EntityId, SearchRestriction, FULL_INDEXED_TIMESTAMP, NOTHING_INDEXED_TIMESTAMP};

/// The id bounds a restriction resolves to: `min_id` is inclusive, `max_id`
/// is exclusive.
#[derive(Clone, Copy, Debug)]
pub struct IdBounds {
    pub min_id: EntityId,
    pub max_id: Option<EntityId>,
}

/// Resolves `restriction.{start,end}` to concrete id bounds. `now_ms` stands
/// in for wall-clock "now" so the resolution stays a pure function of its
/// inputs.
pub fn resolve_bounds(restriction: &SearchRestriction, current_index_timestamp: i64, now_ms: i64) -> IdBounds {
    let end_timestamp = restriction.end.unwrap_or_else(|| {
        if restriction.type_ref.is_mail() {
            current_index_timestamp
        } else {
            FULL_INDEXED_TIMESTAMP
        }
    });
    let end_timestamp = if end_timestamp == NOTHING_INDEXED_TIMESTAMP {
        now_ms
    } else {
        end_timestamp
    };
    let min_id = ts_to_id(end_timestamp);
    let max_id = restriction.start.map(|start| ts_to_id(start.saturating_add(1)));
    IdBounds { min_id, max_id }
}

/// `accept(entry) := (attributeIds is none ∨ entry.attribute ∈ attributeIds)
/// ∧ entry.id ≥ minId ∧ (maxId is none ∨ entry.id < maxId)`.
pub fn accept(entry: &Entry, restriction: &SearchRestriction, bounds: IdBounds) -> bool {
    let attribute_ok = restriction
        .attribute_ids
        .as_ref()
        .map_or(true, |ids| ids.contains(&entry.attribute));
    attribute_ok && entry.id >= bounds.min_id && bounds.max_id.map_or(true, |max| entry.id < max)
}

/// Filters a term's decrypted entries in place against the restriction.
pub fn filter(entries: Vec<Entry>, restriction: &SearchRestriction, bounds: IdBounds) -> Vec<Entry> {
    entries
        .into_iter()
        .filter(|e| accept(e, restriction, bounds))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeRef;
    use ulid::Ulid;

    fn entry(ts: u64, attribute: u8) -> Entry {
        Entry {
            id: Ulid::from_parts(ts, 0),
            attribute,
            positions: vec![0],
        }
    }

    #[test]
    fn mail_without_end_defaults_to_current_index_timestamp() {
        let restriction = SearchRestriction::unbounded(TypeRef::MAIL);
        let bounds = resolve_bounds(&restriction, 500, 999_999);
        assert_eq!(bounds.min_id, Ulid::from_parts(500, 0));
        assert!(bounds.max_id.is_none());
    }

    #[test]
    fn non_mail_without_end_defaults_to_full_indexed() {
        let other = TypeRef { app: 3, type_id: 9 };
        let restriction = SearchRestriction::unbounded(other);
        let bounds = resolve_bounds(&restriction, 500, 999_999);
        assert_eq!(bounds.min_id, Ulid::from_parts(0, 0));
    }

    #[test]
    fn nothing_indexed_timestamp_is_treated_as_now() {
        let mut restriction = SearchRestriction::unbounded(TypeRef::MAIL);
        restriction.end = Some(NOTHING_INDEXED_TIMESTAMP);
        let bounds = resolve_bounds(&restriction, 500, 777);
        assert_eq!(bounds.min_id, Ulid::from_parts(777, 0));
    }

    #[test]
    fn attribute_and_window_filter_together() {
        let mut restriction = SearchRestriction::unbounded(TypeRef::MAIL);
        restriction.attribute_ids = Some(vec![1]);
        restriction.start = Some(99);
        let bounds = resolve_bounds(&restriction, 1_000, 0);
        let entries = vec![entry(50, 1), entry(100, 1), entry(100, 2), entry(150, 1)];
        let kept = filter(entries, &restriction, bounds);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, Ulid::from_parts(100, 0));
    }
}
