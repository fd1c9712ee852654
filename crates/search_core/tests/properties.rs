//! Property-based coverage of the result ordering, dedup, intersection,
//! determinism, commutativity, and page-size invariants, plus a
//! deterministic pagination-concatenation check.

mod support;

use std::collections::BTreeSet;
use std::sync::Arc;

use crypto::{DbKey, Iv};
use proptest::prelude::*;
use search_core::{SearchCore, SearchRestriction, SearchTunables, TypeRef};
use store::{fake::FakeStore, ElementData, ElementDataStore, SearchIndexMetaDataStore, SearchIndexStore};
use support::{FakeEntityLoader, FakeIndexer, FakeSuggestions, FakeTypeModels, SimpleTokenizer};
use ulid::Ulid;

fn key() -> (DbKey, Iv) {
    (DbKey([3u8; 32]), Iv([5u8; 16]))
}

fn build_core(store: Arc<FakeStore>, db_key: DbKey, iv: Iv) -> SearchCore {
    let meta_store: Arc<dyn SearchIndexMetaDataStore> = store.clone();
    let index_store: Arc<dyn SearchIndexStore> = store.clone();
    let element_store: Arc<dyn ElementDataStore> = store;
    SearchCore::new(
        Arc::new(SimpleTokenizer),
        Arc::new(FakeIndexer { current_index_timestamp: i64::MAX / 2 }),
        Arc::new(FakeSuggestions::default()),
        Arc::new(FakeEntityLoader::default()),
        Arc::new(FakeTypeModels::default()),
        meta_store,
        index_store,
        element_store,
        db_key,
        iv,
        "user-1".to_string(),
        SearchTunables::default(),
    )
}

fn seed(store: &FakeStore, db_key: &DbKey, iv: &Iv, chunk_key: u64, term: &str, ids: &[u64]) {
    let entries: Vec<_> = ids
        .iter()
        .map(|&ts| (Ulid::from_parts(ts, 0), 0u8, vec![0u32]))
        .collect();
    let index_key = search_core::index_key(db_key, iv, &term.to_string());
    let metadata = search_core::Metadata {
        rows: vec![search_core::ChunkDescriptor {
            key: chunk_key,
            size: entries.len() as u32,
            type_ref: TypeRef::MAIL,
        }],
    };
    store.put_meta(index_key.as_bytes().to_vec(), search_core::encode_metadata(db_key, iv, &metadata));
    store.put_chunk(chunk_key, search_core::encode_chunk(db_key, iv, &entries));
    for (id, _, _) in &entries {
        let b64 = crypto::id_to_base64(&crypto::encrypt_id(db_key, iv, &id.to_bytes()));
        store.put_element(b64, ElementData { list_id: "L".to_string() });
    }
}

fn run(core: &SearchCore, query: &str, max_results: Option<usize>) -> Vec<(String, Ulid)> {
    tokio::runtime::Runtime::new()
        .unwrap()
        .block_on(core.search(query, SearchRestriction::unbounded(TypeRef::MAIL), 0, max_results))
        .unwrap()
        .results
}

proptest! {
    #[test]
    fn invariant_decreasing_deduped_and_correct_intersection(
        a_ids in prop::collection::hash_set(1u64..1000, 0..12),
        b_ids in prop::collection::hash_set(1u64..1000, 0..12),
    ) {
        let (db_key, iv) = key();
        let store = Arc::new(FakeStore::default());
        let a: Vec<u64> = a_ids.iter().copied().collect();
        let b: Vec<u64> = b_ids.iter().copied().collect();
        seed(&store, &db_key, &iv, 1, "alpha", &a);
        seed(&store, &db_key, &iv, 2, "beta", &b);
        let core = build_core(store, db_key, iv);

        let results = run(&core, "alpha beta", None);

        for pair in results.windows(2) {
            prop_assert!(pair[0].1 > pair[1].1);
        }
        let expected: BTreeSet<u64> = a_ids.intersection(&b_ids).copied().collect();
        prop_assert_eq!(results.len(), expected.len());
    }

    #[test]
    fn invariant_determinism(a_ids in prop::collection::hash_set(1u64..1000, 0..10)) {
        let (db_key, iv) = key();
        let store = Arc::new(FakeStore::default());
        let a: Vec<u64> = a_ids.into_iter().collect();
        seed(&store, &db_key, &iv, 1, "alpha", &a);
        let core = build_core(store, db_key, iv);

        let first = run(&core, "alpha", None);
        let second = run(&core, "alpha", None);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn invariant_and_search_is_commutative(
        a_ids in prop::collection::hash_set(1u64..1000, 0..10),
        b_ids in prop::collection::hash_set(1u64..1000, 0..10),
    ) {
        let (db_key, iv) = key();
        let store = Arc::new(FakeStore::default());
        let a: Vec<u64> = a_ids.into_iter().collect();
        let b: Vec<u64> = b_ids.into_iter().collect();
        seed(&store, &db_key, &iv, 1, "alpha", &a);
        seed(&store, &db_key, &iv, 2, "beta", &b);
        let core = build_core(store, db_key, iv);

        let forward = run(&core, "alpha beta", None);
        let backward = run(&core, "beta alpha", None);
        prop_assert_eq!(forward, backward);
    }

    #[test]
    fn invariant_max_results_bounds_page_length(
        a_ids in prop::collection::hash_set(1u64..1000, 0..15),
        cap in 0usize..8,
    ) {
        let (db_key, iv) = key();
        let store = Arc::new(FakeStore::default());
        let a: Vec<u64> = a_ids.into_iter().collect();
        seed(&store, &db_key, &iv, 1, "alpha", &a);
        let core = build_core(store, db_key, iv);

        let results = run(&core, "alpha", Some(cap));
        prop_assert!(results.len() <= cap);
    }
}

#[test]
fn pagination_concatenation_matches_unbounded_search() {
    let (db_key, iv) = key();
    let store = Arc::new(FakeStore::default());
    let ids: Vec<u64> = (1..=9).map(|i| i * 10).collect();
    seed(&store, &db_key, &iv, 1, "alpha", &ids);
    let core = build_core(store, db_key, iv);

    let rt = tokio::runtime::Runtime::new().unwrap();
    let full = rt
        .block_on(core.search("alpha", SearchRestriction::unbounded(TypeRef::MAIL), 0, None))
        .unwrap()
        .results;

    let mut paged = rt
        .block_on(core.search("alpha", SearchRestriction::unbounded(TypeRef::MAIL), 0, Some(4)))
        .unwrap();
    rt.block_on(core.get_more_search_results(&mut paged, 4)).unwrap();
    rt.block_on(core.get_more_search_results(&mut paged, 4)).unwrap();

    assert_eq!(full, paged.results);
}
