//! Core data model: terms, chunk descriptors, postings, restrictions, and
//! the `SearchResult` that doubles as the pagination cursor.

use ulid::Ulid;

/// A normalized term as produced by the (external) tokenizer.
pub type Term = String;

/// An entity id. Ids are ULIDs: a 48-bit millisecond timestamp prefix
/// followed by 80 bits of randomness, which makes them bytewise comparable
/// with "larger ⇒ newer", and gives us a ready-made `timestamp → id`
/// lower-bound mapping for the constraint filter: `Ulid::from_parts(ts_ms,
/// 0)` is the smallest id that could have been minted at `ts_ms`.
pub type EntityId = Ulid;

/// Sentinel meaning "indexing has reached the beginning of time".
pub const FULL_INDEXED_TIMESTAMP: i64 = 0;
/// Sentinel meaning "nothing has been indexed yet". Treated as "now"
/// wherever it would otherwise bound a query.
pub const NOTHING_INDEXED_TIMESTAMP: i64 = i64::MAX;

/// The deterministic `timestamp → id` lower-bound mapping used by the
/// constraint filter: the smallest id that could have been minted at
/// `timestamp_ms`.
pub fn ts_to_id(timestamp_ms: i64) -> EntityId {
    Ulid::from_parts(timestamp_ms.max(0) as u64, 0)
}

/// Identifies an entity kind by the same `(app, type)` pair a
/// `ChunkDescriptor` carries. `Mail` is the one kind the index extension
/// protocol singles out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TypeRef {
    pub app: u8,
    pub type_id: u8,
}

impl TypeRef {
    pub const MAIL: TypeRef = TypeRef { app: 1, type_id: 1 };

    pub fn is_mail(&self) -> bool {
        *self == Self::MAIL
    }
}

/// One row of a term's `Metadata`: addresses a `PostingChunk` and restricts
/// it to one entity kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkDescriptor {
    pub key: u64,
    pub size: u32,
    pub type_ref: TypeRef,
}

/// The decrypted contents of a `MetaRow`, before the `(app, type)` filter
/// and newest-first reordering the meta reader applies.
#[derive(Clone, Debug, Default)]
pub struct Metadata {
    pub rows: Vec<ChunkDescriptor>,
}

/// A posting entry before decryption: the deterministically-encrypted id
/// prefix (what `IdHash` hashes) plus the encrypted `(attribute,
/// positions)` payload.
#[derive(Clone, Debug)]
pub struct EncryptedEntry {
    pub id_ciphertext: [u8; crypto::ID_SIZE_BYTES],
    pub payload_ciphertext: Vec<u8>,
}

/// A decrypted posting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    pub id: EntityId,
    pub attribute: u8,
    /// Strictly increasing token positions within `attribute`'s text.
    pub positions: Vec<u32>,
}

/// 32-bit hash of an encrypted id, used as the intersector's cheap
/// pre-filter pass.
pub type IdHash = u32;

/// The scope a search is restricted to: entity type, attribute whitelist,
/// list id, and time window.
#[derive(Clone, Debug)]
pub struct SearchRestriction {
    pub type_ref: TypeRef,
    pub attribute_ids: Option<Vec<u8>>,
    pub list_id: Option<String>,
    /// Inclusive lower timestamp bound, milliseconds since epoch.
    pub start: Option<i64>,
    /// Inclusive upper timestamp bound, milliseconds since epoch.
    pub end: Option<i64>,
}

impl SearchRestriction {
    pub fn unbounded(type_ref: TypeRef) -> Self {
        Self {
            type_ref,
            attribute_ids: None,
            list_id: None,
            start: None,
            end: None,
        }
    }
}

/// The per-term resume cursor: an explicit struct rather than a mutated
/// `[term, lastRead]` pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cursor {
    pub term: Term,
    pub last_read_chunk_key: Option<u64>,
}

/// User-facing search output, and also the pagination cursor fed back into
/// `get_more_search_results`.
#[derive(Clone, Debug)]
pub struct SearchResult {
    pub query: String,
    pub restriction: SearchRestriction,
    /// `(listId, id)` pairs, strictly decreasing by id, no duplicates
    /// (invariants 1-2).
    pub results: Vec<(String, EntityId)>,
    pub current_index_timestamp: i64,
    /// Matched entries left over from a prior page once `maxResults` was
    /// hit, not yet resolved to `(listId, id)` pairs.
    pub more_results_entries: Vec<Entry>,
    pub last_read_search_index_row: Vec<Cursor>,
    pub match_word_order: bool,
}

impl SearchResult {
    pub fn empty(query: String, restriction: SearchRestriction, current_index_timestamp: i64, terms_len: usize) -> Self {
        let match_word_order = terms_len >= 2 && is_fully_quoted(&query);
        Self {
            query,
            restriction,
            results: Vec::new(),
            current_index_timestamp,
            more_results_entries: Vec::new(),
            last_read_search_index_row: Vec::new(),
            match_word_order,
        }
    }
}

/// True when the query is fully enclosed in a single pair of double quotes.
pub fn is_fully_quoted(query: &str) -> bool {
    let trimmed = query.trim();
    trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"')
}
