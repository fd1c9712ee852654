//! Key encoder. `indexKey(term) = encode_base64(keyed_encrypt(dbKey, iv,
//! term))` - pure and deterministic, so it lives as a thin wrapper over
//! [`crypto::index_key`] rather than duplicating the cipher plumbing here.

pub use crypto::{DbKey, IndexKey, Iv};

use crate::types::Term;

/// `term` must be a single tokenizer output, not raw user input.
pub fn index_key(db_key: &DbKey, iv: &Iv, term: &Term) -> IndexKey {
    crypto::index_key(db_key, iv, term)
}
