//! Encrypted full-text search core of a client-side mail application: reads
//! a locally persisted, encrypted inverted index, merges posting lists
//! across query terms, and returns ranked entity identifiers newest first.
//!
//! The index itself is maintained by an external indexer; this crate only
//! reads, decrypts selectively, intersects, filters, and paginates. See
//! [`orchestrator::SearchCore`] for the public entry point.

mod assemble;
mod collaborators;
mod config;
mod constraint;
mod error;
mod intersect;
mod key_encoder;
mod meta;
mod metrics;
mod model;
mod orchestrator;
mod phrase;
mod posting;
mod suggestion;
mod types;

pub use collaborators::{EntityLoader, Indexer, SuggestionProvider, Tokenizer};
pub use config::SearchTunables;
pub use crypto::{DbKey, Iv};
pub use error::{Result, SearchError};
pub use model::{AssociationField, Cardinality, Entity, EntityValue, FieldKind, TypeModel, TypeModelRegistry, ValueField};
pub use orchestrator::SearchCore;
pub use types::{
    ChunkDescriptor, Cursor, EncryptedEntry, Entry, EntityId, IdHash, Metadata, SearchResult,
    SearchRestriction, Term, TypeRef, FULL_INDEXED_TIMESTAMP, NOTHING_INDEXED_TIMESTAMP,
};

#[cfg(any(test, feature = "testing"))]
pub use key_encoder::index_key;
#[cfg(any(test, feature = "testing"))]
pub use meta::encode_metadata;
#[cfg(any(test, feature = "testing"))]
pub use posting::encode_chunk;
