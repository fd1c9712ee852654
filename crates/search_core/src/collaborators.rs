//! Trait contracts for the external collaborators: tokenizer, indexer,
//! suggestion provider, and entity loader. Only their contracts live here -
//! implementations (the real tokenizer, the background indexer, the
//! persistent store adapters) are out of scope for this crate.

use async_trait::async_trait;

use crate::{
    error::Result,
    model::Entity,
    types::{EntityId, Term, TypeRef},
};

/// Splits query or entity text into terms: pure, idempotent on its own
/// output, deterministic.
pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> Vec<Term>;
}

/// The background indexer: tracks how far back in time the index currently
/// reaches and can be asked to extend that horizon.
#[async_trait]
pub trait Indexer: Send + Sync {
    /// The current effective index horizon, in the same units as
    /// `SearchRestriction::start`/`end` (epoch milliseconds), or one of the
    /// sentinels in `types::{FULL_INDEXED_TIMESTAMP, NOTHING_INDEXED_TIMESTAMP}`.
    fn current_index_timestamp(&self) -> i64;

    /// Extends the indexed range backward to `since_epoch_ms` for `user`.
    /// Cancellable: a caller may drop the returned future's driving task, or
    /// this may resolve to `SearchError::Cancelled`, which callers log and
    /// swallow rather than propagate.
    async fn index_mailboxes(&self, user: &str, since_epoch_ms: i64) -> Result<()>;
}

/// Expands a term into completions, scoped to one entity type at a time.
#[async_trait]
pub trait SuggestionProvider: Send + Sync {
    async fn get_suggestions(&self, type_ref: TypeRef, term: &Term) -> Result<Vec<Term>>;
}

/// Loads the full entity behind an id. `NotFound` and `NotAuthorized` are
/// expected failure modes that the result assembler and suggestion path
/// treat as "skip this candidate", not page-aborting errors.
#[async_trait]
pub trait EntityLoader: Send + Sync {
    async fn load(&self, type_ref: TypeRef, id: &EntityId) -> Result<Entity>;
}
