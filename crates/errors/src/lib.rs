//! Error taxonomy shared across the search core.
//!
//! Mirrors the `ErrorMetadata`-style convention used throughout the codebase
//! this crate is modeled on: a small closed set of machine-matchable codes,
//! each carrying a short tag (stable for tests/metrics) and a human message.

use std::fmt;

use thiserror::Error;

/// The error taxonomy from the search core's failure-semantics policy:
/// `NotFound` / `NotAuthorized` are swallowed by entity-load callers,
/// `Cancelled` is swallowed by the index-extension caller, everything else
/// surfaces to the caller of `search`/`get_more_search_results`.
#[derive(Debug, Error, Clone)]
pub enum SearchError {
    /// The entity a posting pointed at no longer exists (or was never
    /// written). Swallowed per-entity in C8/C9.
    #[error("not found: {0}")]
    NotFound(String),

    /// The caller is not authorized to load the entity. Swallowed
    /// per-entity in C8/C9, identically to `NotFound`.
    #[error("not authorized: {0}")]
    NotAuthorized(String),

    /// A cooperative cancellation, e.g. of an index-extension request.
    /// Logged and swallowed; never surfaces past the orchestrator.
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// Framing or decryption produced an inconsistent result: the store
    /// holds fewer/more bytes than a chunk descriptor promised, or a block
    /// failed to decrypt/unpad. Indicates store corruption or a key
    /// mismatch; fatal to the page.
    #[error("corruption: {0}")]
    Corruption(String),

    /// A cryptographic operation failed (bad key length, unpad failure,
    /// MAC mismatch if authenticated encryption is layered in later).
    #[error("crypto error: {0}")]
    Crypto(String),

    /// The persistent store itself failed (not a miss - a miss is `Ok(None)`,
    /// not an error).
    #[error("store error: {0}")]
    Store(String),

    /// Anything else, propagated with its original context attached.
    #[error(transparent)]
    Other(#[from] std::sync::Arc<anyhow::Error>),
}

impl SearchError {
    /// Short, stable, ScreamingCamelCase-free tag usable in tests and
    /// metrics labels without depending on message wording.
    pub fn tag(&self) -> &'static str {
        match self {
            SearchError::NotFound(_) => "NotFound",
            SearchError::NotAuthorized(_) => "NotAuthorized",
            SearchError::Cancelled(_) => "Cancelled",
            SearchError::Corruption(_) => "Corruption",
            SearchError::Crypto(_) => "Crypto",
            SearchError::Store(_) => "Store",
            SearchError::Other(_) => "Other",
        }
    }

    /// True for the two entity-load failures callers should swallow and
    /// continue past, rather than aborting the page.
    pub fn is_skippable_entity_error(&self) -> bool {
        matches!(self, SearchError::NotFound(_) | SearchError::NotAuthorized(_))
    }

    pub fn other(err: anyhow::Error) -> Self {
        SearchError::Other(std::sync::Arc::new(err))
    }
}

impl From<anyhow::Error> for SearchError {
    fn from(err: anyhow::Error) -> Self {
        SearchError::other(err)
    }
}

/// Helper for call sites that want to attach a short context string the way
/// `anyhow::Context` does, without pulling the whole message into the error
/// variant's Display.
pub trait ErrContext<T> {
    fn search_context(self, msg: impl fmt::Display) -> Result<T, SearchError>;
}

impl<T, E: std::error::Error + Send + Sync + 'static> ErrContext<T> for Result<T, E> {
    fn search_context(self, msg: impl fmt::Display) -> Result<T, SearchError> {
        self.map_err(|e| SearchError::other(anyhow::anyhow!("{msg}: {e}")))
    }
}
