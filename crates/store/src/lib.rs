//! Trait contracts for the three object stores the search core reads from:
//! `SearchIndexMetaDataOS`, `SearchIndexOS`, `ElementDataOS`.
//!
//! The core never writes to these stores and never opens more than one read
//! transaction per object-store group per page, so the traits below expose
//! point lookups only - no scans, no mutation. A real adapter implements
//! these against whatever embedded KV engine backs the client (out of scope
//! here).

use async_trait::async_trait;
use errors::SearchError;

/// `SearchIndexMetaDataOS`, looked up by `IndexKey` via the secondary
/// `SearchIndexWordsIndex`. A miss is `Ok(None)`, not an error.
#[async_trait]
pub trait SearchIndexMetaDataStore: Send + Sync {
    async fn get_by_index_key(&self, index_key: &[u8]) -> Result<Option<Vec<u8>>, SearchError>;
}

/// `SearchIndexOS`, keyed by the `u64` chunk key carried in a
/// `ChunkDescriptor`. A miss is `Ok(None)`.
#[async_trait]
pub trait SearchIndexStore: Send + Sync {
    async fn get_chunk(&self, chunk_key: u64) -> Result<Option<Vec<u8>>, SearchError>;
}

/// One row of `ElementDataOS`: its value tuple begins with `listId`;
/// everything else about the entity is opaque to the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    pub list_id: String,
}

/// `ElementDataOS`, keyed by the base64-encoded encrypted id.
#[async_trait]
pub trait ElementDataStore: Send + Sync {
    async fn get_element(&self, encrypted_id_b64: &str) -> Result<Option<ElementData>, SearchError>;
}

#[cfg(any(test, feature = "testing"))]
pub mod fake {
    use std::collections::HashMap;

    use parking_lot::Mutex;

    use super::*;

    /// In-memory stand-in for all three object stores, seeded directly by
    /// tests. Mirrors the read-miss-is-empty contract of the real stores.
    #[derive(Default)]
    pub struct FakeStore {
        meta: Mutex<HashMap<Vec<u8>, Vec<u8>>>,
        chunks: Mutex<HashMap<u64, Vec<u8>>>,
        elements: Mutex<HashMap<String, ElementData>>,
    }

    impl FakeStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn put_meta(&self, index_key: Vec<u8>, meta_ciphertext: Vec<u8>) {
            self.meta.lock().insert(index_key, meta_ciphertext);
        }

        pub fn put_chunk(&self, chunk_key: u64, bytes: Vec<u8>) {
            self.chunks.lock().insert(chunk_key, bytes);
        }

        pub fn put_element(&self, encrypted_id_b64: String, element: ElementData) {
            self.elements.lock().insert(encrypted_id_b64, element);
        }
    }

    #[async_trait]
    impl SearchIndexMetaDataStore for FakeStore {
        async fn get_by_index_key(&self, index_key: &[u8]) -> Result<Option<Vec<u8>>, SearchError> {
            Ok(self.meta.lock().get(index_key).cloned())
        }
    }

    #[async_trait]
    impl SearchIndexStore for FakeStore {
        async fn get_chunk(&self, chunk_key: u64) -> Result<Option<Vec<u8>>, SearchError> {
            Ok(self.chunks.lock().get(&chunk_key).cloned())
        }
    }

    #[async_trait]
    impl ElementDataStore for FakeStore {
        async fn get_element(
            &self,
            encrypted_id_b64: &str,
        ) -> Result<Option<ElementData>, SearchError> {
            Ok(self.elements.lock().get(encrypted_id_b64).cloned())
        }
    }
}
