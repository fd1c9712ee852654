//! Shared fakes for the collaborator traits, used by the integration tests
//! under `tests/`.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use search_core::{
    Entity, EntityId, EntityLoader, EntityValue, FieldKind, Indexer, Result, SearchError,
    SuggestionProvider, Term, Tokenizer, TypeModel, TypeModelRegistry, TypeRef,
};

/// Installs a `tracing` subscriber writing to the test harness's captured
/// output. Safe to call from every test: `try_init` is a no-op if a
/// subscriber is already installed, which is the common case when several
/// tests in the same binary call this.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .compact()
        .try_init();
}

/// Lowercases and splits on whitespace/punctuation - deterministic and
/// idempotent on its own output.
pub struct SimpleTokenizer;

impl Tokenizer for SimpleTokenizer {
    fn tokenize(&self, text: &str) -> Vec<Term> {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_lowercase())
            .collect()
    }
}

/// Reports a fixed index horizon and never extends (tests seed whatever
/// window they need directly in the store).
pub struct FakeIndexer {
    pub current_index_timestamp: i64,
}

#[async_trait]
impl Indexer for FakeIndexer {
    fn current_index_timestamp(&self) -> i64 {
        self.current_index_timestamp
    }

    async fn index_mailboxes(&self, _user: &str, _since_epoch_ms: i64) -> Result<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeSuggestions {
    pub completions: HashMap<String, Vec<Term>>,
}

#[async_trait]
impl SuggestionProvider for FakeSuggestions {
    async fn get_suggestions(&self, _type_ref: TypeRef, term: &Term) -> Result<Vec<Term>> {
        Ok(self.completions.get(term).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
pub struct FakeEntityLoader {
    pub entities: Mutex<HashMap<EntityId, Entity>>,
}

impl FakeEntityLoader {
    pub fn put(&self, id: EntityId, entity: Entity) {
        self.entities.lock().unwrap().insert(id, entity);
    }
}

#[async_trait]
impl EntityLoader for FakeEntityLoader {
    async fn load(&self, _type_ref: TypeRef, id: &EntityId) -> Result<Entity> {
        self.entities
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| SearchError::NotFound(id.to_string()))
    }
}

#[derive(Default)]
pub struct FakeTypeModels {
    pub models: HashMap<TypeRef, TypeModel>,
}

impl TypeModelRegistry for FakeTypeModels {
    fn resolve(&self, type_ref: TypeRef) -> Result<TypeModel> {
        self.models
            .get(&type_ref)
            .cloned()
            .ok_or_else(|| SearchError::NotFound(format!("{type_ref:?}")))
    }
}

/// Builds a single-string-field type model: one value field named `subject`
/// of kind `String`.
pub fn mail_type_model() -> TypeModel {
    let mut values = HashMap::new();
    values.insert(
        "subject".to_string(),
        search_core::ValueField { id: 1, kind: FieldKind::String },
    );
    TypeModel { values, associations: HashMap::new() }
}

pub fn mail_entity(subject: &str) -> Entity {
    let mut fields = HashMap::new();
    fields.insert("subject".to_string(), EntityValue::Str(subject.to_string()));
    Entity { type_ref: TypeRef::MAIL, fields }
}
