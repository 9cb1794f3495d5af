use serde_json::Value as JsonValue;

use crate::usecase::ports::repo::RepoError;

#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: i64,
    pub body: JsonValue,
}

/// Collection-scoped JSON document storage. Ids are assigned on insert and
/// increase within a collection.
pub trait DocumentStore: Send + Sync {
    fn insert(&self, collection: &str, body: JsonValue) -> Result<i64, RepoError>;
    fn insert_bulk(&self, collection: &str, bodies: Vec<JsonValue>)
        -> Result<Vec<i64>, RepoError>;
    fn delete(&self, collection: &str, ids: &[i64]) -> Result<usize, RepoError>;
    fn scan(&self, collection: &str) -> Result<Vec<StoredDocument>, RepoError>;
}
