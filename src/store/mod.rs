//! Document store: JSON documents keyed by `(collection, id)`.

mod memory;
mod mysql;

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("malformed document: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("document {0} is not an object")]
    NotAnObject(String),
}

pub enum DocumentStore {
    Memory(MemoryStore),
    MySql(MySqlStore),
}

impl DocumentStore {
    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::MySql(_) => "mysql",
        }
    }

    pub async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        match self {
            Self::Memory(store) => Ok(store.get(collection, id).await),
            Self::MySql(store) => store.get(collection, id).await,
        }
    }

    pub async fn set(&self, collection: &str, id: &str, doc: Value) -> Result<(), StoreError> {
        match self {
            Self::Memory(store) => {
                store.set(collection, id, doc).await;
                Ok(())
            }
            Self::MySql(store) => store.set(collection, id, doc).await,
        }
    }

    pub async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        match self {
            Self::Memory(store) => {
                store.delete(collection, id).await;
                Ok(())
            }
            Self::MySql(store) => store.delete(collection, id).await,
        }
    }

    /// Atomic read-modify-write. `apply` sees the current document (if any)
    /// and returns its replacement; no other writer can interleave.
    pub async fn update<F>(&self, collection: &str, id: &str, apply: F) -> Result<(), StoreError>
    where
        F: FnOnce(Option<Value>) -> Result<Value, StoreError> + Send,
    {
        match self {
            Self::Memory(store) => store.update(collection, id, apply).await,
            Self::MySql(store) => store.update(collection, id, apply).await,
        }
    }

    /// Shallow merge of `fields` into the document, creating it when absent.
    pub async fn merge(&self, collection: &str, id: &str, fields: Value) -> Result<(), StoreError> {
        let key = format!("{collection}/{id}");
        self.update(collection, id, move |current| merge_fields(&key, current, fields))
            .await
    }
}

pub(crate) fn merge_fields(
    key: &str,
    current: Option<Value>,
    fields: Value,
) -> Result<Value, StoreError> {
    let Value::Object(fields) = fields else {
        return Err(StoreError::NotAnObject(format!("{key} (merge fields)")));
    };
    let mut doc = match current {
        Some(Value::Object(doc)) => doc,
        Some(_) => return Err(StoreError::NotAnObject(key.to_string())),
        None => serde_json::Map::new(),
    };
    doc.extend(fields);
    Ok(Value::Object(doc))
}
