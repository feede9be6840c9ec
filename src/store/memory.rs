use std::collections::HashMap;

use serde_json::Value;
use tokio::sync::Mutex;

use super::StoreError;

/// In-process backend, used when no database is configured and in tests.
#[derive(Default)]
pub struct MemoryStore {
    documents: Mutex<HashMap<(String, String), Value>>,
}

impl MemoryStore {
    pub async fn get(&self, collection: &str, id: &str) -> Option<Value> {
        self.documents
            .lock()
            .await
            .get(&key(collection, id))
            .cloned()
    }

    pub async fn set(&self, collection: &str, id: &str, doc: Value) {
        self.documents.lock().await.insert(key(collection, id), doc);
    }

    pub async fn delete(&self, collection: &str, id: &str) {
        self.documents.lock().await.remove(&key(collection, id));
    }

    pub async fn update<F>(&self, collection: &str, id: &str, apply: F) -> Result<(), StoreError>
    where
        F: FnOnce(Option<Value>) -> Result<Value, StoreError>,
    {
        // Held across `apply` so the read and the write are one step
        let mut documents = self.documents.lock().await;
        let key = key(collection, id);
        let next = apply(documents.get(&key).cloned())?;
        documents.insert(key, next);
        Ok(())
    }
}

fn key(collection: &str, id: &str) -> (String, String) {
    (collection.to_string(), id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn failed_update_leaves_document_untouched() {
        let store = MemoryStore::default();
        store.set("interactions", "s", json!({"points": 1})).await;

        let result = store
            .update("interactions", "s", |_| {
                Err(StoreError::NotAnObject("interactions/s".into()))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(store.get("interactions", "s").await, Some(json!({"points": 1})));
    }

    #[tokio::test]
    async fn concurrent_updates_are_not_lost() {
        let store = std::sync::Arc::new(MemoryStore::default());
        let mut tasks = Vec::new();
        for _ in 0..32 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                store
                    .update("interactions", "s", |current| {
                        let n = current
                            .and_then(|v| v.get("n").and_then(Value::as_u64))
                            .unwrap_or(0);
                        Ok(json!({ "n": n + 1 }))
                    })
                    .await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }
        assert_eq!(store.get("interactions", "s").await, Some(json!({"n": 32})));
    }
}
