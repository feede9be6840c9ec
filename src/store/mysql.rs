use serde_json::Value;
use sqlx::{mysql::MySqlPoolOptions, MySqlPool, Row};

use super::StoreError;

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS documents (
        collection VARCHAR(64) NOT NULL,
        doc_id VARCHAR(64) NOT NULL,
        body LONGTEXT NOT NULL,
        updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP,
        PRIMARY KEY (collection, doc_id)
    )
"#;

// Creates a placeholder row, or takes the row lock on an existing one
const LOCK_ROW: &str = "INSERT INTO documents (collection, doc_id, body) VALUES (?, ?, 'null') \
                        ON DUPLICATE KEY UPDATE body = body";

const UPSERT: &str = "INSERT INTO documents (collection, doc_id, body) VALUES (?, ?, ?) \
                      ON DUPLICATE KEY UPDATE body = VALUES(body)";

/// MySQL backend. Each document is one row holding its JSON text.
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = MySqlPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        sqlx::query(CREATE_TABLE).execute(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let row = sqlx::query("SELECT body FROM documents WHERE collection = ? AND doc_id = ?")
            .bind(collection)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|row| decode_body(&row)).transpose()
    }

    pub async fn set(&self, collection: &str, id: &str, doc: Value) -> Result<(), StoreError> {
        sqlx::query(UPSERT)
            .bind(collection)
            .bind(id)
            .bind(serde_json::to_string(&doc)?)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM documents WHERE collection = ? AND doc_id = ?")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn update<F>(&self, collection: &str, id: &str, apply: F) -> Result<(), StoreError>
    where
        F: FnOnce(Option<Value>) -> Result<Value, StoreError> + Send,
    {
        let mut tx = self.pool.begin().await?;

        // Locking through an insert first means a missing row never falls
        // back to a gap lock, which two concurrent upserts would deadlock on
        sqlx::query(LOCK_ROW)
            .bind(collection)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let row = sqlx::query(
            "SELECT body FROM documents WHERE collection = ? AND doc_id = ? FOR UPDATE",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let current = row
            .map(|row| decode_body(&row))
            .transpose()?
            .and_then(present);

        let next = apply(current)?;
        sqlx::query(UPSERT)
            .bind(collection)
            .bind(id)
            .bind(serde_json::to_string(&next)?)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

/// The placeholder body stands for a document that does not exist yet.
fn present(body: Value) -> Option<Value> {
    (!body.is_null()).then_some(body)
}

fn decode_body(row: &sqlx::mysql::MySqlRow) -> Result<Value, StoreError> {
    let body: String = row.try_get("body")?;
    Ok(serde_json::from_str(&body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn placeholder_row_reads_as_missing() {
        let body: Value = serde_json::from_str("null").unwrap();
        assert_eq!(present(body), None);
        assert_eq!(present(json!({"points": 3})), Some(json!({"points": 3})));
    }
}
