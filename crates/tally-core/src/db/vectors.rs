//! Stored transaction embeddings

use rusqlite::{params, OptionalExtension};

use super::Database;
use crate::error::Result;

/// An embedding row for one transaction
#[derive(Debug, Clone)]
pub struct StoredVector {
    pub transaction_id: i64,
    pub embedding: Vec<f32>,
    pub model: String,
    pub content_hash: String,
}

fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn decode_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

impl Database {
    /// Insert or replace the embedding for a transaction
    pub fn upsert_vector(
        &self,
        user_id: &str,
        transaction_id: i64,
        embedding: &[f32],
        model: &str,
        content_hash: &str,
    ) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO transaction_vectors (transaction_id, user_id, embedding, model, content_hash)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(transaction_id) DO UPDATE SET
                embedding = excluded.embedding,
                model = excluded.model,
                content_hash = excluded.content_hash,
                created_at = CURRENT_TIMESTAMP
            "#,
            params![
                transaction_id,
                user_id,
                encode_embedding(embedding),
                model,
                content_hash
            ],
        )?;
        Ok(())
    }

    /// Content hash of the stored embedding, if any
    pub fn get_vector_hash(&self, transaction_id: i64) -> Result<Option<String>> {
        let conn = self.conn()?;
        let hash = conn
            .query_row(
                "SELECT content_hash FROM transaction_vectors WHERE transaction_id = ?",
                params![transaction_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(hash)
    }

    pub fn list_user_vectors(&self, user_id: &str) -> Result<Vec<StoredVector>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT transaction_id, embedding, model, content_hash FROM transaction_vectors WHERE user_id = ?",
        )?;
        let vectors = stmt
            .query_map(params![user_id], |row| {
                let blob: Vec<u8> = row.get(1)?;
                Ok(StoredVector {
                    transaction_id: row.get(0)?,
                    embedding: decode_embedding(&blob),
                    model: row.get(2)?,
                    content_hash: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(vectors)
    }

    /// Drop every stored embedding for a user, returning how many were removed
    pub fn delete_user_vectors(&self, user_id: &str) -> Result<usize> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM transaction_vectors WHERE user_id = ?",
            params![user_id],
        )?;
        Ok(deleted)
    }
}
