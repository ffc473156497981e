//! Transaction similarity search
//!
//! Embeddings come from the configured AI backend and are stored per
//! transaction. Search ranks stored vectors by cosine similarity and falls back
//! to keyword scoring when embeddings are unavailable.

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::ai::{AIBackend, AIClient};
use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::Transaction;

/// Result of (re)indexing a user's transactions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub indexed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// How a search hit was ranked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMethod {
    Semantic,
    Keyword,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub transaction: Transaction,
    pub score: f64,
    pub method: SearchMethod,
}

/// Text that gets embedded for a transaction
pub fn transaction_text(tx: &Transaction) -> String {
    format!(
        "{} | {} | {} | {:.2}",
        tx.description, tx.category, tx.transaction_type, tx.amount
    )
}

/// SHA-256 over model and text, so a model change forces re-embedding
pub fn content_hash(model: &str, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(model.as_bytes());
    hasher.update(b"\n");
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Cosine similarity; 0.0 for mismatched or zero-length vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Fraction of query tokens found in the description, category or notes
pub fn keyword_score(query_tokens: &[String], tx: &Transaction) -> f64 {
    if query_tokens.is_empty() {
        return 0.0;
    }
    let haystack = format!(
        "{} {} {}",
        tx.description,
        tx.category,
        tx.notes.as_deref().unwrap_or("")
    )
    .to_lowercase();

    let found = query_tokens
        .iter()
        .filter(|t| haystack.contains(t.as_str()))
        .count();
    found as f64 / query_tokens.len() as f64
}

/// Per-user embedding index over transactions
#[derive(Clone)]
pub struct VectorIndex {
    db: Database,
    ai: Option<AIClient>,
}

impl VectorIndex {
    pub fn new(db: Database, ai: Option<AIClient>) -> Self {
        Self { db, ai }
    }

    fn client(&self) -> Result<&AIClient> {
        self.ai
            .as_ref()
            .ok_or_else(|| Error::Config("No AI backend configured for embeddings".into()))
    }

    /// Embed and store one transaction
    ///
    /// Returns `false` when the stored embedding is already current.
    pub async fn index_transaction(&self, tx: &Transaction) -> Result<bool> {
        let ai = self.client()?;
        let text = transaction_text(tx);
        let hash = content_hash(ai.embedding_model(), &text);

        if self.db.get_vector_hash(tx.id)?.as_deref() == Some(hash.as_str()) {
            return Ok(false);
        }

        let embedding = ai.embed(&text).await?;
        self.db
            .upsert_vector(&tx.user_id, tx.id, &embedding, ai.embedding_model(), &hash)?;
        Ok(true)
    }

    /// Index every transaction a user has
    pub async fn index_user(&self, user_id: &str) -> Result<IndexStats> {
        self.client()?;
        let mut stats = IndexStats::default();

        for tx in self.db.all_transactions(user_id)? {
            match self.index_transaction(&tx).await {
                Ok(true) => stats.indexed += 1,
                Ok(false) => stats.skipped += 1,
                Err(e) => {
                    warn!(transaction_id = tx.id, error = %e, "Failed to embed transaction");
                    stats.failed += 1;
                }
            }
        }

        info!(
            user_id,
            indexed = stats.indexed,
            skipped = stats.skipped,
            failed = stats.failed,
            "Vector index updated"
        );
        Ok(stats)
    }

    /// Find the transactions most similar to `query`
    pub async fn search(&self, user_id: &str, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        self.search_with(self.ai.as_ref(), user_id, query, limit).await
    }

    /// Search embedding with `ai`; keyword matching only when `ai` is `None`
    pub async fn search_with(
        &self,
        ai: Option<&AIClient>,
        user_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchHit>> {
        if query.trim().is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        if let Some(ai) = ai {
            match ai.embed(query).await {
                Ok(query_vec) if !query_vec.is_empty() => {
                    let hits = self.semantic_search(user_id, ai.embedding_model(), &query_vec, limit)?;
                    if !hits.is_empty() {
                        return Ok(hits);
                    }
                    debug!(user_id, "No stored embeddings matched, using keyword search");
                }
                Ok(_) => debug!("Empty query embedding, using keyword search"),
                Err(e) => warn!(error = %e, "Query embedding failed, using keyword search"),
            }
        }

        self.keyword_search(user_id, query, limit)
    }

    fn semantic_search(
        &self,
        user_id: &str,
        model: &str,
        query_vec: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchHit>> {
        let mut scored: Vec<(i64, f64)> = self
            .db
            .list_user_vectors(user_id)?
            .into_iter()
            .filter(|v| v.model == model && v.embedding.len() == query_vec.len())
            .map(|v| (v.transaction_id, cosine_similarity(query_vec, &v.embedding)))
            .filter(|(_, score)| *score > 0.0)
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| b.0.cmp(&a.0)));

        let mut hits = Vec::with_capacity(limit.min(scored.len()));
        for (id, score) in scored.into_iter().take(limit) {
            if let Some(transaction) = self.db.get_transaction(id)? {
                hits.push(SearchHit {
                    transaction,
                    score,
                    method: SearchMethod::Semantic,
                });
            }
        }
        Ok(hits)
    }

    fn keyword_search(&self, user_id: &str, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        let tokens = tokenize(query);
        let mut hits: Vec<SearchHit> = self
            .db
            .all_transactions(user_id)?
            .into_iter()
            .filter_map(|tx| {
                let score = keyword_score(&tokens, &tx);
                (score > 0.0).then_some(SearchHit {
                    transaction: tx,
                    score,
                    method: SearchMethod::Keyword,
                })
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| b.transaction.date.cmp(&a.transaction.date))
                .then_with(|| b.transaction.id.cmp(&a.transaction.id))
        });
        hits.truncate(limit);
        Ok(hits)
    }

    /// Drop a user's stored embeddings
    pub fn reset_user_vectors(&self, user_id: &str) -> Result<usize> {
        self.db.delete_user_vectors(user_id)
    }
}
