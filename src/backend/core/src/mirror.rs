//! Secondary durable backend for the state store.
//!
//! The primary state document is a JSON file; a [`StateMirror`] is a
//! best-effort copy of that document in a second durable system so run
//! history survives loss of the primary. Mirror writes are never allowed
//! to fail a save; mirror reads are only consulted when the primary file
//! is absent.

use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// A key/document store the state store mirrors itself into.
#[async_trait]
pub trait StateMirror: Send + Sync {
    /// Fetch the mirrored document, if one exists.
    async fn read(&self, key: &str) -> anyhow::Result<Option<String>>;

    /// Replace the mirrored document.
    async fn write(&self, key: &str, document: &str) -> anyhow::Result<()>;
}

/// Postgres-backed mirror: one row per state document in a
/// `scheduler_state` table.
pub struct PostgresMirror {
    pool: PgPool,
}

impl PostgresMirror {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the backing table if it does not exist.
    pub async fn ensure_schema(&self) -> anyhow::Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS scheduler_state (
                 key text PRIMARY KEY,
                 document jsonb NOT NULL,
                 updated_at timestamptz NOT NULL DEFAULT now()
             )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl StateMirror for PostgresMirror {
    async fn read(&self, key: &str) -> anyhow::Result<Option<String>> {
        let document: Option<String> =
            sqlx::query_scalar("SELECT document::text FROM scheduler_state WHERE key = $1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(document)
    }

    async fn write(&self, key: &str, document: &str) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO scheduler_state (key, document, updated_at)
             VALUES ($1, $2::jsonb, now())
             ON CONFLICT (key)
             DO UPDATE SET document = EXCLUDED.document, updated_at = now()",
        )
        .bind(key)
        .bind(document)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// In-memory mirror for testing and development.
#[derive(Default)]
pub struct MemoryMirror {
    documents: Mutex<HashMap<String, String>>,
}

impl MemoryMirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document, as if a previous process had mirrored it.
    pub async fn seed(&self, key: &str, document: &str) {
        self.documents
            .lock()
            .await
            .insert(key.to_string(), document.to_string());
    }
}

#[async_trait]
impl StateMirror for MemoryMirror {
    async fn read(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.documents.lock().await.get(key).cloned())
    }

    async fn write(&self, key: &str, document: &str) -> anyhow::Result<()> {
        self.documents
            .lock()
            .await
            .insert(key.to_string(), document.to_string());
        Ok(())
    }
}
