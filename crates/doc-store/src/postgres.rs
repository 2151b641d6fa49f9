use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use common::DocumentId;

use crate::{
    Document, Result, StoreError, Version,
    store::{DocumentStore, PutOptions},
};

/// PostgreSQL-backed document store implementation.
///
/// Documents live in a single `documents` table as JSONB payloads keyed by
/// (collection, id). Version checks are enforced inside a transaction with
/// a row lock, so concurrent compare-and-set writes serialize correctly.
#[derive(Clone)]
pub struct PostgresDocumentStore {
    pool: PgPool,
}

impl PostgresDocumentStore {
    /// Creates a new PostgreSQL document store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_document(row: PgRow) -> Result<Document> {
        Ok(Document {
            id: DocumentId::from_uuid(row.try_get::<Uuid, _>("id")?),
            version: Version::new(row.try_get("version")?),
            payload: row.try_get("payload")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    async fn get(&self, collection: &str, id: DocumentId) -> Result<Option<Document>> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT id, version, payload, updated_at
            FROM documents
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(collection)
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_document).transpose()
    }

    async fn put(
        &self,
        collection: &str,
        id: DocumentId,
        payload: serde_json::Value,
        options: PutOptions,
    ) -> Result<Version> {
        let mut tx = self.pool.begin().await?;

        // Lock the row so concurrent writers serialize on the version check.
        let current_version: Option<i64> = sqlx::query_scalar(
            "SELECT version FROM documents WHERE collection = $1 AND id = $2 FOR UPDATE",
        )
        .bind(collection)
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await?;

        let actual = Version::new(current_version.unwrap_or(0));

        if let Some(expected) = options.expected_version
            && actual != expected
        {
            return Err(StoreError::VersionConflict {
                collection: collection.to_string(),
                id,
                expected,
                actual,
            });
        }

        let new_version = actual.next();

        sqlx::query(
            r#"
            INSERT INTO documents (collection, id, version, payload, updated_at)
            VALUES ($1, $2, $3, $4, now())
            ON CONFLICT (collection, id) DO UPDATE SET
                version = EXCLUDED.version,
                payload = EXCLUDED.payload,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(collection)
        .bind(id.as_uuid())
        .bind(new_version.as_i64())
        .bind(&payload)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(new_version)
    }

    async fn delete(&self, collection: &str, id: DocumentId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find(&self, collection: &str, filter: serde_json::Value) -> Result<Vec<Document>> {
        let rows = sqlx::query(
            r#"
            SELECT id, version, payload, updated_at
            FROM documents
            WHERE collection = $1 AND payload @> $2
            ORDER BY updated_at DESC
            "#,
        )
        .bind(collection)
        .bind(&filter)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_document).collect()
    }
}
