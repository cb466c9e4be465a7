//! Queries against the `documents` table.
//!
//! A document is a flat JSON object stored under `(collection, id)`. The id is
//! never stored inside the body.

use sqlx::types::Json;
use sqlx::PgPool;
use tally_engine::{CollectionName, Document, Fields, RecordId};

/// All documents of a collection, oldest first.
pub async fn list_documents(
    pool: &PgPool,
    collection: CollectionName,
) -> Result<Vec<Document>, sqlx::Error> {
    let rows: Vec<(String, Json<Fields>)> = sqlx::query_as(
        r#"
        SELECT id, body
        FROM documents
        WHERE collection = $1
        ORDER BY created_at ASC, id ASC
        "#,
    )
    .bind(collection.as_str())
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(id, Json(fields))| Document::new(id, fields))
        .collect())
}

/// Insert a document under a fresh server-assigned id.
pub async fn insert_document(
    pool: &PgPool,
    collection: CollectionName,
    fields: Fields,
) -> Result<RecordId, sqlx::Error> {
    let id = uuid::Uuid::new_v4().simple().to_string();
    sqlx::query(
        r#"
        INSERT INTO documents (collection, id, body)
        VALUES ($1, $2, $3)
        "#,
    )
    .bind(collection.as_str())
    .bind(&id)
    .bind(Json(fields))
    .execute(pool)
    .await?;
    Ok(id)
}

/// Create or fully replace the document with the given id.
pub async fn upsert_document(
    pool: &PgPool,
    collection: CollectionName,
    id: &str,
    fields: Fields,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO documents (collection, id, body)
        VALUES ($1, $2, $3)
        ON CONFLICT (collection, id)
        DO UPDATE SET body = EXCLUDED.body, updated_at = now()
        "#,
    )
    .bind(collection.as_str())
    .bind(id)
    .bind(Json(fields))
    .execute(pool)
    .await?;
    Ok(())
}

/// Merge fields into an existing document.
///
/// Returns `false` when no document has that id.
pub async fn merge_document(
    pool: &PgPool,
    collection: CollectionName,
    id: &str,
    fields: Fields,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE documents
        SET body = body || $3, updated_at = now()
        WHERE collection = $1 AND id = $2
        "#,
    )
    .bind(collection.as_str())
    .bind(id)
    .bind(Json(fields))
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Delete a document. Returns whether one existed.
pub async fn delete_document(
    pool: &PgPool,
    collection: CollectionName,
    id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
        .bind(collection.as_str())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
