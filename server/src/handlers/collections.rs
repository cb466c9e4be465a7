//! Collection handlers: list, add, set, update, delete.
//!
//! Every successful write pushes a fresh snapshot to the collection's
//! subscribers. Writes to one collection hold its lock from the database
//! write until the snapshot is published.

use serde_json::Value;
use sqlx::PgPool;
use tally_engine::remote::wire::AddResponse;
use tally_engine::{CollectionName, Document, Fields};

use crate::db;
use crate::error::{AppError, Result};
use crate::websocket::{FeedManager, Frame};

/// Resolve a collection name from the URL.
pub fn parse_collection(name: &str) -> Result<CollectionName> {
    name.parse()
        .map_err(|_| AppError::NotFound(format!("unknown collection: {name}")))
}

/// Turn a request body into document fields.
///
/// The body must be a JSON object. Any `id` inside it is dropped: the id lives
/// in the URL or is assigned by the server.
pub fn into_fields(body: Value) -> Result<Fields> {
    match body {
        Value::Object(mut fields) => {
            fields.remove("id");
            Ok(fields)
        }
        other => Err(AppError::BadRequest(format!(
            "document must be a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Ids travel in URL paths, so keep them to something path-safe.
pub fn validate_id(id: &str) -> Result<()> {
    let valid = !id.is_empty()
        && id.len() <= 128
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!("invalid document id: {id}")))
    }
}

pub async fn handle_list(pool: &PgPool, collection: CollectionName) -> Result<Vec<Document>> {
    Ok(db::list_documents(pool, collection).await?)
}

pub async fn handle_add(
    pool: &PgPool,
    feeds: &FeedManager,
    collection: CollectionName,
    fields: Fields,
) -> Result<AddResponse> {
    let _guard = feeds.lock_collection(collection).await;
    let id = db::insert_document(pool, collection, fields).await?;
    tracing::info!(collection = %collection, id = %id, "Document added");
    notify(pool, feeds, collection).await;
    Ok(AddResponse { id })
}

pub async fn handle_set(
    pool: &PgPool,
    feeds: &FeedManager,
    collection: CollectionName,
    id: &str,
    fields: Fields,
) -> Result<()> {
    validate_id(id)?;
    let _guard = feeds.lock_collection(collection).await;
    db::upsert_document(pool, collection, id, fields).await?;
    tracing::info!(collection = %collection, id = %id, "Document set");
    notify(pool, feeds, collection).await;
    Ok(())
}

pub async fn handle_update(
    pool: &PgPool,
    feeds: &FeedManager,
    collection: CollectionName,
    id: &str,
    fields: Fields,
) -> Result<()> {
    validate_id(id)?;
    let _guard = feeds.lock_collection(collection).await;
    if !db::merge_document(pool, collection, id, fields).await? {
        return Err(AppError::NotFound(format!(
            "document not found: {collection}/{id}"
        )));
    }
    tracing::info!(collection = %collection, id = %id, "Document updated");
    notify(pool, feeds, collection).await;
    Ok(())
}

pub async fn handle_delete(
    pool: &PgPool,
    feeds: &FeedManager,
    collection: CollectionName,
    id: &str,
) -> Result<()> {
    validate_id(id)?;
    let _guard = feeds.lock_collection(collection).await;
    let existed = db::delete_document(pool, collection, id).await?;
    tracing::info!(collection = %collection, id = %id, existed, "Document deleted");
    if existed {
        notify(pool, feeds, collection).await;
    }
    Ok(())
}

/// Current snapshot frame of a collection, or an error frame.
pub async fn snapshot_frame(pool: &PgPool, collection: CollectionName) -> Frame {
    match db::list_documents(pool, collection).await {
        Ok(documents) => Frame::Snapshot {
            collection,
            documents,
        },
        Err(e) => {
            tracing::error!(collection = %collection, "Failed to load snapshot: {:?}", e);
            Frame::error(format!("failed to load {collection}"))
        }
    }
}

/// Push the current snapshot to every subscriber of `collection`.
///
/// Callers hold the collection lock.
async fn notify(pool: &PgPool, feeds: &FeedManager, collection: CollectionName) {
    if feeds.watching(collection) == 0 {
        return;
    }
    let frame = snapshot_frame(pool, collection).await;
    feeds.publish(collection, frame);
}
