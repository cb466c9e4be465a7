//! Collection endpoint routes.

use axum::{
    extract::{ws::WebSocketUpgrade, Path, State},
    http::StatusCode,
    response::Response,
    routing::get,
    Json, Router,
};
use serde_json::Value;
use tally_engine::remote::wire::AddResponse;
use tally_engine::Document;

use crate::error::Result;
use crate::handlers::{
    handle_add, handle_delete, handle_feed_connection, handle_list, handle_set, handle_update,
    into_fields, parse_collection,
};
use crate::AppState;

/// Create collection routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/collections/{name}", get(list_handler).post(add_handler))
        .route("/collections/{name}/subscribe", get(subscribe_handler))
        .route(
            "/collections/{name}/{id}",
            axum::routing::put(set_handler)
                .patch(update_handler)
                .delete(delete_handler),
        )
}

/// GET /collections/{name} - List all documents.
async fn list_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Vec<Document>>> {
    let collection = parse_collection(&name)?;
    let documents = handle_list(&state.pool, collection).await?;
    Ok(Json(documents))
}

/// POST /collections/{name} - Add a document under a server-assigned id.
async fn add_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<AddResponse>)> {
    let collection = parse_collection(&name)?;
    let fields = into_fields(body)?;
    let response = handle_add(&state.pool, &state.feeds, collection, fields).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// PUT /collections/{name}/{id} - Create or replace a document.
async fn set_handler(
    State(state): State<AppState>,
    Path((name, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<StatusCode> {
    let collection = parse_collection(&name)?;
    let fields = into_fields(body)?;
    handle_set(&state.pool, &state.feeds, collection, &id, fields).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PATCH /collections/{name}/{id} - Merge fields into an existing document.
async fn update_handler(
    State(state): State<AppState>,
    Path((name, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<StatusCode> {
    let collection = parse_collection(&name)?;
    let fields = into_fields(body)?;
    handle_update(&state.pool, &state.feeds, collection, &id, fields).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /collections/{name}/{id} - Delete a document.
async fn delete_handler(
    State(state): State<AppState>,
    Path((name, id)): Path<(String, String)>,
) -> Result<StatusCode> {
    let collection = parse_collection(&name)?;
    handle_delete(&state.pool, &state.feeds, collection, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /collections/{name}/subscribe - Live snapshot feed over WebSocket.
async fn subscribe_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    ws: WebSocketUpgrade,
) -> Result<Response> {
    let collection = parse_collection(&name)?;
    let pool = state.pool.clone();
    let feeds = state.feeds.clone();
    Ok(ws.on_upgrade(move |socket| handle_feed_connection(socket, pool, feeds, collection)))
}
