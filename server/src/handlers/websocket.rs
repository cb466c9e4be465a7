//! WebSocket handler for collection feeds.
//!
//! Handles one subscriber connection: sends the current snapshot, forwards
//! every later snapshot, and answers pings.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use sqlx::PgPool;
use tally_engine::CollectionName;
use tokio::sync::mpsc;

use crate::websocket::{ClientFrame, FeedManager, Frame};

use super::snapshot_frame;

/// Handle an established feed connection.
///
/// This function:
/// 1. Registers the connection with the manager
/// 2. Spawns a task to forward outgoing frames
/// 3. Sends the current snapshot
/// 4. Processes incoming frames in a loop
/// 5. Cleans up on disconnect
pub async fn handle_feed_connection(
    socket: WebSocket,
    pool: PgPool,
    feeds: Arc<FeedManager>,
    collection: CollectionName,
) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Arc<Frame>>();

    // Register and send the first snapshot under the collection lock, so no
    // write can publish between the two or overtake the initial snapshot.
    let guard = feeds.lock_collection(collection).await;
    let conn_id = feeds.register(collection, tx);

    let send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            match serde_json::to_string(frame.as_ref()) {
                Ok(text) => {
                    if let Err(e) = ws_sender.send(Message::Text(text.into())).await {
                        tracing::warn!("Failed to send WebSocket message: {}", e);
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!("Failed to serialize frame: {}", e);
                }
            }
        }
    });

    let initial = snapshot_frame(&pool, collection).await;
    feeds.send_to(&conn_id, initial);
    drop(guard);

    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(Message::Text(text)) => {
                let reply = process_frame(text.as_str());
                feeds.send_to(&conn_id, reply);
            }
            Ok(Message::Binary(_)) => {
                tracing::warn!("Binary messages not supported");
                feeds.send_to(&conn_id, Frame::error("binary messages not supported"));
            }
            Ok(Message::Ping(data)) => {
                tracing::trace!("Received ping: {} bytes", data.len());
            }
            Ok(Message::Pong(_)) => {
                tracing::trace!("Received pong");
            }
            Ok(Message::Close(_)) => {
                tracing::info!(conn_id = %conn_id, "WebSocket close frame received");
                break;
            }
            Err(e) => {
                tracing::warn!(conn_id = %conn_id, "WebSocket error: {}", e);
                break;
            }
        }
    }

    feeds.unregister(&conn_id);
    send_task.abort();

    tracing::info!(
        conn_id = %conn_id,
        collection = %collection,
        active_subscribers = feeds.subscriber_count(),
        "Feed subscriber disconnected"
    );
}

/// Answer a frame sent by a subscriber.
pub fn process_frame(text: &str) -> Frame {
    match serde_json::from_str::<ClientFrame>(text) {
        Ok(ClientFrame::Ping) => Frame::Pong,
        Err(e) => Frame::error(format!("Invalid message format: {}", e)),
    }
}
