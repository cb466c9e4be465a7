//! Remote Collection Service - the asynchronous document store the engine
//! mirrors into.
//!
//! The engine only depends on the [`RemoteCollections`] trait. Two bindings
//! ship with the crate:
//! - [`MemoryRemote`] - in-process, for tests and offline demos
//! - [`HttpRemote`] - REST + WebSocket client for `tally-server`
//!
//! Live updates are delivered as [`RemoteEvent`]s on a channel supplied by
//! the subscriber. Each event carries the *full* current contents of one
//! collection (or the error that interrupted the feed).

mod http;
mod memory;
pub mod wire;

pub use http::HttpRemote;
pub use memory::{MemoryRemote, RemoteCall};

use crate::document::{Document, Fields};
use crate::{CollectionName, RecordId};
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors from the remote service.
///
/// `Clone` so that a failed feed can be reported inside a [`RemoteEvent`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("remote not configured")]
    NotConfigured,

    #[error("remote unavailable: {0}")]
    Unavailable(String),

    #[error("remote rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("document not found: {collection}/{id}")]
    NotFound {
        collection: CollectionName,
        id: RecordId,
    },

    #[error("failed to decode remote response: {0}")]
    Decode(String),

    #[error("subscription closed")]
    Closed,
}

/// Result type for remote operations.
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// One live update for one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteEvent {
    pub collection: CollectionName,
    pub documents: RemoteResult<Vec<Document>>,
}

impl RemoteEvent {
    pub fn snapshot(collection: CollectionName, documents: Vec<Document>) -> Self {
        Self {
            collection,
            documents: Ok(documents),
        }
    }

    pub fn failed(collection: CollectionName, error: RemoteError) -> Self {
        Self {
            collection,
            documents: Err(error),
        }
    }
}

/// Sending half of a live-update feed.
pub type EventSender = mpsc::UnboundedSender<RemoteEvent>;

/// Handle returned by [`RemoteCollections::subscribe`].
///
/// Dropping the handle also unsubscribes, so a forgotten handle cannot leak
/// a listener.
pub struct Subscription {
    collection: CollectionName,
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(collection: CollectionName, cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            collection,
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn collection(&self) -> CollectionName {
        self.collection
    }

    /// Stop receiving updates.
    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
            tracing::debug!(collection = %self.collection, "Unsubscribed from remote collection");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("collection", &self.collection)
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// The document-collection API the engine mirrors into.
///
/// All operations are asynchronous and fallible. Implementations must deliver
/// the current contents once immediately after `subscribe`, then again after
/// every change.
#[async_trait]
pub trait RemoteCollections: Send + Sync {
    /// Register a live-update listener for `collection`.
    async fn subscribe(
        &self,
        collection: CollectionName,
        events: EventSender,
    ) -> RemoteResult<Subscription>;

    /// Create a document; the service assigns its id.
    async fn add(&self, collection: CollectionName, fields: Fields) -> RemoteResult<RecordId>;

    /// Create or fully replace the document with the given id.
    async fn set(&self, collection: CollectionName, id: &str, fields: Fields) -> RemoteResult<()>;

    /// Merge fields into an existing document.
    async fn update(
        &self,
        collection: CollectionName,
        id: &str,
        fields: Fields,
    ) -> RemoteResult<()>;

    /// Delete a document. Deleting a missing document is not an error.
    async fn delete(&self, collection: CollectionName, id: &str) -> RemoteResult<()>;

    /// One-shot read of a whole collection.
    async fn list_all(&self, collection: CollectionName) -> RemoteResult<Vec<Document>>;
}
