//! Subscriber registry.
//!
//! Tracks active feed connections per collection and fans frames out to them.
//! Also hands out the per-collection write lock that keeps snapshots
//! published in commit order.

use std::sync::Arc;

use dashmap::DashMap;
use tally_engine::CollectionName;
use tokio::sync::{mpsc, Mutex, OwnedMutexGuard};

use super::Frame;

/// Sender for frames going out on one connection.
pub type FrameSender = mpsc::UnboundedSender<Arc<Frame>>;

/// A single feed connection.
#[derive(Debug)]
pub struct Subscriber {
    /// Unique identifier for this connection
    pub id: String,
    /// Collection being watched
    pub collection: CollectionName,
    /// Channel to send frames to this connection
    pub sender: FrameSender,
}

/// Manages active feed connections.
///
/// Thread-safe and can be shared across handlers via `Arc`.
#[derive(Debug, Default)]
pub struct FeedManager {
    subscribers: DashMap<String, Subscriber>,
    write_locks: DashMap<CollectionName, Arc<Mutex<()>>>,
}

impl FeedManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Serialize writers of one collection.
    ///
    /// Held across write, snapshot read and publish, so subscribers see
    /// snapshots in the order the writes committed.
    pub async fn lock_collection(&self, collection: CollectionName) -> OwnedMutexGuard<()> {
        let lock = Arc::clone(self.write_locks.entry(collection).or_default().value());
        lock.lock_owned().await
    }

    /// Register a new subscriber. Returns the connection ID.
    pub fn register(&self, collection: CollectionName, sender: FrameSender) -> String {
        let conn_id = uuid::Uuid::new_v4().to_string();
        self.subscribers.insert(
            conn_id.clone(),
            Subscriber {
                id: conn_id.clone(),
                collection,
                sender,
            },
        );
        tracing::info!(conn_id = %conn_id, collection = %collection, "Feed subscriber registered");
        conn_id
    }

    /// Unregister a subscriber.
    pub fn unregister(&self, conn_id: &str) {
        if let Some((_, subscriber)) = self.subscribers.remove(conn_id) {
            tracing::info!(
                conn_id = %subscriber.id,
                collection = %subscriber.collection,
                "Feed subscriber unregistered"
            );
        }
    }

    /// Send a frame to every subscriber of `collection`.
    ///
    /// Returns the number of subscribers that received it.
    pub fn publish(&self, collection: CollectionName, frame: Frame) -> usize {
        let frame = Arc::new(frame);
        let mut sent_count = 0;

        for entry in self.subscribers.iter() {
            let subscriber = entry.value();
            if subscriber.collection == collection && subscriber.sender.send(frame.clone()).is_ok() {
                sent_count += 1;
            }
        }

        tracing::debug!(collection = %collection, recipients = sent_count, "Published frame");
        sent_count
    }

    /// Send a frame to one connection.
    pub fn send_to(&self, conn_id: &str, frame: Frame) -> bool {
        match self.subscribers.get(conn_id) {
            Some(subscriber) => subscriber.sender.send(Arc::new(frame)).is_ok(),
            None => false,
        }
    }

    /// Number of active subscribers across all collections.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Number of active subscribers of one collection.
    pub fn watching(&self, collection: CollectionName) -> usize {
        self.subscribers
            .iter()
            .filter(|entry| entry.value().collection == collection)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_engine::Document;

    #[test]
    fn register_and_unregister() {
        let manager = FeedManager::new();
        let (tx, _rx) = mpsc::unbounded_channel();

        let conn_id = manager.register(CollectionName::Orders, tx);
        assert_eq!(manager.subscriber_count(), 1);
        assert_eq!(manager.watching(CollectionName::Orders), 1);

        manager.unregister(&conn_id);
        assert_eq!(manager.subscriber_count(), 0);
    }

    #[test]
    fn publish_reaches_only_matching_collection() {
        let manager = FeedManager::new();
        let (tx_orders, mut rx_orders) = mpsc::unbounded_channel();
        let (tx_clients, mut rx_clients) = mpsc::unbounded_channel();
        manager.register(CollectionName::Orders, tx_orders);
        manager.register(CollectionName::Clients, tx_clients);

        let sent = manager.publish(
            CollectionName::Orders,
            Frame::Snapshot {
                collection: CollectionName::Orders,
                documents: vec![],
            },
        );

        assert_eq!(sent, 1);
        assert!(rx_orders.try_recv().is_ok());
        assert!(rx_clients.try_recv().is_err());
    }

    #[test]
    fn closed_receivers_are_not_counted() {
        let manager = FeedManager::new();
        let (tx, rx) = mpsc::unbounded_channel();
        manager.register(CollectionName::Products, tx);
        drop(rx);

        assert_eq!(manager.publish(CollectionName::Products, Frame::Pong), 0);
    }

    #[tokio::test]
    async fn collection_lock_is_per_collection() {
        let manager = FeedManager::new();
        let orders = manager.lock_collection(CollectionName::Orders).await;
        let _clients = manager.lock_collection(CollectionName::Clients).await;

        let blocked = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            manager.lock_collection(CollectionName::Orders),
        )
        .await;
        assert!(blocked.is_err());

        drop(orders);
        let _again = manager.lock_collection(CollectionName::Orders).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn locked_writers_publish_in_commit_order() {
        let manager = Arc::new(FeedManager::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        manager.register(CollectionName::Orders, tx);
        let committed = Arc::new(std::sync::Mutex::new(Vec::new()));

        let mut writers = Vec::new();
        for n in 0..32 {
            let manager = Arc::clone(&manager);
            let committed = Arc::clone(&committed);
            writers.push(tokio::spawn(async move {
                let _guard = manager.lock_collection(CollectionName::Orders).await;
                let documents = {
                    let mut committed = committed.lock().unwrap();
                    committed.push(n);
                    committed.len()
                };
                tokio::task::yield_now().await;
                manager.publish(
                    CollectionName::Orders,
                    Frame::Snapshot {
                        collection: CollectionName::Orders,
                        documents: vec![Document::new("o", Default::default()); documents],
                    },
                );
            }));
        }
        for writer in writers {
            writer.await.unwrap();
        }

        let mut sizes = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            if let Frame::Snapshot { documents, .. } = frame.as_ref() {
                sizes.push(documents.len());
            }
        }
        assert_eq!(sizes, (1..=32).collect::<Vec<_>>());
    }

    #[test]
    fn send_to_unknown_connection() {
        let manager = FeedManager::new();
        assert!(!manager.send_to("missing", Frame::Pong));
    }
}
