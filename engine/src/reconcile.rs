//! Reconciliation Engine.
//!
//! The [`Engine`] owns the in-memory [`AppState`], which is the single source
//! of truth for a session. The Local Store and the remote service are both
//! downstream mirrors of it.
//!
//! # Lifecycle
//!
//! 1. [`Engine::open`] seeds memory from the Local Store (local-only mode).
//! 2. [`Engine::connect`] / [`Engine::attach`] move to remote-attached mode:
//!    - subscribe to all three collections
//!    - one-time upward sync: a collection is pushed with `add` only when the
//!      remote copy is empty and the local copy is not
//! 3. Live updates are queued on a channel and applied, in delivery order,
//!    when the owner calls [`Engine::pump`] or [`Engine::process_next`].
//!
//! # Consistency
//!
//! A live update fully replaces the matching collection and is persisted
//! immediately. There is no diffing against local edits: a local edit made
//! between a remote write and the echo of an earlier write is overwritten by
//! that echo. Consistency with the remote is eventual, not strong.
//!
//! Remote failures never reach the caller. They are logged at `warn` and the
//! local path stays authoritative.
//!
//! # Remote writes
//!
//! Mutations are mirrored through a single FIFO queue per attached link. One
//! writer task drains it and awaits each call before starting the next, so
//! successive writes to the same document reach the remote in the order the
//! mutations happened. Enqueueing never blocks the caller.

use crate::document::{Document, Fields};
use crate::local::{LocalStore, StorageBackend};
use crate::manager::{Entity, Manager};
use crate::remote::{EventSender, RemoteCollections, RemoteError, RemoteEvent, RemoteResult, Subscription};
use crate::view::OrderQuery;
use crate::{error::Result, AppState, Client, CollectionName, Order, Product};
use chrono::{SecondsFormat, Utc};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Which mirrors the engine is currently keeping up to date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Memory and Local Store only.
    LocalOnly,
    /// Memory, Local Store and the remote service.
    RemoteAttached,
}

enum RemoteLink {
    /// No remote initialization attempted yet.
    Detached,
    /// Remote initialization failed; local-only for the rest of the session.
    Failed,
    Attached {
        remote: Arc<dyn RemoteCollections>,
        subscriptions: Vec<Subscription>,
        writes: WriteQueue,
    },
}

/// One queued remote write.
enum RemoteWrite {
    Set {
        collection: CollectionName,
        id: String,
        fields: Fields,
    },
    Delete {
        collection: CollectionName,
        id: String,
    },
    /// Resolved once every write queued before it has been attempted.
    Flush(oneshot::Sender<()>),
}

/// Ordered queue of remote writes, drained by one writer task.
struct WriteQueue {
    tx: mpsc::UnboundedSender<RemoteWrite>,
    pending: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl WriteQueue {
    /// Start the writer task. Must be called inside a tokio runtime.
    fn start(remote: Arc<dyn RemoteCollections>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let pending = Arc::new(AtomicUsize::new(0));
        let task = tokio::spawn(drain_writes(remote, rx, Arc::clone(&pending)));
        Self { tx, pending, task }
    }

    fn push(&self, write: RemoteWrite) {
        self.pending.fetch_add(1, Ordering::SeqCst);
        if self.tx.send(write).is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            tracing::warn!("Remote writer stopped, write dropped");
        }
    }

    fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(RemoteWrite::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }

    /// Close the queue. Writes already queued are still delivered.
    fn close(self) -> JoinHandle<()> {
        self.task
    }
}

async fn drain_writes(
    remote: Arc<dyn RemoteCollections>,
    mut rx: mpsc::UnboundedReceiver<RemoteWrite>,
    pending: Arc<AtomicUsize>,
) {
    while let Some(write) = rx.recv().await {
        let (op, collection, id, result) = match write {
            RemoteWrite::Flush(done) => {
                let _ = done.send(());
                continue;
            }
            RemoteWrite::Set {
                collection,
                id,
                fields,
            } => {
                let result = remote.set(collection, &id, fields).await;
                ("set", collection, id, result)
            }
            RemoteWrite::Delete { collection, id } => {
                let result = remote.delete(collection, &id).await;
                ("delete", collection, id, result)
            }
        };
        pending.fetch_sub(1, Ordering::SeqCst);
        match result {
            Ok(()) => tracing::debug!(op, collection = %collection, id = %id, "Remote write done"),
            Err(e) => {
                tracing::warn!(op, collection = %collection, id = %id, error = %e, "Remote write failed")
            }
        }
    }
}

/// Outcome of the one-time upward sync for one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpwardSync {
    /// Remote already holds documents; nothing pushed.
    RemoteNotEmpty,
    /// Nothing local to push.
    LocalEmpty,
    /// Local records were pushed with `add`.
    Pushed { added: usize, failed: usize },
    /// `list_all` failed; nothing pushed.
    ListFailed,
}

/// What happened while attaching to a remote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Collections with a live subscription.
    pub subscribed: Vec<CollectionName>,
    /// Upward-sync outcome per collection.
    pub upward: Vec<(CollectionName, UpwardSync)>,
}

impl SyncReport {
    pub fn outcome(&self, collection: CollectionName) -> Option<&UpwardSync> {
        self.upward
            .iter()
            .find(|(name, _)| *name == collection)
            .map(|(_, outcome)| outcome)
    }

    /// Total records successfully pushed upward.
    pub fn added(&self) -> usize {
        self.upward
            .iter()
            .map(|(_, outcome)| match outcome {
                UpwardSync::Pushed { added, .. } => *added,
                _ => 0,
            })
            .sum()
    }
}

/// Owner of the in-memory collections and both mirrors.
pub struct Engine<B> {
    state: AppState,
    local: LocalStore<B>,
    link: RemoteLink,
    events_tx: EventSender,
    events_rx: mpsc::UnboundedReceiver<RemoteEvent>,
    /// Writers of detached links still delivering their queues.
    retired: Vec<JoinHandle<()>>,
}

impl<B: StorageBackend> Engine<B> {
    /// Seed memory from the Local Store. Starts local-only.
    pub fn open(local: LocalStore<B>) -> Self {
        let state = local.load_all();
        tracing::info!(
            products = state.products.len(),
            clients = state.clients.len(),
            orders = state.orders.len(),
            "Loaded local state"
        );
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            state,
            local,
            link: RemoteLink::Detached,
            events_tx,
            events_rx,
            retired: Vec::new(),
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub(crate) fn state_mut(&mut self) -> &mut AppState {
        &mut self.state
    }

    pub fn local(&self) -> &LocalStore<B> {
        &self.local
    }

    pub fn mode(&self) -> SyncMode {
        match self.link {
            RemoteLink::Attached { .. } => SyncMode::RemoteAttached,
            RemoteLink::Detached | RemoteLink::Failed => SyncMode::LocalOnly,
        }
    }

    /// Whether remote initialization was attempted and failed.
    pub fn remote_failed(&self) -> bool {
        matches!(self.link, RemoteLink::Failed)
    }

    pub fn products(&mut self) -> Manager<'_, Product, B> {
        Manager::new(self)
    }

    pub fn clients(&mut self) -> Manager<'_, Client, B> {
        Manager::new(self)
    }

    pub fn orders(&mut self) -> Manager<'_, Order, B> {
        Manager::new(self)
    }

    /// Orders for the day view, filtered and sorted.
    pub fn visible_orders(&self, query: &OrderQuery) -> Vec<&Order> {
        crate::view::visible_orders(&self.state, query)
    }

    /// Write all collections to the Local Store.
    pub fn persist(&mut self) -> Result<()> {
        self.local.save_all(&self.state)
    }

    /// Initialize the remote and attach to it, at most once per session.
    ///
    /// If `init` fails the engine stays local-only for good; later calls are
    /// ignored and return `None`.
    pub async fn connect<F, R>(&mut self, init: F) -> Option<SyncReport>
    where
        F: Future<Output = RemoteResult<R>>,
        R: RemoteCollections + 'static,
    {
        if !matches!(self.link, RemoteLink::Detached) {
            tracing::debug!("Remote initialization already attempted");
            return None;
        }
        match init.await {
            Ok(remote) => Some(self.attach(Arc::new(remote)).await),
            Err(e) => {
                tracing::warn!(error = %e, "Remote initialization failed, staying local-only");
                self.link = RemoteLink::Failed;
                None
            }
        }
    }

    /// Subscribe to every collection, then run the one-time upward sync.
    ///
    /// Any previous subscriptions are cancelled first. The upward sync works
    /// from a copy of memory taken before any live update is applied, so the
    /// immediate snapshot delivered on subscribe cannot hide local records.
    pub async fn attach(&mut self, remote: Arc<dyn RemoteCollections>) -> SyncReport {
        self.detach();
        let local_snapshot = self.state.clone();
        let mut report = SyncReport::default();

        let mut subscriptions = Vec::with_capacity(CollectionName::ALL.len());
        for collection in CollectionName::ALL {
            match remote.subscribe(collection, self.events_tx.clone()).await {
                Ok(subscription) => {
                    report.subscribed.push(collection);
                    subscriptions.push(subscription);
                }
                Err(e) => {
                    tracing::warn!(collection = %collection, error = %e, "Remote subscribe failed");
                }
            }
        }

        for collection in CollectionName::ALL {
            let outcome = upward_sync(remote.as_ref(), &local_snapshot, collection).await;
            report.upward.push((collection, outcome));
        }
        tracing::info!(
            subscribed = report.subscribed.len(),
            added = report.added(),
            "Attached to remote"
        );

        let writes = WriteQueue::start(Arc::clone(&remote));
        self.link = RemoteLink::Attached {
            remote,
            subscriptions,
            writes,
        };
        report
    }

    /// Cancel all subscriptions and go back to local-only.
    ///
    /// Updates already queued from the old subscriptions are discarded.
    /// Remote writes already queued are still delivered.
    pub fn detach(&mut self) {
        let link = std::mem::replace(&mut self.link, RemoteLink::Detached);
        match link {
            RemoteLink::Attached {
                subscriptions,
                writes,
                ..
            } => {
                for subscription in subscriptions {
                    subscription.unsubscribe();
                }
                while self.events_rx.try_recv().is_ok() {}
                self.retired.retain(|task| !task.is_finished());
                self.retired.push(writes.close());
            }
            RemoteLink::Failed => self.link = RemoteLink::Failed,
            RemoteLink::Detached => {}
        }
    }

    /// Apply one live update.
    ///
    /// Returns the collection that was replaced, or `None` when the update
    /// carried an error (which is logged and otherwise ignored).
    pub fn apply_remote_event(&mut self, event: RemoteEvent) -> Result<Option<CollectionName>> {
        let collection = event.collection;
        let documents = match event.documents {
            Ok(documents) => documents,
            Err(e) => {
                tracing::warn!(collection = %collection, error = %e, "Remote subscription error");
                return Ok(None);
            }
        };

        let count = match collection {
            CollectionName::Products => replace_from::<Product>(&mut self.state, &documents),
            CollectionName::Clients => replace_from::<Client>(&mut self.state, &documents),
            CollectionName::Orders => replace_from::<Order>(&mut self.state, &documents),
        };
        self.persist()?;
        tracing::debug!(collection = %collection, records = count, "Applied remote update");
        Ok(Some(collection))
    }

    /// Apply every update queued so far, in delivery order.
    pub fn pump(&mut self) -> Result<Vec<CollectionName>> {
        let mut changed = Vec::new();
        while let Ok(event) = self.events_rx.try_recv() {
            if let Some(collection) = self.apply_remote_event(event)? {
                changed.push(collection);
            }
        }
        Ok(changed)
    }

    /// Wait for the next live update and apply it.
    pub async fn process_next(&mut self) -> Result<Option<CollectionName>> {
        match self.events_rx.recv().await {
            Some(event) => self.apply_remote_event(event),
            None => Ok(None),
        }
    }

    /// Wait until every remote write queued so far has been attempted.
    pub async fn settle(&mut self) {
        if let RemoteLink::Attached { writes, .. } = &self.link {
            writes.flush().await;
        }
        for task in self.retired.drain(..) {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Remote writer did not complete");
            }
        }
    }

    /// Number of queued remote writes not yet attempted.
    pub fn pending_writes(&self) -> usize {
        match &self.link {
            RemoteLink::Attached { writes, .. } => writes.pending(),
            RemoteLink::Detached | RemoteLink::Failed => 0,
        }
    }

    pub(crate) fn mirror_set(&mut self, collection: CollectionName, document: Document) {
        self.enqueue(RemoteWrite::Set {
            collection,
            id: document.id,
            fields: document.fields,
        });
    }

    pub(crate) fn mirror_delete(&mut self, collection: CollectionName, id: String) {
        self.enqueue(RemoteWrite::Delete { collection, id });
    }

    /// Queue a remote write behind every earlier one. No-op unless attached.
    fn enqueue(&self, write: RemoteWrite) {
        if let RemoteLink::Attached { writes, .. } = &self.link {
            writes.push(write);
        }
    }
}

/// Decode `documents` into `E` and replace its collection. Undecodable
/// documents are skipped.
fn replace_from<E: Entity>(state: &mut AppState, documents: &[Document]) -> usize {
    let records: Vec<E> = documents
        .iter()
        .filter_map(|doc| match E::from_document(doc) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(collection = %E::COLLECTION, id = %doc.id, error = %e, "Skipping remote document");
                None
            }
        })
        .collect();
    let count = records.len();
    E::collection_mut(state).replace(records);
    count
}

fn local_documents<E: Entity>(state: &AppState) -> Vec<Document> {
    E::collection(state)
        .iter()
        .filter_map(|record| match record.to_document() {
            Ok(doc) => Some(doc),
            Err(e) => {
                tracing::warn!(collection = %E::COLLECTION, error = %e, "Cannot encode local record");
                None
            }
        })
        .collect()
}

async fn upward_sync(
    remote: &dyn RemoteCollections,
    local: &AppState,
    collection: CollectionName,
) -> UpwardSync {
    let existing = match remote.list_all(collection).await {
        Ok(documents) => documents,
        Err(e) => {
            tracing::warn!(collection = %collection, error = %e, "Remote listing failed, skipping upward sync");
            return UpwardSync::ListFailed;
        }
    };
    if !existing.is_empty() {
        return UpwardSync::RemoteNotEmpty;
    }

    let mut documents = match collection {
        CollectionName::Products => local_documents::<Product>(local),
        CollectionName::Clients => local_documents::<Client>(local),
        CollectionName::Orders => local_documents::<Order>(local),
    };
    if collection == CollectionName::Orders {
        // Orders saved before audit stamps existed get one on first push.
        let pushed_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        for document in &mut documents {
            document
                .fields
                .entry("createdAt")
                .or_insert_with(|| pushed_at.clone().into());
        }
    }
    if documents.is_empty() {
        return UpwardSync::LocalEmpty;
    }

    let (mut added, mut failed) = (0, 0);
    for document in documents {
        // The remote assigns its own id.
        match remote.add(collection, document.fields).await {
            Ok(_) => added += 1,
            Err(e) => {
                failed += 1;
                log_push_failure(collection, &document.id, &e);
            }
        }
    }
    tracing::info!(collection = %collection, added, failed, "Upward sync pushed local records");
    UpwardSync::Pushed { added, failed }
}

fn log_push_failure(collection: CollectionName, id: &str, error: &RemoteError) {
    tracing::warn!(collection = %collection, id = %id, error = %error, "Upward sync add failed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::MemoryBackend;
    use crate::manager::{ClientDraft, ProductDraft};
    use crate::remote::{MemoryRemote, RemoteCall};
    use rust_decimal::Decimal;
    use serde_json::json;

    fn engine() -> Engine<MemoryBackend> {
        Engine::open(LocalStore::new(MemoryBackend::new()))
    }

    fn doc(id: &str, value: serde_json::Value) -> Document {
        match value {
            serde_json::Value::Object(fields) => Document::new(id, fields),
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn starts_local_only() {
        let engine = engine();
        assert_eq!(engine.mode(), SyncMode::LocalOnly);
        assert!(!engine.remote_failed());
        assert_eq!(engine.state().record_count(), 0);
    }

    #[test]
    fn local_writes_do_not_need_runtime() {
        let mut engine = engine();
        engine
            .products()
            .upsert(ProductDraft::new("Sod", Decimal::ONE))
            .unwrap();
        assert_eq!(engine.pending_writes(), 0);
    }

    #[test]
    fn remote_event_replaces_and_persists() {
        let mut engine = engine();
        engine
            .clients()
            .upsert(ClientDraft::new("Local", ""))
            .unwrap();

        let event = RemoteEvent::snapshot(
            CollectionName::Clients,
            vec![doc("c1", json!({"name": "Ana", "phone": "1"}))],
        );
        let changed = engine.apply_remote_event(event).unwrap();
        assert_eq!(changed, Some(CollectionName::Clients));
        assert_eq!(engine.state().clients.len(), 1);
        assert_eq!(engine.state().client("c1").unwrap().name, "Ana");
        assert_eq!(&engine.local().load_all(), engine.state());
    }

    #[test]
    fn remote_event_error_is_ignored() {
        let mut engine = engine();
        engine
            .clients()
            .upsert(ClientDraft::new("Local", ""))
            .unwrap();
        let event = RemoteEvent::failed(CollectionName::Clients, RemoteError::Closed);
        assert_eq!(engine.apply_remote_event(event).unwrap(), None);
        assert_eq!(engine.state().clients.len(), 1);
    }

    #[test]
    fn undecodable_documents_are_skipped() {
        let mut engine = engine();
        let event = RemoteEvent::snapshot(
            CollectionName::Orders,
            vec![
                doc("o1", json!({"date": "2024-01-01", "items": "nope"})),
                doc("o2", json!({"date": "2024-01-01", "items": []})),
            ],
        );
        engine.apply_remote_event(event).unwrap();
        assert_eq!(engine.state().orders.len(), 1);
        assert!(engine.state().order("o2").is_some());
    }

    #[test]
    fn reapplying_same_snapshot_is_noop() {
        let mut engine = engine();
        let event = RemoteEvent::snapshot(
            CollectionName::Products,
            vec![doc("p1", json!({"name": "Sod", "price": 2}))],
        );
        engine.apply_remote_event(event.clone()).unwrap();
        let before = engine.state().clone();
        engine.apply_remote_event(event).unwrap();
        assert_eq!(engine.state(), &before);
    }

    #[tokio::test]
    async fn failed_init_stays_local_only() {
        let mut engine = engine();
        let report = engine
            .connect(async { Err::<MemoryRemote, _>(RemoteError::Unavailable("down".into())) })
            .await;
        assert!(report.is_none());
        assert!(engine.remote_failed());
        assert_eq!(engine.mode(), SyncMode::LocalOnly);

        // No retry for the rest of the session.
        let remote = MemoryRemote::new();
        let handle = remote.clone();
        assert!(engine.connect(async move { Ok(remote) }).await.is_none());
        assert!(handle.calls().is_empty());
    }

    #[tokio::test]
    async fn attach_subscribes_every_collection() {
        let mut engine = engine();
        let remote = MemoryRemote::new();
        let report = engine.attach(Arc::new(remote.clone())).await;
        assert_eq!(report.subscribed, CollectionName::ALL.to_vec());
        assert_eq!(remote.subscriber_count(), 3);
        assert_eq!(engine.mode(), SyncMode::RemoteAttached);
    }

    #[tokio::test]
    async fn reattach_cancels_previous_subscriptions() {
        let mut engine = engine();
        let remote = MemoryRemote::new();
        engine.attach(Arc::new(remote.clone())).await;
        engine.attach(Arc::new(remote.clone())).await;
        assert_eq!(remote.subscriber_count(), 3);

        engine.detach();
        assert_eq!(remote.subscriber_count(), 0);
        assert_eq!(engine.mode(), SyncMode::LocalOnly);
    }

    #[tokio::test]
    async fn upsert_mirrors_with_same_id() {
        let mut engine = engine();
        let remote = MemoryRemote::new();
        engine.attach(Arc::new(remote.clone())).await;

        let client = engine
            .clients()
            .upsert(ClientDraft::new("Ana", "1"))
            .unwrap();
        engine.settle().await;

        assert!(remote
            .calls()
            .contains(&RemoteCall::Set(CollectionName::Clients, client.id.clone())));
        let docs = remote.documents(CollectionName::Clients);
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, client.id);

        // The echo is idempotent.
        engine.pump().unwrap();
        assert_eq!(engine.state().clients.len(), 1);
        assert_eq!(engine.state().client(&client.id).unwrap().name, "Ana");
    }

    #[tokio::test]
    async fn remote_write_failure_keeps_local_state() {
        let mut engine = engine();
        let remote = MemoryRemote::new();
        engine.attach(Arc::new(remote.clone())).await;
        engine.pump().unwrap();
        remote.fail_writes(true);

        engine
            .products()
            .upsert(ProductDraft::new("Sod", Decimal::ONE))
            .unwrap();
        engine.settle().await;

        assert_eq!(engine.state().products.len(), 1);
        assert_eq!(engine.local().load_all().products.len(), 1);
        assert!(remote.documents(CollectionName::Products).is_empty());
    }

    #[tokio::test]
    async fn writes_reach_remote_in_mutation_order() {
        let mut engine = engine();
        let remote = MemoryRemote::new();
        engine.attach(Arc::new(remote.clone())).await;

        let product = engine
            .products()
            .upsert(ProductDraft::new("Sod", Decimal::ONE).with_id("prod_1"))
            .unwrap();
        engine.products().delete(&product.id).unwrap();
        engine
            .products()
            .upsert(ProductDraft::new("Sod", Decimal::TWO).with_id("prod_1"))
            .unwrap();
        engine.settle().await;
        assert_eq!(engine.pending_writes(), 0);

        let writes: Vec<RemoteCall> = remote
            .calls()
            .into_iter()
            .filter(|call| !matches!(call, RemoteCall::Subscribe(_) | RemoteCall::ListAll(_)))
            .collect();
        assert_eq!(
            writes,
            vec![
                RemoteCall::Set(CollectionName::Products, "prod_1".into()),
                RemoteCall::Delete(CollectionName::Products, "prod_1".into()),
                RemoteCall::Set(CollectionName::Products, "prod_1".into()),
            ]
        );
        let stored = &remote.documents(CollectionName::Products)[0];
        assert_eq!(stored.fields["price"].as_f64(), Some(2.0));
    }

    #[tokio::test]
    async fn detach_still_delivers_queued_writes() {
        let mut engine = engine();
        let remote = MemoryRemote::new();
        engine.attach(Arc::new(remote.clone())).await;

        engine
            .clients()
            .upsert(ClientDraft::new("Ana", "1"))
            .unwrap();
        engine.detach();
        engine.settle().await;

        assert_eq!(remote.documents(CollectionName::Clients).len(), 1);
        assert_eq!(engine.pending_writes(), 0);
    }

    #[tokio::test]
    async fn upward_sync_stamps_unstamped_orders() {
        let mut engine = engine();
        let event = RemoteEvent::snapshot(
            CollectionName::Orders,
            vec![doc(
                "order_old",
                json!({"date": "2024-01-01", "items": [{"name": "Sod", "price": 1, "qty": 1}]}),
            )],
        );
        engine.apply_remote_event(event).unwrap();
        assert_eq!(engine.state().order("order_old").unwrap().created_at, None);

        let remote = MemoryRemote::new();
        engine.attach(Arc::new(remote.clone())).await;

        let pushed = &remote.documents(CollectionName::Orders)[0];
        let stamp = pushed.fields["createdAt"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(stamp).is_ok());
    }

    #[tokio::test]
    async fn delete_mirrors_to_remote() {
        let mut engine = engine();
        let remote = MemoryRemote::new();
        engine.attach(Arc::new(remote.clone())).await;

        let product = engine
            .products()
            .upsert(ProductDraft::new("Sod", Decimal::ONE))
            .unwrap();
        engine.settle().await;
        engine.products().delete(&product.id).unwrap();
        engine.settle().await;

        assert!(remote.documents(CollectionName::Products).is_empty());
        engine.pump().unwrap();
        assert!(engine.state().products.is_empty());
    }
}
