//! In-process implementation of the remote service.

use super::{EventSender, RemoteCollections, RemoteError, RemoteEvent, RemoteResult, Subscription};
use crate::document::{Document, Fields};
use crate::{CollectionName, RecordId};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

/// A call received by [`MemoryRemote`], recorded in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteCall {
    Subscribe(CollectionName),
    Add(CollectionName),
    Set(CollectionName, RecordId),
    Update(CollectionName, RecordId),
    Delete(CollectionName, RecordId),
    ListAll(CollectionName),
}

#[derive(Default)]
struct Inner {
    documents: HashMap<CollectionName, BTreeMap<RecordId, Fields>>,
    subscribers: HashMap<u64, (CollectionName, EventSender)>,
    next_subscriber: u64,
    next_doc: u64,
    calls: Vec<RemoteCall>,
    fail_writes: bool,
    fail_listing: bool,
    fail_subscribe: bool,
}

impl Inner {
    fn snapshot(&self, collection: CollectionName) -> Vec<Document> {
        self.documents
            .get(&collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, fields)| Document::new(id.clone(), fields.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn notify(&mut self, collection: CollectionName) {
        let documents = self.snapshot(collection);
        // Closed receivers are pruned as they are discovered.
        self.subscribers.retain(|_, (name, sender)| {
            *name != collection
                || sender
                    .send(RemoteEvent::snapshot(collection, documents.clone()))
                    .is_ok()
        });
    }

    fn check_writes(&self) -> RemoteResult<()> {
        if self.fail_writes {
            Err(RemoteError::Unavailable("writes disabled".into()))
        } else {
            Ok(())
        }
    }
}

/// Remote service kept entirely in memory.
///
/// Cloning yields another handle to the same store. Every change is pushed
/// synchronously to the collection's subscribers, and subscribing delivers
/// the current contents immediately.
#[derive(Clone, Default)]
pub struct MemoryRemote {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Seed a document without recording a call or notifying anyone.
    pub fn seed(&self, collection: CollectionName, document: Document) {
        self.lock()
            .documents
            .entry(collection)
            .or_default()
            .insert(document.id, document.fields);
    }

    /// Current contents of a collection.
    pub fn documents(&self, collection: CollectionName) -> Vec<Document> {
        self.lock().snapshot(collection)
    }

    /// All calls received so far.
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.lock().calls.clone()
    }

    /// Number of `add` calls received for a collection.
    pub fn add_count(&self, collection: CollectionName) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| **c == RemoteCall::Add(collection))
            .count()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    /// Make add/set/update/delete fail.
    pub fn fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    /// Make `list_all` fail.
    pub fn fail_listing(&self, fail: bool) {
        self.lock().fail_listing = fail;
    }

    /// Make `subscribe` fail.
    pub fn fail_subscribe(&self, fail: bool) {
        self.lock().fail_subscribe = fail;
    }
}

#[async_trait]
impl RemoteCollections for MemoryRemote {
    async fn subscribe(
        &self,
        collection: CollectionName,
        events: EventSender,
    ) -> RemoteResult<Subscription> {
        let subscriber_id = {
            let mut inner = self.lock();
            inner.calls.push(RemoteCall::Subscribe(collection));
            if inner.fail_subscribe {
                return Err(RemoteError::Unavailable("subscriptions disabled".into()));
            }
            let id = inner.next_subscriber;
            inner.next_subscriber += 1;
            let _ = events.send(RemoteEvent::snapshot(collection, inner.snapshot(collection)));
            inner.subscribers.insert(id, (collection, events));
            id
        };

        let inner = Arc::downgrade(&self.inner);
        Ok(Subscription::new(collection, move || {
            if let Some(inner) = inner.upgrade() {
                let mut inner = inner.lock().unwrap_or_else(|e| e.into_inner());
                inner.subscribers.remove(&subscriber_id);
            }
        }))
    }

    async fn add(&self, collection: CollectionName, fields: Fields) -> RemoteResult<RecordId> {
        let mut inner = self.lock();
        inner.calls.push(RemoteCall::Add(collection));
        inner.check_writes()?;
        inner.next_doc += 1;
        let id = format!("remote-{}", inner.next_doc);
        inner
            .documents
            .entry(collection)
            .or_default()
            .insert(id.clone(), fields);
        inner.notify(collection);
        Ok(id)
    }

    async fn set(&self, collection: CollectionName, id: &str, fields: Fields) -> RemoteResult<()> {
        let mut inner = self.lock();
        inner.calls.push(RemoteCall::Set(collection, id.to_string()));
        inner.check_writes()?;
        inner
            .documents
            .entry(collection)
            .or_default()
            .insert(id.to_string(), fields);
        inner.notify(collection);
        Ok(())
    }

    async fn update(
        &self,
        collection: CollectionName,
        id: &str,
        fields: Fields,
    ) -> RemoteResult<()> {
        let mut inner = self.lock();
        inner
            .calls
            .push(RemoteCall::Update(collection, id.to_string()));
        inner.check_writes()?;
        let existing = inner
            .documents
            .get_mut(&collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| RemoteError::NotFound {
                collection,
                id: id.to_string(),
            })?;
        existing.extend(fields);
        inner.notify(collection);
        Ok(())
    }

    async fn delete(&self, collection: CollectionName, id: &str) -> RemoteResult<()> {
        let mut inner = self.lock();
        inner
            .calls
            .push(RemoteCall::Delete(collection, id.to_string()));
        inner.check_writes()?;
        if let Some(docs) = inner.documents.get_mut(&collection) {
            docs.remove(id);
        }
        inner.notify(collection);
        Ok(())
    }

    async fn list_all(&self, collection: CollectionName) -> RemoteResult<Vec<Document>> {
        let mut inner = self.lock();
        inner.calls.push(RemoteCall::ListAll(collection));
        if inner.fail_listing {
            return Err(RemoteError::Unavailable("listing disabled".into()));
        }
        Ok(inner.snapshot(collection))
    }
}
