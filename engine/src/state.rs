//! In-memory application state.
//!
//! [`AppState`] is the single source of truth during a session. Local Store
//! and the remote service are downstream mirrors of it.

use crate::{Client, Order, Product, RecordId};
use serde::{Deserialize, Serialize};

/// Anything stored in a [`Collection`].
pub trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for Product {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for Client {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for Order {
    fn key(&self) -> &str {
        &self.id
    }
}

/// An ordered collection of records with unique ids.
///
/// Insertion order is preserved so the persisted array keeps the order in
/// which records were created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Collection<T> {
    records: Vec<T>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
        }
    }
}

impl<T: Keyed> Collection<T> {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a collection from records, keeping the last record for any
    /// repeated id.
    pub fn from_records(records: impl IntoIterator<Item = T>) -> Self {
        let mut collection = Self::new();
        for record in records {
            collection.upsert(record);
        }
        collection
    }

    /// Get a record by ID.
    pub fn get(&self, id: &str) -> Option<&T> {
        self.records.iter().find(|r| r.key() == id)
    }

    /// Check if a record exists.
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Insert a record, or overwrite the one with the same id in place.
    ///
    /// Returns the record that was replaced, if any.
    pub fn upsert(&mut self, record: T) -> Option<T> {
        match self.records.iter().position(|r| r.key() == record.key()) {
            Some(index) => Some(std::mem::replace(&mut self.records[index], record)),
            None => {
                self.records.push(record);
                None
            }
        }
    }

    /// Remove a record by ID.
    pub fn remove(&mut self, id: &str) -> Option<T> {
        let index = self.records.iter().position(|r| r.key() == id)?;
        Some(self.records.remove(index))
    }

    /// Replace the whole collection.
    pub fn replace(&mut self, records: Vec<T>) {
        *self = Self::from_records(records);
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.records.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.records
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(Keyed::key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<T: Keyed> FromIterator<T> for Collection<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_records(iter)
    }
}

/// The three in-memory collections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    pub products: Collection<Product>,
    pub clients: Collection<Client>,
    pub orders: Collection<Order>,
}

impl AppState {
    /// Create an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn product(&self, id: &str) -> Option<&Product> {
        self.products.get(id)
    }

    pub fn client(&self, id: &str) -> Option<&Client> {
        self.clients.get(id)
    }

    pub fn order(&self, id: &str) -> Option<&Order> {
        self.orders.get(id)
    }

    /// Orders referencing the given client id.
    pub fn orders_for_client<'a>(&'a self, client_id: &'a RecordId) -> impl Iterator<Item = &'a Order> {
        self.orders.iter().filter(move |o| &o.client_id == client_id)
    }

    /// Total number of records across all collections.
    pub fn record_count(&self) -> usize {
        self.products.len() + self.clients.len() + self.orders.len()
    }
}
