//! Entity Managers - validated CRUD over the in-memory collections.
//!
//! Every write follows the same path:
//! 1. validate the draft (nothing is touched on failure)
//! 2. mutate the in-memory collection
//! 3. persist all collections to the Local Store
//! 4. mirror to the remote service in the background, if attached
//!
//! Drafts are the form-level input. A draft without an id inserts a new
//! record; a draft with an id overwrites the record with that id.

use crate::document::{clamp_qty, Document};
use crate::local::StorageBackend;
use crate::record::total_of;
use crate::state::{Collection, Keyed};
use crate::{
    error::Result, ids, AppState, Client, CollectionName, Engine, Error, Order, OrderItem,
    PaymentMethod, Product, RecordId,
};
use chrono::{NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::marker::PhantomData;

/// A record type managed by the engine.
pub trait Entity: Keyed + Clone + Serialize + Sized + Send + 'static {
    /// Remote/local collection holding this type.
    const COLLECTION: CollectionName;
    /// Prefix of locally generated ids.
    const ID_PREFIX: &'static str;

    fn collection(state: &AppState) -> &Collection<Self>;
    fn collection_mut(state: &mut AppState) -> &mut Collection<Self>;
    fn to_document(&self) -> Result<Document>;
    fn from_document(doc: &Document) -> Result<Self>;
}

impl Entity for Product {
    const COLLECTION: CollectionName = CollectionName::Products;
    const ID_PREFIX: &'static str = "prod_";

    fn collection(state: &AppState) -> &Collection<Self> {
        &state.products
    }
    fn collection_mut(state: &mut AppState) -> &mut Collection<Self> {
        &mut state.products
    }
    fn to_document(&self) -> Result<Document> {
        Product::to_document(self)
    }
    fn from_document(doc: &Document) -> Result<Self> {
        Product::from_document(doc)
    }
}

impl Entity for Client {
    const COLLECTION: CollectionName = CollectionName::Clients;
    const ID_PREFIX: &'static str = "cli_";

    fn collection(state: &AppState) -> &Collection<Self> {
        &state.clients
    }
    fn collection_mut(state: &mut AppState) -> &mut Collection<Self> {
        &mut state.clients
    }
    fn to_document(&self) -> Result<Document> {
        Client::to_document(self)
    }
    fn from_document(doc: &Document) -> Result<Self> {
        Client::from_document(doc)
    }
}

impl Entity for Order {
    const COLLECTION: CollectionName = CollectionName::Orders;
    const ID_PREFIX: &'static str = "order_";

    fn collection(state: &AppState) -> &Collection<Self> {
        &state.orders
    }
    fn collection_mut(state: &mut AppState) -> &mut Collection<Self> {
        &mut state.orders
    }
    fn to_document(&self) -> Result<Document> {
        Order::to_document(self)
    }
    fn from_document(doc: &Document) -> Result<Self> {
        Order::from_document(doc)
    }
}

/// Form-level input that becomes a record of type `Self::Record`.
pub trait Draft {
    type Record: Entity;

    /// Id of the record being edited, `None` for a new record.
    fn id(&self) -> Option<&str>;

    /// Validate and build the record under `id`.
    ///
    /// Must not have side effects: a failure here means nothing changed.
    fn build(self, id: RecordId, state: &AppState) -> Result<Self::Record>;
}

fn required_text(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::MissingRequiredField(field.to_string()));
    }
    Ok(trimmed.to_string())
}

fn non_negative(field: &str, value: Decimal) -> Result<Decimal> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(Error::invalid(field, "must not be negative"));
    }
    Ok(value)
}

/// Product form.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProductDraft {
    pub id: Option<RecordId>,
    pub name: String,
    pub price: Decimal,
}

impl ProductDraft {
    pub fn new(name: impl Into<String>, price: Decimal) -> Self {
        Self {
            id: None,
            name: name.into(),
            price,
        }
    }

    pub fn with_id(mut self, id: impl Into<RecordId>) -> Self {
        self.id = Some(id.into());
        self
    }
}

impl From<&Product> for ProductDraft {
    fn from(product: &Product) -> Self {
        Self {
            id: Some(product.id.clone()),
            name: product.name.clone(),
            price: product.price,
        }
    }
}

impl Draft for ProductDraft {
    type Record = Product;

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn build(self, id: RecordId, _state: &AppState) -> Result<Product> {
        Ok(Product {
            id,
            name: required_text("name", &self.name)?,
            price: non_negative("price", self.price)?,
        })
    }
}

/// Client form.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClientDraft {
    pub id: Option<RecordId>,
    pub name: String,
    pub phone: String,
}

impl ClientDraft {
    pub fn new(name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            phone: phone.into(),
        }
    }

    pub fn with_id(mut self, id: impl Into<RecordId>) -> Self {
        self.id = Some(id.into());
        self
    }
}

impl From<&Client> for ClientDraft {
    fn from(client: &Client) -> Self {
        Self {
            id: Some(client.id.clone()),
            name: client.name.clone(),
            phone: client.phone.clone(),
        }
    }
}

impl Draft for ClientDraft {
    type Record = Client;

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn build(self, id: RecordId, _state: &AppState) -> Result<Client> {
        Ok(Client {
            id,
            name: required_text("name", &self.name)?,
            phone: self.phone.trim().to_string(),
        })
    }
}

/// One line of an order form. `qty` is raw user input and gets clamped.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemDraft {
    pub id: Option<RecordId>,
    pub name: String,
    pub price: Decimal,
    pub qty: i64,
}

impl ItemDraft {
    /// A catalog line: copies the product's id, name and price by value.
    pub fn from_product(product: &Product, qty: i64) -> Self {
        Self {
            id: Some(product.id.clone()),
            name: product.name.clone(),
            price: product.price,
            qty,
        }
    }

    /// A free-form line entered at order time.
    pub fn custom(name: impl Into<String>, price: Decimal, qty: i64) -> Self {
        Self {
            id: None,
            name: name.into(),
            price,
            qty,
        }
    }

    fn build(self) -> Result<OrderItem> {
        Ok(OrderItem {
            id: self
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| ids::generate("item_")),
            name: self.name.trim().to_string(),
            price: non_negative("price", self.price)?,
            qty: clamp_qty(self.qty),
        })
    }
}

impl From<&OrderItem> for ItemDraft {
    fn from(item: &OrderItem) -> Self {
        Self {
            id: Some(item.id.clone()),
            name: item.name.clone(),
            price: item.price,
            qty: i64::from(item.qty),
        }
    }
}

/// Order form.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OrderDraft {
    pub id: Option<RecordId>,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    /// Selected client; empty or `None` for a walk-in order.
    pub client_id: Option<RecordId>,
    /// Snapshot kept when the client is not (or no longer) in the catalog.
    pub client_name: String,
    pub client_phone: String,
    pub items: Vec<ItemDraft>,
    pub payment_method: PaymentMethod,
    pub paid: bool,
    /// Whatever total the form displayed. Ignored: the saved total is
    /// always recomputed from the items.
    pub total: Option<Decimal>,
}

impl OrderDraft {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date: Some(date),
            ..Self::default()
        }
    }

    pub fn at(mut self, time: NaiveTime) -> Self {
        self.time = Some(time);
        self
    }

    pub fn for_client(mut self, client_id: impl Into<RecordId>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn item(mut self, item: ItemDraft) -> Self {
        self.items.push(item);
        self
    }

    pub fn with_id(mut self, id: impl Into<RecordId>) -> Self {
        self.id = Some(id.into());
        self
    }
}

impl From<&Order> for OrderDraft {
    fn from(order: &Order) -> Self {
        Self {
            id: Some(order.id.clone()),
            date: Some(order.date),
            time: order.time,
            client_id: Some(order.client_id.clone()).filter(|id| !id.is_empty()),
            client_name: order.client_name.clone(),
            client_phone: order.client_phone.clone(),
            items: order.items.iter().map(ItemDraft::from).collect(),
            payment_method: order.payment_method,
            paid: order.paid,
            total: Some(order.total),
        }
    }
}

impl Draft for OrderDraft {
    type Record = Order;

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn build(self, id: RecordId, state: &AppState) -> Result<Order> {
        let date = self
            .date
            .ok_or_else(|| Error::MissingRequiredField("date".into()))?;
        if self.items.is_empty() {
            return Err(Error::EmptyOrder);
        }
        let items = self
            .items
            .into_iter()
            .map(ItemDraft::build)
            .collect::<Result<Vec<_>>>()?;

        let client_id = self.client_id.unwrap_or_default();
        let (client_name, client_phone) = match state.client(&client_id) {
            Some(client) => (client.name.clone(), client.phone.clone()),
            None => (self.client_name, self.client_phone),
        };

        let saved_at = Utc::now();
        let created_at = state
            .order(&id)
            .and_then(|existing| existing.created_at)
            .or(Some(saved_at));
        let total = total_of(&items);
        if let Some(supplied) = self.total.filter(|t| *t != total) {
            tracing::debug!(order = %id, %supplied, %total, "Replacing stale order total");
        }

        Ok(Order {
            id,
            date,
            time: self.time,
            client_id,
            client_name,
            client_phone,
            items,
            payment_method: self.payment_method,
            paid: self.paid,
            total,
            created_at,
            updated_at: Some(saved_at),
        })
    }
}

/// CRUD handle for one collection, borrowed from an [`Engine`].
pub struct Manager<'e, E, B> {
    engine: &'e mut Engine<B>,
    _entity: PhantomData<E>,
}

impl<'e, E: Entity, B: StorageBackend> Manager<'e, E, B> {
    pub(crate) fn new(engine: &'e mut Engine<B>) -> Self {
        Self {
            engine,
            _entity: PhantomData,
        }
    }

    /// All records of this collection.
    pub fn list(&self) -> &[E] {
        E::collection(self.engine.state()).as_slice()
    }

    pub fn get(&self, id: &str) -> Option<&E> {
        E::collection(self.engine.state()).get(id)
    }

    /// Insert or overwrite a record from a draft.
    ///
    /// Validation failures return before anything is mutated. The returned
    /// record is what was stored (with its id and any normalization).
    pub fn upsert<D: Draft<Record = E>>(&mut self, draft: D) -> Result<E> {
        let id = draft
            .id()
            .filter(|id| !id.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| ids::generate(E::ID_PREFIX));
        let record = draft.build(id, self.engine.state())?;
        let document = record.to_document()?;

        let replaced = E::collection_mut(self.engine.state_mut()).upsert(record.clone());
        self.engine.persist()?;
        tracing::debug!(
            collection = %E::COLLECTION,
            id = %record.key(),
            inserted = replaced.is_none(),
            "Saved record"
        );

        self.engine.mirror_set(E::COLLECTION, document);
        Ok(record)
    }

    /// Remove a record by id.
    ///
    /// Returns the removed record, or `None` if no record had that id (in
    /// which case nothing is persisted or mirrored).
    pub fn delete(&mut self, id: &str) -> Result<Option<E>> {
        let Some(removed) = E::collection_mut(self.engine.state_mut()).remove(id) else {
            return Ok(None);
        };
        self.engine.persist()?;
        tracing::debug!(collection = %E::COLLECTION, id = %id, "Deleted record");

        self.engine.mirror_delete(E::COLLECTION, id.to_string());
        Ok(Some(removed))
    }
}
