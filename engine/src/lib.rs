//! # Tally Engine
//!
//! The reconciliation core of a small order-management tool: a product
//! catalog, clients, and per-day orders made of line items.
//!
//! The in-memory [`AppState`] is the single source of truth during a session.
//! Two mirrors follow it:
//! - the **Local Store** ([`LocalStore`]), written synchronously after every
//!   mutation
//! - the **Remote Collection Service** ([`RemoteCollections`]), written in
//!   the background and listened to for live updates once attached
//!
//! ## Core Concepts
//!
//! ### Records
//!
//! [`Product`], [`Client`] and [`Order`] (with its [`OrderItem`]s) are plain
//! typed records. Orders carry denormalized copies of their client and
//! products, so deleting either never touches existing orders.
//!
//! ### Entity Managers
//!
//! All writes go through a [`Manager`] obtained from the [`Engine`]
//! (`engine.orders()`, ...). Input arrives as drafts ([`OrderDraft`], ...),
//! which are validated before anything is mutated.
//!
//! ### Reconciliation
//!
//! The [`Engine`] starts local-only. Once a remote is attached it subscribes
//! to all collections and pushes local data upward if, and only if, the
//! remote collection is empty. Live updates fully replace a collection.
//!
//! ## Quick Start
//!
//! ```rust
//! use tally_engine::{
//!     Engine, LocalStore, MemoryBackend, OrderDraft, ItemDraft, OrderQuery,
//!     ProductDraft,
//! };
//! use chrono::NaiveDate;
//! use rust_decimal::Decimal;
//!
//! let mut engine = Engine::open(LocalStore::new(MemoryBackend::new()));
//!
//! let soda = engine
//!     .products()
//!     .upsert(ProductDraft::new("Soda", Decimal::new(450, 2)))
//!     .unwrap();
//!
//! let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! let order = engine
//!     .orders()
//!     .upsert(OrderDraft::new(day).item(ItemDraft::from_product(&soda, 2)))
//!     .unwrap();
//! assert_eq!(order.total, Decimal::new(900, 2));
//!
//! let visible = engine.visible_orders(&OrderQuery::for_date(day));
//! assert_eq!(visible.len(), 1);
//! ```

pub mod config;
pub mod document;
pub mod edit;
pub mod error;
pub mod gate;
pub mod ids;
pub mod local;
pub mod manager;
pub mod reconcile;
pub mod record;
pub mod remote;
pub mod session;
pub mod state;
pub mod view;

pub use config::{Config, ConfigError};
pub use document::{Document, Fields};
pub use edit::{CloseOutcome, EditBuffer};
pub use error::{Error, Result};
pub use gate::{Passcode, PasscodeGate};
pub use ids::{shift_day, today};
pub use local::{FileBackend, LocalStore, MemoryBackend, StorageBackend};
pub use manager::{
    ClientDraft, Draft, Entity, ItemDraft, Manager, OrderDraft, ProductDraft,
};
pub use reconcile::{Engine, SyncMode, SyncReport, UpwardSync};
pub use record::{Client, CollectionName, Order, OrderItem, PaymentMethod, Product};
pub use remote::{
    HttpRemote, MemoryRemote, RemoteCollections, RemoteError, RemoteEvent, Subscription,
};
pub use session::{ConfiguredSession, Session, Unlock};
pub use state::{AppState, Collection};
pub use view::{visible_orders, OrderQuery, SortDirection};

/// Unique identifier for a record within its collection.
pub type RecordId = String;
