//! Record types for the three collections.

use crate::RecordId;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The three logical collections mirrored locally and remotely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionName {
    Products,
    Clients,
    Orders,
}

impl CollectionName {
    /// All collections, in the order they are loaded and synced.
    pub const ALL: [CollectionName; 3] = [
        CollectionName::Products,
        CollectionName::Clients,
        CollectionName::Orders,
    ];

    /// Wire name of the collection.
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionName::Products => "products",
            CollectionName::Clients => "clients",
            CollectionName::Orders => "orders",
        }
    }
}

impl fmt::Display for CollectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CollectionName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "products" => Ok(CollectionName::Products),
            "clients" => Ok(CollectionName::Clients),
            "orders" => Ok(CollectionName::Orders),
            other => Err(format!("unknown collection: {other}")),
        }
    }
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: RecordId,
    pub name: String,
    pub price: Decimal,
}

/// A customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: RecordId,
    pub name: String,
    #[serde(default)]
    pub phone: String,
}

/// A line of an order, owned by that order.
///
/// For catalog lines the id is the product id at the time the line was
/// added; name and price are copies, not references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: RecordId,
    pub name: String,
    pub price: Decimal,
    pub qty: u32,
}

impl OrderItem {
    /// `price × qty` for this line.
    pub fn subtotal(&self) -> Decimal {
        self.price * Decimal::from(self.qty)
    }
}

/// How an order was (or will be) paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    #[serde(alias = "dinheiro")]
    Cash,
    #[serde(alias = "cartao")]
    Card,
    Pix,
    #[serde(alias = "transferencia")]
    Transfer,
    #[serde(other)]
    Other,
}

/// A customer order for a single day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: RecordId,
    pub date: NaiveDate,
    #[serde(with = "hhmm", default)]
    pub time: Option<NaiveTime>,
    /// Referenced client, or empty for walk-in orders.
    #[serde(default)]
    pub client_id: RecordId,
    /// Client name as it was when the order was saved.
    #[serde(default)]
    pub client_name: String,
    /// Client phone as it was when the order was saved.
    #[serde(default)]
    pub client_phone: String,
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub paid: bool,
    pub total: Decimal,
    /// First save of this order. Absent on orders that predate it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Last save of this order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Sum of `price × qty` over the items.
    pub fn computed_total(&self) -> Decimal {
        total_of(&self.items)
    }
}

/// Sum of `price × qty` over a slice of items.
pub fn total_of(items: &[OrderItem]) -> Decimal {
    items.iter().map(OrderItem::subtotal).sum()
}

/// Serde adapter for `"HH:MM"` times where the empty string means "no time".
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(time: &Option<NaiveTime>, s: S) -> Result<S::Ok, S::Error> {
        match time {
            Some(t) => s.serialize_str(&t.format(FORMAT).to_string()),
            None => s.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveTime>, D::Error> {
        let raw = Option::<String>::deserialize(d)?.unwrap_or_default();
        parse(&raw).map_err(serde::de::Error::custom)
    }

    /// Parse `"HH:MM"` (or `"HH:MM:SS"`); blank input is `None`.
    pub fn parse(raw: &str) -> Result<Option<NaiveTime>, String> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        NaiveTime::parse_from_str(raw, FORMAT)
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
            .map(Some)
            .map_err(|e| format!("invalid time '{raw}': {e}"))
    }
}
