//! Remote documents and their conversion to typed records.
//!
//! The remote service stores flat field maps. Writing a record strips the
//! id (it travels separately, in the path or as the server-assigned key);
//! reading is lenient the way a hand-edited document store demands: absent
//! numbers are zero, absent strings are empty, numeric strings are accepted.
//! Only structurally wrong documents are rejected.

use crate::{
    error::Result, ids, record::hhmm, state::Keyed, Client, Error, Order, OrderItem,
    PaymentMethod, Product, RecordId,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;

/// Bounds applied to every item quantity.
pub const MIN_QTY: u32 = 1;
pub const MAX_QTY: u32 = 9999;

/// Field map of a document, without its id.
pub type Fields = Map<String, Value>;

/// A document as listed or pushed by the remote service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: RecordId,
    #[serde(flatten)]
    pub fields: Fields,
}

impl Document {
    pub fn new(id: impl Into<RecordId>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Build a document from any record that serializes to a JSON object.
    pub fn from_record<T: Serialize + Keyed>(record: &T) -> Result<Self> {
        let id = record.key().to_string();
        match serde_json::to_value(record) {
            Ok(Value::Object(mut fields)) => {
                fields.remove("id");
                Ok(Self { id, fields })
            }
            Ok(_) => Err(Error::InvalidDocument {
                id,
                reason: "record did not serialize to an object".into(),
            }),
            Err(e) => Err(Error::InvalidDocument {
                id,
                reason: e.to_string(),
            }),
        }
    }

    fn str_field(&self, name: &str) -> String {
        match self.fields.get(name) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        }
    }

    fn decimal_field(&self, name: &str) -> Decimal {
        self.fields.get(name).map(decimal_of).unwrap_or_default()
    }

    /// An RFC 3339 timestamp; anything else reads as absent.
    fn timestamp_field(&self, name: &str) -> Option<DateTime<Utc>> {
        match self.fields.get(name) {
            Some(Value::String(s)) => DateTime::parse_from_rfc3339(s.trim())
                .ok()
                .map(|t| t.with_timezone(&Utc)),
            _ => None,
        }
    }

    fn reject(&self, reason: impl Into<String>) -> Error {
        Error::InvalidDocument {
            id: self.id.clone(),
            reason: reason.into(),
        }
    }
}

/// Clamp a raw quantity into `[MIN_QTY, MAX_QTY]`.
pub fn clamp_qty(raw: i64) -> u32 {
    raw.clamp(MIN_QTY as i64, MAX_QTY as i64) as u32
}

fn decimal_of(value: &Value) -> Decimal {
    match value {
        Value::Number(n) => {
            let text = n.to_string();
            Decimal::from_str(&text)
                .or_else(|_| Decimal::from_scientific(&text))
                .ok()
                .or_else(|| n.as_f64().and_then(Decimal::from_f64))
                .unwrap_or_default()
        }
        Value::String(s) => Decimal::from_str(s.trim()).unwrap_or_default(),
        _ => Decimal::ZERO,
    }
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

fn qty_of(value: Option<&Value>) -> u32 {
    let raw = match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse::<i64>().unwrap_or(0),
        _ => 0,
    };
    clamp_qty(raw)
}

impl Product {
    pub fn to_document(&self) -> Result<Document> {
        Document::from_record(self)
    }

    pub fn from_document(doc: &Document) -> Result<Self> {
        Ok(Product {
            id: doc.id.clone(),
            name: doc.str_field("name"),
            price: doc.decimal_field("price"),
        })
    }
}

impl Client {
    pub fn to_document(&self) -> Result<Document> {
        Document::from_record(self)
    }

    pub fn from_document(doc: &Document) -> Result<Self> {
        Ok(Client {
            id: doc.id.clone(),
            name: doc.str_field("name"),
            phone: doc.str_field("phone"),
        })
    }
}

impl Order {
    pub fn to_document(&self) -> Result<Document> {
        Document::from_record(self)
    }

    pub fn from_document(doc: &Document) -> Result<Self> {
        let items = match doc.fields.get("items") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(raw)) => raw
                .iter()
                .map(|item| decode_item(doc, item))
                .collect::<Result<Vec<_>>>()?,
            Some(_) => return Err(doc.reject("items is not an array")),
        };

        let date = NaiveDate::parse_from_str(doc.str_field("date").trim(), "%Y-%m-%d")
            .unwrap_or_else(|_| ids::today());
        let time = hhmm::parse(&doc.str_field("time")).unwrap_or(None);
        let payment_method = doc
            .fields
            .get("paymentMethod")
            .cloned()
            .and_then(|v| serde_json::from_value::<PaymentMethod>(v).ok())
            .unwrap_or_default();

        Ok(Order {
            id: doc.id.clone(),
            date,
            time,
            client_id: doc.str_field("clientId"),
            client_name: doc.str_field("clientName"),
            client_phone: doc.str_field("clientPhone"),
            items,
            payment_method,
            paid: truthy(doc.fields.get("paid")),
            total: doc.decimal_field("total"),
            created_at: doc.timestamp_field("createdAt"),
            updated_at: doc.timestamp_field("updatedAt"),
        })
    }
}

fn decode_item(doc: &Document, value: &Value) -> Result<OrderItem> {
    let Value::Object(fields) = value else {
        return Err(doc.reject("order item is not an object"));
    };
    let id = match fields.get("id") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        _ => ids::generate("item_"),
    };
    let name = match fields.get("name") {
        Some(Value::String(s)) => s.clone(),
        _ => String::new(),
    };
    Ok(OrderItem {
        id,
        name,
        price: fields.get("price").map(decimal_of).unwrap_or_default(),
        qty: qty_of(fields.get("qty")),
    })
}
