//! Wire format shared by `tally-server` and [`super::HttpRemote`].
//!
//! Subscription frames are JSON text messages tagged by `type`, snake_case.

use crate::document::Document;
use crate::{CollectionName, RecordId};
use serde::{Deserialize, Serialize};

/// Messages pushed by the server on a collection subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    /// Full current contents of a collection.
    Snapshot {
        collection: CollectionName,
        documents: Vec<Document>,
    },

    /// Response to a client ping.
    Pong,

    /// The feed hit an error.
    Error { message: String },
}

impl Frame {
    pub fn error(message: impl Into<String>) -> Self {
        Frame::Error {
            message: message.into(),
        }
    }
}

/// Messages a subscriber may send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    Ping,
}

/// Response body of `POST /collections/{name}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddResponse {
    pub id: RecordId,
}

/// Error body returned by the server on non-2xx responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}
