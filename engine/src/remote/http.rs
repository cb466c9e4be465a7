//! HTTP/WebSocket client for `tally-server`.

use super::wire::{AddResponse, ErrorBody, Frame};
use super::{EventSender, RemoteCollections, RemoteError, RemoteEvent, RemoteResult, Subscription};
use crate::document::{Document, Fields};
use crate::{CollectionName, RecordId};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::StatusCode;
use tokio_tungstenite::tungstenite::Message;

/// Remote service reached over HTTP, with WebSocket subscriptions.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRemote {
    /// Create a client without contacting the server.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    /// Create a client and verify the server answers its health check.
    ///
    /// This is the "remote initialized" step: an error here keeps the
    /// session local-only.
    pub async fn connect(base_url: impl Into<String>) -> RemoteResult<Self> {
        let remote = Self::new(base_url);
        let response = remote
            .client
            .get(format!("{}/health", remote.base_url))
            .send()
            .await
            .map_err(unavailable)?;
        check(response).await?;
        tracing::info!(url = %remote.base_url, "Connected to remote collection service");
        Ok(remote)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn collection_url(&self, collection: CollectionName) -> String {
        format!("{}/collections/{}", self.base_url, collection)
    }

    /// The id is pushed as one percent-encoded path segment.
    fn document_url(&self, collection: CollectionName, id: &str) -> RemoteResult<reqwest::Url> {
        let invalid = || RemoteError::Unavailable(format!("invalid base url: {}", self.base_url));
        let mut url = reqwest::Url::parse(&self.collection_url(collection)).map_err(|_| invalid())?;
        url.path_segments_mut().map_err(|()| invalid())?.push(id);
        Ok(url)
    }

    /// WebSocket URL of a collection feed.
    pub fn subscribe_url(&self, collection: CollectionName) -> RemoteResult<String> {
        let rest = if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            return Err(RemoteError::Unavailable(format!(
                "unsupported url scheme: {}",
                self.base_url
            )));
        };
        Ok(format!("{rest}/collections/{collection}/subscribe"))
    }
}

fn unavailable(err: reqwest::Error) -> RemoteError {
    RemoteError::Unavailable(err.to_string())
}

/// Turn a non-2xx response into a [`RemoteError::Rejected`].
async fn check(response: reqwest::Response) -> RemoteResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = match response.json::<ErrorBody>().await {
        Ok(body) => body.error,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string(),
    };
    Err(RemoteError::Rejected {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl RemoteCollections for HttpRemote {
    async fn subscribe(
        &self,
        collection: CollectionName,
        events: EventSender,
    ) -> RemoteResult<Subscription> {
        let url = self.subscribe_url(collection)?;
        let (mut socket, _) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| RemoteError::Unavailable(e.to_string()))?;

        let feed = tokio::spawn(async move {
            while let Some(message) = socket.next().await {
                let event = match message {
                    Ok(Message::Text(text)) => match serde_json::from_str::<Frame>(text.as_str()) {
                        Ok(Frame::Snapshot {
                            collection,
                            documents,
                        }) => RemoteEvent::snapshot(collection, documents),
                        Ok(Frame::Pong) => continue,
                        Ok(Frame::Error { message }) => {
                            RemoteEvent::failed(collection, RemoteError::Unavailable(message))
                        }
                        Err(e) => {
                            RemoteEvent::failed(collection, RemoteError::Decode(e.to_string()))
                        }
                    },
                    Ok(Message::Close(_)) => {
                        let _ = events.send(RemoteEvent::failed(collection, RemoteError::Closed));
                        break;
                    }
                    Ok(_) => continue,
                    Err(e) => {
                        let _ = events.send(RemoteEvent::failed(
                            collection,
                            RemoteError::Unavailable(e.to_string()),
                        ));
                        break;
                    }
                };
                if events.send(event).is_err() {
                    break;
                }
            }
            tracing::debug!(collection = %collection, "Remote feed ended");
        });

        Ok(Subscription::new(collection, move || feed.abort()))
    }

    async fn add(&self, collection: CollectionName, fields: Fields) -> RemoteResult<RecordId> {
        let response = self
            .client
            .post(self.collection_url(collection))
            .json(&fields)
            .send()
            .await
            .map_err(unavailable)?;
        let body: AddResponse = check(response)
            .await?
            .json()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))?;
        Ok(body.id)
    }

    async fn set(&self, collection: CollectionName, id: &str, fields: Fields) -> RemoteResult<()> {
        let response = self
            .client
            .put(self.document_url(collection, id)?)
            .json(&fields)
            .send()
            .await
            .map_err(unavailable)?;
        check(response).await?;
        Ok(())
    }

    async fn update(
        &self,
        collection: CollectionName,
        id: &str,
        fields: Fields,
    ) -> RemoteResult<()> {
        let response = self
            .client
            .patch(self.document_url(collection, id)?)
            .json(&fields)
            .send()
            .await
            .map_err(unavailable)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(RemoteError::NotFound {
                collection,
                id: id.to_string(),
            });
        }
        check(response).await?;
        Ok(())
    }

    async fn delete(&self, collection: CollectionName, id: &str) -> RemoteResult<()> {
        let response = self
            .client
            .delete(self.document_url(collection, id)?)
            .send()
            .await
            .map_err(unavailable)?;
        check(response).await?;
        Ok(())
    }

    async fn list_all(&self, collection: CollectionName) -> RemoteResult<Vec<Document>> {
        let response = self
            .client
            .get(self.collection_url(collection))
            .send()
            .await
            .map_err(unavailable)?;
        check(response)
            .await?
            .json()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))
    }
}
