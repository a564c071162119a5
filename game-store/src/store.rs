use async_trait::async_trait;
use futures_util::stream::BoxStream;
use game_types::{FieldWrite, GameError};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    #[error("Invalid field path {path:?} in {key}")]
    InvalidPath { key: String, path: String },
    #[error("Malformed document {key}: {message}")]
    Serialization { key: String, message: String },
}

impl From<StoreError> for GameError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(message) => GameError::StoreUnavailable { message },
            StoreError::InvalidPath { key, path } => GameError::Corrupt {
                room_id: key,
                message: format!("invalid field path {path:?}"),
            },
            StoreError::Serialization { key, message } => GameError::Corrupt {
                room_id: key,
                message,
            },
        }
    }
}

/// Current value of a document as a subscriber sees it. `Ok(None)` means the
/// document does not exist; `Err` means the subscription lost its store.
pub type Snapshot = Result<Option<Value>, StoreError>;

/// Last-value-wins stream of snapshots. The first item is the value at the
/// time of subscribing; intermediate values may be skipped.
pub type SnapshotStream = BoxStream<'static, Snapshot>;

/// A remotely observable JSON document store.
///
/// Keys name whole documents. Partial updates address fields inside a
/// document with slash-separated paths and a `null` value deletes the field.
/// Single writes are atomic; there are no multi-document transactions.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Create or replace the whole document.
    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;

    /// Apply every field write as one atomic change. Returns `false` without
    /// writing anything when the document does not exist, so a late write
    /// cannot bring back a deleted document.
    async fn update(&self, key: &str, fields: Vec<FieldWrite>) -> Result<bool, StoreError>;

    /// Delete the document. Deleting a missing document is not an error.
    async fn remove(&self, key: &str) -> Result<(), StoreError>;

    async fn subscribe(&self, key: &str) -> Result<SnapshotStream, StoreError>;
}
