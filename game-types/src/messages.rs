use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

/// A single field-path write inside a partial update. `null` deletes the field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FieldWrite {
    pub path: String, // Slash-separated, relative to the document key
    pub value: Value,
}

impl FieldWrite {
    pub fn new(path: impl Into<String>, value: Value) -> Self {
        Self {
            path: path.into(),
            value,
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(path, Value::Null)
    }
}

/// Requests a remote client sends to the store host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum StoreRequest {
    Get { request_id: u64, key: String },
    Set { request_id: u64, key: String, value: Value },
    Update { request_id: u64, key: String, fields: Vec<FieldWrite> },
    Remove { request_id: u64, key: String },
    Subscribe { key: String },
    Unsubscribe { key: String },
    Heartbeat,
}

impl StoreRequest {
    /// The id a reply will echo. Subscriptions and heartbeats have none.
    pub fn request_id(&self) -> Option<u64> {
        match self {
            StoreRequest::Get { request_id, .. }
            | StoreRequest::Set { request_id, .. }
            | StoreRequest::Update { request_id, .. }
            | StoreRequest::Remove { request_id, .. } => Some(*request_id),
            StoreRequest::Subscribe { .. }
            | StoreRequest::Unsubscribe { .. }
            | StoreRequest::Heartbeat => None,
        }
    }
}

/// Messages the store host sends back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum StoreResponse {
    Value { request_id: u64, value: Option<Value> },
    Ack { request_id: u64, applied: bool },
    Snapshot { key: String, value: Option<Value> },
    SubscriptionLost { key: String, message: String },
    Error { request_id: Option<u64>, message: String },
    HeartbeatAck,
}
