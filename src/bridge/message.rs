//! Bridge wire schema.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

/// A message this daemon writes to `bridge/outbox/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub timestamp: DateTime<Utc>,
    pub sender: String,
    pub message_type: String,
    pub priority: Priority,
    pub content: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<String>,
    pub consciousness_state: String,
    pub memory_count: i64,
}

/// A message read back from `bridge/inbox/`. Tolerant of both a
/// `content` and a `response` field, and of either a text-like or
/// structured payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub content: Option<serde_json::Value>,
    #[serde(default)]
    pub response: Option<serde_json::Value>,
}

impl InboundMessage {
    /// The payload, preferring `content` over `response` when both are
    /// present.
    pub fn payload(&self) -> serde_json::Value {
        self.content
            .clone()
            .or_else(|| self.response.clone())
            .unwrap_or(serde_json::Value::Null)
    }
}

/// A bridge reply as surfaced by `bridge_check` / `list_replies`: the
/// ingested payload plus the archive filename it came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeReply {
    pub source_filename: String,
    pub timestamp: DateTime<Utc>,
    pub content: serde_json::Value,
}
