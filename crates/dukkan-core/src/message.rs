use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An incoming customer message from the channel.
///
/// Echo events (the page's own outbound messages reflected back by the
/// platform) are discarded inside the channel and never reach the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub id: Uuid,
    /// Platform-specific customer ID (Messenger PSID).
    pub sender_id: String,
    /// Message text content.
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl IncomingMessage {
    /// Build a message with a fresh id and the current timestamp.
    pub fn new(sender_id: &str, text: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender_id: sender_id.to_string(),
            text: text.to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// A raw model reply, before directive extraction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub text: String,
    pub metadata: MessageMetadata,
}

/// Metadata about how a reply was generated.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MessageMetadata {
    /// Which provider produced this response.
    pub provider_used: String,
    /// Token count (if available from the provider).
    pub tokens_used: Option<u64>,
    /// Wall-clock processing time in milliseconds.
    pub processing_time_ms: u64,
    /// Model identifier (if applicable).
    pub model: Option<String>,
}

/// A captured customer order, built only from a well-formed SaveOrder
/// directive — all three fields are guaranteed non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub name: String,
    pub order: String,
    pub phone: String,
}

impl Order {
    /// Construct an order; returns `None` if any field is empty after
    /// trimming.
    pub fn new(name: &str, order: &str, phone: &str) -> Option<Self> {
        let name = name.trim();
        let order = order.trim();
        let phone = phone.trim();
        if name.is_empty() || order.is_empty() || phone.is_empty() {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            order: order.to_string(),
            phone: phone.to_string(),
        })
    }
}
