//! Facebook Messenger channel.
//!
//! Inbound: an axum webhook server — `GET /webhook` answers the platform's
//! verification handshake, `POST /webhook` receives page messaging events.
//! Outbound: Graph API Send calls. Delivery is fire-and-forget; a non-2xx
//! from the Graph API is logged, never propagated.
//! Docs: <https://developers.facebook.com/docs/messenger-platform>

use async_trait::async_trait;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use dukkan_core::{
    config::MessengerConfig,
    error::DukkanError,
    message::IncomingMessage,
    traits::Channel,
};
use serde::Deserialize;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Messenger's hard limit on a single text message.
const MESSENGER_TEXT_LIMIT: usize = 2000;

/// Messenger channel backed by a webhook server and the Graph API.
pub struct MessengerChannel {
    config: MessengerConfig,
    client: reqwest::Client,
}

// --- Webhook payload types (lenient: unknown shapes parse to empty) ---

#[derive(Debug, Default, Deserialize)]
struct WebhookPayload {
    #[serde(default)]
    object: String,
    #[serde(default)]
    entry: Vec<WebhookEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct WebhookEntry {
    #[serde(default)]
    messaging: Vec<MessagingEvent>,
}

#[derive(Debug, Default, Deserialize)]
struct MessagingEvent {
    sender: Option<EventSender>,
    message: Option<EventMessage>,
}

#[derive(Debug, Deserialize)]
struct EventSender {
    id: String,
}

#[derive(Debug, Default, Deserialize)]
struct EventMessage {
    text: Option<String>,
    #[serde(default)]
    is_echo: bool,
}

#[derive(Clone)]
struct WebhookState {
    tx: mpsc::Sender<IncomingMessage>,
    verify_token: String,
}

impl MessengerChannel {
    /// Create a new Messenger channel from config.
    pub fn new(config: MessengerConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn send_api_url(&self) -> String {
        format!(
            "https://graph.facebook.com/{}/me/messages?access_token={}",
            self.config.graph_api_version, self.config.page_access_token
        )
    }

    async fn post_message(&self, payload: serde_json::Value) -> Result<(), DukkanError> {
        let resp = self
            .client
            .post(self.send_api_url())
            .json(&payload)
            .send()
            .await
            .map_err(|e| DukkanError::Channel(format!("messenger send failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            warn!("messenger send got {status}: {body}");
        }
        Ok(())
    }
}

#[async_trait]
impl Channel for MessengerChannel {
    fn name(&self) -> &str {
        "messenger"
    }

    async fn start(&self) -> Result<mpsc::Receiver<IncomingMessage>, DukkanError> {
        let (tx, rx) = mpsc::channel(256);
        let state = WebhookState {
            tx,
            verify_token: self.config.verify_token.clone(),
        };

        let app = Router::new()
            .route("/", get(health))
            .route("/webhook", get(verify_handler).post(receive_handler))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind(&self.config.bind_addr)
            .await
            .map_err(|e| {
                DukkanError::Channel(format!(
                    "failed to bind webhook server on {}: {e}",
                    self.config.bind_addr
                ))
            })?;

        info!("messenger webhook listening on {}", self.config.bind_addr);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!("messenger webhook server exited: {e}");
            }
        });

        Ok(rx)
    }

    async fn send_text(&self, recipient_id: &str, text: &str) -> Result<(), DukkanError> {
        for chunk in split_message(text, MESSENGER_TEXT_LIMIT) {
            self.post_message(serde_json::json!({
                "recipient": { "id": recipient_id },
                "message": { "text": chunk },
            }))
            .await?;
        }
        Ok(())
    }

    async fn send_image(&self, recipient_id: &str, image_url: &str) -> Result<(), DukkanError> {
        self.post_message(serde_json::json!({
            "recipient": { "id": recipient_id },
            "message": {
                "attachment": {
                    "type": "image",
                    "payload": {
                        "url": image_url,
                        "is_reusable": true,
                    }
                }
            },
        }))
        .await
    }

    async fn stop(&self) -> Result<(), DukkanError> {
        Ok(())
    }
}

async fn health() -> &'static str {
    "Dukkan bot is running"
}

/// `GET /webhook` — the platform's verification handshake.
async fn verify_handler(
    State(state): State<WebhookState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<String, (StatusCode, &'static str)> {
    match verify_challenge(&params, &state.verify_token) {
        Some(challenge) => Ok(challenge),
        None => {
            warn!("webhook verification failed");
            Err((StatusCode::FORBIDDEN, "Verification Failed"))
        }
    }
}

/// Answer the `hub.challenge` value when `hub.verify_token` matches the
/// configured secret. An empty configured secret never verifies.
fn verify_challenge(params: &HashMap<String, String>, verify_token: &str) -> Option<String> {
    if verify_token.is_empty() {
        return None;
    }
    if params.get("hub.verify_token").map(String::as_str) != Some(verify_token) {
        return None;
    }
    params.get("hub.challenge").cloned()
}

/// `POST /webhook` — inbound page events.
///
/// Always answers 200 "ok" so the platform does not retry; malformed
/// bodies simply produce zero messages.
async fn receive_handler(
    State(state): State<WebhookState>,
    Json(body): Json<serde_json::Value>,
) -> &'static str {
    for message in extract_messages(&body) {
        if state.tx.send(message).await.is_err() {
            warn!("webhook receiver dropped, discarding inbound message");
        }
    }
    "ok"
}

/// Pull customer messages out of a webhook payload.
///
/// Echo events (`is_echo`) and events without text are discarded here,
/// before the gateway ever sees them.
fn extract_messages(body: &serde_json::Value) -> Vec<IncomingMessage> {
    let payload: WebhookPayload = match serde_json::from_value(body.clone()) {
        Ok(p) => p,
        Err(e) => {
            debug!("webhook: unparseable payload: {e}");
            return Vec::new();
        }
    };

    if payload.object != "page" {
        return Vec::new();
    }

    let mut messages = Vec::new();
    for entry in &payload.entry {
        for event in &entry.messaging {
            let (sender, message) = match (&event.sender, &event.message) {
                (Some(s), Some(m)) => (s, m),
                _ => continue,
            };
            if message.is_echo {
                continue;
            }
            let text = match &message.text {
                Some(t) if !t.is_empty() => t,
                _ => continue,
            };
            messages.push(IncomingMessage::new(&sender.id, text));
        }
    }
    messages
}

/// Split text into chunks under `limit` characters, preferring newline
/// then space boundaries.
pub(crate) fn split_message(text: &str, limit: usize) -> Vec<String> {
    if text.chars().count() <= limit {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;
    while remaining.chars().count() > limit {
        let hard = remaining
            .char_indices()
            .nth(limit)
            .map(|(i, _)| i)
            .unwrap_or(remaining.len());
        let window = &remaining[..hard];
        let cut = window
            .rfind('\n')
            .or_else(|| window.rfind(' '))
            .filter(|&i| i > 0)
            .unwrap_or(hard);
        chunks.push(remaining[..cut].trim_end().to_string());
        remaining = remaining[cut..].trim_start();
    }
    if !remaining.is_empty() {
        chunks.push(remaining.to_string());
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_event(sender: &str, text: &str, is_echo: bool) -> serde_json::Value {
        serde_json::json!({
            "object": "page",
            "entry": [{
                "messaging": [{
                    "sender": { "id": sender },
                    "message": { "text": text, "is_echo": is_echo },
                }]
            }]
        })
    }

    #[test]
    fn test_extract_messages_basic() {
        let messages = extract_messages(&page_event("12345", "شحال السعر؟", false));
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].sender_id, "12345");
        assert_eq!(messages[0].text, "شحال السعر؟");
    }

    #[test]
    fn test_extract_messages_discards_echo() {
        let messages = extract_messages(&page_event("12345", "hi", true));
        assert!(messages.is_empty());
    }

    #[test]
    fn test_extract_messages_ignores_non_page_objects() {
        let body = serde_json::json!({ "object": "instagram", "entry": [] });
        assert!(extract_messages(&body).is_empty());
    }

    #[test]
    fn test_extract_messages_tolerates_malformed_payload() {
        assert!(extract_messages(&serde_json::json!({})).is_empty());
        assert!(extract_messages(&serde_json::json!({"object": "page"})).is_empty());
        assert!(extract_messages(&serde_json::json!([1, 2, 3])).is_empty());
        // Event without text (e.g. an attachment-only message) is skipped.
        let body = serde_json::json!({
            "object": "page",
            "entry": [{ "messaging": [{ "sender": { "id": "1" }, "message": {} }] }]
        });
        assert!(extract_messages(&body).is_empty());
    }

    #[test]
    fn test_verify_challenge_match() {
        let mut params = HashMap::new();
        params.insert("hub.verify_token".to_string(), "secret".to_string());
        params.insert("hub.challenge".to_string(), "1158201444".to_string());
        assert_eq!(
            verify_challenge(&params, "secret"),
            Some("1158201444".to_string())
        );
    }

    #[test]
    fn test_verify_challenge_wrong_token() {
        let mut params = HashMap::new();
        params.insert("hub.verify_token".to_string(), "wrong".to_string());
        params.insert("hub.challenge".to_string(), "1158201444".to_string());
        assert_eq!(verify_challenge(&params, "secret"), None);
    }

    #[test]
    fn test_verify_challenge_empty_configured_token() {
        let mut params = HashMap::new();
        params.insert("hub.verify_token".to_string(), String::new());
        params.insert("hub.challenge".to_string(), "x".to_string());
        assert_eq!(verify_challenge(&params, ""), None);
    }

    #[test]
    fn test_split_message_short_text_untouched() {
        let chunks = split_message("سومتها 1200", 2000);
        assert_eq!(chunks, vec!["سومتها 1200".to_string()]);
    }

    #[test]
    fn test_split_message_prefers_word_boundary() {
        let text = "aaaa bbbb cccc";
        let chunks = split_message(text, 10);
        assert_eq!(chunks, vec!["aaaa bbbb".to_string(), "cccc".to_string()]);
    }

    #[test]
    fn test_split_message_hard_cut_without_boundary() {
        let text = "a".repeat(25);
        let chunks = split_message(&text, 10);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_split_message_multibyte_safe() {
        let text = "شحال ".repeat(500);
        for chunk in split_message(text.trim_end(), 2000) {
            assert!(chunk.chars().count() <= 2000);
        }
    }
}
