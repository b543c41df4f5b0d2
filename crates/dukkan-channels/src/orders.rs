//! Order-recording webhook sink.
//!
//! Captured orders are POSTed as JSON to a configured URL (typically an
//! Apps Script endpoint appending to an orders sheet). Best-effort: the
//! gateway logs failures and the conversation is unaffected.

use async_trait::async_trait;
use chrono::Utc;
use dukkan_core::{config::OrdersConfig, error::DukkanError, message::Order, traits::OrderRecorder};
use std::time::Duration;
use tracing::debug;

/// Recorder that forwards orders to a webhook URL.
pub struct WebhookOrderRecorder {
    client: reqwest::Client,
    url: String,
}

impl WebhookOrderRecorder {
    /// Create from config values. Returns `None` when no sink URL is
    /// configured — the gateway then drops orders with a log line.
    pub fn from_config(config: &OrdersConfig) -> Option<Self> {
        if config.webhook_url.is_empty() {
            return None;
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();
        Some(Self {
            client,
            url: config.webhook_url.clone(),
        })
    }
}

#[async_trait]
impl OrderRecorder for WebhookOrderRecorder {
    async fn record(&self, order: &Order) -> Result<(), DukkanError> {
        let payload = serde_json::json!({
            "name": order.name,
            "order": order.order,
            "phone": order.phone,
            "recorded_at": Utc::now().to_rfc3339(),
        });

        let resp = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| DukkanError::Recorder(format!("order post failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(DukkanError::Recorder(format!(
                "order sink returned {status}: {body}"
            )));
        }

        debug!("order recorded for {}", order.name);
        Ok(())
    }
}
