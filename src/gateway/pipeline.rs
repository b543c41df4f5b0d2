//! Per-message orchestration pipeline.
//!
//! One run per inbound customer message: mute gate, catalog fetch, prompt
//! composition, model call, directive extraction, history append, then
//! side effects in a fixed order (text, images, orders, mute latch).
//! Channel and recorder failures are logged and never abort the run.

use super::{compose_system_prompt, Gateway};
use crate::directives::{self, Directive};
use dukkan_core::{
    context::{Context, SamplingConfig},
    message::IncomingMessage,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

impl Gateway {
    pub(super) async fn handle_message(&self, incoming: IncomingMessage) {
        let preview: String = incoming.text.chars().take(60).collect();
        info!("[{}] {} says: {}", self.channel.name(), incoming.sender_id, preview);

        // Held for the whole run: concurrent messages from the same
        // customer are processed one at a time, in arrival order.
        let mut session = self.sessions.lock(&incoming.sender_id).await;

        if session.is_muted() {
            debug!("session {} is muted, dropping message", incoming.sender_id);
            return;
        }

        let provider = match &self.provider {
            Some(p) => Arc::clone(p),
            None => {
                warn!("no provider configured, sending maintenance notice");
                self.deliver_text(&incoming.sender_id, &self.persona.maintenance)
                    .await;
                return;
            }
        };

        // A fresh snapshot per run; a failed fetch degrades to the
        // placeholder listing inside the catalog source.
        let snapshot = self.catalog.fetch().await;

        let context = Context {
            system_prompt: compose_system_prompt(&self.persona.policy, &snapshot),
            history: session.history(),
            current_message: incoming.text.clone(),
            sampling: SamplingConfig {
                temperature: self.persona.temperature,
                max_tokens: self.persona.max_tokens,
            },
        };

        let reply = match provider.complete(&context).await {
            Ok(reply) => reply,
            Err(e) => {
                // History stays untouched so the failed run leaves no trace.
                warn!("provider failure for {}: {e}", incoming.sender_id);
                self.deliver_text(&incoming.sender_id, &self.persona.apology)
                    .await;
                return;
            }
        };

        debug!(
            "[{}] replied in {}ms (model: {})",
            reply.metadata.provider_used,
            reply.metadata.processing_time_ms,
            reply.metadata.model.as_deref().unwrap_or("unknown"),
        );

        let (cleaned, extracted) = directives::parse(&reply.text);

        // The pair is appended before delivery; delivery failures do not
        // roll history back.
        session.push_exchange(&incoming.text, &cleaned);

        if !cleaned.is_empty() {
            self.deliver_text(&incoming.sender_id, &cleaned).await;
        }

        let mut mute_requested = false;
        for directive in &extracted {
            match directive {
                Directive::Mute => mute_requested = true,
                Directive::Image(url) => {
                    if let Err(e) = self.channel.send_image(&incoming.sender_id, url).await {
                        warn!("image delivery failed for {}: {e}", incoming.sender_id);
                    }
                }
                Directive::SaveOrder(order) => match &self.recorder {
                    Some(recorder) => {
                        if let Err(e) = recorder.record(order).await {
                            warn!("failed to record order from {}: {e}", order.name);
                        } else {
                            info!("order recorded: {} ({})", order.name, order.phone);
                        }
                    }
                    None => {
                        warn!("no order sink configured, dropping order from {}", order.name)
                    }
                },
            }
        }

        // Latched last so the reply that requested the mute still goes out.
        if mute_requested {
            session.mute();
            info!("session {} muted until operator reset", incoming.sender_id);
        }
    }

    async fn deliver_text(&self, recipient_id: &str, text: &str) {
        if let Err(e) = self.channel.send_text(recipient_id, text).await {
            warn!("text delivery failed for {recipient_id}: {e}");
        }
    }
}
