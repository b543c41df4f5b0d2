//! Gateway — wires the channel, provider, catalog, sessions, and order
//! sink together and drives the per-message pipeline.

mod pipeline;
mod prompt;

#[cfg(test)]
mod tests;

pub use prompt::compose_system_prompt;

use anyhow::Result;
use dukkan_core::{
    config::PersonaConfig,
    traits::{CatalogSource, Channel, OrderRecorder, Provider},
};
use dukkan_sessions::SessionStore;
use std::sync::Arc;
use tracing::{error, info, warn};

/// The message gateway.
///
/// `provider` is `None` when no model credential is configured; the
/// gateway then answers every message with the fixed maintenance text
/// instead of calling a model.
pub struct Gateway {
    pub(crate) provider: Option<Arc<dyn Provider>>,
    pub(crate) channel: Arc<dyn Channel>,
    pub(crate) catalog: Arc<dyn CatalogSource>,
    pub(crate) sessions: Arc<SessionStore>,
    pub(crate) recorder: Option<Arc<dyn OrderRecorder>>,
    pub(crate) persona: PersonaConfig,
}

impl Gateway {
    pub fn new(
        provider: Option<Arc<dyn Provider>>,
        channel: Arc<dyn Channel>,
        catalog: Arc<dyn CatalogSource>,
        sessions: Arc<SessionStore>,
        recorder: Option<Arc<dyn OrderRecorder>>,
        persona: PersonaConfig,
    ) -> Self {
        Self {
            provider,
            channel,
            catalog,
            sessions,
            recorder,
            persona,
        }
    }

    /// Run the gateway until the channel closes or Ctrl-C.
    ///
    /// Each inbound message is handled on its own task; the per-customer
    /// session lock inside the pipeline keeps runs for one customer
    /// sequential while different customers proceed in parallel.
    pub async fn run(self: Arc<Self>) -> Result<()> {
        match &self.provider {
            Some(p) => info!(
                "gateway starting | provider: {} | channel: {}",
                p.name(),
                self.channel.name()
            ),
            None => warn!(
                "gateway starting in maintenance mode (no provider) | channel: {}",
                self.channel.name()
            ),
        }

        let mut rx = self.channel.start().await?;

        loop {
            tokio::select! {
                maybe = rx.recv() => match maybe {
                    Some(incoming) => {
                        let gateway = Arc::clone(&self);
                        tokio::spawn(async move {
                            gateway.handle_message(incoming).await;
                        });
                    }
                    None => {
                        warn!("channel closed its message stream");
                        break;
                    }
                },
                _ = tokio::signal::ctrl_c() => {
                    info!("shutdown requested");
                    break;
                }
            }
        }

        if let Err(e) = self.channel.stop().await {
            error!("channel shutdown failed: {e}");
        }
        Ok(())
    }
}
