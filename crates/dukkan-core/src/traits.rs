use crate::{
    catalog::CatalogSnapshot,
    context::Context,
    error::DukkanError,
    message::{IncomingMessage, Order, OutgoingMessage},
};
use async_trait::async_trait;

/// Language Model Port — the brain.
///
/// Every chat-completion-capable backend (Groq, Anthropic, ...) implements
/// this trait to provide a uniform interface. Persona text, sampling
/// temperature, and token budget travel inside the [`Context`], never
/// hardcoded per adapter.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Human-readable provider name.
    fn name(&self) -> &str;

    /// Whether this provider requires an API key to function.
    fn requires_api_key(&self) -> bool;

    /// Send a conversation context to the provider and get a response.
    ///
    /// Fails with `Transport`, `Quota`, or `Timeout`; the caller decides
    /// the degraded behavior.
    async fn complete(&self, context: &Context) -> Result<OutgoingMessage, DukkanError>;

    /// Check if the provider is available and ready.
    async fn is_available(&self) -> bool;
}

/// Channel Port — the messaging transport.
///
/// Delivery is fire-and-forget from the gateway's perspective: a returned
/// error is logged and has no effect on session state.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Human-readable channel name.
    fn name(&self) -> &str;

    /// Start receiving inbound events.
    /// Returns a receiver that yields incoming messages; echo events are
    /// filtered out before they reach the receiver.
    async fn start(&self) -> Result<tokio::sync::mpsc::Receiver<IncomingMessage>, DukkanError>;

    /// Send a text message to a customer.
    async fn send_text(&self, recipient_id: &str, text: &str) -> Result<(), DukkanError>;

    /// Send an image attachment (by URL) to a customer.
    async fn send_image(&self, recipient_id: &str, image_url: &str) -> Result<(), DukkanError>;

    /// Graceful shutdown.
    async fn stop(&self) -> Result<(), DukkanError>;
}

/// Catalog port — produces the grounding snapshot for one orchestration
/// run.
///
/// `fetch` always succeeds from the caller's perspective: any transport or
/// parse failure yields [`CatalogSnapshot::placeholder`] instead of an
/// error.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch(&self) -> CatalogSnapshot;
}

/// Order Recorder port — persists a captured order to an external sink.
///
/// Best-effort: the gateway logs a failure and moves on; nothing is
/// surfaced to the customer.
#[async_trait]
pub trait OrderRecorder: Send + Sync {
    async fn record(&self, order: &Order) -> Result<(), DukkanError>;
}
