use super::*;
use async_trait::async_trait;
use dukkan_core::{
    catalog::{CatalogSnapshot, Product},
    context::Context,
    error::DukkanError,
    message::{IncomingMessage, Order, OutgoingMessage},
};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{mpsc, Mutex};

struct StubProvider {
    reply: String,
    fail: bool,
    calls: AtomicUsize,
    last_context: Mutex<Option<Context>>,
}

impl StubProvider {
    fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            fail: false,
            calls: AtomicUsize::new(0),
            last_context: Mutex::new(None),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: String::new(),
            fail: true,
            calls: AtomicUsize::new(0),
            last_context: Mutex::new(None),
        })
    }
}

#[async_trait]
impl Provider for StubProvider {
    fn name(&self) -> &str {
        "stub"
    }

    fn requires_api_key(&self) -> bool {
        false
    }

    async fn complete(&self, context: &Context) -> Result<OutgoingMessage, DukkanError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_context.lock().await = Some(context.clone());
        if self.fail {
            return Err(DukkanError::Timeout("stub timeout".into()));
        }
        Ok(OutgoingMessage {
            text: self.reply.clone(),
            metadata: Default::default(),
        })
    }

    async fn is_available(&self) -> bool {
        !self.fail
    }
}

#[derive(Default)]
struct RecordingChannel {
    texts: Mutex<Vec<(String, String)>>,
    images: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl Channel for RecordingChannel {
    fn name(&self) -> &str {
        "recording"
    }

    async fn start(&self) -> Result<mpsc::Receiver<IncomingMessage>, DukkanError> {
        let (_tx, rx) = mpsc::channel(1);
        Ok(rx)
    }

    async fn send_text(&self, recipient_id: &str, text: &str) -> Result<(), DukkanError> {
        self.texts
            .lock()
            .await
            .push((recipient_id.to_string(), text.to_string()));
        Ok(())
    }

    async fn send_image(&self, recipient_id: &str, image_url: &str) -> Result<(), DukkanError> {
        self.images
            .lock()
            .await
            .push((recipient_id.to_string(), image_url.to_string()));
        Ok(())
    }

    async fn stop(&self) -> Result<(), DukkanError> {
        Ok(())
    }
}

struct StubCatalog {
    snapshot: CatalogSnapshot,
}

#[async_trait]
impl CatalogSource for StubCatalog {
    async fn fetch(&self) -> CatalogSnapshot {
        self.snapshot.clone()
    }
}

struct StubRecorder {
    orders: Mutex<Vec<Order>>,
    fail: bool,
}

#[async_trait]
impl OrderRecorder for StubRecorder {
    async fn record(&self, order: &Order) -> Result<(), DukkanError> {
        if self.fail {
            return Err(DukkanError::Recorder("stub sink down".into()));
        }
        self.orders.lock().await.push(order.clone());
        Ok(())
    }
}

fn stocked_catalog() -> Arc<StubCatalog> {
    Arc::new(StubCatalog {
        snapshot: CatalogSnapshot::new(
            vec![Product {
                name: "قهوة".into(),
                price: "1200 دج".into(),
                stock: "متوفر".into(),
                image_url: Some("http://img/coffee.jpg".into()),
            }],
            None,
        ),
    })
}

struct Harness {
    gateway: Gateway,
    provider: Arc<StubProvider>,
    channel: Arc<RecordingChannel>,
    recorder: Arc<StubRecorder>,
}

fn harness(provider: Arc<StubProvider>) -> Harness {
    harness_with(provider, false)
}

fn harness_with(provider: Arc<StubProvider>, recorder_fails: bool) -> Harness {
    let channel = Arc::new(RecordingChannel::default());
    let recorder = Arc::new(StubRecorder {
        orders: Mutex::new(Vec::new()),
        fail: recorder_fails,
    });
    let gateway = Gateway::new(
        Some(provider.clone() as Arc<dyn Provider>),
        channel.clone() as Arc<dyn Channel>,
        stocked_catalog() as Arc<dyn CatalogSource>,
        Arc::new(SessionStore::new(4)),
        Some(recorder.clone() as Arc<dyn OrderRecorder>),
        PersonaConfig::default(),
    );
    Harness {
        gateway,
        provider,
        channel,
        recorder,
    }
}

#[tokio::test]
async fn test_exchange_is_grounded_and_appended() {
    let h = harness(StubProvider::replying("سومتها 1200 دج للكرتونة"));

    h.gateway
        .handle_message(IncomingMessage::new("c1", "شحال السعر؟"))
        .await;

    // One model call whose system instruction carries the listing.
    assert_eq!(h.provider.calls.load(Ordering::SeqCst), 1);
    let ctx = h.provider.last_context.lock().await.clone().unwrap();
    assert!(ctx.system_prompt.contains("المنتج: قهوة"));
    assert_eq!(ctx.current_message, "شحال السعر؟");

    // One text action, no images, no orders.
    let texts = h.channel.texts.lock().await;
    assert_eq!(texts.len(), 1);
    assert_eq!(texts[0], ("c1".to_string(), "سومتها 1200 دج للكرتونة".to_string()));
    assert!(h.channel.images.lock().await.is_empty());
    assert!(h.recorder.orders.lock().await.is_empty());

    // Exactly one pair appended, mute unchanged.
    let history = h.gateway.sessions.history("c1").await;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].content, "شحال السعر؟");
    assert_eq!(history[1].content, "سومتها 1200 دج للكرتونة");
    assert!(!h.gateway.sessions.is_muted("c1").await);
}

#[tokio::test]
async fn test_history_flows_back_into_context() {
    let h = harness(StubProvider::replying("نعم"));

    h.gateway
        .handle_message(IncomingMessage::new("c1", "واش خويا"))
        .await;
    h.gateway
        .handle_message(IncomingMessage::new("c1", "عندك قهوة؟"))
        .await;

    let ctx = h.provider.last_context.lock().await.clone().unwrap();
    assert_eq!(ctx.history.len(), 2);
    assert_eq!(ctx.history[0].content, "واش خويا");
    assert_eq!(ctx.history[1].content, "نعم");
    assert_eq!(ctx.current_message, "عندك قهوة؟");
}

#[tokio::test]
async fn test_mute_latches_after_delivery_and_silences_session() {
    let h = harness(StubProvider::replying("نحولك للمسؤول [MUTE]"));

    h.gateway
        .handle_message(IncomingMessage::new("c1", "حبيت نحكي مع المول"))
        .await;

    // The triggering reply still goes out, cleaned.
    {
        let texts = h.channel.texts.lock().await;
        assert_eq!(texts.len(), 1);
        assert_eq!(texts[0].1, "نحولك للمسؤول");
    }
    assert!(h.gateway.sessions.is_muted("c1").await);
    assert_eq!(h.gateway.sessions.history("c1").await.len(), 2);

    // Subsequent messages produce zero model calls, zero actions, no
    // history growth.
    h.gateway
        .handle_message(IncomingMessage::new("c1", "راك هنا؟"))
        .await;

    assert_eq!(h.provider.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.channel.texts.lock().await.len(), 1);
    assert_eq!(h.gateway.sessions.history("c1").await.len(), 2);

    // Other customers are unaffected.
    h.gateway
        .handle_message(IncomingMessage::new("c2", "سلام"))
        .await;
    assert_eq!(h.provider.calls.load(Ordering::SeqCst), 2);
    assert!(!h.gateway.sessions.is_muted("c2").await);
}

#[tokio::test]
async fn test_provider_failure_sends_apology_without_history_mutation() {
    let h = harness(StubProvider::failing());

    h.gateway
        .handle_message(IncomingMessage::new("c1", "شحال السعر؟"))
        .await;

    let texts = h.channel.texts.lock().await;
    assert_eq!(texts.len(), 1);
    assert_eq!(texts[0].1, PersonaConfig::default().apology);
    assert!(h.gateway.sessions.history("c1").await.is_empty());
    assert!(!h.gateway.sessions.is_muted("c1").await);
}

#[tokio::test]
async fn test_maintenance_mode_without_provider() {
    let channel = Arc::new(RecordingChannel::default());
    let gateway = Gateway::new(
        None,
        channel.clone() as Arc<dyn Channel>,
        stocked_catalog() as Arc<dyn CatalogSource>,
        Arc::new(SessionStore::new(4)),
        None,
        PersonaConfig::default(),
    );

    gateway
        .handle_message(IncomingMessage::new("c1", "شحال السعر؟"))
        .await;

    let texts = channel.texts.lock().await;
    assert_eq!(texts.len(), 1);
    assert_eq!(texts[0].1, PersonaConfig::default().maintenance);
    assert!(gateway.sessions.history("c1").await.is_empty());
}

#[tokio::test]
async fn test_image_and_order_directives_emit_actions() {
    let h = harness(StubProvider::replying(
        "تم التسجيل ||SAVE||أحمد|2 كرتونة قهوة|0550123456|| هاك التصويرة IMAGE: http://img/coffee.jpg",
    ));

    h.gateway
        .handle_message(IncomingMessage::new("c1", "نأكد الطلبية"))
        .await;

    let images = h.channel.images.lock().await;
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].1, "http://img/coffee.jpg");

    let orders = h.recorder.orders.lock().await;
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].name, "أحمد");
    assert_eq!(orders[0].phone, "0550123456");

    // The delivered text carries no markup.
    let texts = h.channel.texts.lock().await;
    assert_eq!(texts.len(), 1);
    assert!(!texts[0].1.contains("IMAGE:"));
    assert!(!texts[0].1.contains("||SAVE||"));
}

#[tokio::test]
async fn test_recorder_failure_does_not_disturb_conversation() {
    let h = harness_with(
        StubProvider::replying("سجلناها ||SAVE||أحمد|كرتونة|0550||"),
        true,
    );

    h.gateway
        .handle_message(IncomingMessage::new("c1", "نأكد"))
        .await;

    let texts = h.channel.texts.lock().await;
    assert_eq!(texts.len(), 1);
    assert_eq!(texts[0].1, "سجلناها");
    assert_eq!(h.gateway.sessions.history("c1").await.len(), 2);
}

#[tokio::test]
async fn test_directive_only_reply_sends_no_text() {
    let h = harness(StubProvider::replying("[MUTE]"));

    h.gateway
        .handle_message(IncomingMessage::new("c1", "تعصبت"))
        .await;

    assert!(h.channel.texts.lock().await.is_empty());
    assert!(h.gateway.sessions.is_muted("c1").await);
    // The pair is still appended, with an empty assistant turn.
    let history = h.gateway.sessions.history("c1").await;
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].content, "");
}
