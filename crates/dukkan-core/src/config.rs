use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::error::DukkanError;

/// Top-level Dukkan configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub dukkan: AppConfig,
    #[serde(default)]
    pub persona: PersonaConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub channel: ChannelConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub orders: OrdersConfig,
}

/// General agent settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            log_level: default_log_level(),
        }
    }
}

/// Persona policy and the fixed degraded-mode texts.
///
/// The policy is the static default unless the catalog carries a remote
/// override. Temperature and token budget are per-persona knobs, not
/// provider constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaConfig {
    /// Persona/policy text injected as the head of the system instruction.
    #[serde(default = "default_policy")]
    pub policy: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Sent when the model port fails (timeout, quota, network).
    #[serde(default = "default_apology")]
    pub apology: String,
    /// Sent for every message when no provider credential is configured.
    #[serde(default = "default_maintenance")]
    pub maintenance: String,
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            policy: default_policy(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            apology: default_apology(),
            maintenance: default_maintenance(),
        }
    }
}

/// Provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_provider")]
    pub default: String,
    pub groq: Option<GroqConfig>,
    pub anthropic: Option<AnthropicConfig>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            default: default_provider(),
            groq: Some(GroqConfig::default()),
            anthropic: None,
        }
    }
}

/// Groq provider config (OpenAI-compatible chat completions).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroqConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_groq_model")]
    pub model: String,
    #[serde(default = "default_groq_base_url")]
    pub base_url: String,
    /// Request timeout in seconds; a timed-out call is a transport failure.
    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,
}

impl Default for GroqConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: String::new(),
            model: default_groq_model(),
            base_url: default_groq_base_url(),
            timeout_secs: default_provider_timeout(),
        }
    }
}

/// Anthropic API provider config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_anthropic_model")]
    pub model: String,
    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,
}

/// Channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChannelConfig {
    pub messenger: Option<MessengerConfig>,
}

/// Facebook Messenger channel config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessengerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Page access token for the Graph API.
    #[serde(default)]
    pub page_access_token: String,
    /// Secret matched against `hub.verify_token` during the webhook
    /// verification handshake.
    #[serde(default)]
    pub verify_token: String,
    /// Address the webhook server binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_graph_version")]
    pub graph_api_version: String,
}

impl Default for MessengerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            page_access_token: String::new(),
            verify_token: String::new(),
            bind_addr: default_bind_addr(),
            graph_api_version: default_graph_version(),
        }
    }
}

/// Catalog source config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// CSV export URL of the product sheet.
    #[serde(default)]
    pub sheet_url: String,
    /// Optional plain-text URL whose body overrides the persona policy.
    #[serde(default)]
    pub policy_url: Option<String>,
    #[serde(default = "default_catalog_timeout")]
    pub timeout_secs: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            sheet_url: String::new(),
            policy_url: None,
            timeout_secs: default_catalog_timeout(),
        }
    }
}

/// Session store config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// History bound in turn-pairs; `len(history) <= 2 * max_turn_pairs`.
    #[serde(default = "default_max_turn_pairs")]
    pub max_turn_pairs: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_turn_pairs: default_max_turn_pairs(),
        }
    }
}

/// Order recording sink config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrdersConfig {
    /// Webhook URL that receives captured orders as JSON. Empty = orders
    /// are dropped with a log line.
    #[serde(default)]
    pub webhook_url: String,
    #[serde(default = "default_catalog_timeout")]
    pub timeout_secs: u64,
}

impl Default for OrdersConfig {
    fn default() -> Self {
        Self {
            webhook_url: String::new(),
            timeout_secs: default_catalog_timeout(),
        }
    }
}

// --- Default value functions ---

fn default_name() -> String {
    "Dukkan".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_provider() -> String {
    "groq".to_string()
}
fn default_true() -> bool {
    true
}
fn default_groq_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}
fn default_groq_base_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}
fn default_anthropic_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}
fn default_provider_timeout() -> u64 {
    30
}
fn default_catalog_timeout() -> u64 {
    10
}
fn default_bind_addr() -> String {
    "0.0.0.0:10000".to_string()
}
fn default_graph_version() -> String {
    "v18.0".to_string()
}
fn default_max_turn_pairs() -> usize {
    4
}
fn default_temperature() -> f32 {
    0.3
}
fn default_max_tokens() -> u32 {
    200
}
fn default_apology() -> String {
    "اسمحلنا خويا، كاين ضغط، عاود ابعثلي.".to_string()
}
fn default_maintenance() -> String {
    "السيرفر في حالة صيانة، دقيقة ونرجعو.".to_string()
}

/// Default wholesale-trader persona, including the directive grammar the
/// model must use to trigger side effects.
fn default_policy() -> String {
    "أنت 'أمين'، مسير مبيعات في ورشة بيع بالجملة.\n\
     \n\
     شخصيتك:\n\
     - تاجر جملة محترف، ولد فاميليا، تتكلم بالدارجة فقط، ممنوع الفصحى.\n\
     - بدل \"السعر هو\" قل: \"سومتها\"، \"نحسبوهالك بـ\".\n\
     - بدل \"مرحباً\" قل: \"واش خويا\"، \"السلام عليكم\".\n\
     \n\
     القواعد:\n\
     1. بيع بالجملة فقط. ارفض التجزئة بأدب: \"الورشة تبيع غير السيري\".\n\
     2. جاوب فقط على المنتج المطلوب من القائمة تحت.\n\
     3. إذا طلب الزبون صورة منتج وعنده رابط، ضع الرابط في نهاية ردك بعد الكلمة IMAGE:.\n\
     4. إذا طلب الزبون يحكي مع صاحب المحل أو تعصب، اعتذر له وأضف [MUTE] في آخر ردك.\n\
     5. إذا أكد الزبون طلبية وأعطاك اسمه وهاتفه، سجلها في آخر ردك هكذا: ||SAVE||الاسم|الطلبية|الهاتف||"
        .to_string()
}

/// Load configuration from a TOML file.
///
/// A missing file is not an error — full defaults are used so the bot can
/// run entirely from environment variables (the original deployment
/// model). Empty credential fields are backfilled from the environment
/// afterwards.
pub fn load(path: &str) -> Result<Config, DukkanError> {
    let path = Path::new(path);
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DukkanError::Config(format!("failed to read {}: {e}", path.display())))?;
        toml::from_str(&content)
            .map_err(|e| DukkanError::Config(format!("failed to parse config: {e}")))?
    } else {
        info!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        Config {
            channel: ChannelConfig {
                messenger: Some(MessengerConfig::default()),
            },
            ..Default::default()
        }
    };

    apply_env_overrides(&mut config);
    Ok(config)
}

/// Backfill empty credential/URL fields from environment variables.
///
/// Env never overrides a value set explicitly in the file.
fn apply_env_overrides(config: &mut Config) {
    fn fill(slot: &mut String, var: &str) {
        if slot.is_empty() {
            if let Ok(v) = std::env::var(var) {
                if !v.is_empty() {
                    *slot = v;
                }
            }
        }
    }

    if let Some(ref mut groq) = config.provider.groq {
        fill(&mut groq.api_key, "GROQ_API_KEY");
    }
    if let Some(ref mut anthropic) = config.provider.anthropic {
        fill(&mut anthropic.api_key, "ANTHROPIC_API_KEY");
    }
    if let Some(ref mut messenger) = config.channel.messenger {
        fill(&mut messenger.page_access_token, "PAGE_ACCESS_TOKEN");
        fill(&mut messenger.verify_token, "VERIFY_TOKEN");
    }
    fill(&mut config.catalog.sheet_url, "SHEET_URL");
    fill(&mut config.orders.webhook_url, "ORDERS_WEBHOOK_URL");
}
