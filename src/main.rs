//! Dukkan — a wholesale sales agent for Facebook Messenger, grounded in a
//! live Google Sheet product catalog.

mod directives;
mod gateway;

use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand};
use dukkan_catalog::SheetCatalog;
use dukkan_channels::{messenger::MessengerChannel, orders::WebhookOrderRecorder};
use dukkan_core::{
    config::{self, Config},
    context::{Context, SamplingConfig},
    traits::{CatalogSource, Channel, OrderRecorder, Provider},
};
use dukkan_providers::{anthropic::AnthropicProvider, groq::GroqProvider};
use dukkan_sessions::SessionStore;
use gateway::Gateway;
use std::sync::Arc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dukkan", version, about = "Catalog-grounded sales agent for Messenger")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the agent (webhook server plus message pipeline)
    Start,
    /// Show configuration readiness without starting anything
    Status,
    /// Ask the model one question from the terminal, grounded in the
    /// current catalog; directives are printed, not executed
    Ask {
        #[arg(trailing_var_arg = true, required = true)]
        message: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cfg = config::load(&cli.config)?;

    match cli.command {
        Commands::Start => start(cfg).await,
        Commands::Status => status(cfg).await,
        Commands::Ask { message } => ask(cfg, message.join(" ")).await,
    }
}

async fn start(cfg: Config) -> Result<()> {
    let messenger_cfg = cfg
        .channel
        .messenger
        .clone()
        .filter(|m| m.enabled)
        .ok_or_else(|| anyhow!("messenger channel is not enabled in the configuration"))?;
    if messenger_cfg.page_access_token.is_empty() {
        bail!("missing Messenger page access token (set PAGE_ACCESS_TOKEN or [channel.messenger] page_access_token)");
    }
    if messenger_cfg.verify_token.is_empty() {
        bail!("missing webhook verify token (set VERIFY_TOKEN or [channel.messenger] verify_token)");
    }

    if cfg.catalog.sheet_url.is_empty() {
        warn!("no catalog sheet URL configured, replies will not be grounded in a product list");
    }

    let provider = build_provider(&cfg);
    let channel: Arc<dyn Channel> = Arc::new(MessengerChannel::new(messenger_cfg));
    let catalog: Arc<dyn CatalogSource> = Arc::new(SheetCatalog::from_config(&cfg.catalog));
    let sessions = Arc::new(SessionStore::new(cfg.session.max_turn_pairs));
    let recorder = WebhookOrderRecorder::from_config(&cfg.orders)
        .map(|r| Arc::new(r) as Arc<dyn OrderRecorder>);
    if recorder.is_none() {
        warn!("no orders webhook configured, captured orders will be dropped");
    }

    let gateway = Arc::new(Gateway::new(
        provider,
        channel,
        catalog,
        sessions,
        recorder,
        cfg.persona.clone(),
    ));
    gateway.run().await
}

async fn status(cfg: Config) -> Result<()> {
    println!("{} status", cfg.dukkan.name);

    match build_provider(&cfg) {
        Some(provider) => {
            let reachable = provider.is_available().await;
            println!(
                "  provider:  {} ({})",
                provider.name(),
                if reachable { "reachable" } else { "unreachable" }
            );
        }
        None => println!("  provider:  not configured (maintenance mode)"),
    }

    match cfg.channel.messenger.as_ref().filter(|m| m.enabled) {
        Some(m) => println!(
            "  messenger: enabled, token {}, verify token {}, binds {}",
            if m.page_access_token.is_empty() { "missing" } else { "set" },
            if m.verify_token.is_empty() { "missing" } else { "set" },
            m.bind_addr
        ),
        None => println!("  messenger: disabled"),
    }

    if cfg.catalog.sheet_url.is_empty() {
        println!("  catalog:   no sheet URL");
    } else {
        println!("  catalog:   {}", cfg.catalog.sheet_url);
    }

    if cfg.orders.webhook_url.is_empty() {
        println!("  orders:    no sink (orders dropped)");
    } else {
        println!("  orders:    {}", cfg.orders.webhook_url);
    }

    println!("  sessions:  {} turn-pair history bound", cfg.session.max_turn_pairs);
    Ok(())
}

/// One-shot terminal exchange: fetch the catalog, compose the prompt, call
/// the model once, and print the cleaned reply plus any directives.
async fn ask(cfg: Config, message: String) -> Result<()> {
    let provider = build_provider(&cfg)
        .ok_or_else(|| anyhow!("no provider configured, set GROQ_API_KEY or [provider.groq] api_key"))?;

    let catalog = SheetCatalog::from_config(&cfg.catalog);
    let snapshot = catalog.fetch().await;

    let context = Context {
        system_prompt: gateway::compose_system_prompt(&cfg.persona.policy, &snapshot),
        history: Vec::new(),
        current_message: message,
        sampling: SamplingConfig {
            temperature: cfg.persona.temperature,
            max_tokens: cfg.persona.max_tokens,
        },
    };

    let reply = provider.complete(&context).await?;
    let (cleaned, extracted) = directives::parse(&reply.text);

    println!("{cleaned}");
    for directive in extracted {
        match directive {
            directives::Directive::Mute => println!("[directive] mute session"),
            directives::Directive::Image(url) => println!("[directive] send image {url}"),
            directives::Directive::SaveOrder(order) => println!(
                "[directive] save order: {} | {} | {}",
                order.name, order.order, order.phone
            ),
        }
    }
    Ok(())
}

/// Build the configured provider, or `None` (maintenance mode) when the
/// selected provider is disabled or has no API key.
fn build_provider(cfg: &Config) -> Option<Arc<dyn Provider>> {
    match cfg.provider.default.as_str() {
        "groq" => match cfg.provider.groq.as_ref().filter(|g| g.enabled) {
            Some(groq) if !groq.api_key.is_empty() => {
                Some(Arc::new(GroqProvider::from_config(groq)) as Arc<dyn Provider>)
            }
            Some(_) => {
                warn!("groq selected but GROQ_API_KEY is missing, running in maintenance mode");
                None
            }
            None => {
                warn!("groq selected but not enabled, running in maintenance mode");
                None
            }
        },
        "anthropic" => match cfg.provider.anthropic.as_ref().filter(|a| a.enabled) {
            Some(anthropic) if !anthropic.api_key.is_empty() => {
                Some(Arc::new(AnthropicProvider::from_config(anthropic)) as Arc<dyn Provider>)
            }
            Some(_) => {
                warn!("anthropic selected but ANTHROPIC_API_KEY is missing, running in maintenance mode");
                None
            }
            None => {
                warn!("anthropic selected but not enabled, running in maintenance mode");
                None
            }
        },
        other => {
            warn!("unknown provider '{other}', running in maintenance mode");
            None
        }
    }
}
