use std::sync::Arc;

use outreach_engine::channels::{ChannelSet, EmailChannel, NetworkMessageChannel};
use outreach_engine::config::Config;
use outreach_engine::crm::{CrmApi, HttpCrmClient};
use outreach_engine::orchestrator::Orchestrator;
use outreach_engine::pacing::RateLimiter;
use outreach_engine::server::{AppState, api_routes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = Config::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    });

    let crm: Arc<dyn CrmApi> = Arc::new(HttpCrmClient::new(&config.crm)?);

    let mut channels = ChannelSet::new();
    if let Some(email) = &config.email {
        channels.register(Arc::new(EmailChannel::new(email.clone())));
    }
    if let Some(network) = &config.network {
        channels.register(Arc::new(NetworkMessageChannel::from_session_file(network)?));
    }
    if channels.available().is_empty() {
        eprintln!("Error: no channel configured");
        eprintln!("  set SMTP_HOST (email) and/or NETWORK_SESSION_PATH (network messages)");
        std::process::exit(1);
    }

    let limiter = RateLimiter::new(config.pacing.min_delay, config.pacing.max_delay)?;
    let orchestrator = Arc::new(Orchestrator::new(
        Arc::clone(&crm),
        channels,
        limiter,
        config.send_timeout,
    ));

    eprintln!("📣 Outreach Engine v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   CRM: {}", config.crm.base_url);
    eprintln!(
        "   Channels: {}",
        orchestrator
            .channels()
            .available()
            .iter()
            .map(|k| k.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    eprintln!("   API: http://{}\n", config.bind_addr);

    let app = api_routes(AppState { crm, orchestrator });
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "API server started");
    axum::serve(listener, app).await?;

    Ok(())
}
