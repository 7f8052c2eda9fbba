use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ideaboard_client::config::Config;
use ideaboard_client::gateway::HttpGateway;
use ideaboard_client::Client;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_span_list(false),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "ideaboard-client starting"
    );

    // Load configuration
    let config = Config::load()?;
    info!(base_url = %config.api.base_url, "Loaded configuration");

    let gateway = Arc::new(HttpGateway::new(&config)?);
    let client = Client::new(config, gateway);

    // Resolve the initial session: authenticated, or guest
    client.bootstrap().await;
    let state = client.session.snapshot();
    info!(status = ?state.status, "Session settled");
    if let Some(error) = &state.error {
        info!(error = %error, "Bootstrap diagnostic");
    }

    if state.is_authenticated() {
        let count = client.ideas.load().await?;
        info!(count, "Ideas loaded");
        for idea in client.ideas.ideas() {
            info!(id = %idea.id, status = ?idea.status, votes = idea.vote_count, "{}", idea.title);
        }
    }

    client.shutdown();
    Ok(())
}
