use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pixedge::{
    api,
    bot::BotClient,
    config::Config,
    kv::{self, Kv},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    match log_format.to_lowercase().as_str() {
        "gcp" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_stackdriver::layer())
                .init();
        }
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

    info!(version = env!("CARGO_PKG_VERSION"), "pixedge starting");

    // Load configuration
    let config = Config::load()?;

    // Initialize the key-value store
    let store: Arc<dyn Kv> = match &config.redis_url {
        Some(url) => {
            let store = kv::RedisKv::connect(url).await?;
            info!("Connected to redis");
            Arc::new(store)
        }
        None => {
            tracing::warn!("No REDIS_URL configured; running with the no-op store");
            Arc::new(kv::NoopKv)
        }
    };

    // Initialize the bot client when a token is configured
    let bot = config
        .telegram
        .bot_token
        .clone()
        .map(|token| BotClient::new(&config.telegram, token));
    if bot.is_some() {
        info!("Telegram bot enabled");
    } else {
        tracing::warn!("No TELEGRAM_BOT_TOKEN configured; webhook and uploads are disabled");
    }

    // Create shared state
    let state = Arc::new(AppState::new(config, store, bot));

    // Build and start the HTTP server
    let app = api::create_router(Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind(&state.config.bind_address).await?;
    info!("Listening on: {}", state.config.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}
