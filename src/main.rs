use anyhow::Result;
use clap::Parser;
use redisflare::auth::AuthRegistry;
use redisflare::config::ServerConfig;
use redisflare::server;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = ServerConfig::parse();

    // 1. Tokens:
    let auth = AuthRegistry::from_config(&config);
    if auth.is_empty() {
        tracing::warn!("No valid auth token configured, every request will be refused with 503");
    } else {
        tracing::info!(
            "Configured tokens: master={} public={}",
            config.master_token.as_deref().is_some_and(|t| !t.is_empty()),
            config.public_token.as_deref().is_some_and(|t| !t.is_empty())
        );
    }

    // 2. Storage layer:
    let storage = server::open_storage(&config).await?;
    tracing::info!("Storage backend: {:?}", config.backend);

    // 3. HTTP Router:
    let app = server::app(storage, auth);

    // 4. Start HTTP server:
    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Redisflare listening on http://{}", listener.local_addr()?);
    tracing::info!("Press Ctrl+C to shutdown");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
