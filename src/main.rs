use std::sync::Arc;

use reel_feed::{
    api::{create_router, AppState},
    config::Config,
    db::{self, Cache, CacheWriterHandle, PgRepository},
    services::{
        providers::{CatalogSource, SocialverseClient},
        FeedService, FeedSettings, LinearScanRanker, SyncService,
    },
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;
    let repository = Arc::new(PgRepository::new(pool));

    let (cache, cache_writer) = build_cache(&config);

    let source = SocialverseClient::from_config(&config)?;
    if !source.has_token() {
        tracing::warn!("FLIC_TOKEN not set, upstream requests are unauthenticated");
    }
    let source: Arc<dyn CatalogSource> = Arc::new(source);

    let feed_service = FeedService::new(
        repository.clone(),
        Arc::new(LinearScanRanker),
        cache,
        FeedSettings::from(&config),
    );
    let sync_service = SyncService::new(source, repository);

    let app = create_router(AppState::new(feed_service, sync_service));

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    tracing::info!(addr = %config.bind_addr(), "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = cache_writer {
        handle.shutdown().await;
    }

    tracing::info!("Server stopped");
    Ok(())
}

/// Builds the feed cache, or none when caching is off or the URL is unusable
fn build_cache(config: &Config) -> (Option<Cache>, Option<CacheWriterHandle>) {
    if !config.cache_enabled {
        tracing::info!("Feed cache disabled");
        return (None, None);
    }

    match db::create_redis_client(&config.redis_url) {
        Ok(client) => {
            let (cache, handle) = Cache::new(client);
            (Some(cache), Some(handle))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Invalid Redis URL, running without feed cache");
            (None, None)
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
