mod api;
mod catalog;
mod catalog_manager;
mod config;
mod discoverer;
mod error;
mod openapi;
mod registry;
mod transform;
#[cfg(test)]
mod test_support;

use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use anyhow::{Context, Result};
use crate::api::discover::DiscoverRoutes;
use crate::catalog_manager::CatalogHandle;
use crate::config::Config;
use crate::discoverer::{Discoverer, IgnoreList};
use crate::openapi::fetch::HttpSpecFetcher;
use crate::openapi::policy::PolicySource;
use crate::registry::static_registry::StaticRegistry;
use crate::transform::Pipeline;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("spec_discoverd=info"))
        )
        .init();

    tracing::info!("Starting spec-discoverd");

    // Load config
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/etc/spec-discover/discoverd.toml".to_string());

    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path))?;

    tracing::info!("Loaded config from {}", config_path);

    // Start catalog thread
    let (hash_tx, hash_rx) = watch::channel(catalog::hash::compute_hash(&[]));
    let catalog = CatalogHandle::spawn(hash_tx);

    let fetcher = HttpSpecFetcher::new(config.discovery.spec_load_timeout())?;
    let policy = match &config.specs.rewrites {
        Some(location) if !location.is_empty() => {
            tracing::info!("Loading rewrites from {} each cycle", location);
            let http = reqwest::Client::builder()
                .timeout(config.discovery.spec_load_timeout())
                .build()
                .context("Failed to create HTTP client")?;
            Some(PolicySource::new(location.clone(), http))
        }
        _ => None,
    };

    let discoverer = Arc::new(Discoverer::new(
        catalog.clone(),
        Arc::new(fetcher),
        policy,
        Pipeline::new(config.specs.dir.clone(), config.specs.groupings.clone()),
        IgnoreList::new(config.discovery.ignore.clone()),
    ));

    // Start watching the registry; returns after the initial sync and first cycle
    let watcher = StaticRegistry::from_config(&config.discovery, &config.registry);
    tracing::info!("Watching namespace {:?}", config.discovery.namespace);
    let discovery_tasks = discoverer.run(Box::new(watcher)).await;

    // Build API router
    let discover_routes = DiscoverRoutes::new(&config.specs.rewrite_urls, &config.site.url)
        .context("Invalid rewrite_urls")?;
    let app_state = api::routes::AppState {
        discoverer: discoverer.clone(),
        hash_rx,
    };
    let specs = discoverer.specs();
    if specs.is_empty() {
        tracing::warn!("No API specs discovered at startup; none will be served until restart");
    }
    let app = api::routes::router(app_state).merge(discover_routes.register(&specs));
    tracing::info!("Serving {} discovered specs", discover_routes.routes().len());

    // Bind HTTP server
    let listener = tokio::net::TcpListener::bind(&config.api.listen)
        .await
        .with_context(|| format!("Failed to bind to {}", config.api.listen))?;

    tracing::info!("API listening on {}", config.api.listen);

    // Run server with graceful shutdown
    let cancel = CancellationToken::new();
    let server_cancel = cancel.clone();
    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async move { server_cancel.cancelled().await })
            .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutdown signal received");

    cancel.cancel();
    discoverer.shutdown();

    // Wait for all tasks to complete
    let _ = tokio::join!(discovery_tasks.join(), server_handle);

    // Shutdown catalog thread
    if let Err(e) = catalog.shutdown().await {
        tracing::error!("Failed to shutdown catalog: {}", e);
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
