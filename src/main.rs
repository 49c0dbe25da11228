use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storyhub::config::Config;
use storyhub::query::StoryQuery;
use storyhub::routes::{self, AppState};
use storyhub::scheduler::{build_collectors, Scheduler, SchedulerSettings};
use storyhub::store::StoryStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storyhub=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path =
        std::env::var("STORYHUB_CONFIG").unwrap_or_else(|_| "stories.toml".to_string());
    let config = if std::path::Path::new(&config_path).exists() {
        Config::load(&config_path)?
    } else {
        info!("No config at {}, using defaults", config_path);
        Config::default()
    };

    let store = Arc::new(StoryStore::new());
    let collectors = build_collectors(&config);
    info!("Collecting from {} sources", collectors.len());

    let scheduler = Arc::new(Scheduler::new(
        collectors,
        store.clone(),
        SchedulerSettings::from(&config),
    ));

    let shutdown = CancellationToken::new();

    // Start background refresh task
    let refresh = {
        let scheduler = scheduler.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move { scheduler.run(shutdown).await })
    };

    // Stop everything on Ctrl-C
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutting down");
            shutdown.cancel();
        });
    }

    let state = Arc::new(AppState {
        query: StoryQuery::new(store),
        scheduler,
    });
    let app = routes::router(state);

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Server starting on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.clone().cancelled_owned())
        .await?;

    refresh.await?;
    Ok(())
}
