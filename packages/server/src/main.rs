use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::http::{HeaderValue, Method, header};
use common::storage::ObjectStore;
use common::storage::filesystem::FilesystemObjectStore;
use common::storage::s3_store::S3ObjectStore;
use mq::{MqConfig, init_mq};
use tower_http::cors::CorsLayer;
use tracing::{Level, info, warn};

use pipeline_server::config::{AppConfig, StorageBackend};
use pipeline_server::dispatch::{JudgeDispatcher, MqDispatcher};
use pipeline_server::state::AppState;
use pipeline_server::{build_router, database, seed};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let config = AppConfig::load().context("Failed to load config")?;

    let db = database::init_db(&config.database.url)
        .await
        .context("Failed to connect to database")?;
    seed::ensure_indexes(&db)
        .await
        .context("Failed to ensure indexes")?;

    let store = build_store(&config).await?;
    let dispatcher = build_dispatcher(&config).await;

    let cors = cors_layer(&config)?;
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let state = AppState {
        db,
        config,
        store,
        dispatcher,
    };
    let app = build_router(state).layer(cors);

    info!("Server running at http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn build_store(config: &AppConfig) -> anyhow::Result<Arc<dyn ObjectStore>> {
    let storage = &config.storage;
    match storage.backend {
        StorageBackend::Filesystem => {
            let store = FilesystemObjectStore::new(storage.root.clone(), storage.max_object_size)
                .await
                .context("Failed to initialize filesystem object store")?;
            info!(root = %storage.root.display(), "Using filesystem object store");
            Ok(Arc::new(store))
        }
        StorageBackend::S3 => {
            let settings = storage
                .s3
                .as_ref()
                .context("storage.s3 must be set when storage.backend = \"s3\"")?;
            let store = S3ObjectStore::new(settings, storage.max_object_size)
                .context("Failed to initialize S3 object store")?;
            info!(endpoint = %settings.endpoint, "Using S3 object store");
            Ok(Arc::new(store))
        }
    }
}

/// The server still starts without a queue; submissions are then refused
/// with `JUDGE_UNAVAILABLE` while configuration and testdata stay usable.
async fn build_dispatcher(config: &AppConfig) -> Option<Arc<dyn JudgeDispatcher>> {
    if !config.mq.enabled {
        warn!("MQ disabled, submissions will be rejected");
        return None;
    }
    match init_mq(MqConfig {
        url: config.mq.url.clone(),
        pool_size: config.mq.pool_size,
    })
    .await
    {
        Ok(mq) => {
            info!(queue_name = %config.mq.queue_name, "MQ connected");
            Some(Arc::new(MqDispatcher::new(mq, config.mq.queue_name.clone())))
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to MQ, submissions will be rejected");
            None
        }
    }
}

fn cors_layer(config: &AppConfig) -> anyhow::Result<CorsLayer> {
    let origins = config
        .server
        .cors
        .allow_origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin).with_context(|| format!("Invalid CORS origin '{origin}'"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PATCH])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(Duration::from_secs(config.server.cors.max_age)))
}
