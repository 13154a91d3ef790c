use std::{error::Error, sync::Arc};

use postboard::{
    InMemoryPostRepository, PostService, PostgresPostRepository, RepositoryState,
    config::{AppConfig, StorageBackend},
    db,
    rpc::rpc_router,
    shutdown, telemetry,
};
use tokio::net::TcpListener;

/// main
///
/// Post service entry point: owns the id allocator and the post repository
/// and serves them over the JSON RPC routes.
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    dotenv::dotenv().ok();
    let config = AppConfig::load()?;

    telemetry::init_tracing(config.env);
    tracing::info!("Post service starting in {:?} mode", config.env);

    let repo: RepositoryState = match &config.storage {
        StorageBackend::Postgres { url } => {
            let pool = db::connect_with_retry(url, config.db_retry).await?;
            let repo = PostgresPostRepository::new(pool);
            repo.ensure_schema().await?;
            Arc::new(repo)
        }
        StorageBackend::Memory => {
            tracing::warn!("Posts are kept in memory and lost on restart");
            Arc::new(InMemoryPostRepository::new())
        }
    };

    let service = if config.seed_ids_from_store {
        PostService::seeded_from_store(repo, config.storage_deadline).await?
    } else {
        PostService::new(repo, config.storage_deadline)
    };

    let app = telemetry::with_observability(rpc_router(Arc::new(service)));

    let listener = TcpListener::bind(&config.post_service_addr).await?;
    tracing::info!("Listening on {}", config.post_service_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown::shutdown_signal())
        .await?;

    tracing::info!("Post service stopped");
    Ok(())
}
