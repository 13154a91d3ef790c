use std::{error::Error, sync::Arc};

use postboard::{
    AppState, CredentialState, InMemoryCredentialStore, PostgresCredentialStore,
    RemotePostBackend, TokenIssuer,
    config::{AppConfig, StorageBackend},
    create_router, db, shutdown, telemetry,
};
use tokio::net::TcpListener;

/// main
///
/// Gateway entry point: configuration, logging, signing keys, the credential
/// store and the post service client, then the HTTP server.
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    // 1. Configuration (fail-fast)
    dotenv::dotenv().ok();
    let config = AppConfig::load()?;

    // 2. Logging
    telemetry::init_tracing(config.env);
    tracing::info!("Gateway starting in {:?} mode", config.env);

    // 3. Signing keys
    let tokens = Arc::new(TokenIssuer::from_pem_files(
        &config.jwt_private_key_path,
        &config.jwt_public_key_path,
    )?);

    // 4. Credential store
    let accounts: CredentialState = match &config.storage {
        StorageBackend::Postgres { url } => {
            let pool = db::connect_with_retry(url, config.db_retry).await?;
            let store = PostgresCredentialStore::new(pool, config.storage_deadline);
            store.ensure_schema().await?;
            Arc::new(store)
        }
        StorageBackend::Memory => {
            tracing::warn!("Accounts are kept in memory and lost on restart");
            Arc::new(InMemoryCredentialStore::new())
        }
    };

    // 5. Post service client
    let posts = Arc::new(RemotePostBackend::new(
        &config.post_service_url,
        config.rpc_deadline,
    )?);
    tracing::info!(url = %config.post_service_url, "Post service client ready");

    // 6. Router and server
    let addr = config.gateway_addr.clone();
    let app = create_router(AppState {
        accounts,
        posts,
        tokens,
        config,
    });

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {addr}");
    tracing::info!("API Documentation (Swagger UI) available at: http://{addr}/swagger-ui");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown::shutdown_signal())
        .await?;

    tracing::info!("Gateway stopped");
    Ok(())
}
