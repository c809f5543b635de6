//! Backend server entry point.

use std::sync::Arc;

use anyhow::Context;
use backend::{
    api::storage::minio_store::MinioObjectStore,
    config::AppConfig,
    db_utils::qlever_utils::QleverClient,
    observability::{LogFormat, init_logging},
    server_extra::{AppState, HandlerSettings, router},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging(LogFormat::from_env());

    let config = AppConfig::from_env().context("Failed to load configuration")?;
    let store = MinioObjectStore::from_settings(&config.s3)?;
    let query_service = QleverClient::new(config.qlever_api_url.clone(), config.qlever_timeout)
        .context("Failed to create query service client")?;

    let state = AppState {
        store: Arc::new(store),
        query_service: Arc::new(query_service),
        settings: HandlerSettings::from_config(&config),
    };
    let app = router(state).layer(axum::middleware::from_fn(
        |request: axum::extract::Request, next: axum::middleware::Next| async move {
            let method = request.method().clone();
            let path = request.uri().path().to_string();
            let t0 = std::time::Instant::now();
            let response = next.run(request).await;
            tracing::info!("{} {} -> {} ({}ms)", method, path, response.status(), t0.elapsed().as_millis());
            response
        },
    ));

    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address))?;
    tracing::info!("Listening on {}", config.bind_address);
    axum::serve(listener, app).await.context("Server failed")?;
    Ok(())
}
