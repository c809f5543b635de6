//! HTTP surface: shared state, error mapping and the router.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    response::{IntoResponse, Response},
    routing::{get, post},
};

use crate::{
    api::storage::{ArchiveOptions, ObjectStore},
    config::AppConfig,
    db_utils::qlever_utils::QueryService,
    error::CatalogError,
};

pub mod batch_files;
pub mod campaigns;
pub mod download_archive;
pub mod search;

#[derive(Debug, Clone)]
pub struct HandlerSettings {
    pub fanout_concurrency: usize,
    pub presign_ttl_secs: u32,
    pub campaign_depth: usize,
    pub archive: ArchiveOptions,
}

impl Default for HandlerSettings {
    fn default() -> Self {
        Self { fanout_concurrency: 16, presign_ttl_secs: 300, campaign_depth: 5, archive: ArchiveOptions::default() }
    }
}

impl HandlerSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            fanout_concurrency: config.fanout_concurrency,
            presign_ttl_secs: config.presign_ttl_secs,
            campaign_depth: config.campaign_depth,
            archive: ArchiveOptions::from_config(config),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ObjectStore>,
    pub query_service: Arc<dyn QueryService>,
    pub settings: HandlerSettings,
}

/// Logs a failed request and turns the error into a plain-text response.
pub(crate) fn error_response(handler: &str, e: CatalogError) -> Response {
    if e.status_code().is_server_error() {
        tracing::error!("{}: request failed: {:#?}", handler, e);
    } else {
        tracing::info!("{}: request rejected: {}", handler, e);
    }
    (e.status_code(), Body::from(e.to_string())).into_response()
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/search", post(search::post_search).get(search::get_search))
        .route("/api/search/count", get(search::get_search_count))
        .route("/api/search/options", get(search::get_search_options))
        .route("/api/campaigns", get(campaigns::get_campaigns))
        .route("/api/folders", get(campaigns::get_folders))
        .route("/api/batch/{year}/{month}/{day}/{nr}", get(batch_files::get_batch_files))
        .route("/api/batch/{year}/{month}/{day}/{nr}/download", get(download_archive::download_batch))
        .route("/api/download", get(download_archive::download_prefix))
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod test_support {
    use axum::{
        body::{Body, to_bytes},
        http::{Request, Response},
    };
    use tower::ServiceExt;

    use super::*;
    use crate::{
        api::storage::memory_store::MemoryObjectStore,
        db_utils::static_query_service::StaticQueryService,
    };

    pub fn batch_store() -> MemoryObjectStore {
        let store = MemoryObjectStore::new();
        store.insert("batch/2024/05/16/24/108-A1-Agilent.json", "{\"peaks\": []}");
        store.insert("batch/2024/05/16/24/raw/trace.csv", "t,v\n0,1\n");
        store.insert("batch/2024/05/16/25/109-B2.json", "{}");
        store.insert("batch/2024/05/17/", "");
        store
    }

    pub fn state(store: MemoryObjectStore, service: StaticQueryService) -> AppState {
        AppState { store: Arc::new(store), query_service: Arc::new(service), settings: HandlerSettings::default() }
    }

    pub async fn send(state: AppState, request: Request<Body>) -> (Response<Body>, Vec<u8>) {
        let response = router(state).oneshot(request).await.map_err(|err| match err {}).unwrap();
        let (parts, body) = response.into_parts();
        let bytes = to_bytes(body, 16 * 1024 * 1024).await.unwrap();
        (Response::from_parts(parts, Body::empty()), bytes.to_vec())
    }

    pub fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }
}
