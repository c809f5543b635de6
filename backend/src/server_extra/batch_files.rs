use axum::{
    Json,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use common::object_listing::ObjectRecordWithUrl;
use serde::{Deserialize, Serialize};

use crate::{
    api::storage::{
        campaign_folders::{batch_prefix, campaign_date, prefix_to_url_path},
        download_urls::add_download_urls,
    },
    error::{CatalogError, Result},
    server_extra::{AppState, error_response},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchFiles {
    pub prefix: String,
    pub url_path: String,
    pub date: Option<String>,
    pub files: Vec<ObjectRecordWithUrl>,
}

async fn _get_batch_files(state: &AppState, (year, month, day, nr): (String, String, String, String)) -> Result<BatchFiles> {
    let prefix = batch_prefix(&year, &month, &day, &nr)?;
    tracing::info!("Listing batch files: {}", prefix);
    let records = state
        .store
        .list_objects(&prefix)
        .await?
        .into_iter()
        .filter(|record| !record.name().is_empty() && record.size > 0)
        .collect::<Vec<_>>();
    if records.is_empty() {
        return Err(CatalogError::NotFound(format!("no files under {prefix}")));
    }
    let files = add_download_urls(
        state.store.as_ref(),
        records,
        state.settings.presign_ttl_secs,
        state.settings.fanout_concurrency,
    )
    .await;
    Ok(BatchFiles { url_path: prefix_to_url_path(&prefix), date: campaign_date(&prefix), prefix, files })
}

pub async fn get_batch_files(State(state): State<AppState>, Path(segments): Path<(String, String, String, String)>) -> Response {
    match _get_batch_files(&state, segments).await {
        Ok(files) => Json(files).into_response(),
        Err(e) => error_response("get_batch_files", e),
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use super::*;
    use crate::{
        db_utils::static_query_service::StaticQueryService,
        server_extra::test_support::{batch_store, get_request, send, state},
    };

    #[tokio::test]
    async fn lists_files_with_links() {
        let state = state(batch_store(), StaticQueryService::new());
        let (response, bytes) = send(state, get_request("/api/batch/2024/05/16/24")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let batch: BatchFiles = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(batch.url_path, "batch/2024-05-16-24");
        assert_eq!(batch.date.as_deref(), Some("2024/05/16"));
        assert_eq!(batch.files.len(), 2);
        assert_eq!(batch.files[0].name, "108-A1-Agilent.json");
        assert!(batch.files.iter().all(|file| file.presigned_url.is_some()));
    }

    #[tokio::test]
    async fn empty_batches_are_not_found() {
        let state = state(batch_store(), StaticQueryService::new());
        let (response, _) = send(state.clone(), get_request("/api/batch/2024/05/17/01")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let (response, _) = send(state, get_request("/api/batch/2024/05/16/..")).await;
        assert_ne!(response.status(), StatusCode::OK);
    }
}
