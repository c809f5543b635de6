use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::info;

use crate::{
    api::storage::{campaign_folders::{batch_prefix, zip_file_name}, stream_archive_for_prefix},
    error::{CatalogError, Result},
    server_extra::{AppState, error_response},
};

#[derive(Debug, Deserialize)]
pub struct DownloadParams {
    pub prefix: Option<String>,
}

/// Lists and validates before the first byte is sent, so listing failures still get a status code.
async fn _download_archive(state: &AppState, prefix: String) -> Result<Response> {
    info!("Downloading archive: {}", prefix);
    let filename = zip_file_name(&prefix);
    let stream = stream_archive_for_prefix(state.store.clone(), &prefix, &state.settings.archive).await?;
    let headers = [
        (header::CONTENT_TYPE, "application/zip".to_string()),
        (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", filename)),
        (header::CACHE_CONTROL, "private, no-cache, no-store, must-revalidate".to_string()),
    ];
    Ok((headers, Body::from_stream(stream)).into_response())
}

pub async fn download_batch(
    State(state): State<AppState>,
    Path((year, month, day, nr)): Path<(String, String, String, String)>,
) -> Response {
    let result = match batch_prefix(&year, &month, &day, &nr) {
        Ok(prefix) => _download_archive(&state, prefix).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(response) => response,
        Err(e) => error_response("download_batch", e),
    }
}

pub async fn download_prefix(State(state): State<AppState>, Query(params): Query<DownloadParams>) -> Response {
    let result = match params.prefix.filter(|prefix| !prefix.trim().is_empty()) {
        Some(prefix) => _download_archive(&state, prefix).await,
        None => Err(CatalogError::Validation("missing prefix parameter".to_string())),
    };
    match result {
        Ok(response) => response,
        Err(e) => error_response("download_prefix", e),
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read};

    use axum::http::StatusCode;
    use zip::ZipArchive;

    use super::*;
    use crate::{
        db_utils::static_query_service::StaticQueryService,
        server_extra::test_support::{batch_store, get_request, send, state},
    };

    #[tokio::test(flavor = "multi_thread")]
    async fn batch_download_streams_a_zip() {
        let state = state(batch_store(), StaticQueryService::new());
        let (response, bytes) = send(state, get_request("/api/batch/2024/05/16/24/download")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "application/zip");
        assert_eq!(headers[header::CONTENT_DISPOSITION], "attachment; filename=\"batch-2024-05-16-24.zip\"");
        assert_eq!(headers[header::CACHE_CONTROL], "private, no-cache, no-store, must-revalidate");

        let mut zip = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut names = zip.file_names().map(str::to_string).collect::<Vec<_>>();
        names.sort();
        assert_eq!(names, vec!["108-A1-Agilent.json", "raw/trace.csv"]);
        let mut content = String::new();
        zip.by_name("raw/trace.csv").unwrap().read_to_string(&mut content).unwrap();
        assert_eq!(content, "t,v\n0,1\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn prefix_download_names_the_zip_after_the_prefix() {
        let state = state(batch_store(), StaticQueryService::new());
        let (response, _) = send(state, get_request("/api/download?prefix=batch/2024/05/16/25/")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"batch-2024-05-16-25.zip\""
        );
    }

    #[tokio::test]
    async fn missing_prefixes_fail_before_streaming() {
        let state = state(batch_store(), StaticQueryService::new());
        let (response, _) = send(state.clone(), get_request("/api/download?prefix=batch/1999/")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let (response, _) = send(state.clone(), get_request("/api/download")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let (response, _) = send(state, get_request("/api/download?prefix=batch/2024/05/17/")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
