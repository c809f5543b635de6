//! Search routes.

use axum::{
    Json,
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use common::{
    search_query::{Filters, SearchRequest},
    search_result::SearchResultPage,
};

use crate::{
    api::search::{search_all_facet_options, search_for_results, search_for_results_hit_count},
    error::Result,
    server_extra::{AppState, error_response},
};

async fn _search(state: &AppState, request: SearchRequest) -> Result<Json<SearchResultPage>> {
    let page = search_for_results(state.query_service.as_ref(), &request).await?;
    Ok(Json(page))
}

pub async fn post_search(State(state): State<AppState>, Json(request): Json<SearchRequest>) -> Response {
    match _search(&state, request).await {
        Ok(response) => response.into_response(),
        Err(e) => error_response("post_search", e),
    }
}

/// Same search, read from URL parameters: `CATEGORY=v1,v2`, `columns=`, `limit=`, `offset=`.
pub async fn get_search(State(state): State<AppState>, Query(pairs): Query<Vec<(String, String)>>) -> Response {
    let request = match SearchRequest::from_query_pairs(pairs) {
        Ok(request) => request,
        Err(e) => return error_response("get_search", e.into()),
    };
    match _search(&state, request).await {
        Ok(response) => response.into_response(),
        Err(e) => error_response("get_search", e),
    }
}

async fn _search_count(state: &AppState, pairs: Vec<(String, String)>) -> Result<Json<u64>> {
    let filters = Filters::from_query_pairs(pairs)?;
    Ok(Json(search_for_results_hit_count(state.query_service.as_ref(), &filters).await?))
}

pub async fn get_search_count(State(state): State<AppState>, Query(pairs): Query<Vec<(String, String)>>) -> Response {
    match _search_count(&state, pairs).await {
        Ok(response) => response.into_response(),
        Err(e) => error_response("get_search_count", e),
    }
}

pub async fn get_search_options(State(state): State<AppState>) -> Response {
    match search_all_facet_options(state.query_service.as_ref()).await {
        Ok(options) => Json(options).into_response(),
        Err(e) => error_response("get_search_options", e),
    }
}
