//! Campaign folder discovery and folder listings.

use axum::{
    Json,
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use common::object_listing::{CampaignFolder, DiscoveredPrefixes, FolderGroup};
use serde::{Deserialize, Serialize};

use crate::{
    api::storage::{campaign_folders::campaign_folders, discover_leaf_prefixes, group_by_folder},
    error::{CatalogError, Result},
    server_extra::{AppState, error_response},
};

const DEFAULT_CAMPAIGN_ROOT: &str = "batch/";

#[derive(Debug, Deserialize)]
pub struct PrefixParams {
    pub prefix: Option<String>,
    pub depth: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignListing {
    #[serde(flatten)]
    pub discovered: DiscoveredPrefixes,
    pub campaigns: Vec<CampaignFolder>,
}

async fn _get_campaigns(state: &AppState, params: PrefixParams) -> Result<CampaignListing> {
    let prefix = params.prefix.unwrap_or_else(|| DEFAULT_CAMPAIGN_ROOT.to_string());
    let depth = match params.depth {
        Some(raw) => raw
            .trim()
            .parse::<usize>()
            .map_err(|_| CatalogError::Validation(format!("depth must be a non-negative integer, got {raw:?}")))?,
        None => state.settings.campaign_depth,
    };
    let discovered =
        discover_leaf_prefixes(state.store.as_ref(), &prefix, depth, state.settings.fanout_concurrency).await?;
    tracing::info!("campaigns under {:?} at depth {}: {}", prefix, depth, discovered.count);
    let campaigns = campaign_folders(&discovered.prefixes);
    Ok(CampaignListing { discovered, campaigns })
}

pub async fn get_campaigns(State(state): State<AppState>, Query(params): Query<PrefixParams>) -> Response {
    match _get_campaigns(&state, params).await {
        Ok(listing) => Json(listing).into_response(),
        Err(e) => error_response("get_campaigns", e),
    }
}

async fn _get_folders(state: &AppState, params: PrefixParams) -> Result<Vec<FolderGroup>> {
    let Some(prefix) = params.prefix.filter(|prefix| !prefix.trim().is_empty()) else {
        return Err(CatalogError::Validation("missing prefix parameter".to_string()));
    };
    let records = state.store.list_objects(&prefix).await?;
    if records.is_empty() {
        return Err(CatalogError::NotFound(format!("no objects under {prefix:?}")));
    }
    Ok(group_by_folder(records))
}

pub async fn get_folders(State(state): State<AppState>, Query(params): Query<PrefixParams>) -> Response {
    match _get_folders(&state, params).await {
        Ok(groups) => Json(groups).into_response(),
        Err(e) => error_response("get_folders", e),
    }
}
