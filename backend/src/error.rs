//! Error taxonomy shared by the search and storage APIs.

use axum::http::StatusCode;
use common::{
    facet_catalog::UnknownFilterCategory,
    search_query::{PaginationError, SearchRequestError},
};

pub type Result<T> = std::result::Result<T, CatalogError>;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Rejected before any remote call was made.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The query service answered with a failure status or could not be reached.
    #[error("query service failed{}: {message}", .status.map(|s| format!(" with status {s}")).unwrap_or_default())]
    Upstream { status: Option<u16>, message: String },

    /// Nothing exists under the requested prefix, or nothing was requested.
    #[error("not found: {0}")]
    NotFound(String),

    #[error("storage error: {message}")]
    Storage {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The archive pipeline itself broke, as opposed to a single file failing.
    #[error("archive writer failed: {0}")]
    Archive(#[from] std::io::Error),
}

impl CatalogError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage { message: message.into(), source: None }
    }

    pub fn storage_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Storage { message: message.into(), source: Some(Box::new(source)) }
    }

    pub fn upstream(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Upstream { status, message: message.into() }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            CatalogError::Validation(_) => StatusCode::BAD_REQUEST,
            CatalogError::NotFound(_) => StatusCode::NOT_FOUND,
            CatalogError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            CatalogError::Storage { .. } | CatalogError::Archive(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<UnknownFilterCategory> for CatalogError {
    fn from(err: UnknownFilterCategory) -> Self {
        CatalogError::Validation(err.to_string())
    }
}

impl From<PaginationError> for CatalogError {
    fn from(err: PaginationError) -> Self {
        CatalogError::Validation(err.to_string())
    }
}

impl From<SearchRequestError> for CatalogError {
    fn from(err: SearchRequestError) -> Self {
        CatalogError::Validation(err.to_string())
    }
}
