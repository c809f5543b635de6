use std::time::Duration;

use async_trait::async_trait;

use crate::{
    db_utils::tabular::{RawResultRow, parse_tabular_response},
    error::{CatalogError, Result},
};

/// Longest slice of an upstream error body kept in the error message.
const MAX_ERROR_BODY: usize = 500;

/// Executes one query text against the graph store and returns its result tuples.
#[async_trait]
pub trait QueryService: Send + Sync {
    async fn execute(&self, query: &str) -> Result<Vec<RawResultRow>>;
}

/// Client for a QLever HTTP endpoint, asking for CSV results.
#[derive(Debug, Clone)]
pub struct QleverClient {
    api_url: String,
    client: reqwest::Client,
}

impl QleverClient {
    pub fn new(api_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CatalogError::upstream(None, format!("cannot build http client: {e}")))?;
        Ok(Self { api_url: api_url.into(), client })
    }
}

#[async_trait]
impl QueryService for QleverClient {
    async fn execute(&self, query: &str) -> Result<Vec<RawResultRow>> {
        let t0 = std::time::Instant::now();
        tracing::debug!("QLEVER QUERY:\n{}", query);
        let response = self
            .client
            .get(&self.api_url)
            .query(&[("query", query)])
            .header(reqwest::header::ACCEPT, "text/csv")
            .send()
            .await
            .map_err(|e| CatalogError::upstream(e.status().map(|s| s.as_u16()), e.to_string()))?;
        let status = response.status();
        let response_txt = response
            .text()
            .await
            .map_err(|e| CatalogError::upstream(Some(status.as_u16()), e.to_string()))?;
        if status.is_client_error() || status.is_server_error() {
            let body: String = response_txt.chars().take(MAX_ERROR_BODY).collect();
            tracing::warn!("QLEVER ERROR: {}: {}", status, body);
            return Err(CatalogError::upstream(Some(status.as_u16()), body));
        }
        let rows = parse_tabular_response(&response_txt);
        tracing::info!(
            "QLEVER RESPONSE: query len = {}, body len = {}, rows = {} ({}ms)",
            query.len(),
            response_txt.len(),
            rows.len(),
            t0.elapsed().as_millis()
        );
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreachable_endpoint_is_an_upstream_error() {
        let client = QleverClient::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let err = client.execute("SELECT ?s WHERE { ?s ?p ?o }").await.unwrap_err();
        assert!(matches!(err, CatalogError::Upstream { .. }));
    }
}
