//! Canned query service for tests.

use std::{collections::VecDeque, sync::Mutex};

use async_trait::async_trait;

use crate::{
    db_utils::{qlever_utils::QueryService, tabular::RawResultRow},
    error::{CatalogError, Result},
};

/// Query service answering from a queue of canned responses, recording every query it sees.
#[derive(Debug, Default)]
pub struct StaticQueryService {
    responses: Mutex<VecDeque<Result<Vec<RawResultRow>>>>,
    /// Fallback used when the queue matches nothing, keyed by a substring of the query.
    by_marker: Vec<(String, Vec<RawResultRow>)>,
    seen: Mutex<Vec<String>>,
}

impl StaticQueryService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response handed out in call order.
    pub fn push(self, response: Result<Vec<RawResultRow>>) -> Self {
        if let Ok(mut responses) = self.responses.lock() {
            responses.push_back(response);
        }
        self
    }

    /// Answers any query containing `marker` with `rows`; checked before the queue.
    pub fn when(mut self, marker: impl Into<String>, rows: Vec<RawResultRow>) -> Self {
        self.by_marker.push((marker.into(), rows));
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.seen.lock().map(|seen| seen.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl QueryService for StaticQueryService {
    async fn execute(&self, query: &str) -> Result<Vec<RawResultRow>> {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(query.to_string());
        }
        if let Some((_, rows)) = self.by_marker.iter().find(|(marker, _)| query.contains(marker.as_str())) {
            return Ok(rows.clone());
        }
        self.responses
            .lock()
            .ok()
            .and_then(|mut responses| responses.pop_front())
            .unwrap_or_else(|| Err(CatalogError::upstream(None, "no canned response left")))
    }
}

/// Builds a row from `(column, value)` pairs.
pub fn raw_row<'a>(cells: impl IntoIterator<Item = (&'a str, &'a str)>) -> RawResultRow {
    cells.into_iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}
