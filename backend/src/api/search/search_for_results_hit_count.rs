use common::search_query::{Filters, Pagination};

use crate::{
    api::search::search_sparql::{COUNT_COLUMN, compile_search},
    db_utils::{
        qlever_utils::QueryService,
        tabular::{RawResultRow, parse_count},
    },
    error::{CatalogError, Result},
};

/// Reads the `?count` cell of a count query; an empty result counts as zero.
pub(crate) fn read_count(rows: &[RawResultRow]) -> Result<u64> {
    if rows.is_empty() {
        return Ok(0);
    }
    parse_count(rows, COUNT_COLUMN)
        .ok_or_else(|| CatalogError::upstream(None, format!("count query returned no numeric ?{COUNT_COLUMN}")))
}

/// Number of campaigns matching `filters`, ignoring pagination.
pub async fn search_for_results_hit_count(service: &dyn QueryService, filters: &Filters) -> Result<u64> {
    let compiled = compile_search(filters, &[], Pagination::default());
    let rows = service.execute(&compiled.count_query).await?;
    read_count(&rows)
}
