//! Search endpoint for result pages.

use common::{search_query::SearchRequest, search_result::SearchResultPage};

use crate::{
    api::search::{
        consolidate::consolidate, search_for_results_hit_count::read_count, search_sparql::compile_search,
    },
    db_utils::qlever_utils::QueryService,
    error::Result,
};

/// Runs one page of a search.
///
/// Both queries come from the same compiled snapshot of `request` and run concurrently.
pub async fn search_for_results(service: &dyn QueryService, request: &SearchRequest) -> Result<SearchResultPage> {
    let compiled = compile_search(&request.filters, &request.output_columns, request.pagination);
    tracing::info!(
        "search: {} filtered categories, columns {:?}, limit {} offset {}",
        request.filters.active().count(),
        compiled.result_columns,
        request.pagination.limit,
        request.pagination.offset
    );

    let (rows, count_rows) =
        tokio::try_join!(service.execute(&compiled.results_query), service.execute(&compiled.count_query))?;
    let total_count = read_count(&count_rows)?;
    let rows = consolidate(&rows, &compiled.result_columns);

    Ok(SearchResultPage {
        rows,
        result_columns: compiled.result_columns,
        total_count,
        pagination: request.pagination,
        has_more: request.pagination.has_more(total_count),
    })
}
