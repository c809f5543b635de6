//! Option lists for the search form.

use std::collections::BTreeMap;

use common::facet_catalog::FilterCategory;
use futures::future::try_join_all;

use crate::{
    api::search::search_sparql::{OPTION_COLUMN, facet_options_query},
    db_utils::qlever_utils::QueryService,
    error::Result,
};

pub async fn search_facet_options(service: &dyn QueryService, category: FilterCategory) -> Result<Vec<String>> {
    let rows = service.execute(&facet_options_query(category)).await?;
    let mut values = Vec::with_capacity(rows.len());
    for row in rows {
        let Some(value) = row.get(OPTION_COLUMN) else { continue };
        let value = value.trim();
        if !value.is_empty() && !values.iter().any(|seen: &String| seen == value) {
            values.push(value.to_string());
        }
    }
    Ok(values)
}

/// Every category's option list, fetched concurrently.
pub async fn search_all_facet_options(service: &dyn QueryService) -> Result<BTreeMap<FilterCategory, Vec<String>>> {
    let lists = try_join_all(
        FilterCategory::all_categories().iter().map(|category| search_facet_options(service, *category)),
    )
    .await?;
    Ok(FilterCategory::all_categories().iter().copied().zip(lists).collect())
}
