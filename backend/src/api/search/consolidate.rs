//! Merges raw result tuples into one display row per campaign folder.

use std::collections::{BTreeMap, HashMap};

use common::{
    facet_catalog::{FilterCategory, LOCATION_VARIABLE, MULTI_VALUE_SEPARATOR, spec_for},
    object_listing::PATH_SEPARATOR,
    search_result::{ColumnValue, ConsolidatedRow},
};

use crate::db_utils::tabular::RawResultRow;

/// Path segment at which campaign folders start inside a content location.
pub const STORE_ROOT_SEGMENT: &str = "batch";

/// Derives the folder prefix a content location belongs to.
///
/// `s3://bucket/batch/2024/05/16/24/file.json` becomes `batch/2024/05/16/24/`.
/// Locations without a `batch` segment keep everything up to their last `/`.
pub fn group_key_from_location(location: &str) -> String {
    let path = location.strip_prefix("s3://").unwrap_or(location);
    let segments = path.split(PATH_SEPARATOR).collect::<Vec<_>>();
    if let Some(root) = segments.iter().position(|segment| *segment == STORE_ROOT_SEGMENT) {
        if root + 1 < segments.len() {
            let mut key = segments[root..segments.len() - 1].join("/");
            key.push(PATH_SEPARATOR);
            return key;
        }
    }
    match path.rfind(PATH_SEPARATOR) {
        Some(index) => path[..=index].to_string(),
        None => path.to_string(),
    }
}

fn cell_values<'a>(row: &'a RawResultRow, category: FilterCategory) -> Vec<&'a str> {
    let spec = spec_for(category);
    let Some(raw) = row.get(&spec.result_column()) else {
        return vec![];
    };
    let parts: Vec<&str> =
        if spec.is_group_key { vec![raw.as_str()] } else { raw.split(MULTI_VALUE_SEPARATOR).collect() };
    parts.into_iter().map(str::trim).filter(|value| !value.is_empty()).collect()
}

pub fn consolidate(rows: &[RawResultRow], output_columns: &[FilterCategory]) -> Vec<ConsolidatedRow> {
    let mut columns = output_columns.to_vec();
    columns.sort();
    columns.dedup();

    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, BTreeMap<FilterCategory, Vec<String>>> = HashMap::new();
    for row in rows {
        let location = row.get(LOCATION_VARIABLE).map(|value| value.trim()).unwrap_or_default();
        if location.is_empty() {
            tracing::debug!("Skipping result row without ?{}: {:?}", LOCATION_VARIABLE, row);
            continue;
        }
        let group_key = group_key_from_location(location);
        let collected = groups.entry(group_key.clone()).or_insert_with(|| {
            order.push(group_key);
            BTreeMap::new()
        });
        for category in &columns {
            let values = collected.entry(*category).or_default();
            for value in cell_values(row, *category) {
                if !values.iter().any(|seen| seen == value) {
                    values.push(value.to_string());
                }
            }
        }
    }

    order
        .into_iter()
        .filter_map(|group_key| {
            let collected = groups.remove(&group_key)?;
            let columns =
                collected.into_iter().map(|(category, values)| (category, ColumnValue::from_distinct(values))).collect();
            Some(ConsolidatedRow { group_key, columns })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::db_utils::static_query_service::raw_row;

    const COLUMNS: [FilterCategory; 2] = [FilterCategory::CampaignName, FilterCategory::ChemicalName];

    fn sample_rows() -> Vec<RawResultRow> {
        vec![
            raw_row([
                ("s", "http://example.org/campaign/1"),
                ("cu", "s3://catplus/batch/2024/05/16/24/108-A1.json"),
                ("cp", "Caffeine Synthesis"),
                ("cn_list", "methanol | methyl iodide"),
            ]),
            raw_row([
                ("s", "http://example.org/campaign/2"),
                ("cu", "s3://catplus/batch/2024/05/17/01/109-B2.json"),
                ("cp", "Aspirin Trial"),
                ("cn_list", "acetic anhydride"),
            ]),
            raw_row([
                ("s", "http://example.org/campaign/1"),
                ("cu", "s3://catplus/batch/2024/05/16/24/108-A2.json"),
                ("cp", "Caffeine Synthesis"),
                ("cn_list", "methyl iodide | theobromine"),
            ]),
        ]
    }

    #[test]
    fn group_key_strips_scheme_and_bucket() {
        assert_eq!(group_key_from_location("s3://catplus/batch/2024/05/16/24/a.json"), "batch/2024/05/16/24/");
        assert_eq!(group_key_from_location("batch/2024/05/16/24/a.json"), "batch/2024/05/16/24/");
        assert_eq!(group_key_from_location("s3://other/runs/7/a.json"), "other/runs/7/");
        assert_eq!(group_key_from_location("loose.json"), "loose.json");
    }

    #[test]
    fn rows_of_one_folder_merge_with_distinct_values() {
        let consolidated = consolidate(&sample_rows(), &COLUMNS);
        assert_eq!(consolidated.len(), 2);
        assert_eq!(consolidated[0].group_key, "batch/2024/05/16/24/");
        assert_eq!(consolidated[1].group_key, "batch/2024/05/17/01/");

        let caffeine = &consolidated[0];
        assert_eq!(
            caffeine.column(FilterCategory::CampaignName),
            Some(&ColumnValue::Single("Caffeine Synthesis".into()))
        );
        assert_eq!(
            caffeine.column(FilterCategory::ChemicalName),
            Some(&ColumnValue::Many(vec!["methanol".into(), "methyl iodide".into(), "theobromine".into()]))
        );
        assert_eq!(
            consolidated[1].column(FilterCategory::ChemicalName),
            Some(&ColumnValue::Single("acetic anhydride".into()))
        );
    }

    #[test]
    fn reordering_rows_does_not_change_the_groups() {
        let summarize = |rows: &[RawResultRow]| {
            consolidate(rows, &COLUMNS)
                .into_iter()
                .map(|row| {
                    let columns = row
                        .columns
                        .iter()
                        .map(|(category, value)| {
                            let values = value.values().into_iter().map(str::to_string).collect::<BTreeSet<_>>();
                            (*category, matches!(value, ColumnValue::Single(_)), values)
                        })
                        .collect::<Vec<_>>();
                    (row.group_key, columns)
                })
                .collect::<BTreeSet<_>>()
        };
        let rows = sample_rows();
        let expected = summarize(&rows);
        let mut reversed = rows.clone();
        reversed.reverse();
        assert_eq!(summarize(&reversed), expected);
        let rotated = [&rows[1..], &rows[..1]].concat();
        assert_eq!(summarize(&rotated), expected);
    }

    #[test]
    fn rows_without_location_are_skipped() {
        let rows = vec![
            raw_row([("s", "http://example.org/campaign/9"), ("cp", "Orphan")]),
            raw_row([("s", "http://example.org/campaign/9"), ("cu", " "), ("cp", "Orphan")]),
        ];
        assert!(consolidate(&rows, &COLUMNS).is_empty());
    }

    #[test]
    fn missing_cells_yield_empty_columns() {
        let rows = vec![raw_row([("cu", "batch/2024/05/16/24/a.json"), ("cp", "Caffeine Synthesis")])];
        let consolidated = consolidate(&rows, &COLUMNS);
        assert!(consolidated[0].column(FilterCategory::ChemicalName).unwrap().is_empty());
    }
}
