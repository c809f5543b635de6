use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{facet_catalog::FilterCategory, search_query::Pagination};


/// Value of one facet column within a consolidated row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnValue {
    Single(String),
    /// Distinct values in first-seen order. Empty when the facet had no value.
    Many(Vec<String>),
}

impl ColumnValue {
    /// Collapses an ordered list of distinct values.
    pub fn from_distinct(mut values: Vec<String>) -> Self {
        if values.len() == 1 {
            ColumnValue::Single(values.remove(0))
        } else {
            ColumnValue::Many(values)
        }
    }

    pub fn values(&self) -> Vec<&str> {
        match self {
            ColumnValue::Single(value) => vec![value.as_str()],
            ColumnValue::Many(values) => values.iter().map(String::as_str).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ColumnValue::Many(values) if values.is_empty())
    }
}

/// All raw rows sharing one group key, merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsolidatedRow {
    /// Folder prefix derived from the content location, e.g. `batch/2024/05/16/24/`.
    pub group_key: String,
    pub columns: BTreeMap<FilterCategory, ColumnValue>,
}

impl ConsolidatedRow {
    pub fn column(&self, category: FilterCategory) -> Option<&ColumnValue> {
        self.columns.get(&category)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResultPage {
    pub rows: Vec<ConsolidatedRow>,
    pub result_columns: Vec<FilterCategory>,
    /// Number of distinct top-level keys matching the filters, ignoring pagination.
    pub total_count: u64,
    pub pagination: Pagination,
    pub has_more: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_value_collapses_to_scalar() {
        assert_eq!(ColumnValue::from_distinct(vec!["a".into()]), ColumnValue::Single("a".into()));
        assert_eq!(
            ColumnValue::from_distinct(vec!["a".into(), "b".into()]),
            ColumnValue::Many(vec!["a".into(), "b".into()])
        );
        assert!(ColumnValue::from_distinct(vec![]).is_empty());
    }

    #[test]
    fn serializes_scalars_and_sets_untagged() {
        let mut columns = BTreeMap::new();
        columns.insert(FilterCategory::CampaignName, ColumnValue::Single("Caffeine Synthesis".into()));
        columns.insert(FilterCategory::Cas, ColumnValue::Many(vec!["74-88-4".into(), "83-67-0".into()]));
        let row = ConsolidatedRow { group_key: "batch/2024/05/16/24/".into(), columns };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["columns"]["CAMPAIGN_NAME"], "Caffeine Synthesis");
        assert_eq!(json["columns"]["CAS"][1], "83-67-0");
    }
}
