//! Shared search request models and their parsing from request parameters.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    facet_catalog::{FilterCategory, UnknownFilterCategory},
    search_const::{MAX_PAGE_SIZE, PAGE_SIZE},
};


/// Selected values per facet. Values of one facet are OR-combined, facets are AND-combined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Filters {
    pub values: BTreeMap<FilterCategory, Vec<String>>,
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, category: FilterCategory, values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        for value in values {
            self.add(category, value);
        }
        self
    }

    /// Adds one value; empty values and repeats of an already selected value are ignored.
    pub fn add(&mut self, category: FilterCategory, value: impl Into<String>) {
        let value = value.into();
        if value.trim().is_empty() {
            return;
        }
        let selected = self.values.entry(category).or_default();
        if !selected.contains(&value) {
            selected.push(value);
        }
    }

    pub fn get(&self, category: FilterCategory) -> &[String] {
        self.values.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Categories that carry at least one value, in catalog order.
    pub fn active(&self) -> impl Iterator<Item = (FilterCategory, &[String])> {
        self.values
            .iter()
            .filter(|(_, values)| !values.is_empty())
            .map(|(category, values)| (*category, values.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.active().next().is_none()
    }

    /// Builds filters from repeated `CATEGORY=value` pairs.
    ///
    /// A single value holding commas is split into several values, the way the
    /// search form submits multi-selects.
    pub fn from_query_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Result<Self, UnknownFilterCategory>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut filters = Filters::new();
        for (key, value) in pairs {
            let category: FilterCategory = key.as_ref().parse()?;
            for part in value.as_ref().split(',') {
                filters.add(category, part.trim());
            }
        }
        Ok(filters)
    }
}


#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaginationError {
    #[error("{field} must be a non-negative integer, got {value:?}")]
    NotANumber { field: &'static str, value: String },
    #[error("limit must be at least 1")]
    ZeroLimit,
    #[error("limit {limit} exceeds the maximum page size {max}")]
    LimitTooLarge { limit: u64, max: u64 },
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct PaginationParts {
    limit: u64,
    #[serde(default)]
    offset: u64,
}

impl TryFrom<PaginationParts> for Pagination {
    type Error = PaginationError;

    fn try_from(parts: PaginationParts) -> Result<Self, Self::Error> {
        Pagination::new(parts.limit, parts.offset)
    }
}

/// Page window over the distinct top-level keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "PaginationParts")]
pub struct Pagination {
    pub limit: u64,
    pub offset: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { limit: PAGE_SIZE, offset: 0 }
    }
}

impl Pagination {
    pub fn new(limit: u64, offset: u64) -> Result<Self, PaginationError> {
        if limit == 0 {
            return Err(PaginationError::ZeroLimit);
        }
        if limit > MAX_PAGE_SIZE {
            return Err(PaginationError::LimitTooLarge { limit, max: MAX_PAGE_SIZE });
        }
        Ok(Self { limit, offset })
    }

    /// Zero-based page number with the default page size.
    pub fn for_page(page: u64) -> Self {
        Self { limit: PAGE_SIZE, offset: page.saturating_mul(PAGE_SIZE) }
    }

    /// Parses raw request parameters; absent values fall back to the defaults.
    pub fn parse(limit: Option<&str>, offset: Option<&str>) -> Result<Self, PaginationError> {
        let limit = match limit {
            Some(raw) => parse_count("limit", raw)?,
            None => PAGE_SIZE,
        };
        let offset = match offset {
            Some(raw) => parse_count("offset", raw)?,
            None => 0,
        };
        Self::new(limit, offset)
    }

    /// Whether rows remain after this page, given the total number of keys.
    pub fn has_more(&self, total_count: u64) -> bool {
        self.offset.saturating_add(self.limit) < total_count
    }
}

fn parse_count(field: &'static str, raw: &str) -> Result<u64, PaginationError> {
    raw.trim().parse::<u64>().map_err(|_| PaginationError::NotANumber { field, value: raw.to_string() })
}


#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchRequestError {
    #[error(transparent)]
    Category(#[from] UnknownFilterCategory),
    #[error(transparent)]
    Pagination(#[from] PaginationError),
}

/// One faceted search: which values are selected, which facets to show, which page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SearchRequest {
    pub filters: Filters,
    pub output_columns: Vec<FilterCategory>,
    pub pagination: Pagination,
}

impl SearchRequest {
    /// Parses URL query parameters.
    ///
    /// `columns=A,B` selects output columns, `limit`/`offset` set the page and
    /// every other key names a facet. Without `columns`, the filtered facets are shown.
    pub fn from_query_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Result<Self, SearchRequestError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut columns = None;
        let mut limit = None;
        let mut offset = None;
        let mut facet_pairs = Vec::new();
        for (key, value) in pairs {
            match key.as_ref() {
                "columns" => columns = Some(value.as_ref().to_string()),
                "limit" => limit = Some(value.as_ref().to_string()),
                "offset" => offset = Some(value.as_ref().to_string()),
                other => facet_pairs.push((other.to_string(), value.as_ref().to_string())),
            }
        }

        let filters = Filters::from_query_pairs(facet_pairs)?;
        let output_columns = match columns {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::parse::<FilterCategory>)
                .collect::<Result<Vec<_>, _>>()?,
            None => filters.active().map(|(category, _)| category).collect(),
        };
        let pagination = Pagination::parse(limit.as_deref(), offset.as_deref())?;
        Ok(Self { filters, output_columns, pagination })
    }
}
