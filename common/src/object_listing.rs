//! Shared object-store listing models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const PATH_SEPARATOR: char = '/';

/// Splits a key into its folder prefix (up to and including the last `/`,
/// empty for root keys) and the name after it.
pub fn split_key(key: &str) -> (&str, &str) {
    match key.rfind(PATH_SEPARATOR) {
        Some(index) => key.split_at(index + 1),
        None => ("", key),
    }
}

/// Number of path separators in a prefix, i.e. its depth in the key tree.
pub fn separator_count(prefix: &str) -> usize {
    prefix.matches(PATH_SEPARATOR).count()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub key: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

impl ObjectRecord {
    pub fn new(key: impl Into<String>, size: u64, last_modified: Option<DateTime<Utc>>) -> Self {
        Self { key: key.into(), size, last_modified }
    }

    /// Substring after the last `/`.
    pub fn name(&self) -> &str {
        split_key(&self.key).1
    }
}

/// Object record decorated with a time-limited download link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRecordWithUrl {
    #[serde(flatten)]
    pub record: ObjectRecord,
    pub name: String,
    pub presigned_url: Option<String>,
    pub presigned_url_error: Option<String>,
}

/// Files sitting directly under one folder prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderGroup {
    /// Folder prefix with trailing `/`, or `""` for the root.
    pub prefix: String,
    pub files: Vec<ObjectRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DiscoveredPrefixes {
    /// Lexicographically sorted, without duplicates.
    pub prefixes: Vec<String>,
    pub count: usize,
}

impl DiscoveredPrefixes {
    pub fn from_sorted(prefixes: Vec<String>) -> Self {
        let count = prefixes.len();
        Self { prefixes, count }
    }
}

/// A leaf folder treated as one campaign run, e.g. `batch/2024/05/16/24/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignFolder {
    pub prefix: String,
    /// `YYYY/MM/DD` when the prefix follows the `batch/YYYY/MM/DD/` layout.
    pub date: Option<String>,
}
