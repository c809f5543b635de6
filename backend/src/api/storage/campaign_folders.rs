//! Campaign folders under the `batch/YYYY/MM/DD/NR/` layout and their URL forms.

use std::collections::HashSet;

use common::object_listing::{CampaignFolder, ObjectRecord, PATH_SEPARATOR, split_key};

use crate::error::{CatalogError, Result};

const BATCH_ROOT: &str = "batch";

/// `YYYY/MM/DD` out of a `batch/YYYY/MM/DD/...` prefix.
pub fn campaign_date(prefix: &str) -> Option<String> {
    let mut parts = prefix.split(PATH_SEPARATOR);
    if !parts.next()?.eq_ignore_ascii_case(BATCH_ROOT) {
        return None;
    }
    let year = parts.next()?;
    let month = parts.next()?;
    let day = parts.next()?;
    // the day must be followed by a separator
    parts.next()?;
    let digits = |s: &str, len: usize| s.len() == len && s.bytes().all(|b| b.is_ascii_digit());
    if digits(year, 4) && digits(month, 2) && digits(day, 2) {
        Some(format!("{year}/{month}/{day}"))
    } else {
        None
    }
}

pub fn campaign_folders(prefixes: &[String]) -> Vec<CampaignFolder> {
    prefixes
        .iter()
        .map(|prefix| CampaignFolder { prefix: prefix.clone(), date: campaign_date(prefix) })
        .collect()
}

/// Distinct folder prefixes of a file listing, in first-seen order.
pub fn campaigns_from_records(records: &[ObjectRecord]) -> Vec<CampaignFolder> {
    let mut seen = HashSet::new();
    records
        .iter()
        .map(|record| split_key(&record.key).0)
        .filter(|prefix| seen.insert(*prefix))
        .map(|prefix| CampaignFolder { prefix: prefix.to_string(), date: campaign_date(prefix) })
        .collect()
}

fn check_segment(name: &str, value: &str) -> Result<()> {
    let valid = !value.is_empty() && value.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_');
    if valid {
        Ok(())
    } else {
        Err(CatalogError::Validation(format!("invalid {name} segment {value:?}")))
    }
}

/// `batch/{year}/{month}/{day}/{nr}/`
pub fn batch_prefix(year: &str, month: &str, day: &str, nr: &str) -> Result<String> {
    for (name, value) in [("year", year), ("month", month), ("day", day), ("nr", nr)] {
        check_segment(name, value)?;
    }
    Ok(format!("{BATCH_ROOT}/{year}/{month}/{day}/{nr}/"))
}

/// `batch/2024/05/16/24/` becomes `batch/2024-05-16-24`.
pub fn prefix_to_url_path(prefix: &str) -> String {
    let parts = prefix.split(PATH_SEPARATOR).filter(|part| !part.is_empty()).collect::<Vec<_>>();
    match parts.split_first() {
        Some((root, rest)) if !rest.is_empty() => format!("{root}/{}", rest.join("-")),
        _ => prefix.trim_end_matches(PATH_SEPARATOR).to_string(),
    }
}

/// Inverse of [`prefix_to_url_path`] for four-part batch paths.
pub fn url_path_to_prefix(url_path: &str) -> Option<String> {
    let rest = url_path.strip_prefix(BATCH_ROOT)?.strip_prefix(PATH_SEPARATOR)?;
    let parts = rest.split('-').collect::<Vec<_>>();
    match parts.as_slice() {
        [year, month, day, nr] => batch_prefix(year, month, day, nr).ok(),
        _ => None,
    }
}

/// Archive name for a prefix: `batch/2024/05/16/24/` becomes `batch-2024-05-16-24.zip`.
pub fn zip_file_name(prefix: &str) -> String {
    let parts = prefix.split(PATH_SEPARATOR).filter(|part| !part.is_empty()).collect::<Vec<_>>();
    if parts.is_empty() {
        return "download.zip".to_string();
    }
    format!("{}.zip", parts.join("-"))
}
