//! Partitioning of a flat object listing into folders.

use std::collections::BTreeMap;

use common::object_listing::{FolderGroup, ObjectRecord, split_key};

/// Groups records by the prefix up to their last `/`, sorted by prefix.
///
/// Folder markers (empty name) and zero-byte objects are left out.
pub fn group_by_folder(records: impl IntoIterator<Item = ObjectRecord>) -> Vec<FolderGroup> {
    let mut folders: BTreeMap<String, Vec<ObjectRecord>> = BTreeMap::new();
    for record in records {
        let (prefix, name) = split_key(&record.key);
        if name.is_empty() || record.size == 0 {
            continue;
        }
        let prefix = prefix.to_string();
        folders.entry(prefix).or_default().push(record);
    }
    folders.into_iter().map(|(prefix, files)| FolderGroup { prefix, files }).collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use chrono::{TimeZone, Utc};

    use super::*;

    fn record(key: &str, size: u64) -> ObjectRecord {
        ObjectRecord::new(key, size, Some(Utc.with_ymd_and_hms(2024, 5, 16, 12, 0, 0).unwrap()))
    }

    #[test]
    fn groups_are_sorted_and_keep_listing_order() {
        let groups = group_by_folder(vec![
            record("batch/2024/05/17/01/z.json", 3),
            record("batch/2024/05/16/24/b.json", 2),
            record("readme.txt", 5),
            record("batch/2024/05/16/24/a.json", 1),
        ]);
        let prefixes = groups.iter().map(|group| group.prefix.as_str()).collect::<Vec<_>>();
        assert_eq!(prefixes, vec!["", "batch/2024/05/16/24/", "batch/2024/05/17/01/"]);
        let names = groups[1].files.iter().map(ObjectRecord::name).collect::<Vec<_>>();
        assert_eq!(names, vec!["b.json", "a.json"]);
        assert_eq!(groups[1].files[0].last_modified, Some(Utc.with_ymd_and_hms(2024, 5, 16, 12, 0, 0).unwrap()));
    }

    #[test]
    fn partitions_every_real_file_exactly_once() {
        let input = vec![
            record("batch/", 0),
            record("batch/2024/05/16/24/", 0),
            record("batch/2024/05/16/24/a.json", 10),
            record("batch/2024/05/16/24/empty.json", 0),
            record("batch/2024/05/16/24/raw/b.bin", 4),
            record("c.txt", 1),
        ];
        let groups = group_by_folder(input.clone());

        let grouped = groups.iter().flat_map(|group| group.files.iter().map(|f| f.key.clone())).collect::<Vec<_>>();
        let unique = grouped.iter().cloned().collect::<HashSet<_>>();
        assert_eq!(grouped.len(), unique.len());

        let expected = input
            .iter()
            .filter(|r| !r.name().is_empty() && r.size > 0)
            .map(|r| r.key.clone())
            .collect::<HashSet<_>>();
        assert_eq!(unique, expected);

        for group in &groups {
            assert!(group.files.iter().all(|f| split_key(&f.key).0 == group.prefix));
        }
    }

    #[test]
    fn empty_listing_has_no_groups() {
        assert!(group_by_folder(vec![]).is_empty());
    }
}
