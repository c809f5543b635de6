//! Breadth-first walk of the common-prefix tree.

use std::collections::BTreeSet;

use common::object_listing::{DiscoveredPrefixes, separator_count};
use futures::{StreamExt, TryStreamExt, stream};

use crate::{
    api::storage::object_store::ObjectStore,
    error::{CatalogError, Result},
};

/// Finds the prefixes `target_depth` separators deep below `start_prefix`.
///
/// Each level is listed with at most `concurrency` calls outstanding, and a
/// level starts only once the previous one has fully returned. When a level
/// has no children the walk stops and returns the last non-empty level.
pub async fn discover_leaf_prefixes(
    store: &dyn ObjectStore,
    start_prefix: &str,
    target_depth: usize,
    concurrency: usize,
) -> Result<DiscoveredPrefixes> {
    let mut depth = separator_count(start_prefix);
    if depth > target_depth {
        return Err(CatalogError::Validation(format!(
            "prefix {start_prefix:?} is already {depth} levels deep, deeper than {target_depth}"
        )));
    }

    let mut frontier = vec![start_prefix.to_string()];
    while depth < target_depth {
        let t0 = std::time::Instant::now();
        let listed: Vec<Vec<String>> = stream::iter(frontier.clone())
            .map(|prefix| async move { store.list_immediate_children(&prefix).await })
            .buffer_unordered(concurrency.max(1))
            .try_collect()
            .await?;
        let next = listed.into_iter().flatten().collect::<BTreeSet<_>>();
        tracing::debug!(
            "prefix walk depth {} -> {}: {} prefixes listed, {} children ({}ms)",
            depth,
            depth + 1,
            frontier.len(),
            next.len(),
            t0.elapsed().as_millis()
        );
        if next.is_empty() {
            tracing::info!("prefix walk under {:?} stopped early at depth {}", start_prefix, depth);
            break;
        }
        frontier = next.into_iter().collect();
        depth += 1;
    }

    frontier.sort();
    frontier.dedup();
    Ok(DiscoveredPrefixes::from_sorted(frontier))
}
