use common::object_listing::{ObjectRecord, ObjectRecordWithUrl};
use futures::{StreamExt, stream};

use crate::api::storage::object_store::ObjectStore;

/// Attaches a presigned download link to every record, keeping input order.
///
/// A failed presign is reported on that record only.
pub async fn add_download_urls(
    store: &dyn ObjectStore,
    records: Vec<ObjectRecord>,
    ttl_secs: u32,
    concurrency: usize,
) -> Vec<ObjectRecordWithUrl> {
    stream::iter(records)
        .map(|record| async move {
            let name = record.name().to_string();
            match store.presigned_read_url(&record.key, ttl_secs).await {
                Ok(url) => ObjectRecordWithUrl { record, name, presigned_url: Some(url), presigned_url_error: None },
                Err(e) => {
                    tracing::warn!("Failed to presign {}: {}", record.key, e);
                    ObjectRecordWithUrl { record, name, presigned_url: None, presigned_url_error: Some(e.to_string()) }
                }
            }
        })
        .buffered(concurrency.max(1))
        .collect()
        .await
}
