//! Object store backed by an S3-compatible endpoint through the minio client.

use async_trait::async_trait;
use common::object_listing::ObjectRecord;
use futures::StreamExt;
use minio::s3::{
    Client,
    types::{S3Api, ToStream},
};

use crate::{
    api::storage::object_store::{ByteStream, ObjectStore},
    config::S3Settings,
    db_utils::s3_utils::get_s3_client,
    error::{CatalogError, Result},
};

pub struct MinioObjectStore {
    client: Client,
    bucket: String,
}

impl MinioObjectStore {
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self { client, bucket: bucket.into() }
    }

    pub fn from_settings(settings: &S3Settings) -> anyhow::Result<Self> {
        Ok(Self::new(get_s3_client(settings)?, settings.bucket.clone()))
    }

    async fn list(&self, prefix: &str, recursive: bool) -> Result<Vec<minio::s3::types::ListEntry>> {
        let mut pages = self
            .client
            .list_objects(self.bucket.as_str())
            .prefix(Some(prefix.to_string()))
            .recursive(recursive)
            .to_stream()
            .await;
        let mut entries = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| CatalogError::storage_with_source(format!("Failed to list {prefix}"), e))?;
            entries.extend(page.contents);
        }
        Ok(entries)
    }
}

fn is_missing_key(err: &minio::s3::error::Error) -> bool {
    let message = err.to_string();
    message.contains("NoSuchKey") || message.contains("does not exist")
}

#[async_trait]
impl ObjectStore for MinioObjectStore {
    async fn list_objects(&self, prefix: &str) -> Result<Vec<ObjectRecord>> {
        let t0 = std::time::Instant::now();
        let records = self
            .list(prefix, true)
            .await?
            .into_iter()
            .filter(|entry| !entry.is_prefix)
            .map(|entry| ObjectRecord::new(entry.name, entry.size.unwrap_or(0), entry.last_modified))
            .collect::<Vec<_>>();
        tracing::debug!("S3 LIST {}: {} objects ({}ms)", prefix, records.len(), t0.elapsed().as_millis());
        Ok(records)
    }

    async fn list_immediate_children(&self, prefix: &str) -> Result<Vec<String>> {
        let children = self
            .list(prefix, false)
            .await?
            .into_iter()
            .filter(|entry| entry.is_prefix)
            .map(|entry| entry.name)
            .collect::<Vec<_>>();
        tracing::debug!("S3 LIST CHILDREN {}: {}", prefix, children.len());
        Ok(children)
    }

    async fn get_object_stream(&self, key: &str) -> Result<ByteStream> {
        let object = self.client.get_object(self.bucket.as_str(), key.to_string()).send().await.map_err(|e| {
            if is_missing_key(&e) {
                CatalogError::NotFound(key.to_string())
            } else {
                CatalogError::storage_with_source(format!("Failed to get object {key}"), e)
            }
        })?;
        let (stream, _size) = object
            .content
            .to_stream()
            .await
            .map_err(|e| CatalogError::storage_with_source(format!("Failed to get object stream {key}"), e))?;
        Ok(Box::pin(stream))
    }

    async fn presigned_read_url(&self, key: &str, ttl_secs: u32) -> Result<String> {
        let response = self
            .client
            .get_presigned_object_url(self.bucket.as_str(), key, reqwest::Method::GET)
            .expiry_seconds(ttl_secs)
            .send()
            .await
            .map_err(|e| CatalogError::storage_with_source(format!("Failed to presign {key}"), e))?;
        Ok(response.url)
    }
}
