//! Contract of the flat key-space object store.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use common::object_listing::ObjectRecord;
use futures::Stream;

use crate::error::Result;

/// Body of one object, read incrementally.
pub type ByteStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Every object whose key starts with `prefix`, at any depth.
    async fn list_objects(&self, prefix: &str) -> Result<Vec<ObjectRecord>>;

    /// Child prefixes one level below `prefix` (delimiter-bounded), each ending in `/`.
    async fn list_immediate_children(&self, prefix: &str) -> Result<Vec<String>>;

    /// Fails with `CatalogError::NotFound` when the key does not exist.
    async fn get_object_stream(&self, key: &str) -> Result<ByteStream>;

    async fn presigned_read_url(&self, key: &str, ttl_secs: u32) -> Result<String>;
}
