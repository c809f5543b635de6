//! In-memory object store for tests and local runs without an S3 endpoint.

use std::{
    collections::{BTreeMap, BTreeSet, HashSet},
    sync::{
        RwLock,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use common::object_listing::{ObjectRecord, PATH_SEPARATOR};
use futures::stream;

use crate::{
    api::storage::object_store::{ByteStream, ObjectStore},
    error::{CatalogError, Result},
};

const CHUNK_SIZE: usize = 8 * 1024;

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    last_modified: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: RwLock<BTreeMap<String, StoredObject>>,
    /// Keys or listing prefixes whose calls fail.
    failing: RwLock<HashSet<String>>,
    /// Keys whose reads never complete.
    stalled: RwLock<HashSet<String>>,
    /// Keys whose reads fail after the first chunk.
    broken: RwLock<HashSet<String>>,
    latency: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: AtomicUsize,
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call sleeps for `latency` first, so concurrent calls overlap.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn insert(&self, key: impl Into<String>, data: impl Into<Bytes>) {
        if let Ok(mut objects) = self.objects.write() {
            objects.insert(key.into(), StoredObject { data: data.into(), last_modified: Utc::now() });
        }
    }

    /// Makes reads and presigns of `key`, and listings of `key` as a prefix, fail.
    pub fn fail_on(&self, key: impl Into<String>) {
        if let Ok(mut failing) = self.failing.write() {
            failing.insert(key.into());
        }
    }

    pub fn stall_on(&self, key: impl Into<String>) {
        if let Ok(mut stalled) = self.stalled.write() {
            stalled.insert(key.into());
        }
    }

    pub fn break_on(&self, key: impl Into<String>) {
        if let Ok(mut broken) = self.broken.write() {
            broken.insert(key.into());
        }
    }

    /// Highest number of calls that were outstanding at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn enter(&self, target: &str) -> Result<InFlight<'_>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let guard = InFlight(&self.in_flight);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let failing = self.failing.read().map_err(|_| CatalogError::storage("lock poisoned"))?;
        if failing.contains(target) {
            return Err(CatalogError::storage(format!("simulated failure for {target}")));
        }
        Ok(guard)
    }

    fn snapshot(&self) -> Result<BTreeMap<String, StoredObject>> {
        self.objects.read().map(|objects| objects.clone()).map_err(|_| CatalogError::storage("lock poisoned"))
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn list_objects(&self, prefix: &str) -> Result<Vec<ObjectRecord>> {
        let _guard = self.enter(prefix).await?;
        Ok(self
            .snapshot()?
            .into_iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, object)| ObjectRecord::new(key, object.data.len() as u64, Some(object.last_modified)))
            .collect())
    }

    async fn list_immediate_children(&self, prefix: &str) -> Result<Vec<String>> {
        let _guard = self.enter(prefix).await?;
        let children = self
            .snapshot()?
            .into_keys()
            .filter_map(|key| {
                let rest = key.strip_prefix(prefix)?;
                let end = rest.find(PATH_SEPARATOR)?;
                Some(format!("{prefix}{}", &rest[..=end]))
            })
            .collect::<BTreeSet<_>>();
        Ok(children.into_iter().collect())
    }

    async fn get_object_stream(&self, key: &str) -> Result<ByteStream> {
        let _guard = self.enter(key).await?;
        let stalled = self.stalled.read().map(|stalled| stalled.contains(key)).unwrap_or(false);
        if stalled {
            futures::future::pending::<()>().await;
        }
        let object = self.snapshot()?.remove(key).ok_or_else(|| CatalogError::NotFound(key.to_string()))?;
        let data = object.data;
        let chunks = (0..data.len())
            .step_by(CHUNK_SIZE)
            .map(|start| Ok(data.slice(start..(start + CHUNK_SIZE).min(data.len()))))
            .collect::<Vec<std::io::Result<Bytes>>>();
        let broken = self.broken.read().map(|broken| broken.contains(key)).unwrap_or(false);
        if broken {
            let first = chunks.into_iter().take(1);
            let failure = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "simulated read failure");
            return Ok(Box::pin(stream::iter(first.chain(std::iter::once(Err(failure))))));
        }
        Ok(Box::pin(stream::iter(chunks)))
    }

    async fn presigned_read_url(&self, key: &str, ttl_secs: u32) -> Result<String> {
        let _guard = self.enter(key).await?;
        Ok(format!("memory:///{key}?expires={ttl_secs}"))
    }
}
