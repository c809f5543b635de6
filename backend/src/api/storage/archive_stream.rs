//! Streaming zip archives assembled from many object reads.
//!
//! Objects are opened concurrently on the async side and handed in key order
//! over a channel to a writer on the blocking pool. Each object is read in full
//! into a spool file before its entry is started, so a read that fails halfway
//! leaves only a placeholder. The writer compresses into one half of an
//! in-memory pipe; the other half is the returned body stream, so the writer
//! only advances as fast as the consumer reads.

use std::{
    fs::File,
    io::{self, Read, Seek, Write},
    sync::Arc,
    time::Duration,
};

use bytes::Bytes;
use futures::{StreamExt, stream};
use tokio::{runtime::Handle, sync::mpsc};
use tokio_util::io::{ReaderStream, StreamReader, SyncIoBridge};
use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

use crate::{
    api::storage::object_store::{ByteStream, ObjectStore},
    config::AppConfig,
    error::{CatalogError, Result},
};

const COPY_BUFFER_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone)]
pub struct ArchiveOptions {
    /// Objects opened at the same time.
    pub concurrency: usize,
    /// Limit for opening one object, and for each wait on its next chunk.
    pub fetch_timeout: Duration,
    /// Bytes buffered between the writer and the consumer.
    pub pipe_capacity: usize,
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self { concurrency: 16, fetch_timeout: Duration::from_secs(30), pipe_capacity: 256 * 1024 }
    }
}

impl ArchiveOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            concurrency: config.fanout_concurrency,
            fetch_timeout: config.archive_fetch_timeout,
            ..Self::default()
        }
    }
}

enum EntrySource {
    Object(ByteStream),
    Failed(String),
}

struct PendingEntry {
    key: String,
    name: String,
    source: EntrySource,
}

#[derive(Debug, Default)]
struct ArchiveSummary {
    written: usize,
    failed: usize,
}

/// Path of `key` inside an archive rooted at `base_prefix`.
pub fn archive_entry_name(key: &str, base_prefix: &str) -> String {
    key.strip_prefix(base_prefix).unwrap_or(key).trim_start_matches('/').to_string()
}

pub fn placeholder_name(entry_name: &str) -> String {
    format!("{entry_name}.error.txt")
}

fn placeholder_text(key: &str, reason: &str) -> String {
    format!("Could not fetch {key}: {reason}")
}

/// Fails a read that waits longer than `idle` for its next chunk.
fn with_idle_timeout(stream: ByteStream, idle: Duration) -> ByteStream {
    Box::pin(stream::unfold(Some(stream), move |state| async move {
        let mut stream = state?;
        match tokio::time::timeout(idle, stream.next()).await {
            Ok(Some(item)) => Some((item, Some(stream))),
            Ok(None) => None,
            Err(_) => Some((
                Err(io::Error::new(io::ErrorKind::TimedOut, format!("no data for {}s", idle.as_secs_f32()))),
                None,
            )),
        }
    }))
}

async fn open_entry(store: Arc<dyn ObjectStore>, key: String, name: String, timeout: Duration) -> PendingEntry {
    let source = match tokio::time::timeout(timeout, store.get_object_stream(&key)).await {
        Ok(Ok(stream)) => EntrySource::Object(with_idle_timeout(stream, timeout)),
        Ok(Err(e)) => {
            tracing::warn!("archive: failed to open {}: {}", key, e);
            EntrySource::Failed(e.to_string())
        }
        Err(_) => {
            tracing::warn!("archive: opening {} timed out", key);
            EntrySource::Failed(format!("timed out after {}s", timeout.as_secs_f32()))
        }
    };
    PendingEntry { key, name, source }
}

fn write_placeholder<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    options: SimpleFileOptions,
    key: &str,
    name: &str,
    reason: &str,
) -> io::Result<()> {
    zip.start_file(placeholder_name(name), options).map_err(io::Error::other)?;
    zip.write_all(placeholder_text(key, reason).as_bytes())
}

/// Copies `reader` into the open entry. Read failures are returned as `Ok(Err)`,
/// write failures as `Err`.
fn copy_entry<R: Read, W: Write>(reader: &mut R, zip: &mut W) -> io::Result<std::result::Result<u64, io::Error>> {
    let mut buf = vec![0u8; COPY_BUFFER_SIZE];
    let mut copied = 0u64;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => return Ok(Ok(copied)),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Ok(Err(e)),
        };
        zip.write_all(&buf[..n])?;
        copied += n as u64;
    }
}

/// Replaces the spool contents with everything `reader` yields. Same result
/// convention as [`copy_entry`].
fn spool_entry<R: Read>(reader: &mut R, spool: &mut File) -> io::Result<std::result::Result<u64, io::Error>> {
    spool.set_len(0)?;
    spool.rewind()?;
    let copied = copy_entry(reader, spool)?;
    spool.rewind()?;
    Ok(copied)
}

fn write_archive<W: Write>(sink: W, mut entries: mpsc::Receiver<PendingEntry>, handle: Handle) -> io::Result<ArchiveSummary> {
    let mut zip = ZipWriter::new_stream(sink);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut summary = ArchiveSummary::default();
    let mut spool = tempfile::tempfile()?;

    while let Some(PendingEntry { key, name, source }) = entries.blocking_recv() {
        let stream = match source {
            EntrySource::Object(stream) => stream,
            EntrySource::Failed(reason) => {
                write_placeholder(&mut zip, options, &key, &name, &reason)?;
                summary.failed += 1;
                continue;
            }
        };

        let mut reader = SyncIoBridge::new_with_handle(StreamReader::new(stream), handle.clone());
        match spool_entry(&mut reader, &mut spool)? {
            Ok(size) => {
                zip.start_file(name.clone(), options).map_err(io::Error::other)?;
                io::copy(&mut (&spool).take(size), &mut zip)?;
                tracing::debug!("archive: added {} ({} bytes)", name, size);
                summary.written += 1;
            }
            Err(e) => {
                tracing::warn!("archive: reading {} failed mid-stream: {}", key, e);
                write_placeholder(&mut zip, options, &key, &name, &format!("read interrupted: {e}"))?;
                summary.failed += 1;
            }
        }
    }

    let mut sink = zip.finish().map_err(io::Error::other)?;
    sink.flush()?;
    Ok(summary)
}

/// Streams a zip of `keys`, named relative to `base_prefix`. Must be called inside a tokio runtime.
///
/// Objects that cannot be read become `<name>.error.txt` entries. Keys whose
/// relative name is empty are left out, and NotFound is returned when that
/// leaves nothing to archive. A failure of the archive writer itself
/// ends the returned stream with an error.
pub fn stream_archive(
    store: Arc<dyn ObjectStore>,
    keys: Vec<String>,
    base_prefix: &str,
    options: &ArchiveOptions,
) -> Result<ByteStream> {
    if keys.is_empty() {
        return Err(CatalogError::NotFound("no keys to archive".to_string()));
    }
    let total = keys.len();
    let named = keys
        .into_iter()
        .filter_map(|key| {
            let name = archive_entry_name(&key, base_prefix);
            if name.is_empty() {
                tracing::debug!("archive: skipping folder key {}", key);
                return None;
            }
            Some((key, name))
        })
        .collect::<Vec<_>>();
    if named.is_empty() {
        return Err(CatalogError::NotFound(format!("only folder keys under {base_prefix:?}")));
    }
    tracing::info!("archive: {} of {} keys under {:?}", named.len(), total, base_prefix);

    let (sender, receiver) = mpsc::channel::<PendingEntry>(1);
    let concurrency = options.concurrency.max(1);
    let timeout = options.fetch_timeout;
    tokio::spawn(async move {
        let mut opened = stream::iter(named)
            .map(|(key, name)| open_entry(store.clone(), key, name, timeout))
            .buffered(concurrency);
        while let Some(entry) = opened.next().await {
            if sender.send(entry).await.is_err() {
                tracing::debug!("archive: writer stopped, no more entries opened");
                break;
            }
        }
    });

    let (pipe_writer, pipe_reader) = tokio::io::duplex(options.pipe_capacity.max(1));
    let sink = SyncIoBridge::new(pipe_writer);
    let handle = Handle::current();
    let writer = tokio::task::spawn_blocking(move || write_archive(sink, receiver, handle));

    let completion = stream::once(async move {
        match writer.await {
            Ok(Ok(summary)) => {
                tracing::info!("archive: finished, {} entries written, {} placeholders", summary.written, summary.failed);
                None::<io::Result<Bytes>>
            }
            Ok(Err(e)) => {
                tracing::error!("archive: writer failed: {}", e);
                Some(Err(e))
            }
            Err(e) => {
                tracing::error!("archive: writer task failed: {}", e);
                Some(Err(io::Error::other(e)))
            }
        }
    })
    .filter_map(futures::future::ready);

    Ok(Box::pin(ReaderStream::new(pipe_reader).chain(completion)))
}

/// Streams every object under `prefix`, with entry names relative to it.
pub async fn stream_archive_for_prefix(
    store: Arc<dyn ObjectStore>,
    prefix: &str,
    options: &ArchiveOptions,
) -> Result<ByteStream> {
    let mut prefix = prefix.trim().to_string();
    if !prefix.is_empty() && !prefix.ends_with('/') {
        prefix.push('/');
    }
    let keys = store.list_objects(&prefix).await?.into_iter().map(|record| record.key).collect::<Vec<_>>();
    if keys.is_empty() {
        return Err(CatalogError::NotFound(format!("no objects under {prefix:?}")));
    }
    stream_archive(store, keys, &prefix, options)
}
