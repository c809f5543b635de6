//! Object store browsing: listings, prefix discovery and archive downloads.

pub mod archive_stream;
pub mod campaign_folders;
pub mod discover_prefixes;
pub mod download_urls;
pub mod folder_groups;
#[cfg(any(test, feature = "test-support"))]
pub mod memory_store;
pub mod minio_store;
pub mod object_store;

pub use archive_stream::{ArchiveOptions, stream_archive, stream_archive_for_prefix};
pub use discover_prefixes::discover_leaf_prefixes;
pub use folder_groups::group_by_folder;
pub use object_store::{ByteStream, ObjectStore};
