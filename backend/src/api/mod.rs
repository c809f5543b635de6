//! Search and storage operations behind the HTTP handlers.

pub mod search;
pub mod storage;
