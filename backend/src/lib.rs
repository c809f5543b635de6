//! Faceted campaign search over a SPARQL endpoint and browsing of the batch object store.

pub mod api;
pub mod config;
pub mod db_utils;
pub mod error;
pub mod observability;
pub mod server_extra;
