//! Common library exports shared between the search and storage backends.

extern crate serde;


pub mod facet_catalog;
pub mod search_query;
pub mod search_result;
pub mod search_const;
pub mod object_listing;
