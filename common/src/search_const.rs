//! Paging constants shared by the search surface.

/// Rows per result page when the caller does not ask for a size.
pub const PAGE_SIZE: u64 = 5;

/// Largest page a single search request may ask for.
pub const MAX_PAGE_SIZE: u64 = 500;
