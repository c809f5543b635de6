pub mod qlever_utils;
pub mod s3_utils;
#[cfg(any(test, feature = "test-support"))]
pub mod static_query_service;
pub mod tabular;
