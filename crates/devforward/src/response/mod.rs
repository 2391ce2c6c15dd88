//! Response construction helpers.

pub mod builder;

pub use builder::{bare_internal_error, build_response, text_error_response};
