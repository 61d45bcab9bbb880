//! Centralized error handling for the EPG filter
//!
//! Every pipeline stage returns its own error type so the orchestrator can
//! decide per source whether a failure aborts the run or only drops that
//! source from the merge.
//!
//! # Error Categories
//!
//! - **Config Errors**: missing or invalid runtime configuration
//! - **Fetch Errors**: transport failures and non-success HTTP statuses
//! - **Decode Errors**: payloads that are not a supported compressed stream
//! - **Parse Errors**: payloads that are not well-formed XMLTV
//! - **Write Errors**: the output file could not be written
//!
//! # Usage
//!
//! ```rust
//! use epg_filter::errors::{AppError, AppResult};
//!
//! fn example_function() -> AppResult<String> {
//!     Ok("success".to_string())
//! }
//! ```

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for per-source Results
pub type SourceResult<T> = Result<T, SourceError>;
