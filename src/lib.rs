//! Campaign progress and dedication API.
//!
//! A small HTTP backend over two records: the campaign funding-progress
//! singleton and the list of dedications (named giving opportunities with a
//! price and a sale status).
//!
//! ```text
//! HTTP request ──► validation ──► StorageAdapter ──► RecordStore
//!                                  (seed, ids,        (file | jsonbin |
//!                                   write locks)       sqlite | memory)
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`model`]: Campaign and dedication records, seed data
//! - [`storage`]: Backends and the data-access adapter
//! - [`api`]: HTTP routes, validation and response envelope
//! - [`metrics`]: Prometheus metrics
//! - [`utils`]: Utility functions

pub mod api;
pub mod config;
pub mod error;
pub mod metrics;
pub mod model;
pub mod storage;
pub mod utils;

pub use config::Config;
pub use error::{AppError, Result, StorageError};
