//! Library exports for the TraceExpress API client, shared between the binary and tests.

pub mod client;
pub mod config;
pub mod errors;
pub mod metrics;
pub mod models;
pub mod notify;
pub mod startup;
pub mod store;
pub mod utils;

pub use client::ApiClient;
pub use errors::{ApiError, RefreshError};
pub use models::{ApiRequest, ApiResponse};
