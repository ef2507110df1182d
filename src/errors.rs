//! Error types surfaced by the API client.

use reqwest::StatusCode;
use thiserror::Error;

/// Why a session refresh failed.
///
/// The same value is handed to the caller that drove the refresh and to every
/// request that was queued behind it, hence `Clone`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RefreshError {
    #[error("refresh request failed: {0}")]
    Transport(String),
    #[error("refresh endpoint answered with status {status}")]
    Rejected { status: u16 },
    #[error("refresh response did not carry an access token: {0}")]
    MalformedResponse(String),
    #[error("refresh did not complete within {timeout_in_ms}ms")]
    TimedOut { timeout_in_ms: u64 },
}

/// Errors returned by `ApiClient` requests.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Non-2xx answer passed through to the caller untouched.
    #[error("request failed with status {status}")]
    Status { status: StatusCode, body: String },
    #[error("transport error: {0}")]
    Transport(String),
    /// The access token expired and could not be renewed.
    #[error("session expired: {0}")]
    SessionExpired(#[from] RefreshError),
    #[error("token storage error: {0}")]
    Storage(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("could not decode response body: {0}")]
    Decode(String),
}

impl ApiError {
    /// The HTTP status carried by this error, if the backend produced one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for both a failed refresh and a replay that was still unauthorized.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, ApiError::SessionExpired(_))
            || self.status() == Some(StatusCode::UNAUTHORIZED)
    }
}
