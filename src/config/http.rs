use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Backend location and transport settings.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct HttpConfig {
    /// Base URL of the TraceExpress backend, e.g. "https://api.traceexpress.com".
    pub base_url: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_in_ms: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Session endpoints and the refresh policy.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct SessionConfig {
    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,
    #[serde(default = "default_login_path")]
    pub login_path: String,
    #[serde(default = "default_signup_path")]
    pub signup_path: String,
    /// Optional server-side logout; when unset, logout only clears local state.
    #[serde(default)]
    pub logout_path: Option<String>,
    /// Upper bound on a single refresh call. Elapse is treated as a failed refresh.
    pub refresh_timeout_in_ms: u64,
}

impl SessionConfig {
    pub fn new(refresh_timeout_in_ms: u64) -> Self {
        SessionConfig {
            refresh_path: default_refresh_path(),
            login_path: default_login_path(),
            signup_path: default_signup_path(),
            logout_path: None,
            refresh_timeout_in_ms,
        }
    }
}

impl HttpConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        HttpConfig {
            base_url: base_url.into(),
            request_timeout_in_ms: default_request_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_request_timeout() -> u64 {
    30_000
}

fn default_user_agent() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

fn default_refresh_path() -> String {
    "/api/user/refreshToken".to_string()
}

fn default_login_path() -> String {
    "/api/user/login".to_string()
}

fn default_signup_path() -> String {
    "/api/user/signup".to_string()
}
