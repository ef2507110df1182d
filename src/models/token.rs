use serde::{Deserialize, Serialize};

/// Body returned by the refresh, login and signup endpoints.
/// Other fields the backend sends alongside the token are ignored.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AccessTokenPayload {
    #[serde(rename = "accessToken")]
    pub access_token: String,
}

impl AccessTokenPayload {
    /// Parses the payload, rejecting an empty token.
    pub fn from_slice(body: &[u8]) -> Result<Self, String> {
        let payload: AccessTokenPayload =
            serde_json::from_slice(body).map_err(|e| format!("Failed to parse token JSON: {}", e))?;
        if payload.access_token.trim().is_empty() {
            return Err("accessToken is empty".to_string());
        }
        Ok(payload)
    }
}

/// Formats the value of an `Authorization` header for a bearer token.
pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}
