//! Login, signup and logout: the calls that create or end a session.
//!
//! These never go through the refresh protocol. A 401 from login means wrong
//! credentials, not an expired token.

use serde_json::Value;
use tracing::{info, warn};

use super::api_client::ApiClient;
use crate::errors::ApiError;
use crate::models::{AccessTokenPayload, ApiRequest, ApiResponse};

impl ApiClient {
    /// Logs in with the given credentials and adopts the returned access token.
    /// Returns the full response so callers can read profile data sent alongside it.
    pub async fn login(&self, credentials: &Value) -> Result<ApiResponse, ApiError> {
        let path = self.session_config().login_path.clone();
        let response = self.open_session(&path, credentials).await?;
        info!(
            event_name = "client.session.login",
            event_domain = "session",
            "Logged in"
        );
        Ok(response)
    }

    /// Registers a new account and adopts the returned access token.
    pub async fn signup(&self, form: &Value) -> Result<ApiResponse, ApiError> {
        let path = self.session_config().signup_path.clone();
        let response = self.open_session(&path, form).await?;
        info!(
            event_name = "client.session.signup",
            event_domain = "session",
            "Signed up"
        );
        Ok(response)
    }

    /// Ends the session locally and, when a logout endpoint is configured,
    /// on the backend. A failing backend logout is logged and otherwise ignored.
    pub async fn logout(&self) -> Result<(), ApiError> {
        if let Some(path) = self.session_config().logout_path.clone() {
            match self.send(&ApiRequest::post(path.as_str())).await {
                Ok(response) if response.is_success() => {}
                Ok(response) => warn!("Backend logout answered {}", response.status),
                Err(e) => warn!("Backend logout failed: {}", e),
            }
        }
        self.clear_token().await;
        info!(
            event_name = "client.session.logout",
            event_domain = "session",
            "Logged out"
        );
        Ok(())
    }

    /// Whether an access token is currently stored.
    pub async fn is_authenticated(&self) -> Result<bool, ApiError> {
        Ok(self
            .store()
            .get_token()
            .await
            .map_err(ApiError::Storage)?
            .is_some())
    }

    async fn open_session(&self, path: &str, body: &Value) -> Result<ApiResponse, ApiError> {
        let response = self
            .send(&ApiRequest::post(path).json(body.clone()))
            .await?;
        if !response.is_success() {
            return Err(response.into_error());
        }
        let payload = AccessTokenPayload::from_slice(&response.body).map_err(ApiError::Decode)?;
        self.adopt_token(&payload.access_token).await;
        Ok(response)
    }
}
