use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, AUTHORIZATION};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use super::refresh::{RefreshCoordinator, RefreshStatus, Role};
use super::transport::{OutgoingRequest, ReqwestTransport, Transport};
use crate::config::{ConfigV1, SessionConfig};
use crate::errors::{ApiError, RefreshError};
use crate::metrics::{Metrics, MetricsRecorder};
use crate::models::{AccessTokenPayload, ApiRequest, ApiResponse};
use crate::notify::{SessionNotifier, SESSION_EXPIRED_MESSAGE};
use crate::store::TokenStore;
use crate::utils::http_helpers::{bearer_header, join_url, parse_headers};
use crate::utils::log_throttle::should_emit;

const QUEUED_LOG_WINDOW: Duration = Duration::from_secs(10);

/// The HTTP client every screen talks to the backend through.
///
/// Requests are decorated with the stored access token. A 401 on an original
/// request triggers one session refresh (shared with any other request that
/// 401s meanwhile) and a single replay with the new token.
pub struct ApiClient {
    base_url: String,
    session: SessionConfig,
    transport: Arc<dyn Transport>,
    store: Arc<dyn TokenStore>,
    notifier: Arc<dyn SessionNotifier>,
    refresher: RefreshCoordinator,
    default_headers: RwLock<HeaderMap>,
    metrics: Metrics,
}

impl ApiClient {
    /// Builds a client on the `reqwest` transport from the loaded configuration.
    pub fn new(
        config: &ConfigV1,
        store: Arc<dyn TokenStore>,
        notifier: Arc<dyn SessionNotifier>,
    ) -> Result<Self, ApiError> {
        let transport = ReqwestTransport::new(&config.http).map_err(ApiError::Transport)?;
        Ok(Self::with_transport(
            &config.http.base_url,
            config.session.clone(),
            Arc::new(transport),
            store,
            notifier,
        ))
    }

    pub fn with_transport(
        base_url: &str,
        session: SessionConfig,
        transport: Arc<dyn Transport>,
        store: Arc<dyn TokenStore>,
        notifier: Arc<dyn SessionNotifier>,
    ) -> Self {
        info!(
            "Creating API client for '{}' (refresh endpoint '{}', refresh timeout {}ms)",
            base_url, session.refresh_path, session.refresh_timeout_in_ms
        );
        ApiClient {
            base_url: base_url.to_string(),
            session,
            transport,
            store,
            notifier,
            refresher: RefreshCoordinator::new(),
            default_headers: RwLock::new(HeaderMap::new()),
            metrics: Metrics::new(),
        }
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn refresh_status(&self) -> RefreshStatus {
        self.refresher.status()
    }

    /// Requests currently parked behind an in-flight refresh.
    pub fn pending_refreshes(&self) -> usize {
        self.refresher.pending()
    }

    /// The `Authorization` value applied by default, as last set by a refresh or login.
    pub fn default_authorization(&self) -> Option<String> {
        self.read_defaults()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    pub(crate) fn session_config(&self) -> &SessionConfig {
        &self.session
    }

    pub(crate) fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    /// Sends `request`, transparently renewing the session once on a 401.
    pub async fn request(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let started = Instant::now();
        let method = request.method().to_string();

        let result = self.dispatch(request).await;

        let outcome = match &result {
            Ok(_) => "ok",
            Err(ApiError::Status { .. }) => "http_error",
            Err(ApiError::SessionExpired(_)) => "session_expired",
            Err(ApiError::Transport(_)) => "transport_error",
            Err(_) => "client_error",
        };
        self.metrics.record_request(&method, outcome);
        self.metrics
            .record_request_duration(&method, started.elapsed().as_secs_f64());
        result
    }

    pub async fn get(&self, path: &str) -> Result<ApiResponse, ApiError> {
        self.request(ApiRequest::get(path)).await
    }

    pub async fn post(&self, path: &str, body: Value) -> Result<ApiResponse, ApiError> {
        self.request(ApiRequest::post(path).json(body)).await
    }

    pub async fn put(&self, path: &str, body: Value) -> Result<ApiResponse, ApiError> {
        self.request(ApiRequest::put(path).json(body)).await
    }

    pub async fn patch(&self, path: &str, body: Value) -> Result<ApiResponse, ApiError> {
        self.request(ApiRequest::patch(path).json(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<ApiResponse, ApiError> {
        self.request(ApiRequest::delete(path)).await
    }

    async fn dispatch(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let sent_token = self.token_for(&request).await?;
        let response = self.send_with(&request, sent_token.as_deref()).await?;
        if response.is_success() {
            return Ok(response);
        }
        if response.status == StatusCode::UNAUTHORIZED && !request.is_replay() {
            return self.recover(request, sent_token).await;
        }
        Err(response.into_error())
    }

    /// Renews the session (or waits for the renewal in flight) and replays `request` once.
    /// If a renewal already replaced `sent_token` while the request was out, the replay
    /// uses the stored token directly.
    async fn recover(
        &self,
        request: ApiRequest,
        sent_token: Option<String>,
    ) -> Result<ApiResponse, ApiError> {
        let token = match self.rotated_token(sent_token.as_deref()).await? {
            Some(current) => {
                debug!(
                    request_id = %request.id(),
                    "{} {} was sent with a superseded token; replaying without refresh",
                    request.method(),
                    request.path()
                );
                current
            }
            None => self.renew(&request).await?,
        };

        let replay = request.retry(&token);
        let response = self.send(&replay).await;
        let result = match response {
            Ok(response) if response.is_success() => Ok(response),
            Ok(response) => Err(response.into_error()),
            Err(e) => Err(e),
        };

        match &result {
            Ok(_) => self.metrics.record_replay("ok"),
            Err(e) => {
                self.metrics.record_replay("error");
                warn!(
                    request_id = %replay.id(),
                    "Replay of {} {} failed: {}",
                    replay.method(),
                    replay.path(),
                    e
                );
            }
        }
        result
    }

    async fn renew(&self, request: &ApiRequest) -> Result<String, RefreshError> {
        debug!(
            request_id = %request.id(),
            "{} {} was unauthorized; renewing session",
            request.method(),
            request.path()
        );

        let renewal = self.refresher.obtain(|| self.refresh_session()).await;
        if renewal.role == Role::Queued {
            self.metrics.record_queued();
            if let Some(suppressed_count) = should_emit("client.refresh.queued", QUEUED_LOG_WINDOW)
            {
                debug!(
                    event_name = "client.refresh.queued",
                    event_domain = "session",
                    request_id = %request.id(),
                    suppressed_count,
                    "request waited on a refresh already in flight"
                );
            }
        }
        renewal.outcome
    }

    /// The stored token, when no refresh is in flight and it differs from `sent`.
    async fn rotated_token(&self, sent: Option<&str>) -> Result<Option<String>, ApiError> {
        if self.refresher.status() != RefreshStatus::Idle {
            return Ok(None);
        }
        let current = self.store.get_token().await.map_err(ApiError::Storage)?;
        Ok(current.filter(|current| sent != Some(current.as_str())))
    }

    /// Leader side of a renewal: call the refresh endpoint within the configured
    /// timeout, then adopt the new token or tear the session down.
    async fn refresh_session(&self) -> Result<String, RefreshError> {
        let started = Instant::now();
        let timeout_in_ms = self.session.refresh_timeout_in_ms;
        info!(
            event_name = "client.refresh.started",
            event_domain = "session",
            "Refreshing access token"
        );

        let outcome = match timeout(
            Duration::from_millis(timeout_in_ms),
            self.call_refresh_endpoint(),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(_) => Err(RefreshError::TimedOut { timeout_in_ms }),
        };
        self.metrics
            .record_refresh_duration(started.elapsed().as_secs_f64());

        match outcome {
            Ok(token) => {
                self.adopt_token(&token).await;
                self.metrics.record_refresh("success");
                info!(
                    event_name = "client.refresh.succeeded",
                    event_domain = "session",
                    "Access token refreshed"
                );
                Ok(token)
            }
            Err(e) => {
                let result = match e {
                    RefreshError::TimedOut { .. } => "timeout",
                    _ => "failure",
                };
                self.metrics.record_refresh(result);
                warn!(
                    event_name = "client.refresh.failed",
                    event_domain = "session",
                    "Session refresh failed: {}",
                    e
                );
                self.expire_session().await;
                Err(e)
            }
        }
    }

    async fn call_refresh_endpoint(&self) -> Result<String, RefreshError> {
        // The refresh credential rides in the transport's cookie store; no Authorization header.
        let outgoing = OutgoingRequest {
            method: Method::POST,
            url: join_url(&self.base_url, &self.session.refresh_path),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
        };
        let response = self
            .transport
            .send(outgoing)
            .await
            .map_err(RefreshError::Transport)?;
        if !response.is_success() {
            return Err(RefreshError::Rejected {
                status: response.status.as_u16(),
            });
        }
        AccessTokenPayload::from_slice(&response.body)
            .map(|payload| payload.access_token)
            .map_err(RefreshError::MalformedResponse)
    }

    /// Persists `token` and makes it the default `Authorization` for later calls.
    pub(crate) async fn adopt_token(&self, token: &str) {
        if let Err(e) = self.store.set_token(token).await {
            // The default header still carries the token for this process.
            error!("Failed to persist access token: {}", e);
        }
        self.set_default_authorization(Some(token));
    }

    /// Forgets the access token everywhere and tells the UI layer.
    async fn expire_session(&self) {
        self.clear_token().await;
        self.notifier.session_expired(SESSION_EXPIRED_MESSAGE);
    }

    pub(crate) async fn clear_token(&self) {
        self.set_default_authorization(None);
        if let Err(e) = self.store.remove_token().await {
            error!("Failed to remove stored access token: {}", e);
        }
    }

    fn set_default_authorization(&self, token: Option<&str>) {
        let mut defaults = self
            .default_headers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match token.map(bearer_header) {
            Some(Ok(value)) => {
                defaults.insert(AUTHORIZATION, value);
            }
            Some(Err(e)) => {
                warn!("Not using access token as default header: {}", e);
                defaults.remove(AUTHORIZATION);
            }
            None => {
                defaults.remove(AUTHORIZATION);
            }
        }
    }

    fn read_defaults(&self) -> std::sync::RwLockReadGuard<'_, HeaderMap> {
        self.default_headers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// The token `request` goes out with: its pinned replay token, else the stored one.
    async fn token_for(&self, request: &ApiRequest) -> Result<Option<String>, ApiError> {
        match request.bearer_override() {
            Some(token) => Ok(Some(token.to_string())),
            None => self.store.get_token().await.map_err(ApiError::Storage),
        }
    }

    /// Applies default headers, the request's own headers and the bearer token.
    fn decorate(
        &self,
        request: &ApiRequest,
        token: Option<&str>,
    ) -> Result<OutgoingRequest, ApiError> {
        let mut headers = self.read_defaults().clone();
        let own = parse_headers(request.headers()).map_err(ApiError::InvalidRequest)?;
        for (name, value) in own.iter() {
            headers.insert(name.clone(), value.clone());
        }
        if let Some(token) = token {
            headers.insert(
                AUTHORIZATION,
                bearer_header(token).map_err(ApiError::InvalidRequest)?,
            );
        }

        Ok(OutgoingRequest {
            method: request.method().clone(),
            url: join_url(&self.base_url, request.path()),
            query: request.query_pairs().to_vec(),
            headers,
            body: request.body().cloned(),
        })
    }

    /// One round trip for `request`, without any recovery.
    pub(crate) async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let token = self.token_for(request).await?;
        self.send_with(request, token.as_deref()).await
    }

    async fn send_with(
        &self,
        request: &ApiRequest,
        token: Option<&str>,
    ) -> Result<ApiResponse, ApiError> {
        let outgoing = self.decorate(request, token)?;
        debug!(
            request_id = %request.id(),
            attempt = request.attempt(),
            "Sending {} {}",
            outgoing.method,
            outgoing.url
        );
        self.transport
            .send(outgoing)
            .await
            .map_err(ApiError::Transport)
    }
}
