//! Application startup: command-line parsing and wiring configuration into a ready client.

use std::sync::Arc;

use reqwest::Method;
use serde_json::Value;

use crate::client::ApiClient;
use crate::config::ConfigV1;
use crate::errors::ApiError;
use crate::models::ApiRequest;
use crate::notify::{LogNotifier, SessionNotifier};
use crate::store::create_store;

/// One request as given on the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

impl Invocation {
    /// Parses `<METHOD> <PATH> [JSON_BODY]`.
    pub fn parse(args: &[String]) -> Result<Self, String> {
        let (method, path, body) = match args {
            [method, path] => (method, path, None),
            [method, path, body] => (method, path, Some(body)),
            _ => return Err("expected <METHOD> <PATH> [JSON_BODY]".to_string()),
        };
        let method = Method::from_bytes(method.to_uppercase().as_bytes())
            .map_err(|_| format!("'{}' is not an HTTP method", method))?;
        let body = body
            .map(|raw| serde_json::from_str(raw).map_err(|e| format!("Body is not JSON: {}", e)))
            .transpose()?;
        Ok(Invocation {
            method,
            path: path.clone(),
            body,
        })
    }

    pub fn to_request(&self) -> ApiRequest {
        let request = ApiRequest::new(self.method.clone(), self.path.as_str());
        match &self.body {
            Some(body) => request.json(body.clone()),
            None => request,
        }
    }
}

/// Builds the API client described by `config`, with session expiry reported through the log.
pub fn build_client(config: &ConfigV1) -> Result<ApiClient, ApiError> {
    build_client_with_notifier(config, Arc::new(LogNotifier))
}

/// Builds the API client described by `config`, reporting session expiry to `notifier`.
pub fn build_client_with_notifier(
    config: &ConfigV1,
    notifier: Arc<dyn SessionNotifier>,
) -> Result<ApiClient, ApiError> {
    let store = create_store(&config.storage);
    ApiClient::new(config, store, notifier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_parse_invocation() {
        let invocation = Invocation::parse(&args(&["get", "/api/orders/17"])).unwrap();
        assert_eq!(invocation.method, Method::GET);
        assert_eq!(invocation.path, "/api/orders/17");
        assert!(invocation.body.is_none());

        let invocation =
            Invocation::parse(&args(&["POST", "/api/disputes", r#"{"orderId": 17}"#])).unwrap();
        assert_eq!(invocation.body, Some(json!({"orderId": 17})));
        assert_eq!(invocation.to_request().body(), Some(&json!({"orderId": 17})));
    }

    #[test]
    fn test_parse_invocation_errors() {
        assert!(Invocation::parse(&args(&["GET"])).is_err());
        assert!(Invocation::parse(&args(&["GET", "/a", "{", "extra"])).is_err());
        assert!(Invocation::parse(&args(&["POST", "/a", "{not json"])).is_err());
        assert!(Invocation::parse(&args(&["G E T", "/a"])).is_err());
    }
}
