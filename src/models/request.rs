use reqwest::Method;
use serde_json::Value;
use uuid::Uuid;

/// An immutable description of one backend call.
///
/// Building methods consume and return the descriptor. A replay after a
/// session refresh is a new descriptor produced by [`ApiRequest::retry`], so the
/// caller's copy is never mutated.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    id: Uuid,
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    body: Option<Value>,
    attempt: u32,
    bearer: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        ApiRequest {
            id: Uuid::new_v4(),
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
            attempt: 0,
            bearer: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Adds a header. Names and values are validated when the request is sent.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// The replay of this request: same call, one more attempt, authorized with `token`.
    pub fn retry(&self, token: &str) -> Self {
        ApiRequest {
            attempt: self.attempt + 1,
            bearer: Some(token.to_string()),
            ..self.clone()
        }
    }

    /// Correlates the original call and its replay in logs.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// Zero for an original request, one for its replay.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn is_replay(&self) -> bool {
        self.attempt > 0
    }

    /// Token pinned by `retry`, used instead of the stored one.
    pub fn bearer_override(&self) -> Option<&str> {
        self.bearer.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_retry_produces_new_descriptor() {
        let original = ApiRequest::post("/api/orders")
            .query("page", "2")
            .header("X-Client", "web")
            .json(json!({"weight": 12}));

        let replay = original.retry("T2");

        assert_eq!(original.attempt(), 0);
        assert!(original.bearer_override().is_none());
        assert!(!original.is_replay());

        assert_eq!(replay.attempt(), 1);
        assert!(replay.is_replay());
        assert_eq!(replay.bearer_override(), Some("T2"));
        assert_eq!(replay.id(), original.id());
        assert_eq!(replay.method(), &Method::POST);
        assert_eq!(replay.path(), "/api/orders");
        assert_eq!(replay.query_pairs(), original.query_pairs());
        assert_eq!(replay.headers(), original.headers());
        assert_eq!(replay.body(), Some(&json!({"weight": 12})));
    }
}
