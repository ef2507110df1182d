use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

/// Resolves `path` against the backend base URL. Absolute URLs pass through.
pub fn join_url(base_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Validates caller-supplied header pairs into a `HeaderMap`.
pub fn parse_headers(pairs: &[(String, String)]) -> Result<HeaderMap, String> {
    let mut headers = HeaderMap::with_capacity(pairs.len());
    for (name, value) in pairs {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| format!("Invalid header name '{}': {}", name, e))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| format!("Invalid value for header '{}': {}", name, e))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

/// An `Authorization: Bearer` value, marked sensitive so it is redacted from debug output.
pub fn bearer_header(token: &str) -> Result<HeaderValue, String> {
    let mut value = HeaderValue::from_str(&crate::models::token::bearer(token))
        .map_err(|_| "Access token contains characters not allowed in a header".to_string())?;
    value.set_sensitive(true);
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::AUTHORIZATION;

    #[test]
    fn test_join_url_normalizes_slashes() {
        assert_eq!(
            join_url("https://api.traceexpress.com/", "/api/user/refreshToken"),
            "https://api.traceexpress.com/api/user/refreshToken"
        );
        assert_eq!(
            join_url("https://api.traceexpress.com", "api/wallet"),
            "https://api.traceexpress.com/api/wallet"
        );
        assert_eq!(
            join_url("https://api.traceexpress.com", "https://cdn.example.com/x"),
            "https://cdn.example.com/x"
        );
    }

    #[test]
    fn test_parse_headers() {
        let headers = parse_headers(&[("X-Client".to_string(), "web".to_string())]).unwrap();
        assert_eq!(headers.get("x-client").unwrap(), "web");

        assert!(parse_headers(&[("bad header".to_string(), "v".to_string())]).is_err());
        assert!(parse_headers(&[("X-Ok".to_string(), "line\nbreak".to_string())]).is_err());
    }

    #[test]
    fn test_bearer_header_is_sensitive() {
        let value = bearer_header("T1").unwrap();
        assert!(value.is_sensitive());
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, value);
        assert!(!format!("{:?}", headers).contains("T1"));
    }
}
