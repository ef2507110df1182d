use std::sync::Arc;

use figment::{
    providers::{Format, Yaml},
    Figment,
};
use traceexpress_client::config::{Config, ConfigV1};
use traceexpress_client::notify::SessionNotifier;
use traceexpress_client::startup::build_client_with_notifier;
use traceexpress_client::ApiClient;

/// Builds a v1 config pointing at `base_url`. `storage` is the YAML body of the
/// `storage` section, indented by four spaces.
pub fn build_config(base_url: &str, storage: &str) -> ConfigV1 {
    let yaml = format!(
        r#"
version: "1.0.0"
http:
  base_url: "{base_url}"
  request_timeout_in_ms: 3000
session:
  refresh_path: "/api/user/refreshToken"
  login_path: "/api/user/login"
  refresh_timeout_in_ms: 2000
storage:
{storage}
logging:
  level: "warn"
  format: "json"
"#
    );

    let config: Config = Figment::new()
        .merge(Yaml::string(&yaml))
        .extract()
        .expect("Failed to parse integration test config");
    config.into_current()
}

pub fn memory_storage() -> &'static str {
    "    type: \"memory\""
}

pub fn file_storage(path: &str) -> String {
    format!("    type: \"file\"\n    path: \"{}\"", path)
}

pub fn build_client(config: &ConfigV1, notifier: Arc<dyn SessionNotifier>) -> ApiClient {
    build_client_with_notifier(config, notifier).expect("Failed to build API client")
}
