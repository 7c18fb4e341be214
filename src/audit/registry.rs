//! npm registry client.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::model::ReleaseTimestamp;
use crate::traits::{LookupError, ReleaseLookup};

pub const DEFAULT_REGISTRY_URL: &str = "https://registry.npmjs.org";

/// Registry client configuration
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Registry root, without trailing slash
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// User-Agent header sent with every request
    pub user_agent: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_REGISTRY_URL.to_string(),
            timeout: Duration::from_secs(10),
            user_agent: concat!("bunlock-audit/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl RegistryConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Percent-encodes a package name for use in a registry URL.
///
/// `@` and `/` stay literal so scoped names route as `@scope/name`.
pub fn encode_package_name(name: &str) -> String {
    name.split('/')
        .map(|segment| {
            segment
                .split('@')
                .map(|part| urlencoding::encode(part).into_owned())
                .collect::<Vec<_>>()
                .join("@")
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Looks up version publish times from the `time` map of an npm packument.
pub struct NpmRegistryClient {
    config: RegistryConfig,
    client: reqwest::Client,
}

impl NpmRegistryClient {
    pub fn new(config: RegistryConfig) -> Result<Self, LookupError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn package_url(&self, name: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            encode_package_name(name)
        )
    }
}

/// Extracts `time[version]` from a packument body.
fn release_time(packument: &Value, version: &str) -> Result<ReleaseTimestamp, LookupError> {
    let Some(entry) = packument.get("time").and_then(|t| t.get(version)) else {
        return Ok(ReleaseTimestamp::Unknown);
    };

    entry
        .as_str()
        .map(|raw| ReleaseTimestamp::Published(raw.to_string()))
        .ok_or_else(|| LookupError::MalformedTime(version.to_string()))
}

#[async_trait]
impl ReleaseLookup for NpmRegistryClient {
    fn registry_id(&self) -> &str {
        "npm"
    }

    async fn lookup(&self, name: &str, version: &str) -> Result<ReleaseTimestamp, LookupError> {
        let response = self.client.get(self.package_url(name)).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::Status(status.as_u16()));
        }

        let packument: Value = response
            .json()
            .await
            .map_err(|e| LookupError::InvalidBody(e.to_string()))?;

        release_time(&packument, version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encode_keeps_scope_readable() {
        assert_eq!(encode_package_name("@babel/core"), "@babel/core");
        assert_eq!(encode_package_name("lodash"), "lodash");
        assert_eq!(encode_package_name("a b+c"), "a%20b%2Bc");
    }

    #[test]
    fn test_package_url_trims_trailing_slash() {
        let client = NpmRegistryClient::new(
            RegistryConfig::default().with_base_url("http://localhost:4873/"),
        )
        .unwrap();
        assert_eq!(
            client.package_url("@types/node"),
            "http://localhost:4873/@types/node"
        );
    }

    #[test]
    fn test_client_keeps_config() {
        let client = NpmRegistryClient::new(
            RegistryConfig::default()
                .with_base_url("http://localhost:4873")
                .with_timeout(Duration::from_secs(3)),
        )
        .unwrap();

        assert_eq!(client.config().base_url, "http://localhost:4873");
        assert_eq!(client.config().timeout, Duration::from_secs(3));
        assert!(client.config().user_agent.starts_with("bunlock-audit/"));
    }

    #[test]
    fn test_release_time_for_known_version() {
        let body = json!({ "time": { "18.2.0": "2022-06-14T15:30:00.000Z" } });
        assert_eq!(
            release_time(&body, "18.2.0").unwrap(),
            ReleaseTimestamp::Published("2022-06-14T15:30:00.000Z".into())
        );
    }

    #[test]
    fn test_release_time_unknown_version() {
        let body = json!({ "time": { "1.0.0": "2020-01-01T00:00:00.000Z" } });
        assert_eq!(release_time(&body, "2.0.0").unwrap(), ReleaseTimestamp::Unknown);
        assert_eq!(release_time(&json!({}), "2.0.0").unwrap(), ReleaseTimestamp::Unknown);
    }

    #[test]
    fn test_release_time_non_string_entry() {
        let body = json!({ "time": { "1.0.0": 1577836800 } });
        assert!(matches!(
            release_time(&body, "1.0.0"),
            Err(LookupError::MalformedTime(_))
        ));
    }

    #[test]
    fn test_default_config() {
        let config = RegistryConfig::default();
        assert_eq!(config.base_url, DEFAULT_REGISTRY_URL);
        assert_eq!(config.timeout, Duration::from_secs(10));
    }
}
