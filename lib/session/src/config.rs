//! Client configuration.
//!
//! Loaded via the `config` crate from an optional file plus environment
//! variables prefixed with `SCHOLARHUB`, using `__` as the nesting
//! separator (e.g. `SCHOLARHUB__IDENTITY__API_KEY`).

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default Identity Toolkit REST endpoint.
pub const DEFAULT_TOOLKIT_ENDPOINT: &str = "https://identitytoolkit.googleapis.com/v1";

/// Which identity provider backs the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Accounts held in process memory. Useful for local development.
    Memory,
    /// The hosted Identity Toolkit REST API.
    #[default]
    IdentityToolkit,
}

/// Identity provider settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityConfig {
    #[serde(default)]
    provider: ProviderKind,
    /// Web API key of the identity project.
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default = "default_toolkit_endpoint")]
    endpoint: String,
}

fn default_toolkit_endpoint() -> String {
    DEFAULT_TOOLKIT_ENDPOINT.to_string()
}

impl IdentityConfig {
    /// Settings for an Identity Toolkit project.
    #[must_use]
    pub fn identity_toolkit(api_key: String) -> Self {
        Self {
            provider: ProviderKind::IdentityToolkit,
            api_key: Some(api_key),
            endpoint: default_toolkit_endpoint(),
        }
    }

    /// Settings for the in-memory provider.
    #[must_use]
    pub fn memory() -> Self {
        Self {
            provider: ProviderKind::Memory,
            api_key: None,
            endpoint: default_toolkit_endpoint(),
        }
    }

    /// Overrides the REST endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: String) -> Self {
        self.endpoint = endpoint;
        self
    }

    #[must_use]
    pub fn provider(&self) -> ProviderKind {
        self.provider
    }

    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            api_key: None,
            endpoint: default_toolkit_endpoint(),
        }
    }
}

/// Configuration for a session client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the backend API (e.g. "http://localhost:5000").
    api_base_url: String,
    /// Per-request timeout for backend calls.
    /// Default: 10
    #[serde(default = "default_request_timeout_secs")]
    request_timeout_secs: u64,
    /// How long an operation waits for the identity observer to confirm it.
    /// Default: 10000
    #[serde(default = "default_settle_timeout_ms")]
    settle_timeout_ms: u64,
    /// Where rejected or anonymous users are sent.
    /// Default: "/signIn"
    #[serde(default = "default_sign_in_path")]
    sign_in_path: String,
    #[serde(default)]
    identity: IdentityConfig,
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_settle_timeout_ms() -> u64 {
    10_000
}

fn default_sign_in_path() -> String {
    crate::navigation::SIGN_IN_PATH.to_string()
}

impl ClientConfig {
    /// Creates a configuration with defaults for optional fields.
    #[must_use]
    pub fn new(api_base_url: String) -> Self {
        Self::builder(api_base_url).build()
    }

    /// Creates a configuration builder for more customization.
    #[must_use]
    pub fn builder(api_base_url: String) -> ClientConfigBuilder {
        ClientConfigBuilder::new(api_base_url)
    }

    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::load(None)
    }

    /// Loads configuration from an optional file, overridden by environment
    /// variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, or if required
    /// configuration is missing or invalid.
    pub fn load(file: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(file) = file {
            builder = builder.add_source(config::File::from(file.to_path_buf()));
        }
        builder
            .add_source(
                config::Environment::with_prefix("SCHOLARHUB")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    #[must_use]
    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    #[must_use]
    pub fn settle_timeout(&self) -> Duration {
        Duration::from_millis(self.settle_timeout_ms)
    }

    #[must_use]
    pub fn sign_in_path(&self) -> &str {
        &self.sign_in_path
    }

    #[must_use]
    pub fn identity(&self) -> &IdentityConfig {
        &self.identity
    }
}

/// Builder for `ClientConfig`.
#[derive(Debug)]
pub struct ClientConfigBuilder {
    api_base_url: String,
    request_timeout: Duration,
    settle_timeout: Duration,
    sign_in_path: String,
    identity: IdentityConfig,
}

impl ClientConfigBuilder {
    #[must_use]
    pub fn new(api_base_url: String) -> Self {
        Self {
            api_base_url,
            request_timeout: Duration::from_secs(default_request_timeout_secs()),
            settle_timeout: Duration::from_millis(default_settle_timeout_ms()),
            sign_in_path: default_sign_in_path(),
            identity: IdentityConfig::default(),
        }
    }

    /// Sets the per-request timeout. Sub-second precision is dropped.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn settle_timeout(mut self, timeout: Duration) -> Self {
        self.settle_timeout = timeout;
        self
    }

    #[must_use]
    pub fn sign_in_path(mut self, path: String) -> Self {
        self.sign_in_path = path;
        self
    }

    #[must_use]
    pub fn identity(mut self, identity: IdentityConfig) -> Self {
        self.identity = identity;
        self
    }

    #[must_use]
    pub fn build(self) -> ClientConfig {
        ClientConfig {
            api_base_url: self.api_base_url,
            request_timeout_secs: self.request_timeout.as_secs(),
            settle_timeout_ms: u64::try_from(self.settle_timeout.as_millis()).unwrap_or(u64::MAX),
            sign_in_path: self.sign_in_path,
            identity: self.identity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn new_config_has_defaults() {
        let config = ClientConfig::new("http://localhost:5000".to_string());

        assert_eq!(config.api_base_url(), "http://localhost:5000");
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.settle_timeout(), Duration::from_secs(10));
        assert_eq!(config.sign_in_path(), "/signIn");
        assert_eq!(config.identity().provider(), ProviderKind::IdentityToolkit);
        assert_eq!(config.identity().endpoint(), DEFAULT_TOOLKIT_ENDPOINT);
        assert!(config.identity().api_key().is_none());
    }

    #[test]
    fn builder_allows_customization() {
        let config = ClientConfig::builder("http://api.test".to_string())
            .request_timeout(Duration::from_secs(3))
            .settle_timeout(Duration::from_millis(250))
            .sign_in_path("/login".to_string())
            .identity(IdentityConfig::memory())
            .build();

        assert_eq!(config.request_timeout(), Duration::from_secs(3));
        assert_eq!(config.settle_timeout(), Duration::from_millis(250));
        assert_eq!(config.sign_in_path(), "/login");
        assert_eq!(config.identity().provider(), ProviderKind::Memory);
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let json = r#"{
            "api_base_url": "http://localhost:5000",
            "identity": { "provider": "identity_toolkit", "api_key": "web-key" }
        }"#;

        let config: ClientConfig = serde_json::from_str(json).expect("deserialize");

        assert_eq!(config.settle_timeout(), Duration::from_secs(10));
        assert_eq!(config.identity().api_key(), Some("web-key"));
        assert_eq!(config.identity().endpoint(), DEFAULT_TOOLKIT_ENDPOINT);
    }

    #[test]
    fn load_reads_toml_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("scholarhub.toml");
        let mut file = std::fs::File::create(&path).expect("create");
        writeln!(
            file,
            r#"
api_base_url = "http://backend.test:5000"
settle_timeout_ms = 500

[identity]
provider = "memory"
"#
        )
        .expect("write");

        let config = ClientConfig::load(Some(&path)).expect("load");

        assert_eq!(config.api_base_url(), "http://backend.test:5000");
        assert_eq!(config.settle_timeout(), Duration::from_millis(500));
        assert_eq!(config.identity().provider(), ProviderKind::Memory);
    }

    #[test]
    fn load_without_base_url_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("empty.toml");
        std::fs::write(&path, "sign_in_path = \"/login\"\n").expect("write");

        assert!(ClientConfig::load(Some(&path)).is_err());
    }
}
