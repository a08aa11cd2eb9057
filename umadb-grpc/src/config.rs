//! Connection settings and the client builder.

use std::{fmt, path::PathBuf};

use serde::Deserialize;
use umadb_core::{Client, InvalidArgument};

use crate::{auth::BearerAuth, channel::GrpcConnector};

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 50051;

/// Where and how to reach an UmaDB server.
///
/// Deserializable so applications can embed it in their own configuration:
///
/// ```
/// let config: umadb_grpc::Config = serde_json::from_str(
///     r#"{ "host": "events.internal", "ca_path": "/etc/umadb/ca.pem", "api_key": "secret" }"#,
/// )?;
/// config.validate()?;
/// assert_eq!(config.port, 50051);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// PEM file with the CA certificate(s) to trust. Enables TLS when set.
    pub ca_path: Option<PathBuf>,
    /// Sent as a bearer token on every call. Requires `ca_path`.
    pub api_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            ca_path: None,
            api_key: None,
        }
    }
}

impl Config {
    /// Check the settings without touching the network.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument`] if the host is blank, the port is zero, or
    /// an API key is configured without TLS or cannot be sent as a header.
    pub fn validate(&self) -> Result<(), InvalidArgument> {
        if self.host.trim().is_empty() {
            return Err(InvalidArgument::config("host must not be empty"));
        }
        if self.port == 0 {
            return Err(InvalidArgument::config("port must be > 0"));
        }
        if let Some(api_key) = &self.api_key {
            if self.ca_path.is_none() {
                return Err(InvalidArgument::config(
                    "an API key requires TLS: configure a CA certificate path",
                ));
            }
            BearerAuth::new(Some(api_key.as_str()))?;
        }
        Ok(())
    }

    #[must_use]
    pub const fn is_secure(&self) -> bool {
        self.ca_path.is_some()
    }

    /// The endpoint URI, `https` when TLS is configured.
    #[must_use]
    pub fn uri(&self) -> String {
        let scheme = if self.is_secure() { "https" } else { "http" };
        format!("{scheme}://{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("ca_path", &self.ca_path)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Builder for a gRPC-backed [`Client`].
///
/// ```
/// let client = umadb_grpc::builder()
///     .host_and_port("events.internal", 50051)
///     .build()?;
/// assert!(!client.is_connected());
/// # Ok::<(), umadb_core::InvalidArgument>(())
/// ```
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct Builder {
    config: Config,
}

/// Start building a client with the default host and port.
pub fn builder() -> Builder {
    Builder::default()
}

impl Builder {
    /// Start from an existing configuration.
    pub const fn from_config(config: Config) -> Self {
        Self { config }
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub const fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn host_and_port(self, host: impl Into<String>, port: u16) -> Self {
        self.host(host).port(port)
    }

    /// Use TLS, trusting the CA certificate(s) in the PEM file at `ca_path`.
    pub fn tls(mut self, ca_path: impl Into<PathBuf>) -> Self {
        self.config.ca_path = Some(ca_path.into());
        self
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.config.api_key = Some(api_key.into());
        self
    }

    pub fn tls_and_api_key(self, ca_path: impl Into<PathBuf>, api_key: impl Into<String>) -> Self {
        self.tls(ca_path).api_key(api_key)
    }

    /// Validate the configuration and create an unconnected client.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument`] if the configuration is invalid; see
    /// [`Config::validate`].
    pub fn build(self) -> Result<Client<GrpcConnector>, InvalidArgument> {
        Ok(Client::new(GrpcConnector::new(self.config)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_local_server() {
        let config = Config::default();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 50051);
        assert_eq!(config.uri(), "http://localhost:50051");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn api_key_without_tls_is_rejected() {
        let error = builder().api_key("secret").build().unwrap_err();
        assert!(error.message().contains("requires TLS"));
    }

    #[test]
    fn api_key_with_tls_is_accepted() {
        let client = builder()
            .tls_and_api_key("/etc/umadb/ca.pem", "secret")
            .build()
            .unwrap();
        assert!(client.connector().config().is_secure());
        assert_eq!(client.connector().config().uri(), "https://localhost:50051");
    }

    #[test]
    fn api_key_must_be_a_valid_header() {
        let error = builder()
            .tls_and_api_key("/ca.pem", "line\nbreak")
            .build()
            .unwrap_err();
        assert!(error.message().contains("API key"));
    }

    #[test]
    fn blank_host_and_zero_port_are_rejected() {
        assert!(builder().host("  ").build().is_err());
        assert!(builder().port(0).build().is_err());
    }

    #[test]
    fn host_and_port_sets_both() {
        let client = builder().host_and_port("db", 7000).build().unwrap();
        assert_eq!(client.connector().config().uri(), "http://db:7000");
    }

    #[test]
    fn from_config_keeps_settings() {
        let config = Config {
            host: "db".to_string(),
            port: 7000,
            ..Config::default()
        };

        let client = Builder::from_config(config.clone()).build().unwrap();

        assert_eq!(client.connector().config(), &config);
        assert_eq!(client.connector().config().uri(), "http://db:7000");
    }

    #[test]
    fn from_config_still_validates() {
        let config = Config {
            api_key: Some("secret".to_string()),
            ..Config::default()
        };

        assert!(Builder::from_config(config).build().is_err());
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: Config = serde_json::from_str(r#"{ "port": 6000 }"#).unwrap();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 6000);
        assert_eq!(config.api_key, None);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(serde_json::from_str::<Config>(r#"{ "hots": "x" }"#).is_err());
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = Config {
            api_key: Some("secret".to_string()),
            ..Config::default()
        };
        assert!(!format!("{config:?}").contains("secret"));
    }
}
