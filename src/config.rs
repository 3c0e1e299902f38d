use std::time::Duration;
use crate::core::{AdapterError, Result};

/// Store connection configuration
///
/// Either host/port/scheme (plus an optional path prefix) or a full base
/// URI; an explicit URI wins.
#[derive(Debug, Clone)]
pub struct AdapterConfig {
    /// `http` or `https`
    pub scheme: String,

    /// Store host
    pub host: String,

    /// Store port
    pub port: u16,

    /// Path the store is mounted under, e.g. `/persevere`
    pub path_prefix: String,

    /// Full base URI, overriding the parts above
    pub uri: Option<String>,

    /// Per-request timeout
    pub timeout: Duration,
}

impl AdapterConfig {
    pub fn new() -> Self {
        Self {
            scheme: "http".to_string(),
            host: "localhost".to_string(),
            port: 8080,
            path_prefix: String::new(),
            uri: None,
            timeout: Duration::from_secs(30),
        }
    }

    /// Set the host
    pub fn host(mut self, host: &str) -> Self {
        self.host = host.to_string();
        self
    }

    /// Set the port
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the scheme
    pub fn scheme(mut self, scheme: &str) -> Self {
        self.scheme = scheme.to_string();
        self
    }

    /// Set the path prefix
    pub fn path_prefix(mut self, prefix: &str) -> Self {
        self.path_prefix = prefix.trim_end_matches('/').to_string();
        self
    }

    /// Use a full base URI
    pub fn uri(mut self, uri: &str) -> Self {
        self.uri = Some(uri.to_string());
        self
    }

    /// Set request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Parse from a store URL
    ///
    /// Format: "http[s]://host[:port][/prefix]"
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let config = AdapterConfig::from_url("http://localhost:8080")?;
    /// ```
    pub fn from_url(url: &str) -> Result<Self> {
        let (scheme, rest) = url
            .split_once("://")
            .ok_or_else(|| AdapterError::Config(format!("URL '{}' has no scheme", url)))?;

        let default_port = match scheme {
            "http" => 80,
            "https" => 443,
            other => {
                return Err(AdapterError::Config(format!("unsupported scheme '{}'", other)));
            }
        };

        let (authority, prefix) = match rest.find('/') {
            Some(idx) => rest.split_at(idx),
            None => (rest, ""),
        };
        if authority.is_empty() {
            return Err(AdapterError::Config(format!("URL '{}' has no host", url)));
        }

        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse()
                    .map_err(|_| AdapterError::Config(format!("invalid port '{}'", port)))?;
                (host, port)
            }
            None => (authority, default_port),
        };

        Ok(Self::new()
            .scheme(scheme)
            .host(host)
            .port(port)
            .path_prefix(prefix))
    }

    /// Base URI requests are sent to, without a trailing slash
    pub fn base_uri(&self) -> String {
        match &self.uri {
            Some(uri) => uri.trim_end_matches('/').to_string(),
            None => format!(
                "{}://{}:{}{}",
                self.scheme, self.host, self.port, self.path_prefix
            ),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if let Some(uri) = &self.uri {
            Self::from_url(uri)?;
            return self.validate_timeout();
        }

        if self.host.is_empty() {
            return Err(AdapterError::Config("host cannot be empty".to_string()));
        }

        if self.port == 0 {
            return Err(AdapterError::Config("port must be > 0".to_string()));
        }

        if self.scheme != "http" && self.scheme != "https" {
            return Err(AdapterError::Config(format!("unsupported scheme '{}'", self.scheme)));
        }

        self.validate_timeout()
    }

    fn validate_timeout(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(AdapterError::Config("timeout must be > 0".to_string()));
        }
        Ok(())
    }
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self::new()
    }
}
