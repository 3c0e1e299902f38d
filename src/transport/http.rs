use async_trait::async_trait;
use log::debug;
use reqwest::{Client, RequestBuilder};
use serde_json::Value as JsonValue;
use crate::config::AdapterConfig;
use crate::core::{AdapterError, Result};
use super::{Response, Transport};

/// HTTP transport against a running store.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_uri: String,
}

impl HttpTransport {
    pub fn new(config: &AdapterConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AdapterError::Config(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_uri: config.base_uri().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    /// Full URL for a store path. Quoted filter literals are percent-encoded
    /// so `#`, `%` and `&` inside a value reach the store intact.
    fn url(&self, path: &str) -> String {
        match path.split_once('?') {
            Some((collection, filter)) => {
                format!("{}{}?{}", self.base_uri, collection, encode_filter(filter))
            }
            None => format!("{}{}", self.base_uri, path),
        }
    }

    async fn send(&self, method: &'static str, path: &str, request: RequestBuilder) -> Result<Response> {
        debug!("{} {}", method, path);

        let transport_error = |e: reqwest::Error| AdapterError::Transport {
            method,
            path: path.to_string(),
            message: e.to_string(),
        };

        let response = request.send().await.map_err(transport_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(transport_error)?;

        Ok(Response { status, body })
    }
}

/// Percent-encode the contents of every `'...'` literal, leaving field
/// names, operators, quotes and `&` separators as they are.
fn encode_filter(filter: &str) -> String {
    let mut out = String::with_capacity(filter.len());
    let mut literal = String::new();
    let mut in_quotes = false;
    let mut escaped = false;

    for c in filter.chars() {
        if !in_quotes {
            out.push(c);
            in_quotes = c == '\'';
            continue;
        }
        if escaped {
            escaped = false;
            literal.push(c);
            continue;
        }
        match c {
            '\\' => {
                escaped = true;
                literal.push(c);
            }
            '\'' => {
                out.push_str(&urlencoding::encode(&literal));
                literal.clear();
                out.push(c);
                in_quotes = false;
            }
            _ => literal.push(c),
        }
    }
    out.push_str(&urlencoding::encode(&literal));
    out
}

#[async_trait]
impl Transport for HttpTransport {
    async fn create(&self, path: &str, payload: &JsonValue) -> Result<Response> {
        let request = self.client.post(self.url(path)).json(payload);
        self.send("POST", path, request).await
    }

    async fn retrieve(&self, path: &str) -> Result<Response> {
        let request = self.client.get(self.url(path));
        self.send("GET", path, request).await
    }

    async fn update(&self, path: &str, payload: &JsonValue) -> Result<Response> {
        let request = self.client.put(self.url(path)).json(payload);
        self.send("PUT", path, request).await
    }

    async fn delete(&self, path: &str) -> Result<Response> {
        let request = self.client.delete(self.url(path));
        self.send("DELETE", path, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_base_and_path() {
        let config = AdapterConfig::new().host("store.local").port(9090);
        let transport = HttpTransport::new(&config).unwrap();

        assert_eq!(transport.base_uri(), "http://store.local:9090");
        assert_eq!(transport.url("/Books/?year>1999"), "http://store.local:9090/Books/?year>1999");
        assert_eq!(transport.url("/Class[=id]"), "http://store.local:9090/Class[=id]");
    }

    #[test]
    fn test_quoted_literals_are_encoded() {
        assert_eq!(
            encode_filter("title='C# & 100%'&year>1999"),
            "title='C%23%20%26%20100%25'&year>1999"
        );
        assert_eq!(encode_filter(r"title='It\'s'"), "title='It%5C%27s'");
        assert_eq!(encode_filter("author~'*Simm*'"), "author~'%2ASimm%2A'");
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = AdapterConfig::new().host("");
        assert!(matches!(HttpTransport::new(&config), Err(AdapterError::Config(_))));
    }

    #[tokio::test]
    async fn test_unreachable_store_is_a_transport_error() {
        // Port 9 (discard) is not served on test machines
        let config = AdapterConfig::new()
            .host("127.0.0.1")
            .port(9)
            .timeout(std::time::Duration::from_secs(2));
        let transport = HttpTransport::new(&config).unwrap();

        let err = transport.retrieve("/Class[=id]").await.unwrap_err();
        assert!(err.is_transport());
        assert!(matches!(err, AdapterError::Transport { method: "GET", .. }));
    }
}
