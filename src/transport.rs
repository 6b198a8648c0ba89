//! Blocking HTTP transport over ureq
//!
//! One thin layer issuing GET requests with caller-supplied headers.
//! Retry and fallback policy belongs to callers, not here.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;

use crate::errors::{ProtocolError, TransportError};

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// A completed HTTP exchange. Non-2xx statuses land here as data,
/// not as transport errors.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    /// Parse the body as JSON, requiring a 200 status first.
    pub fn json(&self) -> Result<Value, ProtocolError> {
        if self.status != 200 {
            return Err(ProtocolError::Status(self.status));
        }
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Shared blocking HTTP client with fixed timeouts.
pub struct HttpTransport {
    agent: ureq::Agent,
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .timeout_connect(Some(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS)))
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }

    /// GET `url` with the given headers and return status plus body text.
    pub fn get(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
    ) -> Result<HttpResponse, TransportError> {
        log::debug!("GET {}", url);
        let mut request = self.agent.get(url);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }
        let mut response = request
            .call()
            .map_err(|e| TransportError::Request(Box::new(e)))?;
        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| TransportError::Body(Box::new(e)))?;
        Ok(HttpResponse { status, body })
    }

    /// GET without extra headers.
    pub fn get_text(&self, url: &str) -> Result<HttpResponse, TransportError> {
        self.get(url, &HashMap::new())
    }

    /// Cheap reachability probe used when verifying a provider URL.
    pub fn verify_url(&self, url: &str) -> bool {
        match self.get_text(url) {
            Ok(_) => true,
            Err(e) => {
                log::warn!("URL verification failed for {}: {}", url, e);
                false
            }
        }
    }
}

/// Prefix `http://` when the URL carries no scheme. Provider URLs are
/// frequently entered as bare hostnames.
pub fn ensure_scheme(url: &str) -> String {
    if url.contains("://") {
        url.to_string()
    } else {
        format!("http://{}", url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_scheme() {
        assert_eq!(ensure_scheme("portal.example"), "http://portal.example");
        assert_eq!(ensure_scheme("http://portal.example"), "http://portal.example");
        assert_eq!(ensure_scheme("https://portal.example"), "https://portal.example");
    }

    #[test]
    fn test_json_requires_200() {
        let response = HttpResponse {
            status: 500,
            body: "{}".to_string(),
        };
        assert!(matches!(
            response.json(),
            Err(ProtocolError::Status(500))
        ));

        let response = HttpResponse {
            status: 200,
            body: r#"{"js":{}}"#.to_string(),
        };
        assert!(response.json().is_ok());
    }

    #[test]
    fn test_json_rejects_malformed_body() {
        let response = HttpResponse {
            status: 200,
            body: "not json".to_string(),
        };
        assert!(matches!(response.json(), Err(ProtocolError::Json(_))));
    }
}
