//! STB (Ministra/Stalker) portal client
//!
//! Owns the handshake token and per-session headers. Catalog fetching and
//! stream-link resolution build on the authenticated session established
//! here.

mod catalog;
mod link;

pub use catalog::{Catalog, ContentPage, SortBy};

use std::collections::HashMap;

use rand::distr::Alphanumeric;
use rand::Rng;
use serde_json::Value;
use url::Url;

use crate::errors::{HandshakeError, PortalError, ProtocolError};
use crate::transport::{ensure_scheme, HttpTransport};

/// Handshake endpoints in the order they are tried. Portal deployments vary
/// between these two paths; each is attempted at most once per handshake.
pub const HANDSHAKE_ENDPOINTS: [&str; 2] = ["/server/load.php", "/portal.php"];

/// Cache-buster the portal expects on every request.
pub(crate) const JS_HTTP_REQUEST: &str = "1-xml";

const STB_USER_AGENT: &str = "Mozilla/5.0 (QtEmbedded; U; Linux; C) AppleWebKit/533.3 \
     (KHTML, like Gecko) MAG200 stbapp ver: 2 rev: 250 Safari/533.3";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Unauthenticated,
    Authenticating,
    Authenticated,
    HandshakeFailed,
}

/// An authenticated portal session: the bearer token plus the full header
/// set (STB user agent, MAC cookie, Authorization) sent on every call.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub headers: HashMap<String, String>,
}

pub struct PortalClient {
    transport: HttpTransport,
    base_url: Url,
    /// Provider URL as configured, scheme-ensured, no trailing slash.
    base: String,
    mac: String,
    cached_token: Option<String>,
    session: Option<Session>,
    state: SessionState,
}

impl PortalClient {
    pub fn new(base_url: &str, mac: &str) -> Result<Self, PortalError> {
        let base = ensure_scheme(base_url);
        let base = base.trim_end_matches('/').to_string();
        let base_url = Url::parse(&base)?;
        Ok(Self {
            transport: HttpTransport::default(),
            base_url,
            base,
            mac: mac.to_string(),
            cached_token: None,
            session: None,
            state: SessionState::Unauthenticated,
        })
    }

    /// Reuse a token persisted from an earlier session instead of
    /// generating a fresh one on the next handshake.
    pub fn with_cached_token(mut self, token: &str) -> Self {
        self.cached_token = Some(token.to_string());
        self
    }

    pub fn with_transport(mut self, transport: HttpTransport) -> Self {
        self.transport = transport;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Token from the last successful handshake, for persisting.
    pub fn token(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.token.as_str())
    }

    /// Authenticate against the portal.
    ///
    /// Each endpoint in [`HANDSHAKE_ENDPOINTS`] is tried at most once, in
    /// order. The first success installs the refreshed token into the
    /// session headers; if every endpoint fails the client lands in
    /// `HandshakeFailed` and the last underlying cause is reported.
    pub fn handshake(&mut self) -> Result<Session, HandshakeError> {
        self.state = SessionState::Authenticating;
        let token = self.cached_token.clone().unwrap_or_else(random_token);
        let headers = self.build_headers(&token);

        let [primary, fallbacks @ ..] = HANDSHAKE_ENDPOINTS;
        let mut last_err = match self.handshake_once(primary, &token, &headers) {
            Ok(session) => return Ok(self.install_session(session)),
            Err(e) => e,
        };
        for endpoint in fallbacks {
            log::warn!("handshake failed: {}, retrying via {}", last_err, endpoint);
            match self.handshake_once(endpoint, &token, &headers) {
                Ok(session) => return Ok(self.install_session(session)),
                Err(e) => last_err = e,
            }
        }
        self.state = SessionState::HandshakeFailed;
        Err(HandshakeError { source: last_err })
    }

    fn handshake_once(
        &self,
        endpoint: &str,
        token: &str,
        headers: &HashMap<String, String>,
    ) -> Result<Session, PortalError> {
        let url = format!(
            "{}{}?type=stb&action=handshake&prehash=0&token={}&JsHttpRequest={}",
            self.base, endpoint, token, JS_HTTP_REQUEST
        );
        let response = self.transport.get(&url, headers)?;
        let body = response.json()?;
        let new_token = body
            .pointer("/js/token")
            .and_then(Value::as_str)
            .ok_or(ProtocolError::MissingField("js.token"))?
            .to_string();

        let mut headers = headers.clone();
        headers.insert("Authorization".to_string(), format!("Bearer {}", new_token));
        Ok(Session {
            token: new_token,
            headers,
        })
    }

    fn install_session(&mut self, session: Session) -> Session {
        self.cached_token = Some(session.token.clone());
        self.session = Some(session.clone());
        self.state = SessionState::Authenticated;
        session
    }

    /// Request headers mimicking a MAG200 set-top box.
    fn build_headers(&self, token: &str) -> HashMap<String, String> {
        let referer = if self.base_url.path().is_empty() || self.base_url.path() == "/" {
            format!("{}/c/", self.base)
        } else {
            format!("{}/", self.base)
        };
        let mut headers = HashMap::new();
        headers.insert("User-Agent".to_string(), STB_USER_AGENT.to_string());
        headers.insert("Accept-Charset".to_string(), "UTF-8,*;q=0.8".to_string());
        headers.insert(
            "X-User-Agent".to_string(),
            "Model: MAG200; Link: Ethernet".to_string(),
        );
        headers.insert("Host".to_string(), netloc(&self.base_url));
        headers.insert("Range".to_string(), "bytes=0-".to_string());
        headers.insert("Accept".to_string(), "*/*".to_string());
        headers.insert("Referer".to_string(), referer);
        headers.insert(
            "Cookie".to_string(),
            format!(
                "mac={}; stb_lang=en; timezone=Europe/Kiev; PHPSESSID=null;",
                self.mac
            ),
        );
        headers.insert("Authorization".to_string(), format!("Bearer {}", token));
        headers
    }

    /// `scheme://host[:port]` root used by catalog and link requests,
    /// regardless of any path on the configured provider URL.
    fn root(&self) -> String {
        format!("{}://{}", self.base_url.scheme(), netloc(&self.base_url))
    }

    fn require_session(&self) -> Result<&Session, PortalError> {
        self.session.as_ref().ok_or(PortalError::Unauthenticated)
    }

    /// GET `/server/load.php?{query}` with session headers and return the
    /// `js` envelope every portal response wraps its payload in.
    pub(crate) fn fetch_js(&self, query: &str) -> Result<Value, PortalError> {
        let session = self.require_session()?;
        let url = format!("{}/server/load.php?{}", self.root(), query);
        let response = self.transport.get(&url, &session.headers)?;
        let body = response.json()?;
        body.get("js")
            .cloned()
            .ok_or_else(|| ProtocolError::MissingField("js").into())
    }
}

/// 32-character alphanumeric handshake token.
pub fn random_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

fn netloc(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}

#[cfg(test)]
#[path = "portal_tests.rs"]
mod tests;
