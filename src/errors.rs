//! Error types for the portal client and transport layers

use thiserror::Error;

/// Failure at the HTTP layer: unreachable host, timeout, broken body.
/// No retry policy lives here; callers decide what to do.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(#[source] Box<ureq::Error>),
    #[error("failed to read response body: {0}")]
    Body(#[source] Box<ureq::Error>),
}

/// The portal answered, but not with the JSON shape we expected.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("response is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("missing field `{0}` in portal response")]
    MissingField(&'static str),
}

/// Umbrella for a single portal operation.
#[derive(Debug, Error)]
pub enum PortalError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("invalid portal URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("session is not authenticated, run handshake first")]
    Unauthenticated,
}

/// Handshake exhausted every candidate endpoint.
#[derive(Debug, Error)]
#[error("handshake failed on every endpoint, last error: {source}")]
pub struct HandshakeError {
    #[source]
    pub source: PortalError,
}

/// Stream link resolution failed.
#[derive(Debug, Error)]
#[error("failed to resolve stream link: {source}")]
pub struct LinkError {
    #[source]
    pub source: PortalError,
}

impl From<PortalError> for LinkError {
    fn from(source: PortalError) -> Self {
        LinkError { source }
    }
}

impl From<TransportError> for LinkError {
    fn from(err: TransportError) -> Self {
        LinkError { source: err.into() }
    }
}

impl From<ProtocolError> for LinkError {
    fn from(err: ProtocolError) -> Self {
        LinkError { source: err.into() }
    }
}
