//! STB portal client and M3U playlist toolkit
//!
//! The network side speaks the Ministra/Stalker-style portal protocol: a
//! MAC-bound token handshake, catalog retrieval and per-channel stream-link
//! resolution, all as synchronous blocking calls. The playlist side parses
//! and writes extended M3U, including the STB localhost-to-direct-URL
//! rewrite on export. A UI layer drives both through the provider store;
//! nothing here renders or plays anything.
//!
//! Operations against one provider must be serialized by the caller — a
//! `PortalClient` is not meant to be shared across threads.

mod errors;
mod m3u;
mod models;
mod portal;
mod store;
mod transport;

pub use errors::{HandshakeError, LinkError, PortalError, ProtocolError, TransportError};
pub use m3u::{
    download_playlist, export_provider, parse_m3u, parse_m3u_file, rewrite_stb_cmd,
    stream_channel, write_m3u, write_stb_m3u,
};
pub use models::{Category, Channel, ContentItem, ContentKind, ProviderConfig, ProviderKind};
pub use portal::{
    random_token, Catalog, ContentPage, PortalClient, Session, SessionState, SortBy,
    HANDSHAKE_ENDPOINTS,
};
pub use store::ProviderStore;
pub use transport::{ensure_scheme, HttpResponse, HttpTransport};
