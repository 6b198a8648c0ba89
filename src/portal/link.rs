//! Stream link resolution
//!
//! Channel commands from the portal are launch strings, not URLs. The
//! `create_link` action materializes a playable URL; the portal prefixes it
//! with a launcher token (`ffmpeg http://...`), so the last
//! whitespace-separated token is the URL.

use serde_json::Value;

use crate::errors::{LinkError, ProtocolError};
use crate::models::ContentKind;

use super::{PortalClient, JS_HTTP_REQUEST};

impl PortalClient {
    /// Resolve a live channel command into a playable stream URL.
    pub fn create_link(&self, cmd: &str) -> Result<String, LinkError> {
        self.fetch_link(ContentKind::Live, cmd, None)
    }

    /// Resolve a VOD command into a playable stream URL.
    pub fn create_vod_link(&self, cmd: &str) -> Result<String, LinkError> {
        self.fetch_link(ContentKind::Vod, cmd, None)
    }

    /// Resolve one episode of a series season command.
    pub fn create_episode_link(&self, season_cmd: &str, episode: u32) -> Result<String, LinkError> {
        self.fetch_link(ContentKind::Series, season_cmd, Some(episode))
    }

    fn fetch_link(
        &self,
        content: ContentKind,
        cmd: &str,
        episode: Option<u32>,
    ) -> Result<String, LinkError> {
        // series links go through the vod endpoint with a series parameter
        let stb_type = match content {
            ContentKind::Series => "vod",
            other => other.stb_type(),
        };
        let series = match episode {
            Some(ep) => ep.to_string(),
            None => String::new(),
        };
        let query = format!(
            "type={}&action=create_link&cmd={}&series={}&hd=0&forced_storage=0&disable_ad=0&download=0&JsHttpRequest={}",
            stb_type,
            urlencoding::encode(cmd),
            series,
            JS_HTTP_REQUEST
        );
        let js = self.fetch_js(&query)?;
        let resolved = js
            .get("cmd")
            .and_then(Value::as_str)
            .ok_or(ProtocolError::MissingField("js.cmd"))?;
        Ok(extract_url(resolved).to_string())
    }
}

/// The portal embeds a launcher prefix before the real URL; keep the last
/// whitespace-separated token.
fn extract_url(cmd: &str) -> &str {
    cmd.split_whitespace().last().unwrap_or(cmd)
}
