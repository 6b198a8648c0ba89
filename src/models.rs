//! Data models shared across the portal client, playlist code and store

use serde::{Deserialize, Serialize};

/// How a provider serves its content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ProviderKind {
    #[serde(rename = "STB")]
    #[default]
    Stb,
    #[serde(rename = "M3UPLAYLIST")]
    M3uPlaylist,
    #[serde(rename = "M3USTREAM")]
    M3uStream,
    #[serde(rename = "XTREAM")]
    Xtream,
}

/// Content sections a provider exposes, and their STB portal type names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Live,
    Vod,
    Series,
}

impl ContentKind {
    pub fn stb_type(&self) -> &'static str {
        match self {
            ContentKind::Live => "itv",
            ContentKind::Vod => "vod",
            ContentKind::Series => "series",
        }
    }
}

/// A single channel or stream entry.
///
/// `cmd` is opaque everywhere except the link resolver: for M3U providers it
/// is the stream URL itself, for STB providers it is the portal launch
/// command that `create_link` turns into a playable URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default)]
    pub tvg_id: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
    pub cmd: String,
}

/// An entry from a paginated `get_ordered_list` response: a VOD item, a
/// series, or one of its seasons. Season entries carry their episode
/// numbers, which `create_episode_link` resolves one at a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default)]
    pub cmd: String,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub episodes: Vec<u32>,
}

/// A genre (itv) or category (vod/series) entry from the portal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub title: String,
}

/// One configured provider, including whatever catalog data was last
/// fetched for it. Channels and the three category lists live under
/// distinct fields so a genre refresh never clobbers the channel cache.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProviderConfig {
    #[serde(rename = "type")]
    pub kind: ProviderKind,
    pub url: String,
    #[serde(default)]
    pub mac: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Portal token from the last successful handshake, reused on the next one.
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub channels: Vec<Channel>,
    #[serde(default)]
    pub genres: Vec<Category>,
    #[serde(default)]
    pub vod_categories: Vec<Category>,
    #[serde(default)]
    pub series_categories: Vec<Category>,
}

impl ProviderConfig {
    pub fn new(kind: ProviderKind, url: &str) -> Self {
        Self {
            kind,
            url: url.to_string(),
            ..Self::default()
        }
    }

    /// URL to download an M3U playlist from, for provider kinds that have one.
    ///
    /// Xtream providers expose playlists through `get.php`; plain M3U
    /// providers already carry the URL. STB providers have no playlist URL,
    /// their catalog comes from the portal API.
    pub fn playlist_url(&self, content: ContentKind) -> Option<String> {
        match self.kind {
            ProviderKind::M3uPlaylist | ProviderKind::M3uStream => Some(self.url.clone()),
            ProviderKind::Xtream => {
                let base = crate::transport::ensure_scheme(&self.url);
                let base = base.trim_end_matches('/');
                match content {
                    ContentKind::Live => Some(format!(
                        "{}/get.php?username={}&password={}&type=m3u",
                        base, self.username, self.password
                    )),
                    ContentKind::Vod => Some(format!(
                        "{}/get.php?username={}&password={}&type=m3u&contentType=vod",
                        base, self.username, self.password
                    )),
                    ContentKind::Series => None,
                }
            }
            ProviderKind::Stb => None,
        }
    }
}
