//! Catalog fetching: channels, itv genres, VOD and series categories
//!
//! Each fetch is independently fallible. `load_catalog` issues all four and
//! keeps whatever succeeded, so a broken genre endpoint never blocks the
//! channel list.

use serde_json::Value;

use crate::errors::{PortalError, ProtocolError};
use crate::models::{Category, Channel, ContentItem, ContentKind};

use super::{PortalClient, JS_HTTP_REQUEST};

/// Sort order accepted by `get_ordered_list`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortBy {
    Name,
    Number,
    Added,
}

impl SortBy {
    fn as_str(self) -> &'static str {
        match self {
            SortBy::Name => "name",
            SortBy::Number => "number",
            SortBy::Added => "added",
        }
    }
}

/// One page of an ordered listing, with the counters the portal reports
/// alongside it.
#[derive(Debug, Clone)]
pub struct ContentPage {
    pub items: Vec<ContentItem>,
    pub page: u32,
    pub total_items: u64,
    pub max_page_items: u64,
}

impl ContentPage {
    /// Number of pages in the full listing, per the portal's counters.
    pub fn page_count(&self) -> u32 {
        if self.max_page_items == 0 {
            0
        } else {
            ((self.total_items + self.max_page_items - 1) / self.max_page_items) as u32
        }
    }
}

/// Everything the portal knows about a provider's content, as far as we
/// fetch it. Fields left empty when their endpoint failed.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub channels: Vec<Channel>,
    pub genres: Vec<Category>,
    pub vod_categories: Vec<Category>,
    pub series_categories: Vec<Category>,
}

impl PortalClient {
    /// Full channel list (`type=itv&action=get_all_channels`, `js.data`).
    pub fn get_all_channels(&self) -> Result<Vec<Channel>, PortalError> {
        let js = self.fetch_js(&format!(
            "type=itv&action=get_all_channels&JsHttpRequest={}",
            JS_HTTP_REQUEST
        ))?;
        let data = js
            .get("data")
            .and_then(Value::as_array)
            .ok_or(ProtocolError::MissingField("js.data"))?;
        Ok(data.iter().filter_map(channel_from_value).collect())
    }

    /// Live TV genres (`type=itv&action=get_genres`).
    pub fn get_itv_genres(&self) -> Result<Vec<Category>, PortalError> {
        self.get_categories_of(ContentKind::Live)
    }

    /// VOD categories (`type=vod&action=get_categories`).
    pub fn get_vod_categories(&self) -> Result<Vec<Category>, PortalError> {
        self.get_categories_of(ContentKind::Vod)
    }

    /// Series categories (`type=series&action=get_categories`).
    pub fn get_series_categories(&self) -> Result<Vec<Category>, PortalError> {
        self.get_categories_of(ContentKind::Series)
    }

    fn get_categories_of(&self, content: ContentKind) -> Result<Vec<Category>, PortalError> {
        // itv calls them genres, vod and series call them categories
        let action = match content {
            ContentKind::Live => "get_genres",
            _ => "get_categories",
        };
        let js = self.fetch_js(&format!(
            "type={}&action={}&JsHttpRequest={}",
            content.stb_type(),
            action,
            JS_HTTP_REQUEST
        ))?;
        let items = js
            .as_array()
            .ok_or(ProtocolError::MissingField("js"))?;
        Ok(items.iter().filter_map(category_from_value).collect())
    }

    /// One page of a category's contents (`action=get_ordered_list`).
    /// Pages are 1-based; the returned counters give the page count.
    pub fn get_ordered_list(
        &self,
        content: ContentKind,
        category_id: &str,
        sort: SortBy,
        page: u32,
    ) -> Result<ContentPage, PortalError> {
        self.fetch_ordered_page(content, category_id, sort, page, "0")
    }

    /// All seasons of a series, newest-first, concatenated across every
    /// page the portal reports.
    pub fn get_seasons(
        &self,
        category_id: &str,
        series_id: &str,
    ) -> Result<Vec<ContentItem>, PortalError> {
        let first =
            self.fetch_ordered_page(ContentKind::Series, category_id, SortBy::Added, 1, series_id)?;
        let pages = first.page_count();
        let mut seasons = first.items;
        for page in 2..=pages {
            seasons.extend(
                self.fetch_ordered_page(
                    ContentKind::Series,
                    category_id,
                    SortBy::Added,
                    page,
                    series_id,
                )?
                .items,
            );
        }
        Ok(seasons)
    }

    fn fetch_ordered_page(
        &self,
        content: ContentKind,
        category_id: &str,
        sort: SortBy,
        page: u32,
        series_id: &str,
    ) -> Result<ContentPage, PortalError> {
        let js = self.fetch_js(&ordered_list_query(content, category_id, sort, page, series_id))?;
        let total_items = int_field(&js, "total_items")
            .ok_or(ProtocolError::MissingField("js.total_items"))?;
        let max_page_items = int_field(&js, "max_page_items")
            .ok_or(ProtocolError::MissingField("js.max_page_items"))?;
        let data = js
            .get("data")
            .and_then(Value::as_array)
            .ok_or(ProtocolError::MissingField("js.data"))?;
        Ok(ContentPage {
            items: data.iter().filter_map(content_item_from_value).collect(),
            page,
            total_items: u64::try_from(total_items).unwrap_or(0),
            max_page_items: u64::try_from(max_page_items).unwrap_or(0),
        })
    }

    /// Fetch all four catalog lists, tolerating partial failure. Failures
    /// are logged and leave the corresponding field empty.
    pub fn load_catalog(&self) -> Catalog {
        let mut catalog = Catalog::default();
        match self.get_all_channels() {
            Ok(channels) => catalog.channels = channels,
            Err(e) => log::warn!("failed to load channels: {}", e),
        }
        match self.get_itv_genres() {
            Ok(genres) => catalog.genres = genres,
            Err(e) => log::warn!("failed to load itv genres: {}", e),
        }
        match self.get_vod_categories() {
            Ok(categories) => catalog.vod_categories = categories,
            Err(e) => log::warn!("failed to load vod categories: {}", e),
        }
        match self.get_series_categories() {
            Ok(categories) => catalog.series_categories = categories,
            Err(e) => log::warn!("failed to load series categories: {}", e),
        }
        catalog
    }
}

/// Query string for `get_ordered_list`. Series listings carry the extra
/// `movie_id`/`category`/`season_id`/`episode_id` parameters; `series_id`
/// is "0" when listing a category and the series id when listing seasons.
fn ordered_list_query(
    content: ContentKind,
    category_id: &str,
    sort: SortBy,
    page: u32,
    series_id: &str,
) -> String {
    let mut query = format!(
        "type={}&action=get_ordered_list&genre={}&force_ch_link_check=&fav=0&sortby={}",
        content.stb_type(),
        category_id,
        sort.as_str()
    );
    if content == ContentKind::Series {
        query.push_str(&format!(
            "&movie_id={}&category={}&season_id=0&episode_id=0",
            series_id, category_id
        ));
    }
    query.push_str(&format!("&hd=0&p={}&JsHttpRequest={}", page, JS_HTTP_REQUEST));
    query
}

/// Read a field that portals serve either as a string or a number.
fn string_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn int_field(value: &Value, key: &str) -> Option<i64> {
    match value.get(key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Build a [`Channel`] from one `js.data` entry. Entries without a name or
/// command are dropped.
fn channel_from_value(value: &Value) -> Option<Channel> {
    let name = string_field(value, "name")?;
    let cmd = string_field(value, "cmd")?;
    Some(Channel {
        id: int_field(value, "id").unwrap_or_default(),
        name,
        logo: string_field(value, "logo").filter(|s| !s.is_empty()),
        tvg_id: string_field(value, "xmltv_id").filter(|s| !s.is_empty()),
        group: string_field(value, "tv_genre_id"),
        cmd,
    })
}

/// Build a [`ContentItem`] from one `js.data` entry. Season entries list
/// their episode numbers under `series`.
fn content_item_from_value(value: &Value) -> Option<ContentItem> {
    Some(ContentItem {
        id: string_field(value, "id")?,
        name: string_field(value, "name")?,
        logo: string_field(value, "logo").filter(|s| !s.is_empty()),
        cmd: string_field(value, "cmd").unwrap_or_default(),
        category_id: string_field(value, "category_id"),
        episodes: value
            .get("series")
            .and_then(Value::as_array)
            .map(|nums| nums.iter().filter_map(Value::as_u64).map(|n| n as u32).collect())
            .unwrap_or_default(),
    })
}

fn category_from_value(value: &Value) -> Option<Category> {
    Some(Category {
        id: string_field(value, "id")?,
        title: string_field(value, "title")?,
    })
}
