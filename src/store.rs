//! Provider and favorites store
//!
//! Persists the configured providers, the selected index and the favorites
//! set as one JSON file under the user config directory. All mutation goes
//! through explicit `update` calls so nothing else hands out shared mutable
//! state.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::models::ProviderConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "StoreData")]
pub struct ProviderStore {
    #[serde(rename = "data")]
    providers: Vec<ProviderConfig>,
    selected: usize,
    /// Favorite channel names. Matching is case-sensitive and exact.
    favorites: BTreeSet<String>,
}

/// Raw on-disk shape. Deserialization funnels through [`From`] so a loaded
/// store always holds at least one provider and an in-range selection, no
/// matter what the file said.
#[derive(Deserialize)]
struct StoreData {
    #[serde(default)]
    data: Vec<ProviderConfig>,
    #[serde(default)]
    selected: usize,
    #[serde(default)]
    favorites: BTreeSet<String>,
}

impl From<StoreData> for ProviderStore {
    fn from(raw: StoreData) -> Self {
        let mut store = Self {
            providers: raw.data,
            selected: raw.selected,
            favorites: raw.favorites,
        };
        if store.providers.is_empty() {
            store.providers.push(ProviderConfig::default());
        }
        if store.selected >= store.providers.len() {
            store.selected = 0;
        }
        store
    }
}

impl Default for ProviderStore {
    fn default() -> Self {
        Self {
            providers: vec![ProviderConfig::default()],
            selected: 0,
            favorites: BTreeSet::new(),
        }
    }
}

impl ProviderStore {
    fn config_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("stb_iptv");
        fs::create_dir_all(&path).ok();
        path.push("config.json");
        path
    }

    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load from `path`, falling back to defaults on a missing or
    /// unreadable file. The store always holds at least one provider.
    pub fn load_from(path: &Path) -> Self {
        fs::read_to_string(path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default()
    }

    pub fn save(&self) -> io::Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> io::Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, content)
    }

    pub fn providers(&self) -> &[ProviderConfig] {
        &self.providers
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    /// The provider currently operated on. Every construction path keeps
    /// the store non-empty and the selection in range, so this always
    /// resolves.
    pub fn selected(&self) -> &ProviderConfig {
        &self.providers[self.selected]
    }

    pub fn select(&mut self, index: usize) -> bool {
        if index < self.providers.len() {
            self.selected = index;
            true
        } else {
            false
        }
    }

    /// Append a provider and return its index.
    pub fn add_provider(&mut self, provider: ProviderConfig) -> usize {
        self.providers.push(provider);
        self.providers.len() - 1
    }

    /// Remove a provider. The last remaining provider cannot be removed.
    pub fn remove_provider(&mut self, index: usize) -> bool {
        if self.providers.len() <= 1 || index >= self.providers.len() {
            return false;
        }
        self.providers.remove(index);
        if self.selected >= self.providers.len() {
            self.selected = self.providers.len() - 1;
        }
        true
    }

    /// Mutate a provider in place. Returns false when the index is out of
    /// range.
    pub fn update(&mut self, index: usize, mutation: impl FnOnce(&mut ProviderConfig)) -> bool {
        match self.providers.get_mut(index) {
            Some(provider) => {
                mutation(provider);
                true
            }
            None => false,
        }
    }

    pub fn update_selected(&mut self, mutation: impl FnOnce(&mut ProviderConfig)) {
        self.update(self.selected, mutation);
    }

    pub fn favorites(&self) -> &BTreeSet<String> {
        &self.favorites
    }

    pub fn is_favorite(&self, name: &str) -> bool {
        self.favorites.contains(name)
    }

    pub fn add_favorite(&mut self, name: &str) {
        self.favorites.insert(name.to_string());
    }

    pub fn remove_favorite(&mut self, name: &str) -> bool {
        self.favorites.remove(name)
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
