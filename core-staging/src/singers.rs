//! Cached singer directory.
//!
//! The singer list is advisory (it feeds name suggestions), so it is fetched
//! once and kept in the persistent store. Failures never block the editor.

use crate::error::Result;
use crate::remote::SongCatalog;
use bridge_traits::SettingsStore;
use std::sync::Arc;
use tracing::{debug, warn};

const SINGERS_KEY: &str = "singers";

pub struct SingerDirectory {
    catalog: Arc<dyn SongCatalog>,
    store: Arc<dyn SettingsStore>,
}

impl SingerDirectory {
    pub fn new(catalog: Arc<dyn SongCatalog>, store: Arc<dyn SettingsStore>) -> Self {
        Self { catalog, store }
    }

    /// Fetch and store the singer list unless it is already cached.
    ///
    /// Returns whether a fetch happened and succeeded.
    pub async fn ensure_cached(&self) -> bool {
        match self.store.has_key(SINGERS_KEY).await {
            Ok(true) => return false,
            Ok(false) => {}
            Err(e) => warn!(error = %e, "Could not check singer cache"),
        }

        match self.fetch_and_store().await {
            Ok(count) => {
                debug!(count, "Cached singer list");
                true
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch singers");
                false
            }
        }
    }

    /// Cached singer names, empty when nothing is cached or the entry is
    /// unreadable.
    pub async fn cached(&self) -> Vec<String> {
        let raw = match self.store.get_string(SINGERS_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(error = %e, "Could not read singer cache");
                return Vec::new();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(error = %e, "Singer cache is unreadable");
            Vec::new()
        })
    }

    async fn fetch_and_store(&self) -> Result<usize> {
        let names = self.catalog.fetch_singers().await?;
        let raw = serde_json::to_string(&names)?;
        self.store.set_string(SINGERS_KEY, &raw).await?;
        Ok(names.len())
    }
}
