//! Session-scoped key-value storage held in process memory

use async_trait::async_trait;
use bridge_traits::{
    error::Result,
    storage::{SettingsStore, StoreScope},
};
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::trace;

/// In-memory settings store
///
/// The desktop stand-in for browser `sessionStorage`: everything is lost when
/// the store is dropped. Also the default fake for tests that need a
/// [`SettingsStore`] without touching disk.
#[derive(Default)]
pub struct MemorySettingsStore {
    values: RwLock<BTreeMap<String, String>>,
    scope: Option<StoreScope>,
}

impl MemorySettingsStore {
    /// Session-scoped store
    pub fn new() -> Self {
        Self::default()
    }

    /// In-memory store that reports itself as persistent, for tests that
    /// stand it in for the SQLite store.
    pub fn persistent() -> Self {
        Self {
            values: RwLock::default(),
            scope: Some(StoreScope::Persistent),
        }
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn set_string(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        trace!(key, "Stored session value");
        Ok(())
    }

    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.values.write().await.remove(key);
        Ok(())
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        Ok(self.values.read().await.keys().cloned().collect())
    }

    async fn clear_all(&self) -> Result<()> {
        self.values.write().await.clear();
        Ok(())
    }

    fn scope(&self) -> StoreScope {
        self.scope.unwrap_or(StoreScope::Session)
    }
}
