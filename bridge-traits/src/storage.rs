//! Storage Abstractions
//!
//! Provides the platform-agnostic key-value store the staging core persists
//! its baseline snapshot, staged edits and cached lookups into.

use async_trait::async_trait;

use crate::error::Result;

/// Lifetime of the values held by a [`SettingsStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreScope {
    /// Values survive process restarts (web: `localStorage`, desktop: SQLite).
    Persistent,
    /// Values are dropped when the editing session ends
    /// (web: `sessionStorage`, desktop: process memory).
    Session,
}

impl StoreScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreScope::Persistent => "persistent",
            StoreScope::Session => "session",
        }
    }
}

/// Key-value settings storage trait
///
/// Abstracts platform-specific string storage:
/// - Desktop: SQLite file (persistent) or process memory (session)
/// - Web: `localStorage` / `sessionStorage`
///
/// Values are opaque strings; callers own the encoding (the core stores JSON).
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::SettingsStore;
///
/// async fn remember(store: &dyn SettingsStore) -> Result<()> {
///     store.set_string("singers", r#"["Ann","Ben"]"#).await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Store a string value, replacing any previous value for the key
    async fn set_string(&self, key: &str, value: &str) -> Result<()>;

    /// Retrieve a string value
    ///
    /// Returns `Ok(None)` if the key doesn't exist.
    async fn get_string(&self, key: &str) -> Result<Option<String>>;

    /// Delete a value. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check if a key exists
    async fn has_key(&self, key: &str) -> Result<bool> {
        Ok(self.get_string(key).await?.is_some())
    }

    /// List all keys in ascending order
    async fn list_keys(&self) -> Result<Vec<String>>;

    /// Clear all values
    async fn clear_all(&self) -> Result<()>;

    /// Lifetime of the stored values
    fn scope(&self) -> StoreScope {
        StoreScope::Persistent
    }
}
