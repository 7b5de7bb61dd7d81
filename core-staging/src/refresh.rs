//! # Baseline Refresh
//!
//! Pulls the collection from the song API into the [`BaselineStore`], falling
//! back to the last persisted snapshot when the API cannot be reached.

use crate::baseline::BaselineStore;
use crate::error::Result;
use crate::models::BaselineSnapshot;
use crate::remote::SongCatalog;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Where a baseline came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Fetched just now and persisted
    Fresh(BaselineSnapshot),
    /// The fetch failed; this is the last persisted snapshot
    Cached(BaselineSnapshot),
}

impl RefreshOutcome {
    pub fn is_fresh(&self) -> bool {
        matches!(self, RefreshOutcome::Fresh(_))
    }

    pub fn snapshot(&self) -> &BaselineSnapshot {
        match self {
            RefreshOutcome::Fresh(snapshot) | RefreshOutcome::Cached(snapshot) => snapshot,
        }
    }

    pub fn into_snapshot(self) -> BaselineSnapshot {
        match self {
            RefreshOutcome::Fresh(snapshot) | RefreshOutcome::Cached(snapshot) => snapshot,
        }
    }
}

pub struct BaselineRefresher {
    catalog: Arc<dyn SongCatalog>,
    store: Arc<dyn BaselineStore>,
}

impl BaselineRefresher {
    pub fn new(catalog: Arc<dyn SongCatalog>, store: Arc<dyn BaselineStore>) -> Self {
        Self { catalog, store }
    }

    /// Fetch the collection and persist it.
    ///
    /// # Errors
    ///
    /// Returns the fetch error only when no persisted baseline exists to fall
    /// back on.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<RefreshOutcome> {
        match self.catalog.fetch_collection().await {
            Ok(snapshot) => {
                if let Err(e) = self.store.save(&snapshot).await {
                    warn!(error = %e, "Failed to persist refreshed baseline");
                }
                info!(songs = snapshot.songs.len(), "Baseline refreshed");
                Ok(RefreshOutcome::Fresh(snapshot))
            }
            Err(fetch_error) => match self.store.load().await {
                Ok(Some(snapshot)) => {
                    warn!(
                        error = %fetch_error,
                        songs = snapshot.songs.len(),
                        "Could not refresh songs, using cached baseline"
                    );
                    Ok(RefreshOutcome::Cached(snapshot))
                }
                Ok(None) => Err(fetch_error),
                Err(load_error) => {
                    warn!(error = %load_error, "Cached baseline unavailable");
                    Err(fetch_error)
                }
            },
        }
    }

    /// The persisted baseline if there is one, otherwise a fresh fetch.
    #[instrument(skip(self))]
    pub async fn load_or_fetch(&self) -> Result<RefreshOutcome> {
        match self.store.load().await {
            Ok(Some(snapshot)) => Ok(RefreshOutcome::Cached(snapshot)),
            Ok(None) => self.refresh().await,
            Err(e) => {
                warn!(error = %e, "Persisted baseline unreadable, fetching");
                self.refresh().await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baseline::SettingsBaselineStore;
    use crate::error::StagingError;
    use crate::models::Song;
    use crate::remote::MockCatalog;
    use bridge_desktop::MemorySettingsStore;

    fn snapshot(title: &str) -> BaselineSnapshot {
        BaselineSnapshot::new(vec![Song::new("a", title, "X")], "Easter")
    }

    fn store() -> Arc<SettingsBaselineStore> {
        Arc::new(SettingsBaselineStore::new(Arc::new(
            MemorySettingsStore::persistent(),
        )))
    }

    fn offline() -> Result<BaselineSnapshot> {
        Err(StagingError::Remote {
            status: 503,
            message: "unavailable".into(),
        })
    }

    #[tokio::test]
    async fn test_refresh_persists_fresh_snapshot() {
        let mut catalog = MockCatalog::new();
        catalog
            .expect_fetch_collection()
            .times(1)
            .returning(|| Ok(snapshot("Fresh")));
        let store = store();
        let refresher = BaselineRefresher::new(Arc::new(catalog), store.clone());

        let outcome = refresher.refresh().await.unwrap();

        assert!(outcome.is_fresh());
        assert_eq!(store.load().await.unwrap(), Some(snapshot("Fresh")));
        assert!(store.last_updated().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_refresh_falls_back_to_cached() {
        let mut catalog = MockCatalog::new();
        catalog.expect_fetch_collection().returning(offline);
        let store = store();
        store.save(&snapshot("Cached")).await.unwrap();
        let refresher = BaselineRefresher::new(Arc::new(catalog), store);

        let outcome = refresher.refresh().await.unwrap();

        assert_eq!(outcome, RefreshOutcome::Cached(snapshot("Cached")));
    }

    #[tokio::test]
    async fn test_refresh_without_cache_surfaces_error() {
        let mut catalog = MockCatalog::new();
        catalog.expect_fetch_collection().returning(offline);
        let refresher = BaselineRefresher::new(Arc::new(catalog), store());

        assert!(matches!(
            refresher.refresh().await,
            Err(StagingError::Remote { status: 503, .. })
        ));
    }

    #[tokio::test]
    async fn test_load_or_fetch_prefers_persisted() {
        let mut catalog = MockCatalog::new();
        catalog.expect_fetch_collection().never();
        let store = store();
        store.save(&snapshot("Stored")).await.unwrap();
        let refresher = BaselineRefresher::new(Arc::new(catalog), store);

        let outcome = refresher.load_or_fetch().await.unwrap();

        assert_eq!(outcome.into_snapshot(), snapshot("Stored"));
    }

    #[tokio::test]
    async fn test_load_or_fetch_first_run_fetches() {
        let mut catalog = MockCatalog::new();
        catalog
            .expect_fetch_collection()
            .times(1)
            .returning(|| Ok(snapshot("First")));
        let refresher = BaselineRefresher::new(Arc::new(catalog), store());

        let outcome = refresher.load_or_fetch().await.unwrap();

        assert!(outcome.is_fresh());
        assert_eq!(outcome.snapshot().songs[0].title, "First");
    }
}
