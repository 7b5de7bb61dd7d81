//! # Baseline Store
//!
//! Persists the last server-confirmed snapshot of the song collection so the
//! editor can start without the network.

use crate::error::{Result, StagingError};
use crate::models::BaselineSnapshot;
use async_trait::async_trait;
use bridge_traits::{Clock, SettingsStore, SystemClock};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

const SONGS_KEY: &str = "songs";
const LAST_UPDATED_KEY: &str = "last_updated";

/// Storage for the baseline snapshot.
///
/// `load` returns `Ok(None)` on first run, before anything was ever fetched.
#[async_trait]
pub trait BaselineStore: Send + Sync {
    async fn load(&self) -> Result<Option<BaselineSnapshot>>;

    /// Replace the stored snapshot and stamp the refresh time.
    async fn save(&self, snapshot: &BaselineSnapshot) -> Result<()>;

    async fn last_updated(&self) -> Result<Option<DateTime<Utc>>>;
}

/// [`BaselineStore`] on top of a persistent [`SettingsStore`].
pub struct SettingsBaselineStore {
    store: Arc<dyn SettingsStore>,
    clock: Arc<dyn Clock>,
}

impl SettingsBaselineStore {
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

#[async_trait]
impl BaselineStore for SettingsBaselineStore {
    #[instrument(skip(self))]
    async fn load(&self) -> Result<Option<BaselineSnapshot>> {
        let Some(raw) = self.store.get_string(SONGS_KEY).await? else {
            debug!("No baseline snapshot stored yet");
            return Ok(None);
        };

        let snapshot: BaselineSnapshot = serde_json::from_str(&raw).map_err(|e| {
            warn!(error = %e, "Stored baseline snapshot is unreadable");
            StagingError::MalformedPayload(format!("stored baseline: {}", e))
        })?;

        debug!(songs = snapshot.songs.len(), "Loaded baseline snapshot");
        Ok(Some(snapshot))
    }

    #[instrument(skip(self, snapshot), fields(songs = snapshot.songs.len()))]
    async fn save(&self, snapshot: &BaselineSnapshot) -> Result<()> {
        let raw = serde_json::to_string(snapshot)?;
        self.store.set_string(SONGS_KEY, &raw).await?;
        self.store
            .set_string(LAST_UPDATED_KEY, &self.clock.now().to_rfc3339())
            .await?;

        debug!("Saved baseline snapshot");
        Ok(())
    }

    async fn last_updated(&self) -> Result<Option<DateTime<Utc>>> {
        let Some(raw) = self.store.get_string(LAST_UPDATED_KEY).await? else {
            return Ok(None);
        };

        DateTime::parse_from_rfc3339(&raw)
            .map(|stamp| Some(stamp.with_timezone(&Utc)))
            .map_err(|e| StagingError::MalformedPayload(format!("last_updated '{}': {}", raw, e)))
    }
}
