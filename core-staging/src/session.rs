//! # Editor Session
//!
//! Wires the staging components into one editing session.
//!
//! ## Overview
//!
//! `EditorSession::open` sources the baseline (persisted snapshot, or a fetch
//! on first run) and the staged overlay explicitly, then hands both to a
//! [`MergeCoordinator`]. Everything the editor does afterwards goes through
//! the session:
//!
//! - reading the merged view, lineups and unassigned songs
//! - staging edits, new songs and lineup moves
//! - committing with [`EditorSession::save`]
//! - uploading lyric text and reading the singer cache
//!
//! ## Usage
//!
//! ```ignore
//! use core_staging::{EditorSession, Lineup, SessionDependencies};
//!
//! let mut session = EditorSession::open(SessionDependencies::from_config(&config)).await?;
//! session.add_to_lineup("amazing-grace_e91e9e12", Lineup::Swc).await?;
//! let result = session.save().await?;
//! println!("submitted {} changes", result.submitted);
//! ```

use crate::baseline::{BaselineStore, SettingsBaselineStore};
use crate::error::{Result, StagingError};
use crate::lyrics::LyricsUploader;
use crate::merge::{EditOutcome, MergeCoordinator};
use crate::models::{DiffRecord, Lineup, Song, SongDraft, UploadReceipt};
use crate::overlay::{OverlayStore, SessionOverlayStore};
use crate::refresh::BaselineRefresher;
use crate::remote::{HttpSongCatalog, SongCatalog};
use crate::singers::SingerDirectory;
use crate::submitter::{CommitResult, ReconciliationSubmitter};
use bridge_traits::SettingsStore;
use chrono::{DateTime, Utc};
use core_runtime::config::CoreConfig;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Collaborators an [`EditorSession`] is built from.
#[derive(Clone)]
pub struct SessionDependencies {
    pub catalog: Arc<dyn SongCatalog>,
    pub baseline_store: Arc<dyn BaselineStore>,
    pub overlay_store: Arc<dyn OverlayStore>,
    /// Persistent store for advisory caches (singers)
    pub cache_store: Arc<dyn SettingsStore>,
}

impl SessionDependencies {
    /// Build the standard collaborators from the configured bridges.
    pub fn from_config(config: &CoreConfig) -> Self {
        let catalog = HttpSongCatalog::new(config.http_client.clone(), config.api_base_url.clone())
            .with_retry_policy(config.retry_policy.clone())
            .with_timeout(config.request_timeout);

        Self {
            catalog: Arc::new(catalog),
            baseline_store: Arc::new(SettingsBaselineStore::new(config.settings_store.clone())),
            overlay_store: Arc::new(SessionOverlayStore::new(config.session_store.clone())),
            cache_store: config.settings_store.clone(),
        }
    }
}

pub struct EditorSession {
    coordinator: MergeCoordinator,
    submitter: ReconciliationSubmitter,
    refresher: Arc<BaselineRefresher>,
    baseline_store: Arc<dyn BaselineStore>,
    lyrics: LyricsUploader,
    singers: SingerDirectory,
    event_title: String,
}

impl EditorSession {
    /// Load the baseline and staged overlay and start a session.
    ///
    /// # Errors
    ///
    /// Fails only when there is no persisted baseline and the collection
    /// cannot be fetched.
    #[instrument(skip(deps))]
    pub async fn open(deps: SessionDependencies) -> Result<Self> {
        let refresher = Arc::new(BaselineRefresher::new(
            deps.catalog.clone(),
            deps.baseline_store.clone(),
        ));
        let baseline = refresher.load_or_fetch().await?.into_snapshot();

        let staged = deps.overlay_store.load().await.unwrap_or_else(|e| {
            warn!(error = %e, "Could not load staged edits, starting with none");
            Vec::new()
        });

        let mut coordinator = MergeCoordinator::new(baseline, staged, deps.overlay_store);
        coordinator.prune_reverted().await;

        let singers = SingerDirectory::new(deps.catalog.clone(), deps.cache_store);
        singers.ensure_cached().await;

        let event_title = coordinator.baseline().info.title.clone();
        info!(
            songs = coordinator.view().len(),
            pending = coordinator.overlay().len(),
            "Editor session opened"
        );

        Ok(Self {
            submitter: ReconciliationSubmitter::new(deps.catalog.clone(), refresher.clone()),
            lyrics: LyricsUploader::new(deps.catalog),
            refresher,
            baseline_store: deps.baseline_store,
            singers,
            coordinator,
            event_title,
        })
    }

    /// All songs, sorted by title.
    pub fn songs(&self) -> &[Song] {
        self.coordinator.view()
    }

    pub fn lineup(&self, lineup: Lineup) -> Vec<Song> {
        self.coordinator.lineup(lineup)
    }

    /// Heading for a lineup, using the current event title.
    pub fn lineup_title(&self, lineup: Lineup) -> String {
        lineup.title(&self.event_title)
    }

    pub fn unassigned(&self) -> Vec<Song> {
        self.coordinator.unassigned()
    }

    pub fn find(&self, id: &str) -> Option<&Song> {
        self.coordinator.find(id)
    }

    pub async fn edit_song(&mut self, song: Song) -> Result<EditOutcome> {
        self.coordinator.edit(song).await
    }

    /// Stage a brand new song and return the staged record.
    pub async fn add_song(&mut self, draft: SongDraft) -> Result<Song> {
        if draft.title.trim().is_empty() {
            return Err(StagingError::invalid_input("title", "title is required"));
        }

        let song = draft.into_song().without_lyrics();
        if self.coordinator.find(&song.id).is_some() {
            return Err(StagingError::invalid_input(
                "title",
                format!("a song with id {} already exists", song.id),
            ));
        }

        self.coordinator.edit(song.clone()).await?;
        info!(song_id = %song.id, "Added new song");
        Ok(song)
    }

    pub async fn add_to_lineup(&mut self, id: &str, lineup: Lineup) -> Result<u32> {
        self.coordinator.add_to_lineup(id, lineup).await
    }

    pub async fn remove_from_lineup(&mut self, id: &str, lineup: Lineup) -> Result<EditOutcome> {
        self.coordinator.remove_from_lineup(id, lineup).await
    }

    pub fn event_title(&self) -> &str {
        &self.event_title
    }

    /// Rename the event lineup. Sent with the next commit.
    pub fn set_event_title(&mut self, title: impl Into<String>) {
        self.event_title = title.into();
    }

    pub fn has_pending_changes(&self) -> bool {
        self.coordinator.has_pending_changes()
            || self.event_title != self.coordinator.baseline().info.title
    }

    /// Diff records the next commit would send.
    pub fn pending_changes(&self) -> Result<Vec<DiffRecord>> {
        self.submitter.pending_diffs(&self.coordinator)
    }

    /// Commit staged changes and the event title.
    pub async fn save(&mut self) -> Result<CommitResult> {
        let result = self
            .submitter
            .commit(&mut self.coordinator, &self.event_title)
            .await?;
        self.event_title = result.event_title.clone();
        Ok(result)
    }

    /// Pull the latest collection without committing. Returns whether the
    /// fetch succeeded.
    pub async fn refresh_baseline(&mut self) -> Result<bool> {
        let outcome = self.refresher.refresh().await?;
        let fresh = outcome.is_fresh();
        let snapshot = outcome.into_snapshot();

        // Keep a locally renamed event title
        if self.event_title == self.coordinator.baseline().info.title {
            self.event_title = snapshot.info.title.clone();
        }
        self.coordinator.replace_baseline(snapshot).await;
        Ok(fresh)
    }

    /// When the persisted baseline was last fetched.
    pub async fn last_updated(&self) -> Result<Option<DateTime<Utc>>> {
        self.baseline_store.last_updated().await
    }

    pub async fn upload_lyrics(&self, filename: &str, text: &str) -> Result<UploadReceipt> {
        self.lyrics.upload(filename, text).await
    }

    pub async fn singers(&self) -> Vec<String> {
        self.singers.cached().await
    }
}
