//! # Overlay Store
//!
//! Staged edits for the current editing session.
//!
//! ## Overview
//!
//! The overlay is an ordered list of edited songs keyed by id, layered over
//! the baseline snapshot. Entries never carry lyric text.
//!
//! [`SessionOverlayStore`] keeps one in-memory [`Overlay`] as the source of
//! truth. It is seeded from the backing store on first use; afterwards every
//! mutation updates memory first and then writes the whole list back. The
//! backing store is never re-read mid-session.

use crate::error::{Result, StagingError};
use crate::models::Song;
use async_trait::async_trait;
use bridge_traits::SettingsStore;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

const OVERLAY_KEY: &str = "temp";

/// Ordered id → edited song mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overlay {
    entries: Vec<Song>,
}

impl Overlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an overlay from stored entries. Later duplicates replace earlier
    /// ones in place.
    pub fn from_songs(songs: impl IntoIterator<Item = Song>) -> Self {
        let mut overlay = Self::new();
        for song in songs {
            overlay.upsert(song);
        }
        overlay
    }

    pub fn get(&self, id: &str) -> Option<&Song> {
        self.entries.iter().find(|song| song.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Replace the entry with the same id, or append. Lyrics are dropped.
    pub fn upsert(&mut self, mut song: Song) {
        song.lyrics = None;
        match self.entries.iter_mut().find(|entry| entry.id == song.id) {
            Some(entry) => *entry = song,
            None => self.entries.push(song),
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<Song> {
        let index = self.entries.iter().position(|song| song.id == id)?;
        Some(self.entries.remove(index))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Song> {
        self.entries.iter()
    }

    pub fn as_slice(&self) -> &[Song] {
        &self.entries
    }

    pub fn into_songs(self) -> Vec<Song> {
        self.entries
    }
}

/// Persistence for the overlay.
#[async_trait]
pub trait OverlayStore: Send + Sync {
    /// Current entries, empty when nothing is staged.
    async fn load(&self) -> Result<Vec<Song>>;

    /// Replace the entry with the same id, or append. No field merging.
    async fn upsert(&self, song: &Song) -> Result<()>;

    async fn remove(&self, id: &str) -> Result<()>;

    async fn clear(&self) -> Result<()>;
}

/// [`OverlayStore`] backed by a session-scoped [`SettingsStore`].
pub struct SessionOverlayStore {
    store: Arc<dyn SettingsStore>,
    overlay: Mutex<Option<Overlay>>,
}

impl SessionOverlayStore {
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self {
            store,
            overlay: Mutex::new(None),
        }
    }

    async fn read_backing(&self) -> Result<Overlay> {
        let Some(raw) = self.store.get_string(OVERLAY_KEY).await? else {
            return Ok(Overlay::new());
        };

        let songs: Vec<Song> = serde_json::from_str(&raw).map_err(|e| {
            warn!(error = %e, "Stored overlay is unreadable");
            StagingError::MalformedPayload(format!("stored overlay: {}", e))
        })?;

        Ok(Overlay::from_songs(songs))
    }

    async fn persist(&self, overlay: &Overlay) -> Result<()> {
        let raw = serde_json::to_string(overlay.as_slice())?;
        self.store.set_string(OVERLAY_KEY, &raw).await?;
        Ok(())
    }
}

#[async_trait]
impl OverlayStore for SessionOverlayStore {
    async fn load(&self) -> Result<Vec<Song>> {
        let mut guard = self.overlay.lock().await;
        if guard.is_none() {
            let seeded = self.read_backing().await?;
            debug!(entries = seeded.len(), "Seeded overlay from session storage");
            *guard = Some(seeded);
        }
        Ok(guard
            .as_ref()
            .map(|overlay| overlay.as_slice().to_vec())
            .unwrap_or_default())
    }

    #[instrument(skip(self, song), fields(song_id = %song.id))]
    async fn upsert(&self, song: &Song) -> Result<()> {
        let mut guard = self.overlay.lock().await;
        if guard.is_none() {
            *guard = Some(self.read_backing().await?);
        }
        let overlay = guard.get_or_insert_with(Overlay::new);
        overlay.upsert(song.clone());
        self.persist(overlay).await
    }

    #[instrument(skip(self))]
    async fn remove(&self, id: &str) -> Result<()> {
        let mut guard = self.overlay.lock().await;
        if guard.is_none() {
            *guard = Some(self.read_backing().await?);
        }
        let overlay = guard.get_or_insert_with(Overlay::new);
        if overlay.remove(id).is_none() {
            return Ok(());
        }
        self.persist(overlay).await
    }

    async fn clear(&self) -> Result<()> {
        let mut guard = self.overlay.lock().await;
        *guard = Some(Overlay::new());
        self.store.delete(OVERLAY_KEY).await?;
        debug!("Cleared overlay");
        Ok(())
    }
}
