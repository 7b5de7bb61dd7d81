//! # Merge Coordinator
//!
//! Layers staged edits over the baseline snapshot and derives the views the
//! editor renders.
//!
//! ## Overview
//!
//! The free functions in this module are pure: they turn a baseline and an
//! overlay into the merged view, lineup views and position assignments.
//!
//! [`MergeCoordinator`] owns one session's state. It is built by an outer
//! layer from an explicit baseline and the overlay entries read from the
//! [`OverlayStore`], holds the in-memory overlay as the source of truth and
//! keeps the merged view cached between edits.
//!
//! ## Edit pruning
//!
//! An edit that makes a record equal to its baseline (ignoring lyrics) is
//! never kept in the overlay. If an entry was staged it is removed, otherwise
//! the edit is dropped.

use crate::diff::songs_equal;
use crate::error::{Result, StagingError};
use crate::models::{BaselineSnapshot, Lineup, Song};
use crate::overlay::{Overlay, OverlayStore};
use icu_collator::{Collator, CollatorOptions};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// What an edit did to the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    /// The edit differs from the baseline and is now staged.
    Staged,
    /// The edit restored the baseline record; its staged entry was dropped.
    Reverted,
    /// Nothing to stage.
    Unchanged,
}

thread_local! {
    static TITLE_COLLATOR: Option<Collator> =
        Collator::try_new(&Default::default(), CollatorOptions::new()).ok();
}

/// Locale-aware title ordering using the root collation: accents sort with
/// their base letter and lowercase precedes uppercase. Titles the collator
/// treats as equal fall back to raw text order.
pub fn compare_titles(a: &str, b: &str) -> Ordering {
    TITLE_COLLATOR
        .with(|collator| match collator {
            Some(collator) => collator.compare(a, b),
            None => a
                .to_lowercase()
                .cmp(&b.to_lowercase())
                .then_with(|| b.cmp(a)),
        })
        .then_with(|| a.cmp(b))
}

/// Baseline with overlay entries substituted by id, overlay-only entries
/// appended, sorted by title.
pub fn merge_view(baseline: &[Song], overlay: &[Song]) -> Vec<Song> {
    let mut view: Vec<Song> = baseline
        .iter()
        .map(|song| {
            overlay
                .iter()
                .find(|staged| staged.id == song.id)
                .unwrap_or(song)
                .clone()
        })
        .collect();

    view.extend(
        overlay
            .iter()
            .filter(|staged| !baseline.iter().any(|song| song.id == staged.id))
            .cloned(),
    );

    view.sort_by(|a, b| compare_titles(&a.title, &b.title));
    view
}

/// Members of `lineup` in running order. The active lineup is listed by
/// title instead of position.
pub fn lineup_view(view: &[Song], lineup: Lineup) -> Vec<Song> {
    let mut members: Vec<Song> = view
        .iter()
        .filter(|song| song.is_member(lineup))
        .cloned()
        .collect();

    match lineup {
        Lineup::Active => members.sort_by(|a, b| compare_titles(&a.title, &b.title)),
        _ => members.sort_by_key(|song| song.position(lineup)),
    }
    members
}

/// Songs that belong to no lineup.
pub fn unassigned_view(view: &[Song]) -> Vec<Song> {
    view.iter()
        .filter(|song| song.is_unassigned())
        .cloned()
        .collect()
}

/// Next position in `lineup`: one past the current member count.
///
/// Numbering is append-only. Removing a member leaves a gap rather than
/// renumbering, so a later addition can repeat an existing position.
pub fn assign_position(lineup: Lineup, view: &[Song]) -> u32 {
    let members = view.iter().filter(|song| song.is_member(lineup)).count();
    u32::try_from(members).unwrap_or(u32::MAX).saturating_add(1)
}

/// Session state: the baseline, the staged overlay and the merged view.
pub struct MergeCoordinator {
    baseline: BaselineSnapshot,
    overlay: Overlay,
    store: Arc<dyn OverlayStore>,
    view: Vec<Song>,
}

impl MergeCoordinator {
    pub fn new(
        baseline: BaselineSnapshot,
        overlay_entries: Vec<Song>,
        store: Arc<dyn OverlayStore>,
    ) -> Self {
        let overlay = Overlay::from_songs(overlay_entries);
        let view = merge_view(&baseline.songs, overlay.as_slice());
        Self {
            baseline,
            overlay,
            store,
            view,
        }
    }

    /// Every song, baseline and staged, sorted by title.
    pub fn view(&self) -> &[Song] {
        &self.view
    }

    pub fn lineup(&self, lineup: Lineup) -> Vec<Song> {
        lineup_view(&self.view, lineup)
    }

    pub fn unassigned(&self) -> Vec<Song> {
        unassigned_view(&self.view)
    }

    /// Current (possibly staged) version of a song.
    pub fn find(&self, id: &str) -> Option<&Song> {
        self.view.iter().find(|song| song.id == id)
    }

    pub fn baseline(&self) -> &BaselineSnapshot {
        &self.baseline
    }

    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.overlay.is_empty()
    }

    /// Stage an edited song, or drop its staged entry if the edit restores
    /// the baseline record.
    #[instrument(skip(self, song), fields(song_id = %song.id))]
    pub async fn edit(&mut self, song: Song) -> Result<EditOutcome> {
        if song.id.is_empty() {
            return Err(StagingError::invalid_input("id", "song id cannot be empty"));
        }

        let song = song.without_lyrics();
        let matches_baseline = self
            .baseline
            .find(&song.id)
            .is_some_and(|original| songs_equal(original, &song));

        if matches_baseline {
            if self.overlay.remove(&song.id).is_none() {
                debug!("Edit matches baseline, nothing to stage");
                return Ok(EditOutcome::Unchanged);
            }
            if let Err(e) = self.store.remove(&song.id).await {
                warn!(error = %e, "Failed to persist overlay removal, keeping in-memory state");
            }
            self.rebuild_view();
            debug!("Edit restored baseline, pruned staged entry");
            return Ok(EditOutcome::Reverted);
        }

        if self.overlay.get(&song.id) == Some(&song) {
            return Ok(EditOutcome::Unchanged);
        }

        self.overlay.upsert(song.clone());
        if let Err(e) = self.store.upsert(&song).await {
            warn!(error = %e, "Failed to persist staged edit, keeping in-memory state");
        }
        self.rebuild_view();
        debug!(pending = self.overlay.len(), "Staged edit");
        Ok(EditOutcome::Staged)
    }

    /// Append a song to a lineup and return its position. A song already in
    /// the lineup keeps its position.
    #[instrument(skip(self))]
    pub async fn add_to_lineup(&mut self, id: &str, lineup: Lineup) -> Result<u32> {
        let mut song = self
            .find(id)
            .cloned()
            .ok_or_else(|| StagingError::SongNotFound(id.to_string()))?;

        if let Some(position) = song.position(lineup) {
            debug!(position, "Song already in lineup");
            return Ok(position);
        }

        let position = assign_position(lineup, &self.view);
        song.set_position(lineup, Some(position));
        self.edit(song).await?;

        info!(%lineup, position, "Added song to lineup");
        Ok(position)
    }

    /// Take a song out of a lineup. Other members keep their positions.
    #[instrument(skip(self))]
    pub async fn remove_from_lineup(&mut self, id: &str, lineup: Lineup) -> Result<EditOutcome> {
        let mut song = self
            .find(id)
            .cloned()
            .ok_or_else(|| StagingError::SongNotFound(id.to_string()))?;

        if !song.is_member(lineup) {
            return Ok(EditOutcome::Unchanged);
        }

        song.set_position(lineup, None);
        let outcome = self.edit(song).await?;

        info!(%lineup, "Removed song from lineup");
        Ok(outcome)
    }

    /// Swap in a refreshed baseline. Staged entries that now match it are
    /// pruned.
    pub async fn replace_baseline(&mut self, snapshot: BaselineSnapshot) {
        self.baseline = snapshot;
        self.prune_reverted().await;
        self.rebuild_view();
    }

    /// Drop staged entries equal to their baseline record.
    pub async fn prune_reverted(&mut self) -> usize {
        let stale: Vec<String> = self
            .overlay
            .iter()
            .filter(|staged| {
                self.baseline
                    .find(&staged.id)
                    .is_some_and(|original| songs_equal(original, staged))
            })
            .map(|staged| staged.id.clone())
            .collect();

        for id in &stale {
            self.overlay.remove(id);
            if let Err(e) = self.store.remove(id).await {
                warn!(song_id = %id, error = %e, "Failed to persist overlay removal");
            }
        }

        if !stale.is_empty() {
            debug!(pruned = stale.len(), "Pruned staged entries matching baseline");
            self.rebuild_view();
        }
        stale.len()
    }

    /// Discard every staged edit.
    pub async fn clear_overlay(&mut self) {
        self.overlay.clear();
        if let Err(e) = self.store.clear().await {
            warn!(error = %e, "Failed to clear persisted overlay");
        }
        self.rebuild_view();
    }

    fn rebuild_view(&mut self) {
        self.view = merge_view(&self.baseline.songs, self.overlay.as_slice());
    }
}
