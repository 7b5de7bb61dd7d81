//! # Diff Engine
//!
//! Computes the minimal set of changed attributes between a baseline record
//! and its edited version. Lyrics never take part in a diff.

use crate::error::{Result, StagingError};
use crate::models::{DiffRecord, Lineup, Song, SongPatch};

/// Outcome of diffing an edit against its baseline record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diff {
    /// The record has no baseline counterpart. Carries the full record.
    New(Song),
    /// Only the listed attributes changed.
    Changed(SongPatch),
    /// Equal to the baseline in every compared attribute.
    Unchanged,
}

impl Diff {
    pub fn is_unchanged(&self) -> bool {
        matches!(self, Diff::Unchanged)
    }

    /// The commit entry for this diff, `None` when there is nothing to send.
    pub fn into_record(self, id: &str) -> Option<DiffRecord> {
        match self {
            Diff::New(song) => Some(DiffRecord::New(song)),
            Diff::Changed(patch) => Some(DiffRecord::Patch {
                id: id.to_string(),
                patch,
            }),
            Diff::Unchanged => None,
        }
    }
}

/// Diff `edited` against `original`.
///
/// Comparison is exact: strings are case-sensitive and a lineup position
/// going from absent to present (or back) is a change.
///
/// # Errors
///
/// Returns `StagingError::IdMismatch` when the two records have different
/// ids.
pub fn diff(original: Option<&Song>, edited: &Song) -> Result<Diff> {
    let Some(original) = original else {
        return Ok(Diff::New(edited.without_lyrics()));
    };

    if original.id != edited.id {
        return Err(StagingError::IdMismatch {
            expected: original.id.clone(),
            actual: edited.id.clone(),
        });
    }

    let mut patch = SongPatch::default();
    if original.title != edited.title {
        patch.title = Some(edited.title.clone());
    }
    if original.artist != edited.artist {
        patch.artist = Some(edited.artist.clone());
    }
    for lineup in Lineup::ALL {
        if original.position(lineup) != edited.position(lineup) {
            patch.set_lineup(lineup, edited.position(lineup));
        }
    }

    if patch.is_empty() {
        Ok(Diff::Unchanged)
    } else {
        Ok(Diff::Changed(patch))
    }
}

/// Field-wise equality ignoring lyrics.
pub fn songs_equal(a: &Song, b: &Song) -> bool {
    a.id == b.id
        && a.title == b.title
        && a.artist == b.artist
        && Lineup::ALL
            .iter()
            .all(|lineup| a.position(*lineup) == b.position(*lineup))
}
