//! # Staging & Reconciliation Module
//!
//! Offline-first editing of the shared song collection.
//!
//! ## Overview
//!
//! Edits are staged in a session overlay layered over the last
//! server-confirmed baseline snapshot, and only the net changes are sent on
//! commit. This module:
//! - Assigns deterministic song ids
//! - Persists the baseline snapshot and the session overlay
//! - Computes minimal per-record diffs and prunes edits that revert
//! - Merges baseline and overlay into the sorted working view
//! - Assigns append-only lineup positions
//! - Commits diffs and reconciles with the refreshed baseline
//!
//! ## Components
//!
//! - **Identity** (`identity`): Song id generation
//! - **Baseline Store** (`baseline`): Last-known-good snapshot persistence
//! - **Overlay Store** (`overlay`): Session-scoped staged edits
//! - **Diff Engine** (`diff`): Changed-attribute computation
//! - **Merge Coordinator** (`merge`): Views, lineup positions and edit staging
//! - **Reconciliation Submitter** (`submitter`): Commit and reconcile
//! - **Song Catalog** (`remote`): Song API client
//! - **Baseline Refresher** (`refresh`): Fetch with cached fallback
//! - **Singer Directory** (`singers`) and **Lyrics Uploader** (`lyrics`)
//! - **Editor Session** (`session`): Everything wired together

pub mod baseline;
pub mod diff;
pub mod error;
pub mod identity;
pub mod lyrics;
pub mod merge;
pub mod models;
pub mod overlay;
pub mod refresh;
pub mod remote;
pub mod session;
pub mod singers;
pub mod submitter;

pub use baseline::{BaselineStore, SettingsBaselineStore};
pub use diff::{diff, songs_equal, Diff};
pub use error::{Result, StagingError};
pub use identity::generate_song_id;
pub use lyrics::{sanitize_blob_name, LyricsUploader};
pub use merge::{
    assign_position, lineup_view, merge_view, unassigned_view, EditOutcome, MergeCoordinator,
};
pub use models::{
    BaselineSnapshot, CommitRequest, DiffRecord, EventInfo, Lineup, Song, SongDraft, SongPatch,
    TextUpload, UploadReceipt,
};
pub use overlay::{Overlay, OverlayStore, SessionOverlayStore};
pub use refresh::{BaselineRefresher, RefreshOutcome};
pub use remote::{HttpSongCatalog, SongCatalog};
pub use session::{EditorSession, SessionDependencies};
pub use singers::SingerDirectory;
pub use submitter::{CommitResult, ReconciliationSubmitter};
