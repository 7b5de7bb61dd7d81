//! Integration tests for the staging workflow
//!
//! These tests drive an `EditorSession` against an in-memory song catalog:
//! - Opening from a fetched or persisted baseline
//! - Staging lineup moves and pruning reverted edits
//! - Committing, refreshing and clearing the overlay
//! - Keeping staged edits when a commit fails
//! - Falling back to the persisted baseline when the API is down

use async_trait::async_trait;
use bridge_desktop::MemorySettingsStore;
use bridge_traits::SettingsStore;
use core_staging::{
    generate_song_id, BaselineSnapshot, BaselineStore, CommitRequest, DiffRecord, EditOutcome,
    EditorSession, Lineup, OverlayStore, SessionDependencies, SessionOverlayStore,
    SettingsBaselineStore, Song, SongCatalog, SongDraft, StagingError, TextUpload, UploadReceipt,
};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;

// ============================================================================
// In-memory catalog
// ============================================================================

/// Song API stand-in that applies commits to its own collection
#[derive(Default)]
struct FakeCatalog {
    collection: Mutex<BaselineSnapshot>,
    singers: Vec<String>,
    commits: Mutex<Vec<serde_json::Value>>,
    fail_fetch: Mutex<bool>,
    fail_commit: Mutex<bool>,
    fetches: Mutex<usize>,
}

impl FakeCatalog {
    fn with_collection(collection: BaselineSnapshot) -> Arc<Self> {
        Arc::new(Self {
            collection: Mutex::new(collection),
            singers: vec!["Ann".to_string(), "Ben".to_string()],
            ..Self::default()
        })
    }

    async fn set_fail_fetch(&self, fail: bool) {
        *self.fail_fetch.lock().await = fail;
    }

    async fn set_fail_commit(&self, fail: bool) {
        *self.fail_commit.lock().await = fail;
    }

    async fn commits(&self) -> Vec<serde_json::Value> {
        self.commits.lock().await.clone()
    }

    async fn fetches(&self) -> usize {
        *self.fetches.lock().await
    }

    fn unavailable() -> StagingError {
        StagingError::Remote {
            status: 503,
            message: "Service unavailable".to_string(),
        }
    }
}

#[async_trait]
impl SongCatalog for FakeCatalog {
    async fn fetch_collection(&self) -> core_staging::Result<BaselineSnapshot> {
        *self.fetches.lock().await += 1;
        if *self.fail_fetch.lock().await {
            return Err(Self::unavailable());
        }
        Ok(self.collection.lock().await.clone())
    }

    async fn commit(&self, request: &CommitRequest) -> core_staging::Result<()> {
        if *self.fail_commit.lock().await {
            return Err(StagingError::Remote {
                status: 500,
                message: "Internal server error".to_string(),
            });
        }

        self.commits
            .lock()
            .await
            .push(serde_json::to_value(request).unwrap());

        let mut collection = self.collection.lock().await;
        collection.info.title = request.event_title.clone();
        for record in &request.songs {
            match record {
                DiffRecord::Patch { id, patch } => {
                    if let Some(song) = collection.songs.iter_mut().find(|s| &s.id == id) {
                        patch.apply(song);
                    }
                }
                DiffRecord::New(song) => collection.songs.push(song.clone()),
            }
        }
        Ok(())
    }

    async fn fetch_singers(&self) -> core_staging::Result<Vec<String>> {
        Ok(self.singers.clone())
    }

    async fn upload_text(&self, upload: &TextUpload) -> core_staging::Result<UploadReceipt> {
        Ok(UploadReceipt {
            pathname: format!("txt/{}.txt", core_staging::sanitize_blob_name(&upload.filename)),
            url: None,
        })
    }
}

// ============================================================================
// Fixtures
// ============================================================================

struct Harness {
    catalog: Arc<FakeCatalog>,
    persistent: Arc<MemorySettingsStore>,
    session_store: Arc<MemorySettingsStore>,
}

impl Harness {
    fn new(collection: BaselineSnapshot) -> Self {
        Self {
            catalog: FakeCatalog::with_collection(collection),
            persistent: Arc::new(MemorySettingsStore::persistent()),
            session_store: Arc::new(MemorySettingsStore::new()),
        }
    }

    fn deps(&self) -> SessionDependencies {
        SessionDependencies {
            catalog: self.catalog.clone(),
            baseline_store: Arc::new(SettingsBaselineStore::new(self.persistent.clone())),
            overlay_store: Arc::new(SessionOverlayStore::new(self.session_store.clone())),
            cache_store: self.persistent.clone(),
        }
    }

    async fn open(&self) -> EditorSession {
        EditorSession::open(self.deps()).await.unwrap()
    }
}

fn single_song_collection() -> BaselineSnapshot {
    BaselineSnapshot::new(
        vec![Song::new("a", "A Song", "Someone").with_position(Lineup::Swc, 1)],
        "Easter",
    )
}

fn hymn_collection() -> BaselineSnapshot {
    BaselineSnapshot::new(
        vec![
            Song::new("h1", "How Great Thou Art", "Boberg").with_position(Lineup::Swc, 1),
            Song::new("h2", "Be Thou My Vision", "Trad").with_position(Lineup::Swc, 2),
            Song::new("h3", "amazing love", "Kendrick").with_position(Lineup::Active, 1),
            Song::new("h4", "Crown Him", "Bridges"),
        ],
        "Easter",
    )
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_open_with_empty_overlay_shows_baseline() {
    let harness = Harness::new(single_song_collection());
    let session = harness.open().await;

    assert_eq!(session.songs(), single_song_collection().songs.as_slice());
    assert_eq!(session.lineup(Lineup::Swc).len(), 1);
    assert!(!session.has_pending_changes());
    assert_eq!(session.event_title(), "Easter");
    assert_eq!(
        session.lineup_title(Lineup::Swc),
        "Sunday Worship Celebration"
    );
    assert_eq!(session.lineup_title(Lineup::Event), "Easter");
}

#[tokio::test]
async fn test_stage_commit_and_refresh() {
    let harness = Harness::new(single_song_collection());
    let mut session = harness.open().await;

    let position = session.add_to_lineup("a", Lineup::Tnl).await.unwrap();
    assert_eq!(position, 1);

    // the overlay holds the full edited record
    let staged: Vec<Song> = harness.deps().overlay_store.load().await.unwrap();
    assert_eq!(
        staged,
        vec![Song::new("a", "A Song", "Someone")
            .with_position(Lineup::Swc, 1)
            .with_position(Lineup::Tnl, 1)]
    );

    // the diff only carries the change
    let pending = session.pending_changes().unwrap();
    assert_eq!(
        serde_json::to_value(&pending).unwrap(),
        json!([{"id": "a", "tnl": 1}])
    );

    let result = session.save().await.unwrap();
    assert_eq!(result.submitted, 1);
    assert!(result.baseline_refreshed);

    assert_eq!(
        harness.catalog.commits().await,
        vec![json!({"songs": [{"id": "a", "tnl": 1}], "event_title": "Easter"})]
    );
    assert!(!session.has_pending_changes());
    assert!(harness.deps().overlay_store.load().await.unwrap().is_empty());

    let song = session.find("a").unwrap();
    assert_eq!(song.swc, Some(1));
    assert_eq!(song.tnl, Some(1));
}

#[tokio::test]
async fn test_edit_then_revert_removes_overlay_entry() {
    let harness = Harness::new(single_song_collection());
    let mut session = harness.open().await;

    let mut renamed = session.find("a").unwrap().clone();
    renamed.title = "A Song (Acoustic)".to_string();
    assert_eq!(
        session.edit_song(renamed).await.unwrap(),
        EditOutcome::Staged
    );
    assert!(session.has_pending_changes());

    let mut restored = session.find("a").unwrap().clone();
    restored.title = "A Song".to_string();
    assert_eq!(
        session.edit_song(restored).await.unwrap(),
        EditOutcome::Reverted
    );

    assert!(!session.has_pending_changes());
    assert!(session.pending_changes().unwrap().is_empty());
    let raw = harness.session_store.get_string("temp").await.unwrap();
    assert_eq!(raw.as_deref(), Some("[]"));
}

#[tokio::test]
async fn test_failed_commit_keeps_overlay() {
    let harness = Harness::new(single_song_collection());
    let mut session = harness.open().await;
    session.add_to_lineup("a", Lineup::Event).await.unwrap();
    harness.catalog.set_fail_commit(true).await;

    let err = session.save().await.unwrap_err();

    assert!(matches!(err, StagingError::Remote { status: 500, .. }));
    assert!(err.is_transient());
    assert!(session.has_pending_changes());
    assert_eq!(session.lineup(Lineup::Event).len(), 1);
    assert_eq!(harness.deps().overlay_store.load().await.unwrap().len(), 1);

    // retry succeeds once the server recovers
    harness.catalog.set_fail_commit(false).await;
    session.save().await.unwrap();
    assert!(!session.has_pending_changes());
    assert_eq!(session.find("a").unwrap().event, Some(1));
}

#[tokio::test]
async fn test_lineup_views_and_sorting() {
    let harness = Harness::new(hymn_collection());
    let mut session = harness.open().await;

    let titles: Vec<&str> = session.songs().iter().map(|s| s.title.as_str()).collect();
    assert_eq!(
        titles,
        vec![
            "amazing love",
            "Be Thou My Vision",
            "Crown Him",
            "How Great Thou Art"
        ]
    );

    let swc: Vec<String> = session
        .lineup(Lineup::Swc)
        .into_iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(swc, vec!["h1", "h2"]);

    let unassigned: Vec<String> = session.unassigned().into_iter().map(|s| s.id).collect();
    assert_eq!(unassigned, vec!["h4"]);

    session
        .add_song(SongDraft::new("Éternel", "Hillsong"))
        .await
        .unwrap();
    session
        .add_song(SongDraft::new("Amazing Love", "Kendrick"))
        .await
        .unwrap();

    let titles: Vec<&str> = session.songs().iter().map(|s| s.title.as_str()).collect();
    assert_eq!(
        titles,
        vec![
            "amazing love",
            "Amazing Love",
            "Be Thou My Vision",
            "Crown Him",
            "Éternel",
            "How Great Thou Art"
        ]
    );
}

#[tokio::test]
async fn test_append_only_positions_leave_gaps() {
    let harness = Harness::new(hymn_collection());
    let mut session = harness.open().await;

    session.remove_from_lineup("h1", Lineup::Swc).await.unwrap();
    let position = session.add_to_lineup("h4", Lineup::Swc).await.unwrap();

    assert_eq!(position, 2);
    let positions: Vec<Option<u32>> = session
        .lineup(Lineup::Swc)
        .iter()
        .map(|s| s.swc)
        .collect();
    assert_eq!(positions, vec![Some(2), Some(2)]);

    let pending = serde_json::to_value(session.pending_changes().unwrap()).unwrap();
    assert!(pending
        .as_array()
        .unwrap()
        .contains(&json!({"id": "h1", "swc": null})));
}

#[tokio::test]
async fn test_add_song_stages_full_record() {
    let harness = Harness::new(single_song_collection());
    let mut session = harness.open().await;

    let song = session
        .add_song(SongDraft::new("Amazing Grace", "John Newton").with_lyrics("Amazing grace"))
        .await
        .unwrap();

    assert_eq!(song.id, generate_song_id("Amazing Grace", "John Newton"));
    assert_eq!(song.id, "amazing-grace_e91e9e12");
    assert_eq!(song.lyrics, None);
    assert_eq!(session.unassigned()[0].id, song.id);

    let pending = session.pending_changes().unwrap();
    assert!(pending[0].is_new());

    let duplicate = session
        .add_song(SongDraft::new("Amazing Grace", " john newton "))
        .await;
    assert!(matches!(duplicate, Err(StagingError::InvalidInput { .. })));

    let untitled = session.add_song(SongDraft::new("  ", "Nobody")).await;
    assert!(matches!(untitled, Err(StagingError::InvalidInput { .. })));
}

#[tokio::test]
async fn test_event_title_is_committed() {
    let harness = Harness::new(single_song_collection());
    let mut session = harness.open().await;

    session.set_event_title("Harvest Festival");
    assert!(session.has_pending_changes());
    assert_eq!(session.lineup_title(Lineup::Event), "Harvest Festival");

    let result = session.save().await.unwrap();

    assert_eq!(result.submitted, 0);
    assert_eq!(result.event_title, "Harvest Festival");
    assert_eq!(session.event_title(), "Harvest Festival");
    assert!(!session.has_pending_changes());
}

#[tokio::test]
async fn test_offline_start_uses_persisted_baseline() {
    let harness = Harness::new(single_song_collection());
    SettingsBaselineStore::new(harness.persistent.clone())
        .save(&hymn_collection())
        .await
        .unwrap();
    harness.catalog.set_fail_fetch(true).await;

    let mut session = harness.open().await;

    assert_eq!(session.songs().len(), 4);
    assert_eq!(harness.catalog.fetches().await, 0);

    // an explicit refresh falls back as well
    let fresh = session.refresh_baseline().await.unwrap();
    assert!(!fresh);
    assert_eq!(session.songs().len(), 4);
    assert!(session.last_updated().await.unwrap().is_some());
}

#[tokio::test]
async fn test_first_run_offline_fails_to_open() {
    let harness = Harness::new(single_song_collection());
    harness.catalog.set_fail_fetch(true).await;

    let result = EditorSession::open(harness.deps()).await;

    assert!(matches!(result, Err(StagingError::Remote { status: 503, .. })));
}

#[tokio::test]
async fn test_staged_edits_survive_reopen_within_session() {
    let harness = Harness::new(hymn_collection());
    {
        let mut session = harness.open().await;
        session.add_to_lineup("h4", Lineup::Tnl).await.unwrap();
    }

    let session = harness.open().await;

    assert!(session.has_pending_changes());
    assert_eq!(session.lineup(Lineup::Tnl)[0].id, "h4");
}

#[tokio::test]
async fn test_singers_cached_on_open() {
    let harness = Harness::new(single_song_collection());
    let session = harness.open().await;

    assert_eq!(session.singers().await, vec!["Ann", "Ben"]);
}

#[tokio::test]
async fn test_upload_lyrics() {
    let harness = Harness::new(single_song_collection());
    let session = harness.open().await;

    let receipt = session
        .upload_lyrics("Amazing Grace", "Amazing grace, how sweet the sound")
        .await
        .unwrap();
    assert_eq!(receipt.pathname, "txt/Amazing_Grace.txt");

    assert!(matches!(
        session.upload_lyrics("Amazing Grace", "").await,
        Err(StagingError::InvalidInput { .. })
    ));
}
