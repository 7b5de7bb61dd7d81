//! # Reconciliation Submitter
//!
//! Sends the net staged changes to the song API and reconciles local state
//! with the result.
//!
//! ## Workflow
//!
//! 1. Refuse to start while another commit is in flight
//! 2. Diff every overlay entry against its baseline record, dropping no-ops
//! 3. `POST` the diffs together with the event title
//! 4. On success clear the overlay and refresh the baseline
//! 5. On failure leave the overlay untouched so the commit can be retried
//!
//! If the post-commit refresh cannot reach the API, the submitted diffs are
//! replayed onto the current baseline so the view still shows what was
//! committed.

use crate::diff::diff;
use crate::error::{Result, StagingError};
use crate::merge::MergeCoordinator;
use crate::models::{BaselineSnapshot, CommitRequest, DiffRecord};
use crate::refresh::{BaselineRefresher, RefreshOutcome};
use crate::remote::SongCatalog;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Summary of a successful commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitResult {
    /// Number of diff records the server accepted
    pub submitted: usize,
    /// Whether the baseline now reflects a fresh fetch
    pub baseline_refreshed: bool,
    pub event_title: String,
}

/// Releases the in-flight flag on every exit path.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| StagingError::CommitInProgress)?;
        Ok(Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct ReconciliationSubmitter {
    catalog: Arc<dyn SongCatalog>,
    refresher: Arc<BaselineRefresher>,
    in_flight: AtomicBool,
}

impl ReconciliationSubmitter {
    pub fn new(catalog: Arc<dyn SongCatalog>, refresher: Arc<BaselineRefresher>) -> Self {
        Self {
            catalog,
            refresher,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn is_committing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Commit entries for every staged edit that still differs from the
    /// baseline.
    pub fn pending_diffs(&self, coordinator: &MergeCoordinator) -> Result<Vec<DiffRecord>> {
        let baseline = coordinator.baseline();
        let mut records = Vec::with_capacity(coordinator.overlay().len());

        for staged in coordinator.overlay().iter() {
            if let Some(record) = diff(baseline.find(&staged.id), staged)?.into_record(&staged.id) {
                records.push(record);
            }
        }

        Ok(records)
    }

    /// Submit staged changes and reconcile.
    ///
    /// # Errors
    ///
    /// - `StagingError::CommitInProgress` if another commit is running
    /// - `StagingError::Remote` / `StagingError::MalformedPayload` when the
    ///   API rejects or cannot be reached; the overlay is left as it was
    #[instrument(skip(self, coordinator))]
    pub async fn commit(
        &self,
        coordinator: &mut MergeCoordinator,
        event_title: &str,
    ) -> Result<CommitResult> {
        let _guard = InFlightGuard::acquire(&self.in_flight)?;

        let songs = self.pending_diffs(coordinator)?;
        let request = CommitRequest {
            songs,
            event_title: event_title.to_string(),
        };
        info!(diffs = request.songs.len(), "Committing staged changes");

        if let Err(e) = self.catalog.commit(&request).await {
            error!(error = %e, "Commit failed, staged changes kept");
            return Err(e);
        }

        let projected = project(coordinator.baseline(), &request);
        coordinator.clear_overlay().await;

        let (snapshot, baseline_refreshed) = match self.refresher.refresh().await {
            Ok(RefreshOutcome::Fresh(snapshot)) => (snapshot, true),
            Ok(RefreshOutcome::Cached(_)) | Err(_) => {
                warn!("Baseline refresh after commit failed, using committed changes locally");
                (projected, false)
            }
        };
        let event_title = snapshot.info.title.clone();
        coordinator.replace_baseline(snapshot).await;

        info!(
            submitted = request.songs.len(),
            baseline_refreshed, "Commit succeeded"
        );
        Ok(CommitResult {
            submitted: request.songs.len(),
            baseline_refreshed,
            event_title,
        })
    }
}

/// The baseline as it should look once the server applied `request`.
fn project(baseline: &BaselineSnapshot, request: &CommitRequest) -> BaselineSnapshot {
    let mut projected = baseline.clone();
    projected.info.title = request.event_title.clone();

    for record in &request.songs {
        match record {
            DiffRecord::Patch { id, patch } => {
                if let Some(song) = projected.songs.iter_mut().find(|song| &song.id == id) {
                    patch.apply(song);
                }
            }
            DiffRecord::New(song) => match projected.songs.iter_mut().find(|s| s.id == song.id) {
                Some(existing) => *existing = song.clone(),
                None => projected.songs.push(song.clone()),
            },
        }
    }

    projected
}
