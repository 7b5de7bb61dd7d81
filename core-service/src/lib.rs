//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (HTTP, persistent
//! settings, session storage) into the staging core. Desktop apps typically
//! enable the `desktop-shims` feature, which lets [`bootstrap_desktop`] fill
//! in `bridge-desktop` defaults; other hosts build a [`CoreConfig`] with their
//! own bridges and call [`CoreService::new`].

pub mod error;

pub use error::{CoreError, Result};

pub use bridge_traits::{HttpClient, RetryPolicy, SettingsStore, StoreScope};
pub use core_runtime::config::{CoreConfig, CoreConfigBuilder};
pub use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
pub use core_staging::{
    CommitResult, DiffRecord, EditOutcome, EditorSession, Lineup, SessionDependencies, Song,
    SongDraft, StagingError, UploadReceipt,
};

use std::sync::Arc;
use tracing::info;

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CoreService {
    config: Arc<CoreConfig>,
}

impl CoreService {
    /// Create a new service from a validated configuration.
    pub fn new(config: CoreConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Build and validate a configuration, then create the service.
    pub fn from_builder(builder: CoreConfigBuilder) -> Result<Self> {
        Ok(Self::new(builder.build()?))
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// The staging collaborators backed by the configured bridges.
    pub fn session_dependencies(&self) -> SessionDependencies {
        SessionDependencies::from_config(&self.config)
    }

    /// Open an editing session: load the baseline, restore staged edits and
    /// warm the singer cache.
    pub async fn open_session(&self) -> Result<EditorSession> {
        let session = EditorSession::open(self.session_dependencies()).await?;
        info!(api = %self.config.api_base_url, "Editing session ready");
        Ok(session)
    }
}

/// Convenience bootstrapper for desktop hosts.
///
/// Uses `ReqwestHttpClient`, an SQLite settings store at `database_path` and
/// an in-memory session store.
///
/// ```no_run
/// # async fn example() -> core_service::Result<()> {
/// use core_service::bootstrap_desktop;
///
/// let core = bootstrap_desktop("https://setlist.example.com", "/tmp/setlist.db").await?;
/// let session = core.open_session().await?;
/// println!("{} songs", session.songs().len());
/// # Ok(())
/// # }
/// ```
#[cfg(feature = "desktop-shims")]
pub async fn bootstrap_desktop(
    api_base_url: &str,
    database_path: impl Into<std::path::PathBuf>,
) -> Result<CoreService> {
    CoreService::from_builder(
        CoreConfig::builder()
            .api_base_url(api_base_url)
            .database_path(database_path),
    )
}
