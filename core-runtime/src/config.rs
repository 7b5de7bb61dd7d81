//! # Core Configuration Module
//!
//! Provides configuration management for the setlist core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance holding every bridge and setting the staging engine needs. It
//! enforces fail-fast validation so a misconfigured host learns about a
//! missing capability at startup rather than on the first commit.
//!
//! ## Bridges
//!
//! - `HttpClient` - talks to the song API (desktop default: reqwest)
//! - persistent `SettingsStore` - holds the baseline snapshot and caches
//!   (desktop default: SQLite file at `database_path`)
//! - session `SettingsStore` - holds staged edits for the current session
//!   (desktop default: process memory)
//!
//! When the `desktop-shims` feature is enabled, the desktop defaults are
//! injected automatically for any bridge that was not provided.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//!
//! let config = CoreConfig::builder()
//!     .api_base_url("https://setlist.example.com")
//!     .database_path("/path/to/setlist.db")
//!     .build()
//!     .expect("Failed to build config");
//! ```
//!
//! ### Configuration with Custom Bridges
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .api_base_url("https://setlist.example.com")
//!     .database_path("/path/to/setlist.db")
//!     .http_client(Arc::new(MyHttpClient))
//!     .settings_store(Arc::new(MyLocalStorage))
//!     .session_store(Arc::new(MySessionStorage))
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::{HttpClient, RetryPolicy, SettingsStore, StoreScope};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);
const MAX_RETRY_ATTEMPTS: u32 = 10;

/// Core configuration for the setlist core.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Base URL of the song API; its path always ends with `/`
    pub api_base_url: Url,

    /// Path to the SQLite file backing the persistent store
    pub database_path: PathBuf,

    /// Per-request timeout applied by the HTTP client
    pub request_timeout: Duration,

    /// Retry policy for API requests
    pub retry_policy: RetryPolicy,

    pub http_client: Arc<dyn HttpClient>,

    /// Survives restarts: baseline snapshot, singer cache
    pub settings_store: Arc<dyn SettingsStore>,

    /// Dropped with the session: staged edits
    pub session_store: Arc<dyn SettingsStore>,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("api_base_url", &self.api_base_url)
            .field("database_path", &self.database_path)
            .field("request_timeout", &self.request_timeout)
            .field("retry_policy", &self.retry_policy)
            .field("http_client", &"HttpClient { ... }")
            .field("settings_store", &self.settings_store.scope())
            .field("session_store", &self.session_store.scope())
            .finish()
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - The API base URL is an absolute http(s) URL
    /// - The database path is not empty
    /// - The request timeout is non-zero and at most five minutes
    /// - The retry policy makes between 1 and 10 attempts
    /// - Each store has the lifetime its role requires
    pub fn validate(&self) -> Result<()> {
        validate_base_url(&self.api_base_url)?;

        if self.database_path.as_os_str().is_empty() {
            return Err(Error::Config("Database path cannot be empty".to_string()));
        }

        if self.request_timeout.is_zero() {
            return Err(Error::Config(
                "Request timeout must be greater than zero".to_string(),
            ));
        }

        if self.request_timeout > MAX_REQUEST_TIMEOUT {
            return Err(Error::Config(format!(
                "Request timeout exceeds maximum of {} seconds",
                MAX_REQUEST_TIMEOUT.as_secs()
            )));
        }

        if self.retry_policy.max_attempts == 0 || self.retry_policy.max_attempts > MAX_RETRY_ATTEMPTS
        {
            return Err(Error::Config(format!(
                "Retry attempts must be between 1 and {}",
                MAX_RETRY_ATTEMPTS
            )));
        }

        if self.settings_store.scope() != StoreScope::Persistent {
            return Err(Error::Config(
                "Settings store must be persistent; the baseline snapshot has to survive restarts"
                    .to_string(),
            ));
        }

        if self.session_store.scope() != StoreScope::Session {
            return Err(Error::Config(
                "Session store must be session-scoped; staged edits must not outlive the session"
                    .to_string(),
            ));
        }

        Ok(())
    }

    /// Join an API path onto the base URL.
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        self.api_base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| Error::Config(format!("Invalid API path '{}': {}", path, e)))
    }
}

/// Parse the configured base URL and give its path a trailing slash so
/// relative API paths join beneath it.
fn parse_base_url(raw: &str) -> Result<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(Error::Config("API base URL cannot be empty".to_string()));
    }

    let mut url = Url::parse(raw)
        .map_err(|e| Error::Config(format!("Invalid API base URL '{}': {}", raw, e)))?;

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    validate_base_url(&url)?;
    Ok(url)
}

fn validate_base_url(url: &Url) -> Result<()> {
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::Config(format!(
            "API base URL must use http or https: {}",
            url
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(Error::Config(format!("API base URL has no host: {}", url)));
    }

    if url.query().is_some() || url.fragment().is_some() {
        return Err(Error::Config(format!(
            "API base URL cannot carry a query or fragment: {}",
            url
        )));
    }

    Ok(())
}

#[cfg(not(feature = "desktop-shims"))]
fn http_client_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "HttpClient implementation is required to reach the song API. \
                 Desktop: enable the 'desktop-shims' feature to use ReqwestHttpClient. \
                 Web: inject a fetch-based client."
            .to_string(),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn settings_store_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "SettingsStore".to_string(),
        message: "A persistent SettingsStore is required for the baseline snapshot. \
                 Desktop: enable the 'desktop-shims' feature to use SqliteSettingsStore. \
                 Web: inject a localStorage-based store."
            .to_string(),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn session_store_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "SessionStore".to_string(),
        message: "A session-scoped SettingsStore is required for staged edits. \
                 Desktop: enable the 'desktop-shims' feature to use MemorySettingsStore. \
                 Web: inject a sessionStorage-based store."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client(
    timeout: Duration,
    policy: &RetryPolicy,
) -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client = ReqwestHttpClient::with_timeout(timeout)
        .map_err(|e| Error::Internal(format!("Failed to initialize HttpClient: {}", e)))?
        .with_default_policy(policy.clone());

    let client: Arc<dyn HttpClient> = Arc::new(client);
    Ok(client)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client(
    _timeout: Duration,
    _policy: &RetryPolicy,
) -> Result<Arc<dyn HttpClient>> {
    Err(http_client_missing_error())
}

#[cfg(feature = "desktop-shims")]
fn provide_default_settings_store(database_path: &Path) -> Result<Arc<dyn SettingsStore>> {
    use bridge_desktop::SqliteSettingsStore;
    use std::thread;
    use tokio::runtime::{Builder, Handle};

    let init_store = |path: PathBuf| -> Result<SqliteSettingsStore> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| {
                Error::Internal(format!(
                    "Failed to create Tokio runtime for default settings store: {}",
                    e
                ))
            })?;

        runtime
            .block_on(SqliteSettingsStore::new(path))
            .map_err(|e| {
                Error::Internal(format!("Failed to initialize default SettingsStore: {}", e))
            })
    };

    let path = database_path.to_path_buf();
    // A runtime cannot be blocked on from inside another runtime's worker
    let store = match Handle::try_current() {
        Ok(_) => thread::spawn(move || init_store(path))
            .join()
            .map_err(|_| {
                Error::Internal(
                    "Worker thread panicked while creating default SettingsStore".to_string(),
                )
            })??,
        Err(_) => init_store(path)?,
    };

    let store: Arc<dyn SettingsStore> = Arc::new(store);
    Ok(store)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_settings_store(_database_path: &Path) -> Result<Arc<dyn SettingsStore>> {
    Err(settings_store_missing_error())
}

#[cfg(feature = "desktop-shims")]
fn provide_default_session_store() -> Result<Arc<dyn SettingsStore>> {
    let store: Arc<dyn SettingsStore> = Arc::new(bridge_desktop::MemorySettingsStore::new());
    Ok(store)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_session_store() -> Result<Arc<dyn SettingsStore>> {
    Err(session_store_missing_error())
}

/// Builder for constructing [`CoreConfig`] instances.
///
/// Call [`build()`](CoreConfigBuilder::build) to validate and create the
/// final config.
#[derive(Default)]
pub struct CoreConfigBuilder {
    api_base_url: Option<String>,
    database_path: Option<PathBuf>,
    request_timeout: Option<Duration>,
    retry_policy: Option<RetryPolicy>,
    http_client: Option<Arc<dyn HttpClient>>,
    settings_store: Option<Arc<dyn SettingsStore>>,
    session_store: Option<Arc<dyn SettingsStore>>,
}

impl CoreConfigBuilder {
    /// Sets the song API base URL (required). Parsed and checked by
    /// [`build()`](CoreConfigBuilder::build).
    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = Some(url.into());
        self
    }

    /// Sets the path of the persistent SQLite store (required).
    pub fn database_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.database_path = Some(path.into());
        self
    }

    /// Sets the per-request timeout.
    ///
    /// Default: 30 seconds
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Sets the retry policy for API requests.
    ///
    /// Default: [`RetryPolicy::default`] (3 attempts, exponential backoff)
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    /// Sets the HTTP client implementation.
    ///
    /// If not provided, `ReqwestHttpClient` is used when the `desktop-shims`
    /// feature is enabled.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the persistent store holding the baseline snapshot.
    ///
    /// If not provided, an `SqliteSettingsStore` at `database_path` is opened
    /// when the `desktop-shims` feature is enabled.
    pub fn settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings_store = Some(store);
        self
    }

    /// Sets the session-scoped store holding staged edits.
    ///
    /// If not provided, a `MemorySettingsStore` is used when the
    /// `desktop-shims` feature is enabled.
    pub fn session_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.session_store = Some(store);
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// - `Error::Config` when a required setting is missing or invalid
    /// - `Error::CapabilityMissing` when a bridge is missing and no desktop
    ///   default is available
    pub fn build(self) -> Result<CoreConfig> {
        let api_base_url = self
            .api_base_url
            .ok_or_else(|| Error::Config("API base URL is required".to_string()))
            .and_then(|raw| parse_base_url(&raw))?;

        let database_path = self
            .database_path
            .ok_or_else(|| Error::Config("Database path is required".to_string()))?;

        let request_timeout = self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT);
        let retry_policy = self.retry_policy.unwrap_or_default();

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client(request_timeout, &retry_policy)?,
        };

        let settings_store = match self.settings_store {
            Some(store) => store,
            None => provide_default_settings_store(&database_path)?,
        };

        let session_store = match self.session_store {
            Some(store) => store,
            None => provide_default_session_store()?,
        };

        let config = CoreConfig {
            api_base_url,
            database_path,
            request_timeout,
            retry_policy,
            http_client,
            settings_store,
            session_store,
        };

        config.validate()?;
        Ok(config)
    }
}
