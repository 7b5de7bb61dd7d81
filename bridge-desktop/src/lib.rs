//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest`, with retry and exponential backoff
//! - `SettingsStore` (persistent) using an SQLite-backed key-value table
//! - `SettingsStore` (session) held in process memory and dropped on exit
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{MemorySettingsStore, ReqwestHttpClient, SqliteSettingsStore};
//!
//! #[tokio::main]
//! async fn main() {
//!     let http_client = ReqwestHttpClient::new();
//!     let baseline_store = SqliteSettingsStore::new("setlist.db".into()).await.unwrap();
//!     let session_store = MemorySettingsStore::new();
//!
//!     // Hand these to `core_runtime::config::CoreConfig::builder()`
//! }
//! ```

mod http;
mod memory;
mod settings;

pub use http::ReqwestHttpClient;
pub use memory::MemorySettingsStore;
pub use settings::SqliteSettingsStore;
