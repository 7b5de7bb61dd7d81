//! # Host Bridge Traits
//!
//! Capability contracts the staging core needs from its host.
//!
//! ## Overview
//!
//! The staging engine never talks to the network or to a storage medium
//! directly. Every such capability is expressed here as a trait, and each host
//! ships an adapter for it (see `bridge-desktop`). Tests inject in-memory
//! fakes or `mockall` mocks through the same seams.
//!
//! ## Traits
//!
//! ### Networking
//! - [`HttpClient`](http::HttpClient) - Async HTTP operations with retry policy
//!
//! ### Storage
//! - [`SettingsStore`](storage::SettingsStore) - String key-value storage, either
//!   persistent (survives restarts) or session-scoped (dropped with the session)
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Adapters
//! should convert platform-specific errors into it and include enough context
//! (key names, URLs, status codes) for the message to be actionable.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so a single adapter can be shared
//! behind an `Arc` by every component of the core.
//!
//! ## Example
//!
//! ```ignore
//! use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
//! use bridge_traits::error::Result;
//! use async_trait::async_trait;
//!
//! pub struct MyHttpClient {
//!     client: reqwest::Client,
//! }
//!
//! #[async_trait]
//! impl HttpClient for MyHttpClient {
//!     async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
//!         // Implementation
//!         todo!()
//!     }
//! }
//! ```

pub mod error;
pub mod http;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use storage::{SettingsStore, StoreScope};
pub use time::{Clock, ConsoleLogger, FixedClock, LogEntry, LogLevel, LoggerSink, SystemClock};
