//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the setlist core:
//! - Logging and tracing infrastructure
//! - Configuration management and bridge wiring
//!
//! ## Overview
//!
//! Every other core crate depends on this one for its logging conventions and
//! for the validated [`config::CoreConfig`] that carries the host bridges
//! (HTTP client, persistent store, session store) into the staging engine.

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
