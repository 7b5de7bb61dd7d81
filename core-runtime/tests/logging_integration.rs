//! Integration tests for logging system
//!
//! Runs in its own process, so the global subscriber can be installed here.

use bridge_traits::time::{LogEntry, LogLevel, LoggerSink};
use core_runtime::logging::{init_logging, redact_if_sensitive, LogFormat, LoggingConfig};
use core_runtime::Error;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct CollectingSink {
    entries: Mutex<Vec<LogEntry>>,
}

#[async_trait::async_trait]
impl LoggerSink for CollectingSink {
    async fn log(&self, entry: LogEntry) -> bridge_traits::error::Result<()> {
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }
}

#[test]
fn test_global_init_forwards_to_sink_once() {
    let sink = Arc::new(CollectingSink::default());
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Debug)
        .with_logger_sink(sink.clone());

    init_logging(config).unwrap();

    tracing::info!(target: "core_staging::submitter", diffs = 2, "Committing staged changes");
    tracing::debug!(target: "sqlx::query", "filtered out below warn");

    let entries = sink.entries.lock().unwrap().clone();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].message, "Committing staged changes");
    assert_eq!(entries[0].fields.get("diffs").map(String::as_str), Some("2"));

    let second = init_logging(LoggingConfig::default());
    assert!(matches!(second, Err(Error::Logging(_))));
}

#[test]
fn test_redaction_helpers() {
    assert_eq!(redact_if_sensitive("blob_token", "vercel_blob_rw_x"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("contact", "ann@example.com"), "a***@[REDACTED]");
    assert_eq!(redact_if_sensitive("title", "Amazing Grace"), "Amazing Grace");
}
