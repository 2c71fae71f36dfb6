//! Error types for the trace engine
//!
//! Only two conditions are fatal for a tracked compilation: the output sink
//! cannot be opened at setup, and an inclusion entry reaches emission without
//! an end time. Everything else (bad path context, name collisions, cyclic
//! inclusion) is recovered in place and logged.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while tracking or writing a compilation trace
#[derive(Error, Debug)]
pub enum TraceError {
    #[error("Couldn't open {} for writing: {source}", path.display())]
    SinkUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Internal error: inclusion of {name} was never closed")]
    UnclosedInclusion { name: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Malformed notification on line {line}: {source}")]
    MalformedNotification {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize trace document: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for trace engine operations
pub type Result<T> = std::result::Result<T, TraceError>;
