// Configuration for a traced compilation
//
// Loaded from an optional TOML file; every field has a default so an empty
// file (or no file) gives the standard behavior.

use crate::error::{Result, TraceError};
use crate::trace_output::DEFAULT_MIN_EVENT_DURATION_NS;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings for one tracked compilation
///
/// # Example
/// ```
/// use compile_trace::config::TraceConfig;
///
/// let config = TraceConfig::from_toml_str("min_event_duration_ns = 500").unwrap();
/// assert_eq!(config.min_event_duration_ns, 500);
/// assert!(!config.pretty);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TraceConfig {
    /// Records shorter than this many nanoseconds are dropped
    ///
    /// Default: 1_000_000 (1ms)
    pub min_event_duration_ns: i64,

    /// File names that are not real files and are never tracked
    ///
    /// Default: `["<command-line>"]`
    pub virtual_file_names: Vec<String>,

    /// Canonicalize include paths through the filesystem before shortening them
    ///
    /// Default: false
    pub resolve_real_paths: bool,

    /// Pretty-print the output document
    ///
    /// Default: false
    pub pretty: bool,

    /// Process id written to every event (default: this process)
    pub process_id: Option<u32>,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            min_event_duration_ns: DEFAULT_MIN_EVENT_DURATION_NS,
            virtual_file_names: vec!["<command-line>".to_string()],
            resolve_real_paths: false,
            pretty: false,
            process_id: None,
        }
    }
}

impl TraceConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.min_event_duration_ns < 0 {
            return Err(TraceError::Config(format!(
                "min_event_duration_ns must be >= 0, got {}",
                self.min_event_duration_ns
            )));
        }

        if let Some(empty) = self.virtual_file_names.iter().position(String::is_empty) {
            return Err(TraceError::Config(format!(
                "virtual_file_names[{}] is empty",
                empty
            )));
        }

        Ok(())
    }

    /// Process id to stamp on events
    pub fn effective_process_id(&self) -> u32 {
        self.process_id.unwrap_or_else(std::process::id)
    }
}
