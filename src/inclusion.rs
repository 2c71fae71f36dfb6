//! File inclusion tracking
//!
//! The host reports entering and leaving included files as a nested stream.
//! A LIFO stack mirrors the nesting; the first time a file opens and the first
//! time it closes are kept as its span.
//!
//! A file that is entered again while it is still open (cyclic inclusion) is
//! pushed as [`CYCLIC_INCLUDE_MARKER`] instead, so the stack stays balanced
//! without touching the outer occurrence's times. The marker never reaches the
//! output.

use crate::error::{Result, TraceError};
use crate::event::{EventCategory, TimeSpan, TraceRecord, Timestamp};
use crate::path_normalizer::PathNormalizer;
use crate::trace_output::RecordSink;
use std::collections::HashMap;

/// Reserved name substituted for a cyclically re-entered file
pub const CYCLIC_INCLUDE_MARKER: &str = "<cyclic-include>";

/// What [`InclusionTracker::enter`] did with a name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entered {
    /// Missing or virtual name; the stack is unchanged
    Ignored,
    /// Name pushed and tracked under its own name
    Tracked,
    /// Name was already open; the marker was pushed in its place
    Cyclic,
}

/// Stack of currently open files with first-open/first-close times
#[derive(Debug)]
pub struct InclusionTracker {
    start_of: HashMap<String, Timestamp>,
    end_of: HashMap<String, Timestamp>,
    /// Names in first-open order, for stable output
    opened: Vec<String>,
    stack: Vec<String>,
    virtual_names: Vec<String>,
}

impl Default for InclusionTracker {
    fn default() -> Self {
        Self::with_virtual_names(vec!["<command-line>".to_string()])
    }
}

impl InclusionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracker that ignores the given sentinel names
    pub fn with_virtual_names(virtual_names: Vec<String>) -> Self {
        Self {
            start_of: HashMap::new(),
            end_of: HashMap::new(),
            opened: Vec::new(),
            stack: Vec::new(),
            virtual_names,
        }
    }

    fn is_virtual(&self, name: &str) -> bool {
        self.virtual_names.iter().any(|v| v == name)
    }

    /// Open `name` at time `now`
    pub fn enter(&mut self, name: Option<&str>, now: Timestamp) -> Entered {
        let Some(name) = name.filter(|n| !self.is_virtual(n)) else {
            return Entered::Ignored;
        };

        let (name, outcome) =
            if self.start_of.contains_key(name) && !self.end_of.contains_key(name) {
                tracing::debug!("Cyclic inclusion of {}, not tracking inner occurrence", name);
                (CYCLIC_INCLUDE_MARKER, Entered::Cyclic)
            } else {
                (name, Entered::Tracked)
            };

        if !self.start_of.contains_key(name) {
            self.start_of.insert(name.to_string(), now);
            self.opened.push(name.to_string());
        }
        self.stack.push(name.to_string());
        outcome
    }

    /// Close the innermost open file; returns its (possibly substituted) name
    pub fn leave(&mut self, now: Timestamp) -> Option<String> {
        let Some(name) = self.stack.pop() else {
            tracing::debug!("Leave with no open inclusion, ignoring");
            return None;
        };
        self.end_of.entry(name.clone()).or_insert(now);
        Some(name)
    }

    /// Close everything still open; returns how many entries were closed
    pub fn drain(&mut self, now: Timestamp) -> usize {
        let mut closed = 0;
        while self.leave(now).is_some() {
            closed += 1;
        }
        closed
    }

    /// Emit one preprocessing record per tracked file
    ///
    /// Every file must have been closed (see [`drain`](Self::drain)); a file
    /// without an end time is an internal error.
    pub fn emit(&self, normalizer: &PathNormalizer, sink: &mut impl RecordSink) -> Result<()> {
        for name in &self.opened {
            if name == CYCLIC_INCLUDE_MARKER {
                continue;
            }
            let start = self.start_of[name];
            let end = *self
                .end_of
                .get(name)
                .ok_or_else(|| TraceError::UnclosedInclusion { name: name.clone() })?;
            sink.submit(TraceRecord::new(
                normalizer.resolve(name),
                EventCategory::Preprocess,
                TimeSpan::new(start, end),
            ));
        }
        Ok(())
    }

    /// Number of currently open entries, markers included
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Innermost open entry
    pub fn current(&self) -> Option<&str> {
        self.stack.last().map(String::as_str)
    }

    pub fn start_time(&self, name: &str) -> Option<Timestamp> {
        self.start_of.get(name).copied()
    }

    pub fn end_time(&self, name: &str) -> Option<Timestamp> {
        self.end_of.get(name).copied()
    }
}
