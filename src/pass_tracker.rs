//! Optimization pass timing
//!
//! The host only announces when a pass *starts*. A pass therefore ends when
//! the next one starts, and the last pass of a compilation is never closed
//! and never emitted.

use crate::event::{PassDescriptor, TimeSpan, TraceRecord, Timestamp};
use crate::trace_output::RecordSink;

/// Argument key carrying the pass sequence number
pub const PASS_NUMBER_ARG: &str = "static_pass_number";

/// A pass with a known start and end
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassRecord {
    pub pass: PassDescriptor,
    pub span: TimeSpan,
}

impl PassRecord {
    fn to_trace_record(&self) -> TraceRecord {
        TraceRecord::new(self.pass.name.clone(), self.pass.kind.category(), self.span)
            .with_arg(PASS_NUMBER_ARG, self.pass.sequence_number.to_string())
    }
}

/// State of the single "current pass" slot
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PassSlot {
    #[default]
    Idle,
    Active {
        pass: PassDescriptor,
        start: Timestamp,
    },
}

/// Accumulates closed passes from a stream of pass-start notifications
#[derive(Debug, Default)]
pub struct PassTracker {
    current: PassSlot,
    history: Vec<PassRecord>,
}

impl PassTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start `pass` at `now`, closing the active pass if there is one
    pub fn begin_pass(&mut self, pass: PassDescriptor, now: Timestamp) {
        if let PassSlot::Active {
            pass: closed,
            start,
        } = std::mem::take(&mut self.current)
        {
            self.history.push(PassRecord {
                pass: closed,
                span: TimeSpan::new(start, now),
            });
        }
        // +1 keeps the new begin strictly after the previous end
        self.current = PassSlot::Active {
            pass,
            start: now.saturating_add(1),
        };
    }

    /// Emit one record per closed pass; the active pass is left out
    pub fn emit(&self, sink: &mut impl RecordSink) {
        for record in &self.history {
            sink.submit(record.to_trace_record());
        }
    }

    pub fn current(&self) -> &PassSlot {
        &self.current
    }

    pub fn history(&self) -> &[PassRecord] {
        &self.history
    }
}
