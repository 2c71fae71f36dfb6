//! Chrome trace output
//!
//! Records are filtered by duration, then written as begin/end ("B"/"E")
//! duration-event pairs that share a `UID` argument. The document is the
//! JSON object form of the Chrome trace format:
//!
//! ```text
//! {
//!   "displayTimeUnit": "ns",
//!   "beginningOfTime": <µs since Unix epoch>,
//!   "traceEvents": [
//!     {"name": .., "ph": "B", "cat": .., "ts": <µs>, "pid": .., "tid": 0,
//!      "args": {"UID": 0, ..}},
//!     ...
//!   ]
//! }
//! ```
//!
//! Timestamps are kept in nanoseconds and converted to microseconds only here.

use crate::error::Result;
use crate::event::{EventCategory, TraceRecord, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;

/// Records shorter than this are dropped by default (1ms)
pub const DEFAULT_MIN_EVENT_DURATION_NS: i64 = 1_000_000;

/// Work is modeled as one sequential stream
const TRACE_THREAD_ID: u32 = 0;

/// Argument key reserved for the begin/end pairing identifier
pub const UID_ARG: &str = "UID";

/// Anything collectors can emit records into
pub trait RecordSink {
    /// Offer one record; returns whether it was kept
    fn submit(&mut self, record: TraceRecord) -> bool;
}

impl RecordSink for Vec<TraceRecord> {
    fn submit(&mut self, record: TraceRecord) -> bool {
        self.push(record);
        true
    }
}

/// Duration-event phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    #[serde(rename = "B")]
    Begin,
    #[serde(rename = "E")]
    End,
}

/// Arguments of one trace event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventArgs {
    #[serde(rename = "UID")]
    pub uid: u64,
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

/// One entry of the `traceEvents` array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    pub name: String,
    pub ph: Phase,
    pub cat: EventCategory,
    /// Microseconds since the start of the compilation
    pub ts: f64,
    pub pid: u32,
    pub tid: u32,
    pub args: EventArgs,
}

/// Root output document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceDocument {
    #[serde(rename = "displayTimeUnit")]
    pub display_time_unit: String,
    /// Microseconds since the Unix epoch
    #[serde(rename = "beginningOfTime")]
    pub beginning_of_time: i64,
    #[serde(rename = "traceEvents")]
    pub trace_events: Vec<TraceEvent>,
}

impl TraceDocument {
    /// Serialize to JSON string
    pub fn to_json(&self, pretty: bool) -> Result<String> {
        Ok(if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        })
    }

    /// Serialize into `writer` and flush it
    pub fn write_to<W: Write>(&self, mut writer: W, pretty: bool) -> Result<()> {
        if pretty {
            serde_json::to_writer_pretty(&mut writer, self)?;
        } else {
            serde_json::to_writer(&mut writer, self)?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn ns_to_us(ns: Timestamp) -> f64 {
    ns as f64 * 0.001
}

/// Counts reported after a trace is written
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraceSummary {
    /// Records offered to the filter
    pub submitted: u64,
    /// Records below the duration threshold
    pub dropped: u64,
    /// Entries in `traceEvents` (two per kept record)
    pub written_entries: u64,
}

/// Duration filter and begin/end pair builder
#[derive(Debug)]
pub struct EventSerializer {
    min_duration_ns: i64,
    pid: u32,
    next_uid: u64,
    events: Vec<TraceEvent>,
    summary: TraceSummary,
}

impl EventSerializer {
    pub fn new(min_duration_ns: i64, pid: u32) -> Self {
        Self {
            min_duration_ns,
            pid,
            next_uid: 0,
            events: Vec::new(),
            summary: TraceSummary::default(),
        }
    }

    fn entry(&self, record: &TraceRecord, ph: Phase, ts: Timestamp, uid: u64) -> TraceEvent {
        let mut extra = record.args.clone().unwrap_or_default();
        extra.remove(UID_ARG);
        TraceEvent {
            name: record.name.clone(),
            ph,
            cat: record.category,
            ts: ns_to_us(ts),
            pid: self.pid,
            tid: TRACE_THREAD_ID,
            args: EventArgs { uid, extra },
        }
    }

    /// Buffered entries so far
    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    pub fn summary(&self) -> TraceSummary {
        self.summary
    }

    /// Build the final document, consuming the buffered entries
    pub fn into_document(self, beginning_of_time_us: i64) -> (TraceDocument, TraceSummary) {
        let document = TraceDocument {
            display_time_unit: "ns".to_string(),
            beginning_of_time: beginning_of_time_us,
            trace_events: self.events,
        };
        (document, self.summary)
    }
}

impl RecordSink for EventSerializer {
    fn submit(&mut self, record: TraceRecord) -> bool {
        self.summary.submitted += 1;
        if record.span.duration() < self.min_duration_ns {
            self.summary.dropped += 1;
            return false;
        }

        if record
            .args
            .as_ref()
            .is_some_and(|args| args.contains_key(UID_ARG))
        {
            tracing::warn!("Dropping reserved {} argument of {}", UID_ARG, record.name);
        }

        let uid = self.next_uid;
        self.next_uid += 1;

        let begin = self.entry(&record, Phase::Begin, record.span.start, uid);
        let end = self.entry(&record, Phase::End, record.span.end, uid);
        self.events.push(begin);
        self.events.push(end);
        self.summary.written_entries += 2;
        true
    }
}
