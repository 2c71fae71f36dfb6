//! Replay of recorded host notifications
//!
//! A notification log is JSON lines, one host notification per line:
//!
//! ```text
//! {"at_ns": 0, "event": "start_file", "name": "/src/main.cpp"}
//! {"at_ns": 120, "event": "start_file", "name": "/usr/include/stdio.h", "dir": "/usr/include"}
//! {"at_ns": 4000000, "event": "leave_file"}
//! {"at_ns": 4500000, "event": "finish_decl"}
//! {"at_ns": 5000000, "event": "pass", "name": "ssa", "kind": "gimple", "sequence_number": 12}
//! {"at_ns": 9000000, "event": "symbol", "name": "Widget::draw()", "file": "/src/main.cpp",
//!  "scope": {"name": "Widget", "kind": "struct"}}
//! {"at_ns": 12000000, "event": "finish"}
//! ```
//!
//! `at_ns` moves the session's [`ManualClock`] forward before the notification
//! is applied; lines without it happen at the current time. Blank lines are
//! skipped. The trace is finalized on `finish` or at end of input.

use crate::clock::ManualClock;
use crate::error::{Result, TraceError};
use crate::event::{PassDescriptor, SymbolInfo, Timestamp};
use crate::session::{FinishedTrace, TraceSession};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};

/// One notification from the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Notification {
    /// Entered a file; `dir` is the include directory it was found in
    StartFile {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dir: Option<String>,
    },
    /// Left the innermost file
    LeaveFile,
    /// Finished a declaration
    FinishDecl,
    /// Started an optimization pass
    Pass(PassDescriptor),
    /// Finished processing a symbol
    Symbol(SymbolInfo),
    /// End of compilation
    Finish,
}

/// A notification with the time it happened
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at_ns: Option<Timestamp>,
    #[serde(flatten)]
    pub notification: Notification,
}

/// Parse one log line; blank lines yield `None`
pub fn parse_line(line: &str, line_number: usize) -> Result<Option<HostEvent>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(line)
        .map(Some)
        .map_err(|source| TraceError::MalformedNotification {
            line: line_number,
            source,
        })
}

/// Apply one event to `session`; returns true for `finish`
pub fn apply<W: Write>(session: &mut TraceSession<W, ManualClock>, event: HostEvent) -> bool {
    if let Some(at) = event.at_ns {
        session.clock().set(at);
    }
    match event.notification {
        Notification::StartFile { name, dir } => {
            session.start_file(name.as_deref(), dir.as_deref());
        }
        Notification::LeaveFile => session.leave_file(),
        Notification::FinishDecl => session.finish_decl(),
        Notification::Pass(pass) => session.begin_pass(pass),
        Notification::Symbol(symbol) => session.finish_symbol(symbol),
        Notification::Finish => return true,
    }
    false
}

/// Drive `session` from a notification log and finalize it
pub fn replay<R: BufRead, W: Write>(
    reader: R,
    mut session: TraceSession<W, ManualClock>,
) -> Result<FinishedTrace<W>> {
    let mut applied = 0usize;
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let Some(event) = parse_line(&line, index + 1)? else {
            continue;
        };
        applied += 1;
        if apply(&mut session, event) {
            break;
        }
    }
    tracing::debug!("Replayed {} notifications", applied);
    session.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TraceConfig;
    use crate::event::{PassKind, ScopeKind};
    use crate::trace_output::TraceDocument;
    use std::io::Cursor;

    fn session() -> TraceSession<Vec<u8>, ManualClock> {
        let config = TraceConfig {
            process_id: Some(1),
            ..TraceConfig::default()
        };
        TraceSession::with_sink(Vec::new(), ManualClock::with_epoch_us(0), config).unwrap()
    }

    #[test]
    fn test_parse_start_file() {
        let event = parse_line(
            r#"{"at_ns": 5, "event": "start_file", "name": "/x/a.h", "dir": "/x"}"#,
            1,
        )
        .unwrap()
        .unwrap();
        assert_eq!(event.at_ns, Some(5));
        assert_eq!(
            event.notification,
            Notification::StartFile {
                name: Some("/x/a.h".to_string()),
                dir: Some("/x".to_string())
            }
        );
    }

    #[test]
    fn test_parse_start_file_without_name() {
        let event = parse_line(r#"{"event": "start_file"}"#, 1).unwrap().unwrap();
        assert_eq!(event.at_ns, None);
        assert_eq!(
            event.notification,
            Notification::StartFile {
                name: None,
                dir: None
            }
        );
    }

    #[test]
    fn test_parse_pass_and_symbol() {
        let pass = parse_line(
            r#"{"event": "pass", "name": "ssa", "kind": "simple_ipa", "sequence_number": 3}"#,
            1,
        )
        .unwrap()
        .unwrap();
        assert_eq!(
            pass.notification,
            Notification::Pass(PassDescriptor::new("ssa", PassKind::SimpleIpa, 3))
        );

        let symbol = parse_line(
            r#"{"event": "symbol", "name": "ns::f()", "file": "f.cpp", "scope": {"name": "ns", "kind": "namespace"}}"#,
            2,
        )
        .unwrap()
        .unwrap();
        assert_eq!(
            symbol.notification,
            Notification::Symbol(
                SymbolInfo::new("ns::f()", "f.cpp").in_scope("ns", ScopeKind::Namespace)
            )
        );
    }

    #[test]
    fn test_blank_line_skipped() {
        assert_eq!(parse_line("   ", 3).unwrap(), None);
    }

    #[test]
    fn test_malformed_line_reports_number() {
        let err = parse_line(r#"{"event": "teleport"}"#, 7).unwrap_err();
        assert!(matches!(err, TraceError::MalformedNotification { line: 7, .. }));
    }

    #[test]
    fn test_apply_advances_clock() {
        let mut session = session();
        let done = apply(
            &mut session,
            HostEvent {
                at_ns: Some(1_234),
                notification: Notification::StartFile {
                    name: Some("main.cpp".to_string()),
                    dir: None,
                },
            },
        );
        assert!(!done);
        assert_eq!(session.inclusions().start_time("main.cpp"), Some(1_234));
    }

    #[test]
    fn test_replay_stops_at_finish() {
        let log = r#"
{"at_ns": 0, "event": "start_file", "name": "main.cpp"}
{"at_ns": 3000000, "event": "leave_file"}
{"at_ns": 4000000, "event": "finish"}
{"at_ns": 9000000, "event": "start_file", "name": "ignored.h"}
"#;
        let finished = replay(Cursor::new(log), session()).unwrap();
        let doc: TraceDocument = serde_json::from_slice(&finished.sink).unwrap();
        let names: Vec<_> = doc.trace_events.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["TU", "TU", "main.cpp", "main.cpp"]);
        assert_eq!(doc.trace_events[1].ts, 4_000.0);
    }

    #[test]
    fn test_replay_finalizes_at_eof() {
        let log = r#"{"at_ns": 2000000, "event": "leave_file"}"#;
        let finished = replay(Cursor::new(log), session()).unwrap();
        assert_eq!(finished.summary.submitted, 1);
        assert_eq!(finished.summary.written_entries, 2);
    }

    #[test]
    fn test_replay_propagates_malformed_line() {
        let log = "{\"event\": \"finish_decl\"}\nnot json\n";
        let err = replay(Cursor::new(log), session()).unwrap_err();
        assert!(matches!(err, TraceError::MalformedNotification { line: 2, .. }));
    }
}
