//! Tracked compilation session
//!
//! A [`TraceSession`] is the single context object for one compilation. It
//! owns the clock, the output sink and every collector; the host calls into
//! it as work starts and finishes, and [`TraceSession::finalize`] consumes it
//! to write the trace document exactly once.
//!
//! # Example
//!
//! ```
//! use compile_trace::clock::ManualClock;
//! use compile_trace::config::TraceConfig;
//! use compile_trace::event::SymbolInfo;
//! use compile_trace::session::TraceSession;
//!
//! let config = TraceConfig { min_event_duration_ns: 0, ..TraceConfig::default() };
//! let mut session = TraceSession::with_sink(Vec::new(), ManualClock::with_epoch_us(0), config)?;
//!
//! session.start_file(Some("main.cpp"), None);
//! session.clock().advance(5_000_000);
//! session.finish_symbol(SymbolInfo::new("main()", "main.cpp"));
//!
//! let finished = session.finalize()?;
//! let json = String::from_utf8(finished.sink).unwrap();
//! assert!(json.contains("\"main()\""));
//! # Ok::<(), compile_trace::error::TraceError>(())
//! ```

use crate::clock::{Clock, MonotonicClock};
use crate::config::TraceConfig;
use crate::error::{Result, TraceError};
use crate::event::{EventCategory, PassDescriptor, SymbolInfo, TimeSpan, TraceRecord};
use crate::function_collector::FunctionCollector;
use crate::inclusion::{Entered, InclusionTracker};
use crate::pass_tracker::PassTracker;
use crate::path_normalizer::{PathNormalizer, PathResolver, RealPaths, VerbatimPaths};
use crate::trace_output::{EventSerializer, RecordSink, TraceSummary};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Name of the synthetic record spanning the whole compilation
pub const TRANSLATION_UNIT_NAME: &str = "TU";

/// Distance between leaving an included file and the next symbol baseline
const LEAVE_BASELINE_GAP_NS: i64 = 3;

/// Result of a finalized session
#[derive(Debug)]
pub struct FinishedTrace<W> {
    /// The sink the document was written to
    pub sink: W,
    pub summary: TraceSummary,
}

/// All state of one tracked compilation
pub struct TraceSession<W: Write, C: Clock = MonotonicClock> {
    clock: C,
    sink: W,
    config: TraceConfig,
    resolver: Box<dyn PathResolver>,
    normalizer: PathNormalizer,
    inclusions: InclusionTracker,
    passes: PassTracker,
    functions: FunctionCollector,
}

impl<C: Clock> TraceSession<BufWriter<File>, C> {
    /// Open `path` for writing and start a session
    ///
    /// Fails if the file can't be created; no session exists without a sink.
    pub fn create(path: &Path, clock: C, config: TraceConfig) -> Result<Self> {
        let file = File::create(path).map_err(|source| TraceError::SinkUnavailable {
            path: path.to_path_buf(),
            source,
        })?;
        Self::with_sink(BufWriter::new(file), clock, config)
    }
}

impl<W: Write, C: Clock> TraceSession<W, C> {
    /// Start a session writing to an already open sink
    pub fn with_sink(sink: W, clock: C, config: TraceConfig) -> Result<Self> {
        config.validate()?;
        let resolver: Box<dyn PathResolver> = if config.resolve_real_paths {
            Box::new(RealPaths)
        } else {
            Box::new(VerbatimPaths)
        };
        Ok(Self {
            clock,
            sink,
            inclusions: InclusionTracker::with_virtual_names(config.virtual_file_names.clone()),
            config,
            resolver,
            normalizer: PathNormalizer::new(),
            passes: PassTracker::new(),
            functions: FunctionCollector::new(),
        })
    }

    /// Replace the path resolver chosen from the configuration
    pub fn with_resolver(mut self, resolver: Box<dyn PathResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// The host entered a file, found in `containing_dir` when known
    pub fn start_file(&mut self, name: Option<&str>, containing_dir: Option<&str>) -> Entered {
        let now = self.clock.now();
        let entered = self.inclusions.enter(name, now);

        if let (Entered::Tracked, Some(name), Some(dir)) = (entered, name, containing_dir) {
            if let Some((file, dir)) = self.resolver.resolve(name, dir) {
                self.normalizer.register(&file, &dir);
                self.normalizer.register_alias(name, &file);
            }
        }
        entered
    }

    /// The host left the innermost open file
    pub fn leave_file(&mut self) {
        let now = self.clock.now();
        if self.inclusions.leave(now).is_some() {
            self.functions.rebase(now.saturating_add(LEAVE_BASELINE_GAP_NS));
        }
    }

    /// The host finished a declaration; closes any files still open
    pub fn finish_decl(&mut self) {
        let now = self.clock.now();
        if self.inclusions.drain(now) > 0 {
            self.functions.rebase(now);
        }
    }

    /// The host started an optimization pass
    pub fn begin_pass(&mut self, pass: PassDescriptor) {
        let now = self.clock.now();
        self.passes.begin_pass(pass, now);
    }

    /// The host finished processing a symbol
    pub fn finish_symbol(&mut self, symbol: SymbolInfo) {
        let now = self.clock.now();
        self.functions.record(symbol, now);
    }

    /// Emit every collected record, write the document and release all state
    pub fn finalize(mut self) -> Result<FinishedTrace<W>> {
        let now = self.clock.now();
        let mut serializer = EventSerializer::new(
            self.config.min_event_duration_ns,
            self.config.effective_process_id(),
        );

        serializer.submit(TraceRecord::new(
            TRANSLATION_UNIT_NAME,
            EventCategory::TranslationUnit,
            TimeSpan::new(0, now),
        ));

        self.inclusions.drain(now);
        self.inclusions.emit(&self.normalizer, &mut serializer)?;
        self.passes.emit(&mut serializer);
        self.functions.emit_functions(&self.normalizer, &mut serializer);
        self.functions.emit_scopes(&mut serializer);

        let (document, summary) = serializer.into_document(self.clock.beginning_of_time_us());
        document.write_to(&mut self.sink, self.config.pretty)?;

        tracing::info!(
            "Trace written: {} records submitted, {} dropped, {} events",
            summary.submitted,
            summary.dropped,
            summary.written_entries
        );

        Ok(FinishedTrace {
            sink: self.sink,
            summary,
        })
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn config(&self) -> &TraceConfig {
        &self.config
    }

    pub fn normalizer(&self) -> &PathNormalizer {
        &self.normalizer
    }

    pub fn inclusions(&self) -> &InclusionTracker {
        &self.inclusions
    }

    pub fn passes(&self) -> &PassTracker {
        &self.passes
    }

    pub fn functions(&self) -> &FunctionCollector {
        &self.functions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::event::{PassKind, ScopeKind};
    use crate::trace_output::TraceDocument;

    fn session(min_duration_ns: i64) -> TraceSession<Vec<u8>, ManualClock> {
        let config = TraceConfig {
            min_event_duration_ns: min_duration_ns,
            process_id: Some(99),
            ..TraceConfig::default()
        };
        TraceSession::with_sink(Vec::new(), ManualClock::with_epoch_us(1_000), config).unwrap()
    }

    fn document(finished: FinishedTrace<Vec<u8>>) -> TraceDocument {
        serde_json::from_slice(&finished.sink).unwrap()
    }

    #[test]
    fn test_empty_session_writes_translation_unit() {
        let session = session(0);
        session.clock().set(2_000_000);
        let finished = session.finalize().unwrap();
        assert_eq!(finished.summary.written_entries, 2);

        let doc = document(finished);
        assert_eq!(doc.beginning_of_time, 1_000);
        assert_eq!(doc.trace_events[0].name, TRANSLATION_UNIT_NAME);
        assert_eq!(doc.trace_events[0].cat, EventCategory::TranslationUnit);
        assert_eq!(doc.trace_events[1].ts, 2_000.0);
        assert!(doc.trace_events.iter().all(|e| e.pid == 99));
    }

    #[test]
    fn test_cyclic_entry_skips_path_registration() {
        let mut session = session(0);
        session.start_file(Some("/x/inc/a.h"), Some("/x/inc"));
        session.start_file(Some("/x/inc/b.h"), Some("/x/inc"));
        assert_eq!(
            session.start_file(Some("/x/inc/a.h"), Some("/elsewhere")),
            Entered::Cyclic
        );
        assert_eq!(session.normalizer().directory_of("/x/inc/a.h"), Some("/x/inc"));
        assert_eq!(session.normalizer().len(), 2);
    }

    #[test]
    fn test_leave_rebases_function_baseline() {
        let mut session = session(0);
        session.start_file(Some("main.cpp"), None);
        session.start_file(Some("big.h"), None);
        session.clock().set(50_000);
        session.leave_file();
        session.clock().set(60_000);
        session.finish_symbol(SymbolInfo::new("f()", "main.cpp"));

        assert_eq!(
            session.functions().functions()[0].span,
            TimeSpan::new(50_006, 60_000)
        );
    }

    #[test]
    fn test_finish_decl_drains_and_rebases() {
        let mut session = session(0);
        session.start_file(Some("main.cpp"), None);
        session.start_file(Some("a.h"), None);
        session.clock().set(7_000);
        session.finish_decl();

        assert_eq!(session.inclusions().depth(), 0);
        assert_eq!(session.inclusions().end_time("main.cpp"), Some(7_000));
        assert_eq!(session.functions().last_function_end(), 7_000);

        // Nothing left to drain: baseline stays put
        session.clock().set(9_000);
        session.finish_decl();
        assert_eq!(session.functions().last_function_end(), 7_000);
    }

    #[test]
    fn test_finalize_order_and_filtering() {
        let mut session = session(1_000_000);
        session.start_file(Some("main.cpp"), None);
        session.clock().set(100);
        session.start_file(Some("tiny.h"), None);
        session.clock().set(200);
        session.leave_file();
        session.clock().set(5_000_000);
        session.finish_decl();

        session.begin_pass(PassDescriptor::new("ssa", PassKind::Gimple, 4));
        session.clock().set(8_000_000);
        session.begin_pass(PassDescriptor::new("expand", PassKind::Rtl, 200));

        session.clock().set(12_000_000);
        session.finish_symbol(
            SymbolInfo::new("Widget::draw()", "main.cpp").in_scope("Widget", ScopeKind::Struct),
        );
        session.clock().set(20_000_000);

        let finished = session.finalize().unwrap();
        // TU, main.cpp, ssa, Widget::draw(), Widget kept; tiny.h dropped
        assert_eq!(finished.summary.submitted, 6);
        assert_eq!(finished.summary.dropped, 1);

        let doc = document(finished);
        let begins: Vec<_> = doc
            .trace_events
            .iter()
            .step_by(2)
            .map(|e| (e.name.as_str(), e.cat))
            .collect();
        assert_eq!(
            begins,
            vec![
                ("TU", EventCategory::TranslationUnit),
                ("main.cpp", EventCategory::Preprocess),
                ("ssa", EventCategory::GimplePass),
                ("Widget::draw()", EventCategory::Function),
                ("Widget", EventCategory::Struct),
            ]
        );
    }

    #[test]
    fn test_finalize_writes_pretty_when_configured() {
        let config = TraceConfig {
            pretty: true,
            ..TraceConfig::default()
        };
        let session =
            TraceSession::with_sink(Vec::new(), ManualClock::with_epoch_us(0), config).unwrap();
        let finished = session.finalize().unwrap();
        assert!(String::from_utf8(finished.sink).unwrap().contains('\n'));
    }

    #[test]
    fn test_invalid_config_refuses_session() {
        let config = TraceConfig {
            min_event_duration_ns: -5,
            ..TraceConfig::default()
        };
        let result = TraceSession::with_sink(Vec::new(), ManualClock::with_epoch_us(0), config);
        assert!(matches!(result, Err(TraceError::Config(_))));
    }

    #[test]
    fn test_create_fails_for_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("trace.json");
        let result = TraceSession::create(&path, ManualClock::new(), TraceConfig::default());
        match result {
            Err(TraceError::SinkUnavailable { path: p, .. }) => assert_eq!(p, path),
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("session created without a sink"),
        }
    }

    #[test]
    fn test_create_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.json");
        let session = TraceSession::create(&path, ManualClock::new(), TraceConfig::default()).unwrap();
        session.finalize().unwrap();

        let doc: TraceDocument =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(doc.display_time_unit, "ns");
    }
}
