//! Function and scope timing
//!
//! The host reports when it has finished processing a symbol, never when it
//! started. A symbol's span runs from the end of the previous symbol to now.
//!
//! Symbols that share an enclosing scope and arrive back to back collapse
//! into a single scope bar (e.g. consecutive methods of one class). A scope
//! revisited after an unrelated symbol gets a second bar.

use crate::event::{EventCategory, ScopeKind, SymbolInfo, TimeSpan, TraceRecord, Timestamp};
use crate::path_normalizer::PathNormalizer;
use crate::trace_output::RecordSink;

/// Argument key carrying the function's source file
pub const FILE_ARG: &str = "file";

/// Gap between consecutive symbol spans, so a begin never coincides with
/// the previous end
const SYMBOL_GAP_NS: i64 = 3;

/// One processed symbol
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionRecord {
    pub name: String,
    pub source_file: String,
    pub span: TimeSpan,
}

/// A run of consecutive symbols in the same scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeRecord {
    pub name: String,
    pub kind: ScopeKind,
    pub span: TimeSpan,
}

/// Collects per-symbol records and merges adjacent same-scope runs
#[derive(Debug, Default)]
pub struct FunctionCollector {
    functions: Vec<FunctionRecord>,
    scopes: Vec<ScopeRecord>,
    last_function_end: Timestamp,
    previous_had_scope: bool,
}

impl FunctionCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `symbol` finished at `now`
    pub fn record(&mut self, symbol: SymbolInfo, now: Timestamp) {
        let span = TimeSpan::new(self.last_function_end.saturating_add(SYMBOL_GAP_NS), now);
        self.last_function_end = now;

        self.functions.push(FunctionRecord {
            name: symbol.name,
            source_file: symbol.file,
            span,
        });

        let Some(scope) = symbol.scope else {
            self.previous_had_scope = false;
            return;
        };

        match self.scopes.last_mut() {
            Some(last) if self.previous_had_scope && last.name == scope.name => {
                last.span.end = span.end.saturating_add(1);
            }
            _ => self.scopes.push(ScopeRecord {
                name: scope.name,
                kind: scope.kind,
                span: TimeSpan::new(span.start - 1, span.end.saturating_add(1)),
            }),
        }
        self.previous_had_scope = true;
    }

    /// Move the start baseline of the next symbol
    ///
    /// Used when non-symbol work (leaving an included file) happened since
    /// the last symbol finished.
    pub fn rebase(&mut self, baseline: Timestamp) {
        self.last_function_end = baseline;
    }

    /// Emit one record per function, with its normalized source file
    pub fn emit_functions(&self, normalizer: &PathNormalizer, sink: &mut impl RecordSink) {
        for function in &self.functions {
            sink.submit(
                TraceRecord::new(function.name.clone(), EventCategory::Function, function.span)
                    .with_arg(FILE_ARG, normalizer.resolve(&function.source_file)),
            );
        }
    }

    /// Emit one record per merged scope run
    pub fn emit_scopes(&self, sink: &mut impl RecordSink) {
        for scope in &self.scopes {
            sink.submit(TraceRecord::new(
                scope.name.clone(),
                scope.kind.category(),
                scope.span,
            ));
        }
    }

    pub fn functions(&self) -> &[FunctionRecord] {
        &self.functions
    }

    pub fn scopes(&self) -> &[ScopeRecord] {
        &self.scopes
    }

    pub fn last_function_end(&self) -> Timestamp {
        self.last_function_end
    }
}
