//! Core data model shared by every collector
//!
//! All timestamps are nanoseconds relative to the start of the compilation.
//! Collectors produce [`TraceRecord`]s; the serializer turns each accepted
//! record into a begin/end pair.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Nanoseconds since the compilation started
pub type Timestamp = i64;

/// Time interval of one unit of work
///
/// `end` may be 0 while the work is still open; once finalized `end >= start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimeSpan {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl TimeSpan {
    pub fn new(start: Timestamp, end: Timestamp) -> Self {
        Self { start, end }
    }

    /// Length of the span in nanoseconds (negative if inverted)
    pub fn duration(&self) -> i64 {
        self.end.saturating_sub(self.start)
    }
}

/// Event category, used for grouping and color selection in the viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventCategory {
    #[serde(rename = "TU")]
    TranslationUnit,
    #[serde(rename = "PREPROCESS")]
    Preprocess,
    #[serde(rename = "FUNCTION")]
    Function,
    #[serde(rename = "STRUCT")]
    Struct,
    #[serde(rename = "NAMESPACE")]
    Namespace,
    #[serde(rename = "GIMPLE_PASS")]
    GimplePass,
    #[serde(rename = "RTL_PASS")]
    RtlPass,
    #[serde(rename = "SIMPLE_IPA_PASS")]
    SimpleIpaPass,
    #[serde(rename = "IPA_PASS")]
    IpaPass,
    #[serde(rename = "UNKNOWN")]
    Unknown,
}

impl EventCategory {
    /// Category string as written to the `cat` field
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TranslationUnit => "TU",
            Self::Preprocess => "PREPROCESS",
            Self::Function => "FUNCTION",
            Self::Struct => "STRUCT",
            Self::Namespace => "NAMESPACE",
            Self::GimplePass => "GIMPLE_PASS",
            Self::RtlPass => "RTL_PASS",
            Self::SimpleIpaPass => "SIMPLE_IPA_PASS",
            Self::IpaPass => "IPA_PASS",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for EventCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The converged record shape every collector emits
#[derive(Debug, Clone, PartialEq)]
pub struct TraceRecord {
    pub name: String,
    pub category: EventCategory,
    pub span: TimeSpan,
    /// Extra string arguments attached to both the begin and end entry
    pub args: Option<BTreeMap<String, String>>,
}

impl TraceRecord {
    pub fn new(name: impl Into<String>, category: EventCategory, span: TimeSpan) -> Self {
        Self {
            name: name.into(),
            category,
            span,
            args: None,
        }
    }

    /// Attach one string argument
    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.args
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }
}

/// Kind of optimization pass, as reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassKind {
    Gimple,
    Rtl,
    SimpleIpa,
    Ipa,
}

impl PassKind {
    pub fn category(&self) -> EventCategory {
        match self {
            Self::Gimple => EventCategory::GimplePass,
            Self::Rtl => EventCategory::RtlPass,
            Self::SimpleIpa => EventCategory::SimpleIpaPass,
            Self::Ipa => EventCategory::IpaPass,
        }
    }
}

/// Value copy of a pass handle, taken when the pass starts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassDescriptor {
    pub name: String,
    pub kind: PassKind,
    pub sequence_number: i32,
}

impl PassDescriptor {
    pub fn new(name: impl Into<String>, kind: PassKind, sequence_number: i32) -> Self {
        Self {
            name: name.into(),
            kind,
            sequence_number,
        }
    }
}

/// Kind of lexical scope enclosing a symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    Namespace,
    /// Structs, classes and unions
    Struct,
}

impl ScopeKind {
    pub fn category(&self) -> EventCategory {
        match self {
            Self::Namespace => EventCategory::Namespace,
            Self::Struct => EventCategory::Struct,
        }
    }
}

/// Enclosing scope of a finished symbol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeRef {
    pub name: String,
    pub kind: ScopeKind,
}

impl ScopeRef {
    pub fn new(name: impl Into<String>, kind: ScopeKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Facts about a symbol the host has finished processing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolInfo {
    /// Display name, e.g. `ns::Widget::draw(int)`
    pub name: String,
    /// Source file the symbol is defined in
    pub file: String,
    /// `None` for symbols at translation-unit scope
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<ScopeRef>,
}

impl SymbolInfo {
    pub fn new(name: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file: file.into(),
            scope: None,
        }
    }

    pub fn in_scope(mut self, name: impl Into<String>, kind: ScopeKind) -> Self {
        self.scope = Some(ScopeRef::new(name, kind));
        self
    }
}
