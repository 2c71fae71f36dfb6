//! compile-trace - compilation time-trace engine
//!
//! This library turns the stream of progress notifications a compiler host
//! emits (files entered and left, optimization passes started, symbols
//! finished) into a single Chrome trace timeline. All bookkeeping lives in a
//! [`session::TraceSession`] created at the start of a compilation and
//! consumed by `finalize` at its end.

pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod event;
pub mod function_collector;
pub mod inclusion;
pub mod pass_tracker;
pub mod path_normalizer;
pub mod replay;
pub mod session;
pub mod trace_output;
