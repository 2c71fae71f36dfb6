use anyhow::{Context, Result};
use clap::Parser;
use compile_trace::{
    cli::Cli,
    clock::ManualClock,
    config::TraceConfig,
    replay,
    session::TraceSession,
    trace_output::TraceSummary,
};
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber; warnings always reach stderr
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Build the effective configuration: file values, then CLI overrides
fn load_config(args: &Cli) -> Result<TraceConfig> {
    let mut config = match &args.config {
        Some(path) => TraceConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => TraceConfig::default(),
    };

    if let Some(ns) = args.min_duration_ns {
        config.min_event_duration_ns = ns;
    }
    if args.real_paths {
        config.resolve_real_paths = true;
    }
    if args.pretty {
        config.pretty = true;
    }
    config.validate()?;
    Ok(config)
}

fn print_summary(summary: &TraceSummary) {
    eprintln!(
        "{} records submitted, {} dropped, {} trace events written",
        summary.submitted, summary.dropped, summary.written_entries
    );
}

fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing(args.debug);

    let config = load_config(&args)?;

    let events: Box<dyn BufRead> = if args.events == "-" {
        Box::new(io::stdin().lock())
    } else {
        let file = File::open(&args.events)
            .with_context(|| format!("Couldn't open notification log {}", args.events))?;
        Box::new(BufReader::new(file))
    };

    // The sink must exist before any notification is accepted
    let session = TraceSession::create(&args.output, ManualClock::new(), config)?;

    let finished = match replay::replay(events, session) {
        Ok(finished) => finished,
        Err(e) => {
            // Don't leave a truncated trace behind
            if let Err(remove_err) = fs::remove_file(&args.output) {
                tracing::warn!(
                    "Couldn't remove partial trace {}: {}",
                    args.output.display(),
                    remove_err
                );
            }
            return Err(e.into());
        }
    };

    if args.summary {
        print_summary(&finished.summary);
    }

    Ok(())
}
