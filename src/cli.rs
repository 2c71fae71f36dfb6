//! CLI argument parsing for compile-trace

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "compile-trace")]
#[command(version)]
#[command(
    about = "Replay recorded compiler notifications into a Chrome trace timeline",
    long_about = None
)]
pub struct Cli {
    /// Notification log to replay (JSON lines, "-" for stdin)
    #[arg(short = 'e', long = "events", value_name = "FILE", default_value = "-")]
    pub events: String,

    /// Where to write the trace JSON
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: PathBuf,

    /// TOML configuration file
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Drop events shorter than this many nanoseconds (overrides config)
    #[arg(long = "min-duration-ns", value_name = "NS")]
    pub min_duration_ns: Option<i64>,

    /// Canonicalize include paths through the filesystem
    #[arg(long = "real-paths")]
    pub real_paths: bool,

    /// Pretty-print the trace JSON
    #[arg(long = "pretty")]
    pub pretty: bool,

    /// Print event counts to stderr when done
    #[arg(short = 's', long = "summary")]
    pub summary: bool,

    /// Enable debug logging
    #[arg(long = "debug")]
    pub debug: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_requires_output() {
        assert!(Cli::try_parse_from(["compile-trace"]).is_err());
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["compile-trace", "-o", "trace.json"]);
        assert_eq!(cli.events, "-");
        assert_eq!(cli.output, PathBuf::from("trace.json"));
        assert!(cli.config.is_none());
        assert!(cli.min_duration_ns.is_none());
        assert!(!cli.pretty);
        assert!(!cli.summary);
        assert!(!cli.debug);
    }

    #[test]
    fn test_cli_all_flags() {
        let cli = Cli::parse_from([
            "compile-trace",
            "--events",
            "build.jsonl",
            "--output",
            "out.json",
            "--config",
            "trace.toml",
            "--min-duration-ns",
            "0",
            "--real-paths",
            "--pretty",
            "--summary",
            "--debug",
        ]);
        assert_eq!(cli.events, "build.jsonl");
        assert_eq!(cli.config, Some(PathBuf::from("trace.toml")));
        assert_eq!(cli.min_duration_ns, Some(0));
        assert!(cli.real_paths);
        assert!(cli.pretty);
        assert!(cli.summary);
        assert!(cli.debug);
    }

    #[test]
    fn test_cli_rejects_non_numeric_threshold() {
        assert!(
            Cli::try_parse_from(["compile-trace", "-o", "t.json", "--min-duration-ns", "fast"])
                .is_err()
        );
    }
}
