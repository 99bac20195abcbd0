//! CLI tool to run path pipelines over arguments and stdin.
//!
//! Usage:
//!   pathpipe base /path/to/file.txt
//!   ls -1 | pathpipe base,match+*.md,strip-ext
//!   ls -1 | pathpipe is-match '*.txt' && echo MATCH!
//!
//! Exit status: 0 when output was produced (or every record passed a
//! check), 1 when nothing matched, 2 on error.

use clap::Parser;
use pathpipe::config::LOG_ENV;
use pathpipe::{Config, Executor, Outcome, RecordSource, RunSummary, Separator, parse_invocation};
use std::io::{self, BufWriter, IsTerminal};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Apply lexical path transformations to records from arguments and stdin.
///
/// Stages are chained with commas and may carry arguments inline after
/// `+`, e.g. `base,match+*.md,strip-ext`. Arguments not given inline are
/// taken from the following positional values; the rest are paths.
#[derive(Parser)]
#[command(name = "pathpipe", version)]
struct Cli {
    /// End each output record with NUL and split stdin on NUL
    #[arg(short, long, conflicts_with = "space")]
    zero: bool,

    /// End each output record with a space and split stdin on spaces
    #[arg(short, long)]
    space: bool,

    /// Suppress all error messages
    #[arg(short, long)]
    quiet: bool,

    /// Show record counts and debug logs on stderr
    #[arg(short, long)]
    verbose: bool,

    /// Command expression, e.g. `base` or `dir,compact`
    command: String,

    /// Stage arguments followed by paths
    #[arg(allow_negative_numbers = true)]
    args: Vec<String>,
}

impl Cli {
    fn config(&self) -> Config {
        let separator = if self.zero {
            Separator::Nul
        } else if self.space {
            Separator::Space
        } else {
            Separator::Newline
        };
        Config {
            separator,
            quiet: self.quiet,
            verbose: self.verbose,
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(config.default_log_directive()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: &Cli, config: &Config) -> pathpipe::Result<RunSummary> {
    let (pipeline, paths) = parse_invocation(&cli.command, &cli.args)?;
    let source = RecordSource::new(paths, config);

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut executor = Executor::new(pipeline.stages(), config);

    let stdin = io::stdin();
    if stdin.is_terminal() {
        executor.run(source, &mut out)
    } else {
        executor.run(source.with_stream(stdin.lock()), &mut out)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = cli.config();
    init_tracing(&config);

    match run(&cli, &config) {
        Ok(summary) => {
            if config.verbose {
                eprintln!(
                    "Records:  {} in -> {} out",
                    summary.input_count, summary.output_count
                );
            }
            match summary.outcome {
                Outcome::Matched => ExitCode::SUCCESS,
                Outcome::NoMatch => ExitCode::from(1),
            }
        }
        Err(e) => {
            if !config.quiet {
                eprintln!("Error: {e}");
            }
            ExitCode::from(2)
        }
    }
}
