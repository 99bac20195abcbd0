//! # pathpipe
//!
//! Lexical path transformations chained into record pipelines.
//!
//! Paths arrive as records, either as positional arguments or as
//! separator-delimited records on a stream, and flow one at a time through
//! a comma-chained list of stages such as `base`, `clean`, `match` or
//! `join`.
//!
//! ## Overview
//!
//! - **Path algorithms** ([`path`]): pure string functions (clean,
//!   compact, dir/base names, extensions, safety checks, secure join)
//! - **Record source** ([`source`]): arguments first, then the stream
//! - **Pipeline builder** ([`dsl`]): `base,match+*.md,strip-ext` into
//!   typed stages, validated before any record is read
//! - **Executor** ([`executor`]): record-at-a-time, short-circuits on
//!   drop, aborts on failure
//!
//! ## Example
//!
//! ```
//! use pathpipe::{Config, Outcome, execute_pipeline};
//!
//! let input = b"a/readme.md\na/notes.txt\n";
//! let (output, summary) =
//!     execute_pipeline("base,match+*.md,strip-ext", &[] as &[&str], input, &Config::default())
//!         .unwrap();
//!
//! assert_eq!(output, b"readme\n");
//! assert_eq!(summary.outcome, Outcome::Matched);
//! ```

pub mod config;
pub mod dsl;
pub mod error;
pub mod executor;
pub mod path;
pub mod record;
pub mod record_stage;
pub mod source;

pub use config::Config;
pub use dsl::{Command, Pipeline, parse_invocation, parse_pipeline};
pub use error::{PipelineError, Result};
pub use executor::{ExecState, Executor, Outcome, RunSummary, execute_pipeline};
pub use record::{Record, Separator};
pub use record_stage::{RecordStage, Signal};
pub use source::RecordSource;
