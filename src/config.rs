//! Run configuration, fixed before the first record is read.

use crate::record::Separator;

/// Environment variable holding a `tracing` filter directive.
pub const LOG_ENV: &str = "PATHPIPE_LOG";

/// Settings shared by the record source, the executor and the CLI glue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Config {
    /// Splits stream input and terminates output records.
    pub separator: Separator,
    /// Suppress error messages on stderr.
    pub quiet: bool,
    /// Report record counts and debug logs on stderr.
    pub verbose: bool,
}

impl Config {
    pub fn with_separator(mut self, separator: Separator) -> Self {
        self.separator = separator;
        self
    }

    /// Filter directive used when `PATHPIPE_LOG` is unset.
    pub fn default_log_directive(&self) -> &'static str {
        if self.verbose { "debug" } else { "warn" }
    }
}
