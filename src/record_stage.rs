//! Record-at-a-time stage trait and the handlers behind each command.
//!
//! A stage turns one record into a [`Signal`]: keep a (possibly
//! rewritten) record, or drop it. Failures travel as `Err` and abort the
//! run.

use glob::MatchOptions;
use tracing::debug;

use crate::dsl::Command;
use crate::error::Result;
use crate::path;
use crate::record::Record;

/// Per-record outcome of a stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// Pass this record to the next stage.
    Keep(Record),
    /// Exclude the record from output; later stages do not run.
    Drop,
}

/// A pipeline stage that processes records one at a time.
pub trait RecordStage {
    /// Process a single input record.
    fn process(&self, record: Record) -> Result<Signal>;

    /// The display name of this stage.
    fn name(&self) -> &str;

    /// Whether this stage only tests a property of the record.
    fn is_check(&self) -> bool {
        false
    }
}

/// Glob wildcards and classes never match a separator.
const GLOB_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

fn keep(text: impl Into<String>) -> Result<Signal> {
    Ok(Signal::Keep(Record::new(text)))
}

fn filter(record: Record, pass: bool) -> Result<Signal> {
    Ok(if pass { Signal::Keep(record) } else { Signal::Drop })
}

impl RecordStage for Command {
    fn process(&self, record: Record) -> Result<Signal> {
        let p = record.as_str();

        match self {
            Command::Base => keep(path::base_name(p)),
            Command::Dir => keep(path::dir_name(p)),
            Command::DirN { depth } => keep(path::dir_name_n(p, *depth)),
            // Resolution failures keep the input: one dangling link or
            // unreadable working directory must not abort the batch.
            Command::Link => match path::resolve_symlink(p) {
                Ok(target) => keep(target),
                Err(e) => {
                    debug!(path = p, error = %e, "symlink resolution failed, keeping input");
                    Ok(Signal::Keep(record))
                }
            },
            Command::Abs => match path::absolute(p) {
                Ok(abs) => keep(abs),
                Err(e) => {
                    debug!(path = p, error = %e, "absolute resolution failed, keeping input");
                    Ok(Signal::Keep(record))
                }
            },
            Command::Clean => keep(path::clean(p)),
            Command::Compact => keep(path::compact(p)),
            Command::Ext => keep(path::extension(p)),
            Command::Volume => keep(path::volume_name(p)),
            Command::Match { pattern } => {
                let pass = pattern.matches_with(p, GLOB_OPTIONS);
                filter(record, pass)
            }
            Command::Join { root } => keep(path::join_secure(root, &[p])?),
            Command::AddPrefix { prefix } => keep(format!("{prefix}{p}")),
            Command::DelPrefix { prefix } => keep(p.strip_prefix(prefix.as_str()).unwrap_or(p)),
            Command::AddSuffix { suffix } => keep(format!("{p}{suffix}")),
            Command::DelSuffix { suffix } => keep(p.strip_suffix(suffix.as_str()).unwrap_or(p)),
            Command::StripExt => keep(path::strip_extension(p)),
            Command::Exclude { substr } => {
                let pass = !p.contains(substr.as_str());
                filter(record, pass)
            }
            Command::Replace { old, new } => {
                if old.is_empty() {
                    Ok(Signal::Keep(record))
                } else {
                    keep(p.replace(old.as_str(), new))
                }
            }
            Command::Lower => keep(p.to_lowercase()),
            Command::Upper => keep(p.to_uppercase()),
            Command::IsAbs => {
                let pass = path::is_absolute(p);
                filter(record, pass)
            }
            Command::IsLocal => {
                let pass = path::is_local(p);
                filter(record, pass)
            }
            Command::IsSafe => {
                let pass = path::is_safe(p);
                filter(record, pass)
            }
            Command::IsMatch { pattern } => {
                let pass = pattern.matches_with(p, GLOB_OPTIONS);
                filter(record, pass)
            }
        }
    }

    fn name(&self) -> &str {
        Command::name(self)
    }

    fn is_check(&self) -> bool {
        Command::is_check(self)
    }
}
