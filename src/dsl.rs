//! Pipeline expression parser.
//!
//! Expression format:
//! ```text
//! base,match+*.md,strip-ext
//! ```
//!
//! - Stages are separated by `,` and run left to right
//! - A stage may carry its arguments inline after `+`
//!   (`replace+old+new`); the last argument takes the rest of the text
//! - Arguments not given inline are taken, in stage order, from the
//!   positional tokens that follow the expression
//! - Command names are case-insensitive
//!
//! Supported stages:
//! - `base` / `basename` - Last path element
//! - `dir` / `dirname` - Path without its last element
//! - `dirn <n>` - First n elements, or last n for `-n` / `^n`
//! - `link` / `readlink` - Resolve symbolic links
//! - `clean` - Shortest lexically equivalent path
//! - `compact` - Shorten every element but the last to one character
//! - `abs` - Absolute path against the working directory
//! - `ext` - Extension of the last element
//! - `volume` - Leading volume name
//! - `match <pattern>` - Keep records matching a glob pattern
//! - `join <root>` - Join the record onto root, refusing escapes
//! - `add-prefix <s>` / `del-prefix <s>` - Add or remove a prefix
//! - `add-suffix <s>` / `del-suffix <s>` - Add or remove a suffix
//! - `strip-ext` - Remove the extension
//! - `exclude <substr>` - Drop records containing substr
//! - `replace <old> <new>` - Replace every occurrence of old with new
//! - `lower` / `upper` - Change case
//! - `is-abs`, `is-local`, `is-safe`, `is-match <pattern>` - Checks

use std::fmt;

use tracing::debug;

use glob::Pattern;

use crate::error::{PipelineError, Result};

/// Separates stages in an expression.
pub const STAGE_DELIMITER: char = ',';
/// Separates a command name from its inline arguments.
pub const ARG_DELIMITER: char = '+';

/// A command bound to its arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Base,
    Dir,
    /// Positive keeps leading elements, negative keeps trailing ones.
    DirN { depth: isize },
    Link,
    Clean,
    Compact,
    Abs,
    Ext,
    Volume,
    Match { pattern: Pattern },
    Join { root: String },
    AddPrefix { prefix: String },
    DelPrefix { prefix: String },
    AddSuffix { suffix: String },
    DelSuffix { suffix: String },
    StripExt,
    Exclude { substr: String },
    Replace { old: String, new: String },
    Lower,
    Upper,
    IsAbs,
    IsLocal,
    IsSafe,
    IsMatch { pattern: Pattern },
}

impl Command {
    /// Stage name for logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Base => "base",
            Command::Dir => "dir",
            Command::DirN { .. } => "dirn",
            Command::Link => "link",
            Command::Clean => "clean",
            Command::Compact => "compact",
            Command::Abs => "abs",
            Command::Ext => "ext",
            Command::Volume => "volume",
            Command::Match { .. } => "match",
            Command::Join { .. } => "join",
            Command::AddPrefix { .. } => "add-prefix",
            Command::DelPrefix { .. } => "del-prefix",
            Command::AddSuffix { .. } => "add-suffix",
            Command::DelSuffix { .. } => "del-suffix",
            Command::StripExt => "strip-ext",
            Command::Exclude { .. } => "exclude",
            Command::Replace { .. } => "replace",
            Command::Lower => "lower",
            Command::Upper => "upper",
            Command::IsAbs => "is-abs",
            Command::IsLocal => "is-local",
            Command::IsSafe => "is-safe",
            Command::IsMatch { .. } => "is-match",
        }
    }

    /// Does this stage only test a property, producing no text of its own?
    pub fn is_check(&self) -> bool {
        matches!(
            self,
            Command::IsAbs | Command::IsLocal | Command::IsSafe | Command::IsMatch { .. }
        )
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Resolve a command name or alias to its canonical name and arity.
fn lookup(name: &str) -> Option<(&'static str, usize)> {
    let entry = match name.to_ascii_lowercase().as_str() {
        "base" | "basename" => ("base", 0),
        "dir" | "dirname" => ("dir", 0),
        "dirn" => ("dirn", 1),
        "link" | "readlink" => ("link", 0),
        "clean" => ("clean", 0),
        "compact" => ("compact", 0),
        "abs" => ("abs", 0),
        "ext" => ("ext", 0),
        "volume" => ("volume", 0),
        "match" => ("match", 1),
        "join" => ("join", 1),
        "add-prefix" => ("add-prefix", 1),
        "del-prefix" => ("del-prefix", 1),
        "add-suffix" => ("add-suffix", 1),
        "del-suffix" => ("del-suffix", 1),
        "strip-ext" => ("strip-ext", 0),
        "exclude" => ("exclude", 1),
        "replace" => ("replace", 2),
        "lower" => ("lower", 0),
        "upper" => ("upper", 0),
        "is-abs" => ("is-abs", 0),
        "is-local" => ("is-local", 0),
        "is-safe" => ("is-safe", 0),
        "is-match" => ("is-match", 1),
        _ => return None,
    };
    Some(entry)
}

/// An ordered, non-empty list of bound stages.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    stages: Vec<Command>,
}

impl Pipeline {
    pub fn stages(&self) -> &[Command] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// True when the last stage is a check, so records are tested
    /// rather than printed.
    pub fn is_check(&self) -> bool {
        self.stages.last().is_some_and(Command::is_check)
    }
}

/// Parse an expression whose stages carry all their arguments inline.
pub fn parse_pipeline(expr: &str) -> Result<Pipeline> {
    let (pipeline, _) = parse_invocation(expr, &[] as &[String])?;
    Ok(pipeline)
}

/// Parse an expression plus the positional tokens that follow it.
///
/// Stages missing inline arguments take them from the front of `tokens`
/// in stage order. Returns the pipeline and the tokens left over, which
/// are path records.
pub fn parse_invocation<S: AsRef<str>>(expr: &str, tokens: &[S]) -> Result<(Pipeline, Vec<String>)> {
    let mut positional = tokens.iter().map(|t| t.as_ref().to_string());
    let mut stages = Vec::new();

    for stage_text in expr.split(STAGE_DELIMITER) {
        let stage_text = stage_text.trim();

        // Skip empty stages ("a,,b" or a trailing comma)
        if stage_text.is_empty() {
            continue;
        }

        let (name, inline) = match stage_text.split_once(ARG_DELIMITER) {
            Some((name, rest)) if !rest.is_empty() => (name, Some(rest)),
            Some((name, _)) => (name, None),
            None => (stage_text, None),
        };

        let (canonical, arity) = lookup(name).ok_or_else(|| PipelineError::UnknownCommand {
            name: name.to_string(),
        })?;

        let mut args: Vec<String> = match inline {
            Some(_) if arity == 0 => {
                return Err(PipelineError::InvalidArgument {
                    stage: stage_text.to_string(),
                    message: format!("{canonical} takes no arguments"),
                });
            }
            Some(rest) => rest.splitn(arity, ARG_DELIMITER).map(String::from).collect(),
            None => Vec::new(),
        };

        while args.len() < arity {
            match positional.next() {
                Some(token) => args.push(token),
                None => {
                    return Err(PipelineError::MissingArgument {
                        stage: stage_text.to_string(),
                        required: arity,
                        supplied: args.len(),
                    });
                }
            }
        }

        let command = bind(canonical, args, stage_text)?;
        debug!(stage = stages.len(), command = %command, "parsed stage");
        stages.push(command);
    }

    if stages.is_empty() {
        return Err(PipelineError::EmptyPipeline);
    }

    Ok((Pipeline { stages }, positional.collect()))
}

/// Build a command from its canonical name and exactly `arity` arguments.
fn bind(name: &str, args: Vec<String>, stage_text: &str) -> Result<Command> {
    let invalid = |message: String| PipelineError::InvalidArgument {
        stage: stage_text.to_string(),
        message,
    };
    let mut args = args.into_iter();
    let mut arg = || args.next().unwrap_or_default();

    let command = match name {
        "base" => Command::Base,
        "dir" => Command::Dir,
        "dirn" => Command::DirN {
            depth: parse_depth(&arg()).map_err(invalid)?,
        },
        "link" => Command::Link,
        "clean" => Command::Clean,
        "compact" => Command::Compact,
        "abs" => Command::Abs,
        "ext" => Command::Ext,
        "volume" => Command::Volume,
        "match" => Command::Match {
            pattern: Pattern::new(&arg()).map_err(|e| invalid(e.to_string()))?,
        },
        "join" => Command::Join { root: arg() },
        "add-prefix" => Command::AddPrefix { prefix: arg() },
        "del-prefix" => Command::DelPrefix { prefix: arg() },
        "add-suffix" => Command::AddSuffix { suffix: arg() },
        "del-suffix" => Command::DelSuffix { suffix: arg() },
        "strip-ext" => Command::StripExt,
        "exclude" => Command::Exclude { substr: arg() },
        "replace" => {
            let old = arg();
            let new = arg();
            Command::Replace { old, new }
        }
        "lower" => Command::Lower,
        "upper" => Command::Upper,
        "is-abs" => Command::IsAbs,
        "is-local" => Command::IsLocal,
        "is-safe" => Command::IsSafe,
        "is-match" => Command::IsMatch {
            pattern: Pattern::new(&arg()).map_err(|e| invalid(e.to_string()))?,
        },
        other => {
            return Err(PipelineError::UnknownCommand {
                name: other.to_string(),
            });
        }
    };

    Ok(command)
}

/// Parse a `dirn` count. `^n` is accepted as an alias for `-n`.
fn parse_depth(token: &str) -> std::result::Result<isize, String> {
    let invalid = || format!("expected an integer count, got {token:?}");
    match token.strip_prefix('^') {
        Some(digits) => digits
            .parse::<usize>()
            .ok()
            .and_then(|n| isize::try_from(n).ok())
            .map(|n| -n)
            .ok_or_else(invalid),
        None => token.parse::<isize>().map_err(|_| invalid()),
    }
}
