//! Record-at-a-time pipeline executor.
//!
//! Each input record flows through the entire stage chain before the next
//! record is read, so unbounded input streams through in constant memory.
//! A dropped record stops at the stage that dropped it; a failing stage
//! aborts the run.

use std::io::Write;

use tracing::{debug, trace};

use crate::config::Config;
use crate::dsl::parse_invocation;
use crate::error::{PipelineError, Result};
use crate::record::{Record, Separator};
use crate::record_stage::{RecordStage, Signal};
use crate::source::RecordSource;

/// Lifecycle of an [`Executor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecState {
    Ready,
    Running,
    Completed,
    Aborted,
}

/// Non-error result of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Output was produced, or every record passed the final check.
    Matched,
    /// Nothing survived, or some record failed the final check.
    NoMatch,
}

/// Counts and outcome of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub input_count: usize,
    pub output_count: usize,
    pub outcome: Outcome,
}

/// Where a record ended up after the stage chain.
enum Passage {
    Survived(Record),
    /// Dropped by the stage at this index.
    DroppedAt(usize),
}

/// Push one record through `stages`, stopping at the first drop.
fn push_through_stages<S: RecordStage>(record: Record, stages: &[S]) -> Result<Passage> {
    let mut current = record;
    for (idx, stage) in stages.iter().enumerate() {
        match stage.process(current)? {
            Signal::Keep(next) => {
                trace!(stage = idx, name = stage.name(), record = %next, "kept");
                current = next;
            }
            Signal::Drop => {
                trace!(stage = idx, name = stage.name(), "dropped");
                return Ok(Passage::DroppedAt(idx));
            }
        }
    }
    Ok(Passage::Survived(current))
}

/// Drives records through a fixed list of stages.
pub struct Executor<'a, S> {
    stages: &'a [S],
    separator: Separator,
    state: ExecState,
}

impl<'a, S: RecordStage> Executor<'a, S> {
    pub fn new(stages: &'a [S], config: &Config) -> Self {
        Self {
            stages,
            separator: config.separator,
            state: ExecState::Ready,
        }
    }

    pub fn state(&self) -> ExecState {
        self.state
    }

    /// Run every record from `records` through the stages, writing each
    /// survivor to `out` followed by the separator.
    ///
    /// When the last stage is a check nothing is written; the run matches
    /// only if every record reaching the check passes, and stops at the
    /// first that does not. Records filtered out by earlier stages never
    /// reach the check and do not count against it.
    pub fn run<I, W>(&mut self, records: I, out: &mut W) -> Result<RunSummary>
    where
        I: IntoIterator<Item = Result<Record>>,
        W: Write,
    {
        self.state = ExecState::Running;
        let result = self.drive(records, out);
        self.state = match result {
            Ok(_) => ExecState::Completed,
            Err(_) => ExecState::Aborted,
        };
        result
    }

    fn drive<I, W>(&self, records: I, out: &mut W) -> Result<RunSummary>
    where
        I: IntoIterator<Item = Result<Record>>,
        W: Write,
    {
        let check_mode = self.stages.last().is_some_and(|s| s.is_check());
        let check_idx = self.stages.len().saturating_sub(1);
        let sep = [self.separator.byte()];
        let mut input_count = 0;
        let mut output_count = 0;

        for record in records {
            let record = record?;
            input_count += 1;

            match push_through_stages(record, self.stages)? {
                Passage::Survived(_) if check_mode => output_count += 1,
                Passage::Survived(survivor) => {
                    out.write_all(survivor.as_str().as_bytes())?;
                    out.write_all(&sep)?;
                    output_count += 1;
                }
                Passage::DroppedAt(idx) if check_mode && idx == check_idx => {
                    debug!(input_count, "check failed, stopping");
                    return Ok(RunSummary {
                        input_count,
                        output_count,
                        outcome: Outcome::NoMatch,
                    });
                }
                Passage::DroppedAt(_) => {}
            }
        }
        out.flush()?;

        if input_count == 0 {
            return Err(PipelineError::EmptyInput);
        }

        let outcome = if output_count > 0 {
            Outcome::Matched
        } else {
            Outcome::NoMatch
        };
        debug!(input_count, output_count, ?outcome, "pipeline completed");

        Ok(RunSummary {
            input_count,
            output_count,
            outcome,
        })
    }
}

/// Parse `expr` with positional `args`, then run it over the argument
/// records followed by `input`.
///
/// Returns the raw output bytes and the run summary.
pub fn execute_pipeline<S: AsRef<str>>(
    expr: &str,
    args: &[S],
    input: &[u8],
    config: &Config,
) -> Result<(Vec<u8>, RunSummary)> {
    let (pipeline, records) = parse_invocation(expr, args)?;
    let source = RecordSource::new(records, config).with_stream(input);
    let mut output = Vec::new();
    let summary = Executor::new(pipeline.stages(), config).run(source, &mut output)?;
    Ok((output, summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::{Command, parse_pipeline};

    /// Helper: run an expression over newline-separated input, returning
    /// the emitted records.
    fn run(expr: &str, input: &str) -> (Vec<String>, RunSummary) {
        let (output, summary) =
            execute_pipeline(expr, &[] as &[&str], input.as_bytes(), &Config::default())
                .unwrap();
        let text = String::from_utf8(output).unwrap();
        let records = text.lines().map(String::from).collect();
        (records, summary)
    }

    fn records(items: &[&str]) -> Vec<Result<Record>> {
        items.iter().map(|s| Ok(Record::from(*s))).collect()
    }

    macro_rules! pipeline_test {
        ($name:ident, $expr:expr, $input:expr, [$($expected:expr),* $(,)?]) => {
            #[test]
            fn $name() {
                let (output, _) = run($expr, $input);
                let expected: Vec<&str> = vec![$($expected),*];
                assert_eq!(output, expected, "pipeline {}", $expr);
            }
        };
    }

    pipeline_test!(base_of_path, "base", "/path/to/file.txt", ["file.txt"]);
    pipeline_test!(dir_of_path, "dir", "/path/to/file.txt", ["/path/to"]);
    pipeline_test!(
        compact_long_path,
        "compact",
        "/very/long/path/to/some/file.txt",
        ["/v/l/p/t/s/file.txt"]
    );
    pipeline_test!(dirn_leading, "dirn+2", "/a/b/c/d", ["/a/b"]);
    pipeline_test!(dirn_trailing_caret, "dirn+^1", "/a/b/c/d", ["d"]);
    pipeline_test!(dirn_trailing_minus, "dirn+-2", "/a/b/c/d", ["c/d"]);
    pipeline_test!(join_inside_root, "join+root", "sub/dir", ["root/sub/dir"]);
    pipeline_test!(
        base_match_strip,
        "base,match+*.md,strip-ext",
        "a/readme.md\na/notes.txt\n",
        ["readme"]
    );
    pipeline_test!(
        match_then_upper,
        "match+*.txt,upper",
        "a.txt\nb.md\nc.txt",
        ["A.TXT", "C.TXT"]
    );
    pipeline_test!(
        exclude_then_clean,
        "exclude+tmp,clean",
        "/tmp/a\n/var//log/../x\n",
        ["/var/x"]
    );
    pipeline_test!(
        check_in_middle_filters,
        "is-abs,base",
        "/a/x\nrel/y\n/b/z",
        ["x", "z"]
    );

    #[test]
    fn test_short_circuit_on_drop() {
        let (output, summary) = run("match+*.txt,upper", "notes.md");
        assert!(output.is_empty());
        assert_eq!(summary.input_count, 1);
        assert_eq!(summary.output_count, 0);
        assert_eq!(summary.outcome, Outcome::NoMatch);
    }

    #[test]
    fn test_fail_aborts_run() {
        let pipeline = parse_pipeline("join+root").unwrap();
        let mut executor = Executor::new(pipeline.stages(), &Config::default());
        let mut out = Vec::new();
        let err = executor
            .run(records(&["ok", "../escape", "never"]), &mut out)
            .unwrap_err();
        assert!(matches!(err, PipelineError::PathEscape { .. }));
        assert_eq!(executor.state(), ExecState::Aborted);
        // Records before the failure were already emitted.
        assert_eq!(out, b"root/ok\n");
    }

    #[test]
    fn test_state_transitions() {
        let pipeline = parse_pipeline("base").unwrap();
        let mut executor = Executor::new(pipeline.stages(), &Config::default());
        assert_eq!(executor.state(), ExecState::Ready);
        let mut out = Vec::new();
        executor.run(records(&["/a/b"]), &mut out).unwrap();
        assert_eq!(executor.state(), ExecState::Completed);
    }

    #[test]
    fn test_separator_terminates_every_record() {
        let config = Config::default().with_separator(Separator::Nul);
        let (output, summary) =
            execute_pipeline("base", &["/a/x /b/y"], b"/c/z\0", &config).unwrap();
        assert_eq!(output, b"x\0y\0z\0");
        assert_eq!(summary.output_count, 3);
    }

    #[test]
    fn test_check_mode_all_pass() {
        let (output, summary) = run("is-match+*.txt", "a.txt\nb.txt");
        assert!(output.is_empty());
        assert_eq!(summary.outcome, Outcome::Matched);
        assert_eq!(summary.output_count, 2);
    }

    #[test]
    fn test_check_mode_stops_at_first_failure() {
        let (output, summary) = run("is-abs", "/a\nrel\n/b");
        assert!(output.is_empty());
        assert_eq!(summary.outcome, Outcome::NoMatch);
        assert_eq!(summary.input_count, 2);
    }

    #[test]
    fn test_check_mode_ignores_records_filtered_earlier() {
        let (output, summary) = run("exclude+tmp,is-abs", "/tmp/x\n/a\n");
        assert!(output.is_empty());
        assert_eq!(summary.outcome, Outcome::Matched);
        assert_eq!(summary.input_count, 2);
        assert_eq!(summary.output_count, 1);

        let (_, summary) = run("exclude+tmp,is-abs", "/tmp/x\nrel\n/a\n");
        assert_eq!(summary.outcome, Outcome::NoMatch);
        assert_eq!(summary.input_count, 2);
    }

    #[test]
    fn test_check_mode_with_nothing_reaching_the_check() {
        let (_, summary) = run("exclude+tmp,is-abs", "/tmp/x\n/tmp/y\n");
        assert_eq!(summary.outcome, Outcome::NoMatch);
        assert_eq!(summary.output_count, 0);
    }

    #[test]
    fn test_invalid_utf8_input_aborts() {
        let err = execute_pipeline("clean", &[] as &[&str], b"a/\xff.txt\n", &Config::default())
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidUtf8 { .. }));
    }

    #[test]
    fn test_empty_input_is_an_error() {
        let err = execute_pipeline("base", &[] as &[&str], b"\n\n", &Config::default())
            .unwrap_err();
        assert!(matches!(err, PipelineError::EmptyInput));
    }

    #[test]
    fn test_read_error_aborts() {
        let stages = vec![Command::Base];
        let mut executor = Executor::new(&stages, &Config::default());
        let input = vec![
            Ok(Record::from("/a/b")),
            Err(PipelineError::Io(std::io::Error::other("disk gone"))),
            Ok(Record::from("/c/d")),
        ];
        let mut out = Vec::new();
        let err = executor.run(input, &mut out).unwrap_err();
        assert!(matches!(err, PipelineError::Io(_)));
        assert_eq!(out, b"b\n");
    }

    #[test]
    fn test_positional_args_feed_stage_and_records() {
        let (output, _) = execute_pipeline(
            "match",
            &["*.md", "a.md b.txt", "c.md"],
            b"",
            &Config::default(),
        )
        .unwrap();
        assert_eq!(output, b"a.md\nc.md\n");
    }

    /// A stage that counts how often it is called, to prove later stages
    /// are skipped after a drop.
    struct Counting<'a>(&'a std::cell::Cell<usize>);

    impl RecordStage for Counting<'_> {
        fn process(&self, record: Record) -> Result<Signal> {
            self.0.set(self.0.get() + 1);
            Ok(Signal::Keep(record))
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    enum Either<'a> {
        Cmd(Command),
        Count(Counting<'a>),
    }

    impl RecordStage for Either<'_> {
        fn process(&self, record: Record) -> Result<Signal> {
            match self {
                Either::Cmd(c) => c.process(record),
                Either::Count(c) => c.process(record),
            }
        }

        fn name(&self) -> &str {
            match self {
                Either::Cmd(c) => RecordStage::name(c),
                Either::Count(c) => c.name(),
            }
        }
    }

    #[test]
    fn test_dropped_record_skips_later_stages() {
        let calls = std::cell::Cell::new(0);
        let pattern = match &parse_pipeline("match+*.txt").unwrap().stages()[0] {
            Command::Match { pattern } => pattern.clone(),
            _ => unreachable!(),
        };
        let stages = vec![
            Either::Cmd(Command::Match { pattern }),
            Either::Count(Counting(&calls)),
        ];
        let mut executor = Executor::new(&stages, &Config::default());
        let mut out = Vec::new();
        executor
            .run(records(&["a.txt", "b.md", "c.md"]), &mut out)
            .unwrap();
        assert_eq!(calls.get(), 1);
        assert_eq!(out, b"a.txt\n");
    }
}
