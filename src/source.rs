//! Record source: positional arguments first, then an optional stream.
//!
//! Argument records are split on whitespace, so one shell word holding
//! several space-separated paths (as produced by `$(ls)` or `xargs`)
//! yields one record per path. Stream records are split only on the
//! configured separator byte. Empty records are skipped in both cases.
//! A stream record that is not valid UTF-8 is an error rather than being
//! rewritten, so no path is silently altered on its way through.

use std::io::{self, BufRead};
use std::vec;

use tracing::trace;

use crate::config::Config;
use crate::error::{PipelineError, Result};
use crate::record::Record;

/// Lazy iterator over input records.
///
/// The stream is not touched until every argument record has been
/// yielded. A read or decoding error is yielded once and ends the
/// iteration.
pub struct RecordSource<R = io::Empty> {
    args: vec::IntoIter<String>,
    stream: Option<R>,
    separator: u8,
    buf: Vec<u8>,
}

impl RecordSource<io::Empty> {
    /// Source over positional arguments only.
    pub fn new<I, S>(args: I, config: &Config) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args: Vec<String> = args
            .into_iter()
            .flat_map(|arg| {
                arg.as_ref()
                    .split_whitespace()
                    .map(String::from)
                    .collect::<Vec<_>>()
            })
            .collect();

        Self {
            args: args.into_iter(),
            stream: None,
            separator: config.separator.byte(),
            buf: Vec::new(),
        }
    }

    /// Read further records from `stream` once the arguments run out.
    pub fn with_stream<R: BufRead>(self, stream: R) -> RecordSource<R> {
        RecordSource {
            args: self.args,
            stream: Some(stream),
            separator: self.separator,
            buf: self.buf,
        }
    }
}

impl<R: BufRead> RecordSource<R> {
    fn next_from_stream(&mut self) -> Option<Result<Record>> {
        loop {
            let stream = self.stream.as_mut()?;
            self.buf.clear();

            match stream.read_until(self.separator, &mut self.buf) {
                Ok(0) => {
                    self.stream = None;
                    return None;
                }
                Ok(_) => {
                    if self.buf.last() == Some(&self.separator) {
                        self.buf.pop();
                    }
                    if self.buf.is_empty() {
                        continue;
                    }
                    return match String::from_utf8(std::mem::take(&mut self.buf)) {
                        Ok(text) => {
                            trace!(record = %text, "read record from stream");
                            Some(Ok(Record::from(text)))
                        }
                        Err(e) => {
                            self.stream = None;
                            let record = String::from_utf8_lossy(e.as_bytes()).into_owned();
                            Some(Err(PipelineError::InvalidUtf8 { record }))
                        }
                    };
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.stream = None;
                    return Some(Err(e.into()));
                }
            }
        }
    }
}

impl<R: BufRead> Iterator for RecordSource<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(arg) = self.args.next() {
            return Some(Ok(Record::from(arg)));
        }
        self.next_from_stream()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Separator;
    use std::io::{BufReader, Cursor, Read};

    fn collect<R: BufRead>(source: RecordSource<R>) -> Vec<String> {
        source
            .map(|r| r.unwrap().into_string())
            .collect::<Vec<_>>()
    }

    #[test]
    fn test_args_split_on_whitespace() {
        let source = RecordSource::new(["a/b c/d", "e"], &Config::default());
        assert_eq!(collect(source), vec!["a/b", "c/d", "e"]);
    }

    #[test]
    fn test_stream_split_on_separator() {
        let config = Config::default();
        let source = RecordSource::new(Vec::<String>::new(), &config)
            .with_stream(Cursor::new("one\ntwo words\n\nthree"));
        assert_eq!(collect(source), vec!["one", "two words", "three"]);
    }

    #[test]
    fn test_nul_separator() {
        let config = Config::default().with_separator(Separator::Nul);
        let source = RecordSource::new(Vec::<String>::new(), &config)
            .with_stream(Cursor::new(b"a\nb\0c d\0".to_vec()));
        assert_eq!(collect(source), vec!["a\nb", "c d"]);
    }

    #[test]
    fn test_args_before_stream() {
        let source = RecordSource::new(["arg1 arg2"], &Config::default())
            .with_stream(Cursor::new("in1\nin2\n"));
        assert_eq!(collect(source), vec!["arg1", "arg2", "in1", "in2"]);
    }

    #[test]
    fn test_empty_sources() {
        let source = RecordSource::new(["   "], &Config::default()).with_stream(Cursor::new(""));
        assert!(collect(source).is_empty());
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "boom"))
        }
    }

    #[test]
    fn test_read_error_is_yielded_once() {
        let mut source = RecordSource::new(["first"], &Config::default())
            .with_stream(BufReader::new(FailingReader));
        assert_eq!(source.next().unwrap().unwrap().as_str(), "first");
        assert!(matches!(source.next(), Some(Err(PipelineError::Io(_)))));
        assert!(source.next().is_none());
    }

    #[test]
    fn test_invalid_utf8_is_rejected() {
        let config = Config::default();
        let mut source = RecordSource::new(Vec::<String>::new(), &config)
            .with_stream(Cursor::new(b"ok\na/\xff.txt\nlater\n".to_vec()));
        assert_eq!(source.next().unwrap().unwrap().as_str(), "ok");
        match source.next() {
            Some(Err(PipelineError::InvalidUtf8 { record })) => {
                assert_eq!(record, "a/\u{fffd}.txt")
            }
            other => panic!("unexpected item: {other:?}"),
        }
        assert!(source.next().is_none());
    }
}
