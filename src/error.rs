//! Error types for pipeline building and execution.

use thiserror::Error;

/// The error type for building and running a path pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The command expression contained no stages.
    #[error("Pipeline is empty")]
    EmptyPipeline,

    /// A stage was given fewer arguments than it requires.
    #[error("Stage '{stage}' requires {required} argument(s), got {supplied}")]
    MissingArgument {
        stage: String,
        required: usize,
        supplied: usize,
    },

    /// The command name is not known.
    #[error("Unknown command {name:?}")]
    UnknownCommand { name: String },

    /// A bound argument could not be interpreted.
    #[error("Invalid argument for '{stage}': {message}")]
    InvalidArgument { stage: String, message: String },

    /// A secure join resolved outside its root.
    #[error("Path {path:?} escapes root {root:?}")]
    PathEscape { root: String, path: String },

    /// A stream record is not valid UTF-8. `record` is its lossy rendering.
    #[error("Record {record:?} is not valid UTF-8")]
    InvalidUtf8 { record: String },

    /// Neither positional arguments nor the stream produced a record.
    #[error("Input is empty")]
    EmptyInput,

    /// Reading records or writing output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
