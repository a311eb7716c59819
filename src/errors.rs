/*!
 * Error types for the subsync application.
 *
 * Every failure that aborts the processing of one video/subtitle pair is a
 * `SyncError`. The batch controller uses `SyncError::is_skip` to tell pairs
 * that were skipped (nothing to select from) from pairs that failed.
 */

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::cleaning::CleaningReport;
use crate::subtitle_processor::StreamOrigin;

/// Errors raised while choosing the embedded/external pair
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SelectionError {
    /// One side has nothing to choose from
    #[error("no {side} subtitle candidates available")]
    NoCandidates {
        /// Side without candidates
        side: StreamOrigin,
    },

    /// The caller answered a selection request with an index out of range
    #[error("invalid {side} stream choice {index} (only {available} candidates)")]
    InvalidChoice {
        side: StreamOrigin,
        index: usize,
        available: usize,
    },

    /// The user aborted the selection prompt
    #[error("stream selection was cancelled")]
    Cancelled,
}

/// Errors raised at the external aligner boundary
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AlignmentFailure {
    /// The aligner must never be handed an empty stream
    #[error("refusing to align an empty {side} stream")]
    EmptyInput { side: StreamOrigin },

    /// The aligner binary could not be started
    #[error("failed to start aligner: {0}")]
    Spawn(String),

    /// The aligner exited with a non-zero status
    #[error("aligner exited with status {}: {stderr}", display_code(.code))]
    ExitStatus { code: Option<i32>, stderr: String },

    /// The aligner did not finish in time
    #[error("aligner timed out after {secs} seconds")]
    TimedOut { secs: u64 },

    /// The aligner produced output that cannot be used
    #[error("aligner produced malformed output: {0}")]
    MalformedOutput(String),
}

fn display_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "unknown".to_string(), |c| c.to_string())
}

/// A subtitle file or container could not be parsed
#[derive(Debug, Clone, PartialEq)]
pub struct FormatParseError {
    /// File being parsed, if known
    pub path: Option<PathBuf>,
    /// 1-based line number, if known
    pub line: Option<usize>,
    /// What went wrong
    pub message: String,
}

impl FormatParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            path: None,
            line: None,
            message: message.into(),
        }
    }

    pub fn at_line(line: usize, message: impl Into<String>) -> Self {
        Self {
            path: None,
            line: Some(line),
            message: message.into(),
        }
    }

    /// Attach the file path once it is known
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }
}

impl fmt::Display for FormatParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "failed to parse {}", path.display())?,
            None => write!(f, "failed to parse subtitle content")?,
        }
        if let Some(line) = self.line {
            write!(f, " (line {})", line)?;
        }
        write!(f, ": {}", self.message)
    }
}

impl std::error::Error for FormatParseError {}

/// Main per-pair error type
#[derive(Error, Debug)]
pub enum SyncError {
    /// Stream selection failed
    #[error("Selection error: {0}")]
    Selection(#[from] SelectionError),

    /// Cleaning would leave nothing for the aligner
    #[error("Cleaning removed all {} events from {}", .report.total, .path.display())]
    EmptyStream {
        /// Stream that was emptied
        path: PathBuf,
        /// What was removed and why
        report: Box<CleaningReport>,
    },

    /// The external aligner failed
    #[error("Alignment failure: {0}")]
    Alignment(#[from] AlignmentFailure),

    /// A subtitle file could not be parsed
    #[error("Format error: {0}")]
    FormatParse(#[from] FormatParseError),

    /// The media prober failed
    #[error("Probe error: {0}")]
    Probe(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// A prompt could not be shown or answered
    #[error("Interaction error: {0}")]
    Interaction(String),
}

impl SyncError {
    /// Whether the pair should be reported as skipped rather than failed
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Selection(_))
    }
}

impl From<std::io::Error> for SyncError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}

impl From<tempfile::PersistError> for SyncError {
    fn from(error: tempfile::PersistError) -> Self {
        Self::File(error.error.to_string())
    }
}
