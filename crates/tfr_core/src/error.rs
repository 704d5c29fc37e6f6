//! Error taxonomy for discovery, series loading and configuration.

use std::path::PathBuf;

use thiserror::Error;

/// Structural failure while resolving run directories.
///
/// A bulk scan aborts on the first one; single-run imports hand it back to the
/// caller and leave the catalog untouched.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("tag folder {path:?} does not follow the `<model tags> | <reward tags>` convention")]
    MalformedTagFolder { path: PathBuf },

    #[error("expected exactly one {what} under {run:?}, found {found}")]
    AmbiguousRunFile {
        run: PathBuf,
        what: RunFile,
        found: usize,
    },

    #[error("run directory {path:?} has no enclosing tag folder")]
    OrphanRun { path: PathBuf },

    #[error("{path:?} is not a directory")]
    NotADirectory { path: PathBuf },

    #[error("failed to read parameter dump {path:?}: {source}")]
    UnreadableParams {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to list {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid glob pattern `{pattern}`: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
}

/// Which of the two per-run files failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunFile {
    ParamsDump,
    EventLog,
}

impl std::fmt::Display for RunFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunFile::ParamsDump => write!(f, "parameter dump"),
            RunFile::EventLog => write!(f, "event log"),
        }
    }
}

/// Per-session failure while loading a scalar series. Isolated to that
/// session's result slot.
#[derive(Debug, Error)]
pub enum SeriesError {
    #[error("failed to read event log {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt record at byte {offset} of {path:?}: {reason}")]
    CorruptRecord {
        path: PathBuf,
        offset: u64,
        reason: String,
    },

    #[error("failed to decode event at byte {offset} of {path:?}: {source}")]
    Decode {
        path: PathBuf,
        offset: u64,
        #[source]
        source: prost::DecodeError,
    },

    #[error("invalid series data in {path:?}: {reason}")]
    InvalidData { path: PathBuf, reason: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
