//! Error types shared across the crate.
//!
//! Expected per-item conditions (an existing destination, a checksum
//! mismatch) are not errors: they are reported through
//! [`Outcome`](crate::file_ops::Outcome). The types here cover configuration
//! problems, job validation and genuine filesystem failures.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors raised while loading, parsing or writing a rules file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Rules file not found at the specified path.
    #[error("rules file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The document could not be parsed.
    #[error("invalid rules file {}: {reason}", path.display())]
    Invalid { path: PathBuf, reason: String },

    /// The document could not be serialized.
    #[error("could not serialize rules: {0}")]
    Serialize(String),

    /// IO error while reading or writing the rules file.
    #[error("I/O error for rules file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Reasons a job spec is rejected before it runs.
///
/// Each variant names the offending field so the skip reason in the log
/// points straight at the rules entry to fix.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    #[error("job has no name")]
    MissingName,

    #[error("no source given")]
    MissingSource,

    #[error("source path {} does not exist", .0.display())]
    SourceNotFound(PathBuf),

    #[error("source path {} is not a directory", .0.display())]
    SourceNotDirectory(PathBuf),

    #[error("destination path {} cannot be resolved", .0.display())]
    UnresolvedDestination(PathBuf),

    #[error("operation '{0}' not recognized")]
    UnknownOperation(String),

    #[error("target '{0}' not recognized")]
    UnknownTarget(String),

    #[error("invalid {field} pattern '{pattern}': {reason}")]
    InvalidPattern {
        field: &'static str,
        pattern: String,
        reason: String,
    },
}

impl JobError {
    /// The rules field this error refers to.
    pub fn field(&self) -> &'static str {
        match self {
            Self::MissingName => "name",
            Self::MissingSource | Self::SourceNotFound(_) | Self::SourceNotDirectory(_) => "source",
            Self::UnresolvedDestination(_) => "destination",
            Self::UnknownOperation(_) => "operation",
            Self::UnknownTarget(_) => "target",
            Self::InvalidPattern { field, .. } => *field,
        }
    }
}

/// A filesystem failure inside a single file or folder operation.
#[derive(Debug, Error)]
pub enum FileOpError {
    /// The source does not exist (it may have been moved already).
    #[error("source not found: {}", .0.display())]
    SourceMissing(PathBuf),

    /// The copy reported success but the destination is not there.
    #[error("destination missing after copy: {}", .0.display())]
    DestinationMissing(PathBuf),

    /// Not a regular file or directory (socket, FIFO, device).
    #[error("unsupported file type: {}", .0.display())]
    Unsupported(PathBuf),

    /// Sanitizing left nothing of the name.
    #[error("name of {} is empty after sanitizing", .0.display())]
    EmptyName(PathBuf),

    /// Directory removal was refused because it still has entries.
    #[error("directory not empty: {}", .0.display())]
    DirectoryNotEmpty(PathBuf),

    /// A folder cannot be transferred into itself.
    #[error("cannot place {} inside itself at {}", folder.display(), destination.display())]
    NestedDestination {
        folder: PathBuf,
        destination: PathBuf,
    },

    /// Some entries of a folder transfer failed.
    #[error("{failed} of {total} entries under {} failed", path.display())]
    Partial {
        path: PathBuf,
        failed: usize,
        total: usize,
    },

    /// General I/O error.
    #[error("I/O error for {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FileOpError {
    /// Wrap an [`io::Error`] with the path it concerns.
    pub fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Top-level errors surfaced by the command-line front end.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("no job named '{0}' in rules")]
    UnknownJob(String),
}
