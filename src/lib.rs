//! ocd - a rule-driven file organizer
//!
//! This library sorts the contents of folders according to a rules document:
//! files are grouped into folders by extension, names are cleaned up with a
//! character substitution table, and entries are copied, moved, renamed or
//! deleted. Moves are copy-then-delete, and the source is only removed once
//! the copy is confirmed, optionally by comparing checksums.
//!
//! The pieces, bottom-up:
//! - [`checksum`]: streaming content digests
//! - [`sanitize`]: file name cleanup
//! - [`file_group`]: the extension to group index
//! - [`paths`]: candidate enumeration with glob patterns
//! - [`file_ops`]: copy, move and delete with [`Outcome`] results
//! - [`rules`] and [`job`]: the rules document and validated jobs
//! - [`runner`]: runs jobs and reports per-item outcomes

pub mod checksum;
pub mod cli;
pub mod error;
pub mod file_group;
pub mod file_ops;
pub mod job;
pub mod logging;
pub mod output;
pub mod paths;
pub mod rules;
pub mod runner;
pub mod sanitize;

pub use error::{CliError, ConfigError, FileOpError, JobError};
pub use file_group::GroupTable;
pub use file_ops::{Copier, FileOperations, Outcome};
pub use job::{Job, Operation, Target};
pub use rules::{JobSpec, Rules};
pub use runner::{JobReport, JobRun, JobRunner};

pub use cli::{Cli, run_cli};
