//! Validated jobs.
//!
//! A [`JobSpec`] from the rules document may leave any field out or carry
//! values the runner does not understand. [`Job::from_spec`] turns it into a
//! [`Job`] with every field concrete, or rejects it with a [`JobError`]
//! naming the offending field. Nothing runs with a partially specified job.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::JobError;
use crate::paths::{self, PathMatcher};
use crate::rules::JobSpec;

/// What a job does with each matched entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Copy,
    Move,
    Delete,
    /// Log what would happen without touching the filesystem.
    DryRun,
    /// Sanitize names in place.
    Rename,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::Copy,
        Operation::Move,
        Operation::Delete,
        Operation::DryRun,
        Operation::Rename,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Copy => "copy",
            Operation::Move => "move",
            Operation::Delete => "delete",
            Operation::DryRun => "dryrun",
            Operation::Rename => "rename",
        }
    }

    /// Tag shown in log lines.
    pub fn short_name(&self) -> &'static str {
        match self {
            Operation::Copy => "CP",
            Operation::Move => "MV",
            Operation::Delete => "DEL",
            Operation::DryRun => "DRY",
            Operation::Rename => "R",
        }
    }
}

impl FromStr for Operation {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| JobError::UnknownOperation(s.to_string()))
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which kinds of entries a job processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Files,
    Folders,
    Both,
}

impl Target {
    pub fn as_str(&self) -> &'static str {
        match self {
            Target::Files => "files",
            Target::Folders => "folders",
            Target::Both => "both",
        }
    }

    pub fn includes_files(&self) -> bool {
        matches!(self, Target::Files | Target::Both)
    }

    pub fn includes_folders(&self) -> bool {
        matches!(self, Target::Folders | Target::Both)
    }
}

impl FromStr for Target {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "files" => Ok(Target::Files),
            "folders" => Ok(Target::Folders),
            "both" => Ok(Target::Both),
            other => Err(JobError::UnknownTarget(other.to_string())),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully populated, validated job.
#[derive(Debug, Clone)]
pub struct Job {
    pub name: String,
    pub source: PathBuf,
    pub destination: PathBuf,
    pub operation: Operation,
    pub pattern: PathMatcher,
    pub target: Target,
    pub subdirs: bool,
    pub group: bool,
    pub filename: bool,
    pub verify: bool,
    pub cleanup: bool,
    pub year: bool,
    pub group_prefix: String,
    pub exclude: Vec<PathMatcher>,
}

impl Job {
    pub const DEFAULT_OPERATION: Operation = Operation::Move;
    pub const DEFAULT_PATTERN: &'static str = "*";
    pub const DEFAULT_TARGET: Target = Target::Both;

    /// Validates `spec` and fills in defaults.
    ///
    /// | field          | default        |
    /// |----------------|----------------|
    /// | `destination`  | the source     |
    /// | `operation`    | `move`         |
    /// | `pattern`      | `*`            |
    /// | `target`       | `both`         |
    /// | `subdirs`      | `false`        |
    /// | `group`        | `true`         |
    /// | `filename`     | `true`         |
    /// | `verify`       | `false`        |
    /// | `cleanup`      | `true`         |
    /// | `year`         | `false`        |
    /// | `group_prefix` | empty          |
    /// | `exclude`      | none           |
    ///
    /// # Errors
    ///
    /// A missing or empty name, a missing source, a source that is not an
    /// existing directory, an unknown operation or target, or an invalid
    /// glob pattern.
    pub fn from_spec(spec: &JobSpec) -> Result<Self, JobError> {
        let name = match spec.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => return Err(JobError::MissingName),
        };

        let source = match &spec.source {
            Some(source) if !source.as_os_str().is_empty() => source.clone(),
            _ => return Err(JobError::MissingSource),
        };
        if !source.exists() {
            return Err(JobError::SourceNotFound(source));
        }
        if !source.is_dir() {
            return Err(JobError::SourceNotDirectory(source));
        }
        // Every later containment and equality check compares against these.
        let source = paths::normalize(&source).map_err(|_| JobError::SourceNotFound(source))?;

        let destination = match spec.destination.as_ref().filter(|d| !d.as_os_str().is_empty()) {
            Some(destination) => paths::normalize(destination)
                .map_err(|_| JobError::UnresolvedDestination(destination.clone()))?,
            None => source.clone(),
        };

        let operation = match spec.operation.as_deref() {
            None | Some("") => Self::DEFAULT_OPERATION,
            Some(op) => op.parse()?,
        };

        let target = match spec.target.as_deref() {
            None | Some("") => Self::DEFAULT_TARGET,
            Some(target) => target.parse()?,
        };

        let pattern = compile(
            "pattern",
            spec.pattern
                .as_deref()
                .filter(|p| !p.is_empty())
                .unwrap_or(Self::DEFAULT_PATTERN),
        )?;

        let exclude = spec
            .exclude
            .iter()
            .flatten()
            .map(|p| compile("exclude", p))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            name,
            source,
            destination,
            operation,
            pattern,
            target,
            subdirs: spec.subdirs.unwrap_or(false),
            group: spec.group.unwrap_or(true),
            filename: spec.filename.unwrap_or(true),
            verify: spec.verify.unwrap_or(false),
            cleanup: spec.cleanup.unwrap_or(true),
            year: spec.year.unwrap_or(false),
            group_prefix: spec.group_prefix.clone().unwrap_or_default(),
            exclude,
        })
    }

    /// Log prefix, e.g. `[photos @ MV]`.
    pub fn prefix(&self) -> String {
        format!("[{} @ {}]", self.name, self.operation.short_name())
    }

    /// Whether a file name is ruled out by the `exclude` patterns.
    pub fn is_excluded(&self, name: &str) -> bool {
        self.exclude.iter().any(|p| p.matches_name(name))
    }
}

fn compile(field: &'static str, pattern: &str) -> Result<PathMatcher, JobError> {
    PathMatcher::new(pattern).map_err(|e| JobError::InvalidPattern {
        field,
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn spec(source: &std::path::Path) -> JobSpec {
        JobSpec {
            name: Some("test".to_string()),
            source: Some(source.to_path_buf()),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults_are_filled() {
        let temp_dir = TempDir::new().unwrap();
        let job = Job::from_spec(&spec(temp_dir.path())).unwrap();

        assert_eq!(job.name, "test");
        assert_eq!(job.source, temp_dir.path());
        assert_eq!(job.destination, temp_dir.path());
        assert_eq!(job.operation, Operation::Move);
        assert_eq!(job.pattern.as_str(), "*");
        assert_eq!(job.target, Target::Both);
        assert!(!job.subdirs);
        assert!(job.group);
        assert!(job.filename);
        assert!(!job.verify);
        assert!(job.cleanup);
        assert!(!job.year);
        assert!(job.group_prefix.is_empty());
        assert!(job.exclude.is_empty());
    }

    #[test]
    fn test_relative_paths_are_made_absolute() {
        let cwd = std::env::current_dir().unwrap();
        let job = Job::from_spec(&JobSpec {
            destination: Some(PathBuf::from("sorted")),
            ..spec(std::path::Path::new("."))
        })
        .unwrap();

        assert_eq!(job.source, cwd);
        assert_eq!(job.destination, cwd.join("sorted"));
        assert!(job.destination.starts_with(&job.source));
    }

    #[test]
    fn test_dotted_destination_equals_source() {
        let temp_dir = TempDir::new().unwrap();
        let job = Job::from_spec(&JobSpec {
            destination: Some(temp_dir.path().join("out").join("..").join(".")),
            ..spec(&temp_dir.path().join("."))
        })
        .unwrap();

        assert_eq!(job.source, temp_dir.path());
        assert_eq!(job.destination, job.source);
    }

    #[test]
    fn test_explicit_false_is_kept() {
        let temp_dir = TempDir::new().unwrap();
        let job = Job::from_spec(&JobSpec {
            group: Some(false),
            filename: Some(false),
            cleanup: Some(false),
            ..spec(temp_dir.path())
        })
        .unwrap();

        assert!(!job.group);
        assert!(!job.filename);
        assert!(!job.cleanup);
    }

    #[test]
    fn test_missing_name_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        for name in [None, Some(""), Some("   ")] {
            let result = Job::from_spec(&JobSpec {
                name: name.map(str::to_string),
                ..spec(temp_dir.path())
            });
            assert_eq!(result.unwrap_err(), JobError::MissingName);
        }
    }

    #[test]
    fn test_source_must_be_existing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("file.txt");
        std::fs::write(&file, "x").unwrap();

        let missing = Job::from_spec(&JobSpec {
            source: None,
            ..spec(temp_dir.path())
        });
        assert_eq!(missing.unwrap_err(), JobError::MissingSource);

        let absent = Job::from_spec(&spec(&temp_dir.path().join("nope")));
        assert!(matches!(absent, Err(JobError::SourceNotFound(_))));

        let not_dir = Job::from_spec(&spec(&file));
        assert!(matches!(not_dir, Err(JobError::SourceNotDirectory(_))));
    }

    #[test]
    fn test_unknown_operation_and_target() {
        let temp_dir = TempDir::new().unwrap();

        let op = Job::from_spec(&JobSpec {
            operation: Some("shred".to_string()),
            ..spec(temp_dir.path())
        })
        .unwrap_err();
        assert_eq!(op, JobError::UnknownOperation("shred".to_string()));
        assert_eq!(op.field(), "operation");

        let target = Job::from_spec(&JobSpec {
            target: Some("links".to_string()),
            ..spec(temp_dir.path())
        })
        .unwrap_err();
        assert_eq!(target.field(), "target");
    }

    #[test]
    fn test_every_operation_parses() {
        for op in Operation::ALL {
            assert_eq!(op.as_str().parse::<Operation>().unwrap(), op);
        }
        assert!("Move".parse::<Operation>().is_err());
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let err = Job::from_spec(&JobSpec {
            exclude: Some(vec!["[broken".to_string()]),
            ..spec(temp_dir.path())
        })
        .unwrap_err();
        assert_eq!(err.field(), "exclude");
    }

    #[test]
    fn test_prefix_and_exclude() {
        let temp_dir = TempDir::new().unwrap();
        let job = Job::from_spec(&JobSpec {
            operation: Some("dryrun".to_string()),
            exclude: Some(vec!["*.part".to_string(), ".DS_Store".to_string()]),
            ..spec(temp_dir.path())
        })
        .unwrap();

        assert_eq!(job.prefix(), "[test @ DRY]");
        assert!(job.is_excluded("movie.mkv.part"));
        assert!(job.is_excluded(".DS_Store"));
        assert!(!job.is_excluded("movie.mkv"));
    }

    #[test]
    fn test_target_includes() {
        assert!(Target::Both.includes_files() && Target::Both.includes_folders());
        assert!(Target::Files.includes_files() && !Target::Files.includes_folders());
        assert!(!Target::Folders.includes_files() && Target::Folders.includes_folders());
    }
}
