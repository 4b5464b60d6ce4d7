//! Job execution.
//!
//! [`JobRunner`] takes each job spec through validation, candidate
//! enumeration and per-item dispatch to [`FileOperations`]. Items are
//! independent: a failure is recorded against that item and the run goes on.
//! Jobs that fail validation are skipped with the reason logged, and the
//! following jobs still run.
//!
//! Within a job, files are handled before folders, and folders deepest
//! first, so a folder is only looked at once everything below it has been
//! dealt with.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, Local};

use crate::error::{FileOpError, JobError};
use crate::file_group::GroupTable;
use crate::file_ops::{self, Copier, FileOperations, Outcome, PreservingCopy};
use crate::job::{Job, Operation};
use crate::paths::PathEnumerator;
use crate::rules::{JobSpec, Rules};
use crate::sanitize;

/// Shown in place of a destination for deletions.
const DELETED_MARKER: &str = "🗑";

/// Name reported for a job spec without a usable name.
pub const UNNAMED_JOB: &str = "(unnamed)";

/// Whether a record concerns a file or a folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    File,
    Folder,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKind::File => f.write_str("file"),
            ItemKind::Folder => f.write_str("folder"),
        }
    }
}

/// What happened to one enumerated entry.
#[derive(Debug)]
pub struct ItemRecord {
    pub kind: ItemKind,
    pub source: PathBuf,
    /// `None` for deletions and for items whose destination could not be
    /// computed.
    pub destination: Option<PathBuf>,
    pub outcome: Outcome,
}

/// Outcome counts of a job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub done: usize,
    pub unchanged: usize,
    pub planned: usize,
    pub exists: usize,
    pub mismatched: usize,
    pub failed: usize,
}

impl Tally {
    fn add(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Done => self.done += 1,
            Outcome::Unchanged => self.unchanged += 1,
            Outcome::Planned => self.planned += 1,
            Outcome::AlreadyExists => self.exists += 1,
            Outcome::ChecksumMismatch => self.mismatched += 1,
            Outcome::Failed(_) => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.done + self.unchanged + self.planned + self.exists + self.mismatched + self.failed
    }

    /// Items that did not reach their destination.
    pub fn problems(&self) -> usize {
        self.exists + self.mismatched + self.failed
    }
}

/// Everything a completed job did.
#[derive(Debug)]
pub struct JobReport {
    pub name: String,
    pub operation: Operation,
    pub items: Vec<ItemRecord>,
    /// Folders found empty while `cleanup` was set.
    pub empty_folders: Vec<PathBuf>,
    /// Candidates left alone: excluded by name, outside the job's target,
    /// or neither file nor folder.
    pub ignored: Vec<PathBuf>,
}

impl JobReport {
    fn new(job: &Job) -> Self {
        Self {
            name: job.name.clone(),
            operation: job.operation,
            items: Vec::new(),
            empty_folders: Vec::new(),
            ignored: Vec::new(),
        }
    }

    pub fn tally(&self) -> Tally {
        let mut tally = Tally::default();
        for item in &self.items {
            tally.add(&item.outcome);
        }
        tally
    }

    /// The record for a given source path, if it was processed.
    pub fn record_for(&self, source: &Path) -> Option<&ItemRecord> {
        self.items.iter().find(|item| item.source == source)
    }
}

/// Result of one job spec.
#[derive(Debug)]
pub enum JobRun {
    /// The spec did not validate; nothing was touched.
    Skipped { name: String, reason: JobError },
    Completed(JobReport),
}

impl JobRun {
    pub fn name(&self) -> &str {
        match self {
            JobRun::Skipped { name, .. } => name,
            JobRun::Completed(report) => &report.name,
        }
    }

    pub fn report(&self) -> Option<&JobReport> {
        match self {
            JobRun::Skipped { .. } => None,
            JobRun::Completed(report) => Some(report),
        }
    }
}

/// Runs jobs against one rule set.
///
/// The extension index is built once from the rules' group table and shared
/// by every job of the run. The [`Copier`] parameter selects the byte copy
/// used by file transfers.
pub struct JobRunner<'r, C = PreservingCopy> {
    rules: &'r Rules,
    groups: GroupTable,
    operations: FileOperations<C>,
}

impl<'r> JobRunner<'r> {
    pub fn new(rules: &'r Rules) -> Self {
        Self::with_copier(rules, PreservingCopy)
    }
}

impl<'r, C: Copier> JobRunner<'r, C> {
    pub fn with_copier(rules: &'r Rules, copier: C) -> Self {
        Self {
            rules,
            groups: GroupTable::from_rules(&rules.groups),
            operations: FileOperations::with_copier(copier),
        }
    }

    /// Runs every job of the rule set, in order.
    pub fn run_all(&self) -> Vec<JobRun> {
        self.rules.jobs.iter().map(|spec| self.run_spec(spec)).collect()
    }

    /// Validates `spec` and runs it, or reports why it was skipped.
    pub fn run_spec(&self, spec: &JobSpec) -> JobRun {
        match Job::from_spec(spec) {
            Ok(job) => JobRun::Completed(self.run_job(&job)),
            Err(reason) => {
                let name = spec
                    .name
                    .as_deref()
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .unwrap_or(UNNAMED_JOB)
                    .to_string();
                log::warn!("[{}] skipped, invalid {}: {}", name, reason.field(), reason);
                JobRun::Skipped { name, reason }
            }
        }
    }

    /// Runs an already validated job.
    pub fn run_job(&self, job: &Job) -> JobReport {
        let prefix = job.prefix();
        let mut report = JobReport::new(job);
        log::info!(
            "{} {} -> {}",
            prefix,
            job.source.display(),
            job.destination.display()
        );

        let candidates = match PathEnumerator::new(&job.source, job.pattern.clone(), job.subdirs) {
            Ok(candidates) => candidates,
            Err(e) => {
                log::error!("{} cannot list {}: {}", prefix, job.source.display(), e);
                report.items.push(ItemRecord {
                    kind: ItemKind::Folder,
                    source: job.source.clone(),
                    destination: None,
                    outcome: Outcome::Failed(FileOpError::io(&job.source, e)),
                });
                return report;
            }
        };

        let (mut files, mut folders) = partition(job, candidates, &mut report.ignored);
        files.sort();
        folders.sort_by(|a, b| depth(b).cmp(&depth(a)).then_with(|| a.cmp(b)));
        log::debug!("{} {} files, {} folders", prefix, files.len(), folders.len());

        if job.target.includes_files() {
            for file in &files {
                let record = self.process_file(job, file);
                log_item(job, &prefix, &record);
                report.items.push(record);
            }
        } else {
            ignore(&prefix, files, "not a target", &mut report.ignored);
        }

        if !job.target.includes_folders() {
            ignore(&prefix, folders, "not a target", &mut report.ignored);
        } else {
            for folder in &folders {
                if job.cleanup && matches!(file_ops::is_empty_dir(folder), Ok(true)) {
                    log::info!("{} {} | empty", prefix, folder.display());
                    report.empty_folders.push(folder.clone());
                }
                let record = self.process_folder(job, folder);
                log_item(job, &prefix, &record);
                report.items.push(record);
            }
        }

        let tally = report.tally();
        log::debug!(
            "{} finished: {} items, {} with problems",
            prefix,
            tally.total(),
            tally.problems()
        );
        report
    }

    fn process_file(&self, job: &Job, file: &Path) -> ItemRecord {
        let record = |destination: Option<PathBuf>, outcome: Outcome| ItemRecord {
            kind: ItemKind::File,
            source: file.to_path_buf(),
            destination,
            outcome,
        };

        if job.operation == Operation::Delete {
            return record(None, self.operations.delete(file));
        }

        let destination = match self.file_destination(job, file) {
            Ok(destination) => destination,
            Err(e) => return record(None, Outcome::Failed(e)),
        };

        let outcome = if destination == file {
            Outcome::Unchanged
        } else {
            match job.operation {
                Operation::DryRun => Outcome::Planned,
                Operation::Copy => self.operations.copy_file(file, &destination, job.verify),
                Operation::Move | Operation::Rename => {
                    self.operations.move_file(file, &destination, job.verify)
                }
                Operation::Delete => self.operations.delete(file),
            }
        };
        record(Some(destination), outcome)
    }

    /// `destination[/prefix+group][/year]/name`, or `parent/name` when
    /// renaming in place.
    fn file_destination(&self, job: &Job, file: &Path) -> Result<PathBuf, FileOpError> {
        let name = self.target_name(job, file)?;
        if job.operation == Operation::Rename {
            return Ok(parent_of(file).join(name));
        }

        let mut dir = job.destination.clone();
        if job.group
            && let Some(group) = self.groups.group_for_path(file)
        {
            dir.push(format!("{}{}", job.group_prefix, group));
        }
        if job.year {
            let year = modification_year(file).map_err(|e| FileOpError::io(file, e))?;
            dir.push(year.to_string());
        }
        Ok(dir.join(name))
    }

    fn process_folder(&self, job: &Job, folder: &Path) -> ItemRecord {
        let record = |destination: Option<PathBuf>, outcome: Outcome| ItemRecord {
            kind: ItemKind::Folder,
            source: folder.to_path_buf(),
            destination,
            outcome,
        };

        if job.operation == Operation::Delete {
            return record(None, self.operations.delete(folder));
        }

        let name = match self.target_name(job, folder) {
            Ok(name) => name,
            Err(e) => return record(None, Outcome::Failed(e)),
        };
        let destination = if job.operation == Operation::Rename {
            parent_of(folder).join(name)
        } else {
            job.destination.join(name)
        };

        let outcome = if destination == folder {
            Outcome::Unchanged
        } else if job.operation != Operation::Rename && job.destination.starts_with(folder) {
            // The folder holds the job's own destination.
            log::debug!("{} contains {}, leaving it", folder.display(), job.destination.display());
            Outcome::Unchanged
        } else {
            match job.operation {
                Operation::DryRun => Outcome::Planned,
                Operation::Copy => self.operations.copy_dir(folder, &destination, job.verify),
                Operation::Move => self.operations.move_dir(folder, &destination, job.verify),
                Operation::Rename => self.operations.rename_dir(folder, &destination),
                Operation::Delete => self.operations.delete(folder),
            }
        };
        record(Some(destination), outcome)
    }

    /// File name of `path`, sanitized when the job asks for it.
    fn target_name(&self, job: &Job, path: &Path) -> Result<String, FileOpError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| FileOpError::SourceMissing(path.to_path_buf()))?;
        if !job.filename {
            return Ok(name);
        }

        let sanitized = sanitize::sanitize(&name, &self.rules.characters);
        if sanitized.is_empty() {
            Err(FileOpError::EmptyName(path.to_path_buf()))
        } else {
            Ok(sanitized)
        }
    }
}

/// Splits candidates into files and folders, dropping excluded names.
/// Symlinks and special files are ignored.
/// Splits candidates into files and folders. Everything else lands in
/// `ignored` with a log line.
fn partition(
    job: &Job,
    candidates: impl Iterator<Item = PathBuf>,
    ignored: &mut Vec<PathBuf>,
) -> (Vec<PathBuf>, Vec<PathBuf>) {
    let prefix = job.prefix();
    let mut files = Vec::new();
    let mut folders = Vec::new();

    for path in candidates {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        if job.is_excluded(&name) {
            ignore(&prefix, [path], "excluded", ignored);
            continue;
        }

        match fs::symlink_metadata(&path) {
            Ok(metadata) if metadata.is_dir() => folders.push(path),
            Ok(metadata) if metadata.is_file() => files.push(path),
            Ok(_) => ignore(&prefix, [path], "neither file nor folder", ignored),
            Err(e) => {
                log::warn!("{} {} | cannot inspect: {}", prefix, path.display(), e);
                ignored.push(path);
            }
        }
    }

    (files, folders)
}

fn ignore(
    prefix: &str,
    paths: impl IntoIterator<Item = PathBuf>,
    reason: &str,
    ignored: &mut Vec<PathBuf>,
) {
    for path in paths {
        log::info!("{} {} | {}", prefix, path.display(), reason);
        ignored.push(path);
    }
}

fn depth(path: &Path) -> usize {
    path.components().count()
}

fn parent_of(path: &Path) -> PathBuf {
    path.parent().map(Path::to_path_buf).unwrap_or_default()
}

/// Local-time year of the last modification.
fn modification_year(path: &Path) -> io::Result<i32> {
    let modified = fs::metadata(path)?.modified()?;
    Ok(DateTime::<Local>::from(modified).year())
}

fn log_item(job: &Job, prefix: &str, record: &ItemRecord) {
    let destination = match &record.destination {
        Some(destination) => destination.display().to_string(),
        None if job.operation == Operation::Delete => DELETED_MARKER.to_string(),
        None => "-".to_string(),
    };

    if record.outcome.is_success() {
        log::info!(
            "{} {} -> {} | {}",
            prefix,
            record.source.display(),
            destination,
            record.outcome
        );
    } else {
        log::warn!(
            "{} {} -> {} | {}",
            prefix,
            record.source.display(),
            destination,
            record.outcome
        );
    }
}
