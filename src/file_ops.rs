//! Copy, move and delete primitives with verified integrity.
//!
//! Every operation returns an [`Outcome`] instead of an error for the
//! conditions a batch run expects to meet (an occupied destination, a
//! checksum mismatch). Genuine filesystem failures are wrapped in
//! [`Outcome::Failed`] so one bad item never aborts the batch.
//!
//! Moves always copy first and remove the source only once the destination
//! is confirmed present, and byte-identical when verification is requested.
//! Existing destinations are never overwritten.
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use filetime::FileTime;
use walkdir::WalkDir;

use crate::checksum;
use crate::error::FileOpError;
use crate::paths;

/// Result of a single file or folder operation.
#[derive(Debug)]
pub enum Outcome {
    /// The operation completed.
    Done,
    /// Source and destination are the same path; nothing was touched.
    Unchanged,
    /// Dry run: the action was only logged.
    Planned,
    /// The destination already exists and was left alone.
    AlreadyExists,
    /// The copy does not match its source; both were kept.
    ChecksumMismatch,
    /// A filesystem error prevented the operation.
    Failed(FileOpError),
}

impl Outcome {
    /// True for `Done`, `Unchanged` and `Planned`.
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Done | Outcome::Unchanged | Outcome::Planned)
    }

    /// Short label used in log lines and summaries.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Done => "ok",
            Outcome::Unchanged => "unchanged",
            Outcome::Planned => "planned",
            Outcome::AlreadyExists => "exists",
            Outcome::ChecksumMismatch => "checksum mismatch",
            Outcome::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Failed(e) => write!(f, "failed: {}", e),
            other => f.write_str(other.label()),
        }
    }
}

/// The byte-level copy step used by [`FileOperations`].
///
/// Implementations must create `destination` exclusively and fail with
/// [`io::ErrorKind::AlreadyExists`] if it is already there.
pub trait Copier {
    fn copy(&self, source: &Path, destination: &Path) -> io::Result<()>;
}

/// Copies content, permissions and access/modification times.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreservingCopy;

impl Copier for PreservingCopy {
    fn copy(&self, source: &Path, destination: &Path) -> io::Result<()> {
        let metadata = fs::metadata(source)?;
        let mut reader = File::open(source)?;
        let mut writer = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(destination)?;

        let written = io::copy(&mut reader, &mut writer).and_then(|_| writer.sync_all());
        if let Err(e) = written {
            drop(writer);
            // Incomplete copy of our own making; do not leave it behind.
            let _ = fs::remove_file(destination);
            return Err(e);
        }
        drop(writer);

        filetime::set_file_times(
            destination,
            FileTime::from_last_access_time(&metadata),
            FileTime::from_last_modification_time(&metadata),
        )?;
        fs::set_permissions(destination, metadata.permissions())?;
        Ok(())
    }
}

/// File and folder operations over a [`Copier`].
#[derive(Debug, Clone, Default)]
pub struct FileOperations<C = PreservingCopy> {
    copier: C,
}

impl FileOperations<PreservingCopy> {
    pub fn new() -> Self {
        Self {
            copier: PreservingCopy,
        }
    }
}

impl<C: Copier> FileOperations<C> {
    /// Uses a custom copy step.
    pub fn with_copier(copier: C) -> Self {
        Self { copier }
    }

    /// Copies a file to `destination`.
    ///
    /// Parent directories are created as needed. With `verify`, a checksum
    /// mismatch is reported as [`Outcome::ChecksumMismatch`] and the bad copy
    /// is kept for inspection.
    pub fn copy_file(&self, source: &Path, destination: &Path, verify: bool) -> Outcome {
        match self.place(source, destination, verify) {
            Outcome::Done => {
                log::debug!(
                    "{} -> {} | copied{}",
                    source.display(),
                    destination.display(),
                    if verify { ", verified" } else { "" }
                );
                Outcome::Done
            }
            other => other,
        }
    }

    /// Moves a file to `destination` by copying it and then removing the
    /// source.
    ///
    /// The source is removed only after the destination is confirmed to
    /// exist, and with `verify` only after the checksums match. On a
    /// mismatch both files are kept.
    pub fn move_file(&self, source: &Path, destination: &Path, verify: bool) -> Outcome {
        match self.place(source, destination, verify) {
            Outcome::Done => match fs::remove_file(source) {
                Ok(()) => {
                    log::debug!(
                        "{} -> {} | moved{}",
                        source.display(),
                        destination.display(),
                        if verify { ", verified" } else { "" }
                    );
                    Outcome::Done
                }
                Err(e) => {
                    log::warn!(
                        "{} -> {} | copied but source could not be removed: {}",
                        source.display(),
                        destination.display(),
                        e
                    );
                    Outcome::Failed(FileOpError::io(source, e))
                }
            },
            other => other,
        }
    }

    /// Removes a file, or a directory if it is empty.
    pub fn delete(&self, path: &Path) -> Outcome {
        let metadata = match fs::symlink_metadata(path) {
            Ok(m) => m,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Outcome::Failed(FileOpError::SourceMissing(path.to_path_buf()));
            }
            Err(e) => return Outcome::Failed(FileOpError::io(path, e)),
        };

        let removed = if metadata.is_dir() {
            match is_empty_dir(path) {
                Ok(true) => fs::remove_dir(path),
                Ok(false) => {
                    return Outcome::Failed(FileOpError::DirectoryNotEmpty(path.to_path_buf()));
                }
                Err(e) => Err(e),
            }
        } else {
            fs::remove_file(path)
        };

        match removed {
            Ok(()) => Outcome::Done,
            Err(e) => Outcome::Failed(FileOpError::io(path, e)),
        }
    }

    /// Recreates the folder tree of `source` at `destination`, copying every
    /// file with [`copy_file`](Self::copy_file).
    pub fn copy_dir(&self, source: &Path, destination: &Path, verify: bool) -> Outcome {
        self.transfer_dir(source, destination, verify, false)
    }

    /// Like [`copy_dir`](Self::copy_dir) but moves each file with
    /// [`move_file`](Self::move_file), then removes source folders that end up
    /// empty. Files whose move failed stay in the source tree.
    pub fn move_dir(&self, source: &Path, destination: &Path, verify: bool) -> Outcome {
        self.transfer_dir(source, destination, verify, true)
    }

    /// Renames a folder in place. No data is copied.
    pub fn rename_dir(&self, source: &Path, destination: &Path) -> Outcome {
        if occupied(destination) {
            return Outcome::AlreadyExists;
        }
        if !source.is_dir() {
            return Outcome::Failed(FileOpError::SourceMissing(source.to_path_buf()));
        }
        match fs::rename(source, destination) {
            Ok(()) => Outcome::Done,
            Err(e) => Outcome::Failed(FileOpError::io(source, e)),
        }
    }

    /// Copies `source` to `destination` and confirms the result.
    fn place(&self, source: &Path, destination: &Path, verify: bool) -> Outcome {
        if occupied(destination) {
            log::debug!("{} already exists", destination.display());
            return Outcome::AlreadyExists;
        }
        match fs::metadata(source) {
            Ok(metadata) if metadata.is_file() => {}
            Ok(_) => return Outcome::Failed(FileOpError::Unsupported(source.to_path_buf())),
            Err(_) => return Outcome::Failed(FileOpError::SourceMissing(source.to_path_buf())),
        }
        if let Some(parent) = destination.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            return Outcome::Failed(FileOpError::io(parent, e));
        }

        match self.copier.copy(source, destination) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Outcome::AlreadyExists,
            Err(e) => return Outcome::Failed(FileOpError::io(destination, e)),
        }

        if verify {
            return match checksum::verify(source, destination) {
                Ok(true) => Outcome::Done,
                Ok(false) => {
                    log::warn!(
                        "{} -> {} | mismatching checksums, keeping both",
                        source.display(),
                        destination.display()
                    );
                    Outcome::ChecksumMismatch
                }
                Err(e) => Outcome::Failed(FileOpError::io(destination, e)),
            };
        }

        if destination.exists() {
            Outcome::Done
        } else {
            Outcome::Failed(FileOpError::DestinationMissing(destination.to_path_buf()))
        }
    }

    fn transfer_dir(
        &self,
        source: &Path,
        destination: &Path,
        verify: bool,
        remove_source: bool,
    ) -> Outcome {
        if occupied(destination) {
            return Outcome::AlreadyExists;
        }
        if !source.is_dir() {
            return Outcome::Failed(FileOpError::SourceMissing(source.to_path_buf()));
        }
        if nested(source, destination) {
            return Outcome::Failed(FileOpError::NestedDestination {
                folder: source.to_path_buf(),
                destination: destination.to_path_buf(),
            });
        }
        if let Err(e) = fs::create_dir_all(destination) {
            return Outcome::Failed(FileOpError::io(destination, e));
        }

        // Snapshot the tree first; files are removed from it as we go.
        let entries: Vec<_> = WalkDir::new(source).min_depth(1).into_iter().collect();
        let mut total = 0;
        let mut failed = 0;
        let mut source_dirs: Vec<PathBuf> = Vec::new();

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Skipping unreadable entry under {}: {}", source.display(), e);
                    total += 1;
                    failed += 1;
                    continue;
                }
            };
            let Ok(relative) = entry.path().strip_prefix(source) else {
                continue;
            };
            let target = destination.join(relative);
            let file_type = entry.file_type();

            total += 1;
            if file_type.is_dir() {
                if let Err(e) = fs::create_dir_all(&target) {
                    log::warn!("Could not create {}: {}", target.display(), e);
                    failed += 1;
                }
                source_dirs.push(entry.into_path());
                continue;
            }

            let outcome = if !file_type.is_file() {
                Outcome::Failed(FileOpError::Unsupported(entry.path().to_path_buf()))
            } else if remove_source {
                self.move_file(entry.path(), &target, verify)
            } else {
                self.copy_file(entry.path(), &target, verify)
            };
            if !outcome.is_success() {
                log::warn!("{} -> {} | {}", entry.path().display(), target.display(), outcome);
                failed += 1;
            }
        }

        if remove_source {
            // Children come after their parents in the walk.
            for dir in source_dirs.iter().rev().map(PathBuf::as_path).chain([source]) {
                if matches!(is_empty_dir(dir), Ok(true))
                    && let Err(e) = fs::remove_dir(dir)
                {
                    log::warn!("Could not remove {}: {}", dir.display(), e);
                }
            }
        }

        if failed > 0 {
            Outcome::Failed(FileOpError::Partial {
                path: source.to_path_buf(),
                failed,
                total,
            })
        } else {
            Outcome::Done
        }
    }
}

/// True if the directory has no entries at all.
pub fn is_empty_dir(path: &Path) -> io::Result<bool> {
    Ok(fs::read_dir(path)?.next().is_none())
}

/// True if `destination` lies inside `folder`, however either is spelled.
fn nested(folder: &Path, destination: &Path) -> bool {
    match (paths::normalize(folder), paths::normalize(destination)) {
        (Ok(folder), Ok(destination)) => destination.starts_with(folder),
        _ => destination.starts_with(folder),
    }
}

/// True if anything, including a dangling symlink, sits at `path`.
fn occupied(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}
