//! Candidate path enumeration.
//!
//! Lists the entries below a job's source directory that match its glob
//! pattern: only direct children, or every descendant when recursing. The
//! sequence is produced lazily and can be consumed once. Entry order is
//! whatever the filesystem yields and must not be relied upon.

use std::fs::{self, ReadDir};
use std::io;
use std::path::{self, Component, Path, PathBuf};

use glob::{MatchOptions, Pattern, PatternError};
use walkdir::WalkDir;

/// `*` and `?` never cross a `/`; `**` is needed for that.
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A compiled name pattern for candidate selection.
#[derive(Debug, Clone)]
pub struct PathMatcher {
    pattern: Pattern,
    anywhere: Pattern,
}

impl PathMatcher {
    /// Compiles `pattern`.
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        Ok(Self {
            pattern: Pattern::new(pattern)?,
            anywhere: Pattern::new(&format!("**/{pattern}"))?,
        })
    }

    /// Matches a path relative to the enumeration root.
    ///
    /// The pattern may match the whole relative path or its trailing
    /// components, so `*.txt` matches `a.txt` and `sub/dir/a.txt` alike.
    pub fn matches(&self, relative: &Path) -> bool {
        self.pattern.matches_path_with(relative, MATCH_OPTIONS)
            || self.anywhere.matches_path_with(relative, MATCH_OPTIONS)
    }

    /// Matches a single file name.
    pub fn matches_name(&self, name: &str) -> bool {
        self.pattern.matches_with(name, MATCH_OPTIONS)
    }

    pub fn as_str(&self) -> &str {
        self.pattern.as_str()
    }
}

/// One-shot sequence of matching paths under a root.
pub struct PathEnumerator {
    root: PathBuf,
    matcher: PathMatcher,
    entries: Entries,
}

enum Entries {
    Flat(ReadDir),
    Recursive(walkdir::IntoIter),
}

impl PathEnumerator {
    /// Starts enumerating `root`.
    ///
    /// # Errors
    ///
    /// Fails when `root` cannot be listed. Entries that become unreadable
    /// during the walk are logged and skipped.
    pub fn new(root: &Path, matcher: PathMatcher, recursive: bool) -> io::Result<Self> {
        let entries = if recursive {
            // Surface an unreadable root up front, like the flat case does.
            fs::read_dir(root)?;
            Entries::Recursive(WalkDir::new(root).min_depth(1).into_iter())
        } else {
            Entries::Flat(fs::read_dir(root)?)
        };
        Ok(Self {
            root: root.to_path_buf(),
            matcher,
            entries,
        })
    }

    fn next_path(&mut self) -> Option<Option<PathBuf>> {
        let path = match &mut self.entries {
            Entries::Flat(read_dir) => match read_dir.next()? {
                Ok(entry) => entry.path(),
                Err(e) => {
                    log::warn!("Skipping unreadable entry in {}: {}", self.root.display(), e);
                    return Some(None);
                }
            },
            Entries::Recursive(walker) => match walker.next()? {
                Ok(entry) => entry.into_path(),
                Err(e) => {
                    log::warn!("Skipping unreadable entry under {}: {}", self.root.display(), e);
                    return Some(None);
                }
            },
        };

        let relative = path.strip_prefix(&self.root).unwrap_or(&path);
        if self.matcher.matches(relative) {
            Some(Some(path))
        } else {
            Some(None)
        }
    }
}

impl Iterator for PathEnumerator {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        loop {
            if let Some(path) = self.next_path()? {
                return Some(path);
            }
        }
    }
}

/// Enumerates paths under `root` matching `pattern`.
pub fn enumerate(root: &Path, pattern: &str, recursive: bool) -> io::Result<PathEnumerator> {
    let matcher = PathMatcher::new(pattern)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;
    PathEnumerator::new(root, matcher, recursive)
}

/// Makes `path` absolute and folds its `.` and `..` components.
///
/// Purely lexical: the filesystem is not consulted and symlinks are not
/// resolved, so the path need not exist.
pub fn normalize(path: &Path) -> io::Result<PathBuf> {
    let mut normalized = PathBuf::new();
    for component in path::absolute(path)?.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// root/{a.txt, b.md, a/, a/a.txt, a/aa/, a/aa/aa.txt}
    fn tree() -> TempDir {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        fs::write(root.join("a.txt"), "a").unwrap();
        fs::write(root.join("b.md"), "b").unwrap();
        fs::create_dir_all(root.join("a").join("aa")).unwrap();
        fs::write(root.join("a").join("a.txt"), "a").unwrap();
        fs::write(root.join("a").join("aa").join("aa.txt"), "aa").unwrap();
        temp_dir
    }

    fn sorted(root: &Path, pattern: &str, recursive: bool) -> Vec<PathBuf> {
        let mut paths: Vec<_> = enumerate(root, pattern, recursive)
            .unwrap()
            .map(|p| p.strip_prefix(root).unwrap().to_path_buf())
            .collect();
        paths.sort();
        paths
    }

    #[test]
    fn test_flat_lists_direct_children() {
        let temp_dir = tree();
        assert_eq!(
            sorted(temp_dir.path(), "*", false),
            vec![PathBuf::from("a"), PathBuf::from("a.txt"), PathBuf::from("b.md")]
        );
    }

    #[test]
    fn test_recursive_lists_all_descendants() {
        let temp_dir = tree();
        assert_eq!(
            sorted(temp_dir.path(), "*", true),
            vec![
                PathBuf::from("a"),
                PathBuf::from("a/a.txt"),
                PathBuf::from("a/aa"),
                PathBuf::from("a/aa/aa.txt"),
                PathBuf::from("a.txt"),
                PathBuf::from("b.md"),
            ]
        );
    }

    #[test]
    fn test_flat_with_pattern() {
        let temp_dir = tree();
        assert_eq!(sorted(temp_dir.path(), "a.txt", false), vec![PathBuf::from("a.txt")]);
    }

    #[test]
    fn test_recursive_with_pattern() {
        let temp_dir = tree();
        assert_eq!(
            sorted(temp_dir.path(), "a.txt", true),
            vec![PathBuf::from("a/a.txt"), PathBuf::from("a.txt")]
        );
        assert_eq!(
            sorted(temp_dir.path(), "*.txt", true),
            vec![
                PathBuf::from("a/a.txt"),
                PathBuf::from("a/aa/aa.txt"),
                PathBuf::from("a.txt"),
            ]
        );
    }

    #[test]
    fn test_recursive_with_directory_pattern() {
        let temp_dir = tree();
        assert_eq!(
            sorted(temp_dir.path(), "a/*.txt", true),
            vec![PathBuf::from("a/a.txt")]
        );
    }

    #[test]
    fn test_missing_root_is_error() {
        assert!(enumerate(Path::new("/non/existent/root"), "*", false).is_err());
        assert!(enumerate(Path::new("/non/existent/root"), "*", true).is_err());
    }

    #[test]
    fn test_invalid_pattern_is_error() {
        let temp_dir = tree();
        assert!(enumerate(temp_dir.path(), "[unclosed", false).is_err());
        assert!(PathMatcher::new("[unclosed").is_err());
    }

    #[test]
    fn test_matches_name() {
        let matcher = PathMatcher::new("*.tmp").unwrap();
        assert!(matcher.matches_name("x.tmp"));
        assert!(!matcher.matches_name("x.txt"));
    }

    #[test]
    fn test_normalize_folds_dots() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(normalize(Path::new(".")).unwrap(), cwd);
        assert_eq!(normalize(Path::new("./sorted")).unwrap(), cwd.join("sorted"));
        assert_eq!(
            normalize(Path::new("sorted")).unwrap(),
            normalize(Path::new("./sorted")).unwrap()
        );
        assert_eq!(
            normalize(Path::new("/data/out/../in/./music")).unwrap(),
            PathBuf::from("/data/in/music")
        );
        assert_eq!(normalize(Path::new("/..")).unwrap(), PathBuf::from("/"));
    }
}
