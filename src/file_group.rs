//! Extension-to-group resolution for organizing files by type.
//!
//! This module flattens the ordered `groups` table of a rule set into a single
//! extension → group lookup, so each file can be classified with one hash
//! lookup.
//!
//! # Examples
//!
//! ```
//! use ocd::file_group::GroupTable;
//! use ocd::rules::GroupRules;
//!
//! let rules: GroupRules = [("document", vec!["txt".to_string()])].into_iter().collect();
//! let table = GroupTable::from_rules(&rules);
//! assert_eq!(table.resolve("TXT"), "document");
//! assert_eq!(table.resolve("xyz"), "other");
//! ```
use std::collections::HashMap;
use std::path::Path;

use crate::rules::GroupRules;

/// Group returned for extensions no group claims.
pub const OTHER_GROUP: &str = "other";

/// Flattened extension → group index.
///
/// Built by walking the groups in their defined order and assigning each
/// extension to the first group that lists it. Later groups listing the same
/// extension are ignored for that extension.
#[derive(Debug, Clone, Default)]
pub struct GroupTable {
    extension_map: HashMap<String, String>,
}

impl GroupTable {
    /// Builds the index from an ordered group table.
    pub fn from_rules(groups: &GroupRules) -> Self {
        let mut table = Self::default();
        for (group, extensions) in groups.iter() {
            for ext in extensions {
                table.add_extension_mapping(ext, group);
            }
        }
        table
    }

    /// Assigns `ext` to `group` unless another group already claimed it.
    ///
    /// Returns `false` when the extension was already assigned.
    pub fn add_extension_mapping(&mut self, ext: &str, group: &str) -> bool {
        let key = normalize(ext);
        if key.is_empty() {
            return false;
        }
        if let Some(owner) = self.extension_map.get(&key) {
            if owner != group {
                log::trace!("Extension '{key}' already claimed by '{owner}', ignoring '{group}'");
            }
            return false;
        }
        self.extension_map.insert(key, group.to_string());
        true
    }

    /// Maps an extension to the group that claims it, if any.
    ///
    /// # Examples
    ///
    /// ```
    /// use ocd::file_group::GroupTable;
    /// use ocd::rules::Rules;
    ///
    /// let table = GroupTable::from_rules(&Rules::default_groups());
    /// assert_eq!(table.lookup("mp3"), Some("audio"));
    /// assert_eq!(table.lookup(".Mp3"), Some("audio"));
    /// assert_eq!(table.lookup("nope"), None);
    /// ```
    pub fn lookup(&self, ext: &str) -> Option<&str> {
        self.extension_map.get(&normalize(ext)).map(String::as_str)
    }

    /// Maps an extension to its group, falling back to [`OTHER_GROUP`].
    pub fn resolve(&self, ext: &str) -> &str {
        self.lookup(ext).unwrap_or(OTHER_GROUP)
    }

    /// Determines the group of a path from its extension.
    ///
    /// Returns `None` for paths without an extension (`README`, `.bashrc`,
    /// `file.`); such files are left ungrouped rather than sent to
    /// [`OTHER_GROUP`].
    ///
    /// # Examples
    ///
    /// ```
    /// use ocd::file_group::GroupTable;
    /// use ocd::rules::Rules;
    /// use std::path::Path;
    ///
    /// let table = GroupTable::from_rules(&Rules::default_groups());
    /// assert_eq!(table.group_for_path(Path::new("notes.TXT")), Some("document"));
    /// assert_eq!(table.group_for_path(Path::new("data.xyz")), Some("other"));
    /// assert_eq!(table.group_for_path(Path::new("Makefile")), None);
    /// ```
    pub fn group_for_path(&self, path: &Path) -> Option<&str> {
        match path.extension().map(|e| e.to_string_lossy()) {
            Some(ext) if !ext.is_empty() => Some(self.resolve(&ext)),
            _ => {
                log::debug!("{} has no extension, leaving it ungrouped", path.display());
                None
            }
        }
    }

    /// All (extension, group) pairs sorted by extension.
    pub fn entries(&self) -> Vec<(&str, &str)> {
        let mut entries: Vec<_> = self
            .extension_map
            .iter()
            .map(|(ext, group)| (ext.as_str(), group.as_str()))
            .collect();
        entries.sort_unstable();
        entries
    }

    pub fn len(&self) -> usize {
        self.extension_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extension_map.is_empty()
    }
}

fn normalize(ext: &str) -> String {
    ext.trim_start_matches('.').to_lowercase()
}
