//! Rule documents: character substitutions, extension groups and jobs.
//!
//! Rules are read once per run and never mutated by a job. They can be
//! stored either as JSON (the historical `rules.json` layout) or as TOML:
//!
//! ```toml
//! [characters]
//! " " = "_"
//! "ë" = "e"
//!
//! [groups]
//! audio = ["mp3", "wav"]
//! document = ["txt", "doc"]
//!
//! [[jobs]]
//! name = "downloads"
//! source = "/home/me/Downloads"
//! destination = "/home/me/Sorted"
//! operation = "move"
//! verify = true
//! ```
//!
//! Both `characters` and `groups` are order-sensitive (substitutions compose
//! in order, the first group claiming an extension wins), so they are kept
//! as [`OrderedTable`]s in document order rather than hash maps.

use std::fmt;
use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// File name looked up in the current directory when no rules path is given.
pub const LOCAL_RULES_TOML: &str = "ocd.toml";
/// Historical JSON rules file name, also looked up in the current directory.
pub const LOCAL_RULES_JSON: &str = "rules.json";

/// Baseline extension groups, in precedence order.
const DEFAULT_GROUPS: &[(&str, &[&str])] = &[
    ("audio", &["mp3", "wav", "flac", "opus", "ogg", "aac", "m4a", "wma", "aif", "aiff", "mid", "midi"]),
    ("picture", &["jpg", "jpeg", "png", "gif", "bmp", "tif", "tiff", "webp", "heic", "psd", "dng", "cr2", "arw"]),
    ("video", &["mp4", "mkv", "mov", "avi", "wmv", "flv", "mpg", "mpeg", "m2ts", "3gp", "webm"]),
    ("document", &["txt", "doc", "docx", "pdf", "md", "odt", "rtf", "tex", "pages", "xls", "xlsx", "csv", "tsv", "ppt", "pptx"]),
    ("archive", &["zip", "rar", "7z", "tar", "gz", "tgz", "bz2", "xz", "zipx"]),
    ("diskimage", &["dmg", "iso", "vmdk", "toast", "vcd"]),
    ("developer", &["c", "cc", "cpp", "h", "hpp", "cs", "java", "py", "rb", "rs", "go", "sh", "js", "ts"]),
    ("web", &["html", "htm", "css", "php", "aspx"]),
    ("database", &["db", "sqlite", "sql", "mdb", "accdb"]),
    ("executable", &["exe", "msi", "app", "apk", "bat", "cmd", "com"]),
    ("fonts", &["ttf", "otf", "woff", "woff2"]),
    ("backup", &["bak", "bkp", "old", "tmp"]),
];

/// A string-keyed table that remembers insertion order.
///
/// Inserting an existing key replaces its value in place, keeping the key's
/// original position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedTable<V> {
    entries: Vec<(String, V)>,
}

impl<V> OrderedTable<V> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Inserts or replaces `key`, returning the previous value if any.
    pub fn insert(&mut self, key: impl Into<String>, value: V) -> Option<V> {
        let key = key.into();
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            return Some(std::mem::replace(&mut slot.1, value));
        }
        self.entries.push((key, value));
        None
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V> Default for OrderedTable<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for OrderedTable<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (key, value) in iter {
            table.insert(key, value);
        }
        table
    }
}

impl<V: Serialize> Serialize for OrderedTable<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

struct OrderedTableVisitor<V>(PhantomData<V>);

impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedTableVisitor<V> {
    type Value = OrderedTable<V>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a table of string keys")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut table = OrderedTable::new();
        while let Some((key, value)) = access.next_entry::<String, V>()? {
            table.insert(key, value);
        }
        Ok(table)
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedTable<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(OrderedTableVisitor(PhantomData))
    }
}

/// Substring → replacement rules, applied in order.
pub type CharacterTable = OrderedTable<String>;

/// Group name → extensions, in precedence order.
pub type GroupRules = OrderedTable<Vec<String>>;

/// A job as written in the rules document.
///
/// Every field is optional here; [`Job::from_spec`](crate::job::Job::from_spec)
/// validates the spec and fills in defaults before anything runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subdirs: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<bool>,
    /// Older rule files call this `rename`.
    #[serde(alias = "rename", skip_serializing_if = "Option::is_none")]
    pub filename: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verify: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleanup: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude: Option<Vec<String>>,
}

/// The complete rule set for a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rules {
    #[serde(default)]
    pub characters: CharacterTable,
    #[serde(default)]
    pub groups: GroupRules,
    #[serde(default)]
    pub jobs: Vec<JobSpec>,
}

/// Top-level sections as they appear in a possibly incomplete file.
#[derive(Debug, Default, Deserialize)]
struct PartialRules {
    characters: Option<CharacterTable>,
    groups: Option<GroupRules>,
    jobs: Option<Vec<JobSpec>>,
}

/// On-disk encoding of a rules file, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RulesFormat {
    Json,
    Toml,
}

impl RulesFormat {
    /// `.json` files are JSON, everything else is TOML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Toml,
        }
    }
}

impl Rules {
    /// An empty rule set: no substitutions, no groups, no jobs.
    pub fn empty() -> Self {
        Self {
            characters: CharacterTable::new(),
            groups: GroupRules::new(),
            jobs: Vec::new(),
        }
    }

    /// The baseline character table: spaces become underscores.
    pub fn default_characters() -> CharacterTable {
        [(" ", "_".to_string())].into_iter().collect()
    }

    /// The baseline extension groups.
    pub fn default_groups() -> GroupRules {
        DEFAULT_GROUPS
            .iter()
            .map(|(name, exts)| (*name, exts.iter().map(|e| e.to_string()).collect()))
            .collect()
    }

    /// An example job, written by [`Rules::init`] as a starting point.
    pub fn example_job() -> JobSpec {
        JobSpec {
            name: Some("defaults".to_string()),
            source: Some(PathBuf::from("/path/to/folder")),
            destination: Some(PathBuf::from("/path/to/folder")),
            operation: Some("move".to_string()),
            pattern: Some("*".to_string()),
            group: Some(true),
            cleanup: Some(true),
            filename: Some(true),
            subdirs: Some(false),
            verify: Some(false),
            ..Default::default()
        }
    }

    /// Load rules from a file, with fallback to defaults.
    ///
    /// Attempts to load rules in the following order:
    /// 1. If `rules_path` is provided, load from that file
    /// 2. `ocd.toml` in the current directory
    /// 3. `rules.json` in the current directory
    /// 4. `~/.config/ocd/rules.toml`
    /// 5. Fall back to [`Rules::default`]
    ///
    /// # Errors
    ///
    /// Returns an error if a file is found (or explicitly given) but cannot
    /// be read or parsed.
    pub fn load(rules_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = rules_path {
            return Self::load_from_file(path);
        }

        for candidate in [PathBuf::from(LOCAL_RULES_TOML), PathBuf::from(LOCAL_RULES_JSON)] {
            if candidate.exists() {
                return Self::load_from_file(&candidate);
            }
        }

        if let Some(home_rules) = Self::user_rules_path()
            && home_rules.exists()
        {
            return Self::load_from_file(&home_rules);
        }

        log::debug!("No rules file found, using built-in defaults");
        Ok(Self::default())
    }

    /// `~/.config/ocd/rules.toml`, if `HOME` is set.
    pub fn user_rules_path() -> Option<PathBuf> {
        std::env::var_os("HOME").map(|home| {
            PathBuf::from(home)
                .join(".config")
                .join("ocd")
                .join("rules.toml")
        })
    }

    /// Load rules from a specific file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` if the file does not exist,
    /// `ConfigError::Invalid` if parsing fails and `ConfigError::Io` if the
    /// file cannot be read.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = Self::read(path)?;
        let rules = Self::parse(&content, RulesFormat::from_path(path)).map_err(|reason| {
            ConfigError::Invalid {
                path: path.to_path_buf(),
                reason,
            }
        })?;
        log::debug!(
            "Loaded {} character rules, {} groups and {} jobs from {}",
            rules.characters.len(),
            rules.groups.len(),
            rules.jobs.len(),
            path.display()
        );
        Ok(rules)
    }

    /// Parse a rules document.
    pub fn parse(content: &str, format: RulesFormat) -> Result<Self, String> {
        match format {
            RulesFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
            RulesFormat::Toml => toml::from_str(content).map_err(|e| e.to_string()),
        }
    }

    /// Render the document in the given format.
    pub fn render(&self, format: RulesFormat) -> Result<String, ConfigError> {
        match format {
            RulesFormat::Json => {
                serde_json::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
            }
            RulesFormat::Toml => {
                toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
            }
        }
    }

    /// Write the rules to `path`, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let rendered = self.render(RulesFormat::from_path(path))?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, rendered).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Initialize a rules file with the default rules.
    ///
    /// If `path` already holds a rules file, its sections are kept and only
    /// the missing top-level sections are filled in from the defaults.
    pub fn init(path: &Path) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let rules = if path.is_file() {
            let content = Self::read(path)?;
            let partial: PartialRules = match RulesFormat::from_path(path) {
                RulesFormat::Json => serde_json::from_str(&content).map_err(|e| e.to_string()),
                RulesFormat::Toml => toml::from_str(&content).map_err(|e| e.to_string()),
            }
            .map_err(|reason| ConfigError::Invalid {
                path: path.to_path_buf(),
                reason,
            })?;
            Self {
                characters: partial
                    .characters
                    .filter(|c| !c.is_empty())
                    .unwrap_or(defaults.characters),
                groups: partial
                    .groups
                    .filter(|g| !g.is_empty())
                    .unwrap_or(defaults.groups),
                jobs: partial
                    .jobs
                    .filter(|j| !j.is_empty())
                    .unwrap_or(defaults.jobs),
            }
        } else {
            log::info!("Creating rules file {}", path.display());
            defaults
        };
        rules.save(path)?;
        Ok(rules)
    }

    /// Add (or replace) a character rule in the file at `path`.
    pub fn add_character(path: &Path, pattern: &str, replacement: &str) -> Result<Self, ConfigError> {
        let mut rules = Self::load_from_file(path)?;
        log::debug!("Adding \"{pattern} = {replacement}\" to rules");
        rules.characters.insert(pattern, replacement.to_string());
        rules.save(path)?;
        Ok(rules)
    }

    /// Find a job spec by name.
    pub fn job(&self, name: &str) -> Option<&JobSpec> {
        self.jobs.iter().find(|job| job.name.as_deref() == Some(name))
    }

    fn read(path: &Path) -> Result<String, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            characters: Self::default_characters(),
            groups: Self::default_groups(),
            jobs: vec![Self::example_job()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_ordered_table_keeps_insertion_order() {
        let mut table = CharacterTable::new();
        table.insert("b", "2".to_string());
        table.insert("a", "1".to_string());
        table.insert("c", "3".to_string());

        let keys: Vec<_> = table.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_ordered_table_replace_keeps_position() {
        let mut table = CharacterTable::new();
        table.insert("x", "1".to_string());
        table.insert("y", "2".to_string());
        let previous = table.insert("x", "3".to_string());

        assert_eq!(previous.as_deref(), Some("1"));
        let entries: Vec<_> = table.iter().collect();
        assert_eq!(entries[0], ("x", &"3".to_string()));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_parse_json_preserves_document_order() {
        let json = r#"{
            "characters": {"z": "1", " ": "_", "a": "2"},
            "groups": {"second": ["txt"], "first": ["txt", "md"]},
            "jobs": [{"name": "one", "source": "/tmp"}]
        }"#;
        let rules = Rules::parse(json, RulesFormat::Json).unwrap();

        let chars: Vec<_> = rules.characters.iter().map(|(k, _)| k).collect();
        assert_eq!(chars, vec!["z", " ", "a"]);
        let groups: Vec<_> = rules.groups.iter().map(|(k, _)| k).collect();
        assert_eq!(groups, vec!["second", "first"]);
        assert_eq!(rules.jobs[0].name.as_deref(), Some("one"));
    }

    #[test]
    fn test_parse_toml_preserves_document_order() {
        let toml = r#"
            [characters]
            "ë" = "e"
            " " = "_"

            [groups]
            picture = ["jpg"]
            audio = ["mp3"]

            [[jobs]]
            name = "pics"
            source = "/tmp"
            operation = "copy"
        "#;
        let rules = Rules::parse(toml, RulesFormat::Toml).unwrap();

        let chars: Vec<_> = rules.characters.iter().map(|(k, _)| k).collect();
        assert_eq!(chars, vec!["ë", " "]);
        let groups: Vec<_> = rules.groups.iter().map(|(k, _)| k).collect();
        assert_eq!(groups, vec!["picture", "audio"]);
        assert_eq!(rules.jobs[0].operation.as_deref(), Some("copy"));
    }

    #[test]
    fn test_missing_sections_are_empty() {
        let rules = Rules::parse("{}", RulesFormat::Json).unwrap();
        assert_eq!(rules, Rules::empty());
    }

    #[test]
    fn test_rename_alias_maps_to_filename() {
        let rules =
            Rules::parse(r#"{"jobs": [{"name": "a", "rename": false}]}"#, RulesFormat::Json)
                .unwrap();
        assert_eq!(rules.jobs[0].filename, Some(false));
    }

    #[test]
    fn test_invalid_document_reports_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("rules.json");
        fs::write(&path, "{not json").unwrap();

        let err = Rules::load_from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
        assert!(err.to_string().contains("rules.json"));
    }

    #[test]
    fn test_load_explicit_missing_file() {
        let result = Rules::load(Some(Path::new("/non/existent/rules.toml")));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_save_and_load_both_formats() {
        let temp_dir = TempDir::new().unwrap();
        for name in ["rules.json", "rules.toml"] {
            let path = temp_dir.path().join(name);
            let rules = Rules::default();
            rules.save(&path).unwrap();
            assert_eq!(Rules::load_from_file(&path).unwrap(), rules, "{name}");
        }
    }

    #[test]
    fn test_init_creates_default_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("rules.json");

        let rules = Rules::init(&path).unwrap();

        assert!(path.is_file());
        assert_eq!(rules, Rules::default());
        assert_eq!(Rules::load_from_file(&path).unwrap(), Rules::default());
    }

    #[test]
    fn test_init_fills_only_missing_sections() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("rules.json");
        fs::write(&path, r#"{"characters": {"jens": "mens"}}"#).unwrap();

        let rules = Rules::init(&path).unwrap();

        assert_eq!(rules.characters.len(), 1);
        assert_eq!(rules.characters.get("jens").map(String::as_str), Some("mens"));
        assert_eq!(rules.groups, Rules::default_groups());
        assert_eq!(rules.jobs, vec![Rules::example_job()]);
    }

    #[test]
    fn test_add_character_persists() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("rules.toml");
        Rules::default().save(&path).unwrap();

        Rules::add_character(&path, "häst", "hest").unwrap();

        let rules = Rules::load_from_file(&path).unwrap();
        assert_eq!(rules.characters.get("häst").map(String::as_str), Some("hest"));
        assert_eq!(rules.characters.get(" ").map(String::as_str), Some("_"));
    }

    #[test]
    fn test_find_job_by_name() {
        let rules = Rules::default();
        assert!(rules.job("defaults").is_some());
        assert!(rules.job("missing").is_none());
    }
}
