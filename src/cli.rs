//! Command-line interface module for ocd.
//!
//! This module handles all CLI-related functionality including:
//! - Argument parsing (clap derive)
//! - Loading the rules document
//! - Running configured or ad-hoc jobs
//! - Maintaining the rules file (`init`, `chars add`)
//!
//! ```bash
//! # Run every job in ./ocd.toml
//! ocd run
//!
//! # Preview how a folder would be sorted
//! ocd organize ~/Downloads --dry-run
//!
//! # Copy pictures into year folders, verifying every copy
//! ocd organize ~/Camera -d ~/Pictures --operation copy --pattern '*.jpg' --year --verify
//! ```

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};

use crate::error::CliError;
use crate::file_group::GroupTable;
use crate::job::Operation;
use crate::output::OutputFormatter;
use crate::rules::{JobSpec, LOCAL_RULES_TOML, Rules};
use crate::runner::{JobRun, JobRunner};

/// Sorts files into group folders by extension, with verified copies and moves.
#[derive(Debug, Parser)]
#[command(name = "ocd")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the jobs of a rules file
    Run(RunArgs),
    /// Run a single job given on the command line
    Organize(OrganizeArgs),
    /// Write a rules file with the default tables
    Init {
        /// Where to write the rules (JSON if it ends in .json, TOML otherwise)
        #[arg(value_name = "PATH", default_value = LOCAL_RULES_TOML)]
        path: PathBuf,
    },
    /// Edit the character substitution table
    Chars {
        #[command(subcommand)]
        action: CharsCommand,
    },
    /// Show which group each extension belongs to
    Groups {
        /// Rules file to read
        #[arg(long, value_name = "PATH")]
        rules: Option<PathBuf>,
    },
}

#[derive(Debug, Subcommand)]
pub enum CharsCommand {
    /// Add or replace a substitution
    Add {
        /// Text to replace
        key: String,
        /// Replacement text
        value: String,
        /// Rules file to edit
        #[arg(long, value_name = "PATH", default_value = LOCAL_RULES_TOML)]
        rules: PathBuf,
    },
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Rules file to read (default: ./ocd.toml, ./rules.json, ~/.config/ocd/rules.toml)
    #[arg(long, value_name = "PATH")]
    pub rules: Option<PathBuf>,

    /// Only run the named job (can be given multiple times)
    #[arg(short, long = "job", value_name = "NAME")]
    pub jobs: Vec<String>,
}

#[derive(Debug, Args)]
pub struct OrganizeArgs {
    /// Folder to organize
    #[arg(value_name = "SOURCE")]
    pub source: PathBuf,

    /// Where to put the results (default: SOURCE)
    #[arg(short, long, value_name = "PATH")]
    pub destination: Option<PathBuf>,

    /// copy, move, delete, dryrun or rename
    #[arg(short, long, default_value = "move")]
    pub operation: String,

    /// Glob pattern selecting entries
    #[arg(short, long, default_value = "*")]
    pub pattern: String,

    /// files, folders or both
    #[arg(short, long, default_value = "both")]
    pub target: String,

    /// Descend into subfolders
    #[arg(long)]
    pub subdirs: bool,

    /// Do not sort files into group folders
    #[arg(long)]
    pub no_group: bool,

    /// Keep names as they are
    #[arg(long)]
    pub no_rename: bool,

    /// Compare checksums after every copy
    #[arg(long)]
    pub verify: bool,

    /// Add a folder level for the modification year
    #[arg(long)]
    pub year: bool,

    /// Prefix for group folder names
    #[arg(long, value_name = "PREFIX")]
    pub group_prefix: Option<String>,

    /// Names to leave alone (can be given multiple times)
    #[arg(short = 'x', long, value_name = "PATTERN")]
    pub exclude: Vec<String>,

    /// Only log what would happen
    #[arg(long)]
    pub dry_run: bool,

    /// Rules file providing the character and group tables
    #[arg(long, value_name = "PATH")]
    pub rules: Option<PathBuf>,
}

impl OrganizeArgs {
    /// The job this command line describes.
    pub fn to_spec(&self) -> JobSpec {
        let operation = if self.dry_run {
            Operation::DryRun.as_str().to_string()
        } else {
            self.operation.clone()
        };
        JobSpec {
            name: Some("organize".to_string()),
            source: Some(self.source.clone()),
            destination: self.destination.clone(),
            operation: Some(operation),
            pattern: Some(self.pattern.clone()),
            target: Some(self.target.clone()),
            subdirs: Some(self.subdirs),
            group: Some(!self.no_group),
            filename: Some(!self.no_rename),
            verify: Some(self.verify),
            cleanup: Some(true),
            year: Some(self.year),
            group_prefix: self.group_prefix.clone(),
            exclude: Some(self.exclude.clone()).filter(|e| !e.is_empty()),
        }
    }
}

/// Runs the parsed command line.
///
/// Per-item failures are logged and summarized but do not make this fail;
/// only an unreadable rules file or an unknown job name does.
///
/// # Examples
///
/// ```no_run
/// use clap::Parser;
/// use ocd::cli::{Cli, run_cli};
///
/// let cli = Cli::parse_from(["ocd", "organize", "/path/to/directory", "--dry-run"]);
/// if let Err(e) = run_cli(&cli) {
///     eprintln!("Error: {}", e);
/// }
/// ```
pub fn run_cli(cli: &Cli) -> Result<(), CliError> {
    match &cli.command {
        Commands::Run(args) => run_jobs(args),
        Commands::Organize(args) => organize(args),
        Commands::Init { path } => init_rules(path),
        Commands::Chars {
            action: CharsCommand::Add { key, value, rules },
        } => {
            Rules::add_character(rules, key, value)?;
            OutputFormatter::success(&format!(
                "\"{}\" -> \"{}\" saved to {}",
                key,
                value,
                rules.display()
            ));
            Ok(())
        }
        Commands::Groups { rules } => {
            let rules = Rules::load(rules.as_deref())?;
            let table = GroupTable::from_rules(&rules.groups);
            OutputFormatter::extension_table(&table.entries());
            Ok(())
        }
    }
}

fn run_jobs(args: &RunArgs) -> Result<(), CliError> {
    let rules = Rules::load(args.rules.as_deref())?;
    let runner = JobRunner::new(&rules);

    let runs = if args.jobs.is_empty() {
        if rules.jobs.is_empty() {
            OutputFormatter::warning("No jobs defined in rules");
            return Ok(());
        }
        runner.run_all()
    } else {
        let specs = args
            .jobs
            .iter()
            .map(|name| rules.job(name).ok_or_else(|| CliError::UnknownJob(name.clone())))
            .collect::<Result<Vec<_>, _>>()?;
        specs.into_iter().map(|spec| runner.run_spec(spec)).collect()
    };

    report(&runs);
    Ok(())
}

fn organize(args: &OrganizeArgs) -> Result<(), CliError> {
    let rules = Rules::load(args.rules.as_deref())?;
    let spec = args.to_spec();
    if args.dry_run {
        OutputFormatter::dry_run_notice(&format!(
            "Nothing will be changed in {}",
            args.source.display()
        ));
    }

    let run = JobRunner::new(&rules).run_spec(&spec);
    report(std::slice::from_ref(&run));
    Ok(())
}

fn init_rules(path: &Path) -> Result<(), CliError> {
    let existed = path.exists();
    let rules = Rules::init(path)?;
    let verb = if existed { "Updated" } else { "Created" };
    OutputFormatter::success(&format!(
        "{} {} ({} character rules, {} groups, {} jobs)",
        verb,
        path.display(),
        rules.characters.len(),
        rules.groups.len(),
        rules.jobs.len()
    ));
    Ok(())
}

fn report(runs: &[JobRun]) {
    OutputFormatter::summary_table(runs);

    let problems: usize = runs
        .iter()
        .filter_map(JobRun::report)
        .map(|report| report.tally().problems())
        .sum();
    if problems > 0 {
        OutputFormatter::warning(&format!(
            "{} item{} could not be processed. Please review the log above.",
            problems,
            if problems == 1 { "" } else { "s" }
        ));
    }
    for report in runs.iter().filter_map(JobRun::report) {
        if !report.empty_folders.is_empty() {
            OutputFormatter::info(&format!(
                "{}: {} empty folder{}",
                report.name,
                report.empty_folders.len(),
                if report.empty_folders.len() == 1 { "" } else { "s" }
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_with_jobs() {
        let cli = Cli::try_parse_from(["ocd", "-v", "run", "--job", "a", "-j", "b"]).unwrap();
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.jobs, vec!["a", "b"]);
                assert!(args.rules.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["ocd", "-q", "-v", "run"]).is_err());
    }

    #[test]
    fn test_organize_spec_defaults() {
        let cli = Cli::try_parse_from(["ocd", "organize", "/tmp/in"]).unwrap();
        let Commands::Organize(args) = cli.command else {
            panic!("expected organize");
        };
        let spec = args.to_spec();

        assert_eq!(spec.source, Some(PathBuf::from("/tmp/in")));
        assert_eq!(spec.destination, None);
        assert_eq!(spec.operation.as_deref(), Some("move"));
        assert_eq!(spec.group, Some(true));
        assert_eq!(spec.filename, Some(true));
        assert_eq!(spec.exclude, None);
    }

    #[test]
    fn test_organize_dry_run_overrides_operation() {
        let cli = Cli::try_parse_from([
            "ocd",
            "organize",
            "/tmp/in",
            "--operation",
            "copy",
            "--dry-run",
            "--no-group",
            "-x",
            "*.part",
        ])
        .unwrap();
        let Commands::Organize(args) = cli.command else {
            panic!("expected organize");
        };
        let spec = args.to_spec();

        assert_eq!(spec.operation.as_deref(), Some("dryrun"));
        assert_eq!(spec.group, Some(false));
        assert_eq!(spec.exclude, Some(vec!["*.part".to_string()]));
    }

    #[test]
    fn test_parse_chars_add() {
        let cli = Cli::try_parse_from(["ocd", "chars", "add", "ö", "o"]).unwrap();
        match cli.command {
            Commands::Chars {
                action: CharsCommand::Add { key, value, rules },
            } => {
                assert_eq!(key, "ö");
                assert_eq!(value, "o");
                assert_eq!(rules, PathBuf::from(LOCAL_RULES_TOML));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_unknown_job_is_error() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let rules_path = temp_dir.path().join("rules.toml");
        Rules::empty().save(&rules_path).unwrap();

        let result = run_jobs(&RunArgs {
            rules: Some(rules_path),
            jobs: vec!["missing".to_string()],
        });
        assert!(matches!(result, Err(CliError::UnknownJob(name)) if name == "missing"));
    }
}
