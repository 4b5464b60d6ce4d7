//! Output formatting and styling module.
//!
//! Provides a centralized interface for user-facing CLI output: colored
//! status lines and the per-job summary table. Per-item progress goes
//! through the logger instead, so it can be filtered by level.

use colored::*;

use crate::runner::{JobRun, Tally};

/// Manages all CLI output with consistent styling and formatting.
///
/// This struct provides methods for:
/// - Success messages (green with ✓)
/// - Error messages (red with ✗)
/// - Warning messages (yellow with ⚠)
/// - Info messages (cyan)
/// - Summary tables of job outcomes
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use ocd::output::OutputFormatter;
    /// OutputFormatter::success("Rules written to ocd.toml");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Prints one row per job with its outcome counts, then a total row.
    ///
    /// Skipped jobs are listed with the reason they were skipped.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use ocd::output::OutputFormatter;
    /// use ocd::rules::Rules;
    /// use ocd::runner::JobRunner;
    ///
    /// let rules = Rules::load(None).unwrap();
    /// let runs = JobRunner::new(&rules).run_all();
    /// OutputFormatter::summary_table(&runs);
    /// ```
    pub fn summary_table(runs: &[JobRun]) {
        Self::header("SUMMARY");

        let name_width = runs
            .iter()
            .map(|run| run.name().chars().count())
            .max()
            .unwrap_or(0)
            .max(3); // At least "Job" width

        println!(
            "{:<width$} | {:>6} | {:>9} | {:>7} | {:>6} | {:>8} | {:>6}",
            "Job".bold(),
            "ok".bold(),
            "unchanged".bold(),
            "planned".bold(),
            "exists".bold(),
            "mismatch".bold(),
            "failed".bold(),
            width = name_width
        );
        let rule = "-".repeat(name_width + 64);
        println!("{}", rule);

        let mut total = Tally::default();
        let mut skipped = 0;
        for run in runs {
            match run {
                JobRun::Skipped { name, reason } => {
                    skipped += 1;
                    println!(
                        "{:<width$} | {} {}",
                        name,
                        "skipped:".yellow(),
                        reason,
                        width = name_width
                    );
                }
                JobRun::Completed(report) => {
                    let tally = report.tally();
                    Self::tally_row(&report.name, &tally, name_width);
                    total.done += tally.done;
                    total.unchanged += tally.unchanged;
                    total.planned += tally.planned;
                    total.exists += tally.exists;
                    total.mismatched += tally.mismatched;
                    total.failed += tally.failed;
                }
            }
        }

        println!("{}", rule);
        Self::tally_row("Total", &total, name_width);
        if skipped > 0 {
            Self::warning(&format!(
                "{} job{} skipped",
                skipped,
                if skipped == 1 { "" } else { "s" }
            ));
        }
    }

    fn tally_row(name: &str, tally: &Tally, width: usize) {
        let problems = |n: usize, cell: String| {
            if n > 0 { cell.red().to_string() } else { cell }
        };
        println!(
            "{:<width$} | {} | {:>9} | {:>7} | {} | {} | {}",
            name,
            format!("{:>6}", tally.done).green(),
            tally.unchanged,
            tally.planned,
            problems(tally.exists, format!("{:>6}", tally.exists)),
            problems(tally.mismatched, format!("{:>8}", tally.mismatched)),
            problems(tally.failed, format!("{:>6}", tally.failed)),
            width = width
        );
    }

    /// Prints the flattened extension index as `extension -> group` rows.
    pub fn extension_table(entries: &[(&str, &str)]) {
        Self::header("EXTENSIONS");
        let width = entries
            .iter()
            .map(|(ext, _)| ext.len())
            .max()
            .unwrap_or(0)
            .max(9); // At least "Extension" width

        println!(
            "{:<width$} | {}",
            "Extension".bold(),
            "Group".bold(),
            width = width
        );
        println!("{}", "-".repeat(width + 12));
        for (ext, group) in entries {
            println!("{:<width$} | {}", ext, group.cyan(), width = width);
        }
    }

    /// Prints a dry-run notice message.
    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }
}
