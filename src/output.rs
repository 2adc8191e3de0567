//! Output formatting and styling module.
//!
//! Provides a centralized interface for all user-facing CLI output: status
//! lines, per-file progress and the end-of-pass summary block. Diagnostic
//! logging goes through `tracing` instead (see `logging`).

use crate::file_organizer::{OrganizeEvent, OrganizeRun};
use colored::*;

/// Manages all CLI output with consistent styling and formatting.
///
/// This struct provides methods for:
/// - Success messages (green with ✓)
/// - Error messages (red with ✗)
/// - Warning messages (yellow with ⚠)
/// - Info messages (cyan)
/// - Progress lines for organizer events
/// - Summary tables with statistics
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use dirsweep::output::OutputFormatter;
    /// OutputFormatter::success("Scheduled to run every 60 minute(s)");
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

    /// Prints one progress line for an organizer event.
    ///
    /// Skips are not printed; they are reported as a count in the summary.
    pub fn event(event: &OrganizeEvent<'_>) {
        match event {
            OrganizeEvent::FolderCreated { category, .. } => {
                Self::success(&format!("Created folder: {}", category));
            }
            OrganizeEvent::Moved {
                destination,
                category,
                ..
            } => {
                let name = destination
                    .file_name()
                    .map(|n| n.to_string_lossy())
                    .unwrap_or_default();
                println!("{} Moved: {} → {}/", "→".cyan(), name, category);
            }
            OrganizeEvent::Skipped { .. } => {}
            OrganizeEvent::Failed(failure) => {
                Self::error(&format!(
                    "Error organizing '{}': {}",
                    failure.path.display(),
                    failure.reason
                ));
            }
        }
    }

    /// Prints the end-of-pass summary block.
    ///
    /// Lists files per category, then totals and every per-file failure.
    pub fn summary(run: &OrganizeRun) {
        Self::header("SUMMARY");

        let categories = summary_rows(run);

        let width = categories
            .iter()
            .map(|(name, _)| name.len())
            .max()
            .unwrap_or(0)
            .max(8); // "Category"

        println!(
            "{:<width$} | {}",
            "Category".bold(),
            "Files".bold(),
            width = width
        );
        println!("{}", "-".repeat(width + 10));
        for (category, count) in &categories {
            println!(
                "{:<width$} | {} {}",
                category,
                count.to_string().green(),
                plural(*count),
                width = width
            );
        }
        println!("{}", "-".repeat(width + 10));

        println!("Files moved:   {}", run.moved().to_string().green().bold());
        println!("Files skipped: {}", run.skipped());
        let failures = run.failures().len();
        if failures == 0 {
            println!("Errors:        {}", failures);
        } else {
            println!("Errors:        {}", failures.to_string().red().bold());
            for failure in run.failures() {
                println!("  - {}: {}", failure.path.display(), failure.reason);
            }
        }
    }

    /// Prints the run as a single JSON document.
    pub fn json(run: &OrganizeRun) -> serde_json::Result<()> {
        println!("{}", serde_json::to_string_pretty(run)?);
        Ok(())
    }
}

/// Category rows of the summary, in category declaration order.
fn summary_rows(run: &OrganizeRun) -> Vec<(&'static str, usize)> {
    run.per_category()
        .iter()
        .map(|(category, count)| (category.name(), *count))
        .collect()
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "file" } else { "files" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_organizer::Organizer;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_summary_rows_follow_category_order() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        for name in ["z.zip", "a.pdf", "m.mp3", "b.pdf", "x.unknown"] {
            fs::write(temp_dir.path().join(name), name).expect("Failed to write test file");
        }

        let run = Organizer::default()
            .organize(temp_dir.path())
            .expect("organize failed");

        assert_eq!(
            summary_rows(&run),
            vec![("Documents", 2), ("Audio", 1), ("Archives", 1), ("Other", 1)]
        );
    }

    #[test]
    fn test_plural() {
        assert_eq!(plural(1), "file");
        assert_eq!(plural(0), "files");
        assert_eq!(plural(2), "files");
    }
}
