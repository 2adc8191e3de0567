//! File organization: one pass over a directory.
//!
//! The organizer lists the immediate entries of a directory, classifies each
//! regular file by extension and moves it into a category subfolder created
//! next to it. Failures on individual files are recorded in the returned
//! [`OrganizeRun`] and never stop the pass.

use crate::config::ExcludeFilter;
use crate::conflict;
use crate::file_category::{Category, CategoryTable};
use serde::Serialize;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors that prevent a pass from starting.
#[derive(Debug, Error)]
pub enum OrganizeError {
    /// The target directory does not exist.
    #[error("directory not found: {}", .path.display())]
    NotFound { path: PathBuf },
    /// The target exists but is not a directory.
    #[error("not a directory: {}", .path.display())]
    NotADirectory { path: PathBuf },
    /// The target could not be inspected or listed.
    #[error("cannot read directory {}: {source}", .path.display())]
    Unreadable { path: PathBuf, source: io::Error },
}

/// Result type for top-level organizer operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// What went wrong for a single file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The category folder could not be created.
    CreateFolder,
    /// The file could not be moved into its category folder.
    Move,
    /// The directory listing yielded an unreadable entry.
    ReadEntry,
}

/// A per-file failure recorded during a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    /// The entry that could not be organized.
    pub path: PathBuf,
    pub kind: FailureKind,
    /// Human-readable cause.
    pub reason: String,
}

/// Why an entry was left in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Hidden,
    NoExtension,
    Excluded,
}

impl SkipReason {
    pub fn describe(&self) -> &'static str {
        match self {
            SkipReason::Hidden => "hidden",
            SkipReason::NoExtension => "no extension",
            SkipReason::Excluded => "excluded",
        }
    }
}

/// Progress notifications emitted while a pass runs.
#[derive(Debug)]
pub enum OrganizeEvent<'a> {
    FolderCreated {
        category: Category,
        path: &'a Path,
    },
    Moved {
        source: &'a Path,
        destination: &'a Path,
        category: Category,
    },
    Skipped {
        path: &'a Path,
        reason: SkipReason,
    },
    Failed(&'a FileFailure),
}

/// Outcome of one pass over a directory.
#[derive(Debug, Clone, Serialize)]
pub struct OrganizeRun {
    directory: PathBuf,
    moved: usize,
    skipped: usize,
    failures: Vec<FileFailure>,
    per_category: BTreeMap<Category, usize>,
    created_folders: Vec<Category>,
}

impl OrganizeRun {
    fn new(directory: PathBuf) -> Self {
        Self {
            directory,
            moved: 0,
            skipped: 0,
            failures: Vec::new(),
            per_category: BTreeMap::new(),
            created_folders: Vec::new(),
        }
    }

    /// The directory this pass organized.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Number of files moved into a category folder.
    pub fn moved(&self) -> usize {
        self.moved
    }

    /// Number of entries left in place (hidden, no extension, excluded).
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Per-file failures, in the order they happened.
    pub fn failures(&self) -> &[FileFailure] {
        &self.failures
    }

    /// Files placed per category. Categories with no placements are absent.
    pub fn per_category(&self) -> &BTreeMap<Category, usize> {
        &self.per_category
    }

    pub fn category_count(&self, category: Category) -> usize {
        self.per_category.get(&category).copied().unwrap_or(0)
    }

    /// Category folders this pass had to create.
    pub fn created_folders(&self) -> &[Category] {
        &self.created_folders
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// A directory entry being considered for a move.
#[derive(Debug)]
struct FileEntry {
    name: OsString,
    extension: Option<String>,
    path: PathBuf,
}

impl FileEntry {
    fn new(path: PathBuf, name: OsString) -> Self {
        // "archive." has an empty extension, which counts as none
        let extension = Path::new(&name)
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .filter(|ext| !ext.is_empty());
        Self {
            name,
            extension,
            path,
        }
    }

    fn is_hidden(&self) -> bool {
        self.name.to_string_lossy().starts_with('.')
    }
}

/// Moves the files of a directory into category subfolders.
#[derive(Debug, Clone, Default)]
pub struct Organizer {
    table: CategoryTable,
    exclude: ExcludeFilter,
}

impl Organizer {
    /// Creates an organizer classifying with `table`.
    pub fn new(table: CategoryTable) -> Self {
        Self {
            table,
            exclude: ExcludeFilter::default(),
        }
    }

    /// Leaves files matching `exclude` in place.
    pub fn with_exclude(mut self, exclude: ExcludeFilter) -> Self {
        self.exclude = exclude;
        self
    }

    /// Runs one pass over `directory`.
    ///
    /// # Errors
    ///
    /// Returns an [`OrganizeError`] if the directory is missing, is not a
    /// directory, or cannot be listed. Nothing is moved in that case.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use dirsweep::file_organizer::Organizer;
    /// use std::path::Path;
    ///
    /// let run = Organizer::default().organize(Path::new("/home/user/Downloads"))?;
    /// println!("moved {} files", run.moved());
    /// # Ok::<(), dirsweep::file_organizer::OrganizeError>(())
    /// ```
    pub fn organize(&self, directory: &Path) -> OrganizeResult<OrganizeRun> {
        self.organize_with(directory, |_| {})
    }

    /// Runs one pass over `directory`, reporting progress to `on_event`.
    pub fn organize_with<F>(&self, directory: &Path, mut on_event: F) -> OrganizeResult<OrganizeRun>
    where
        F: FnMut(&OrganizeEvent<'_>),
    {
        let entries = list_directory(directory)?;
        debug!(dir = %directory.display(), entries = entries.len(), "organizing");

        let mut run = OrganizeRun::new(directory.to_path_buf());

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let failure = FileFailure {
                        path: directory.to_path_buf(),
                        kind: FailureKind::ReadEntry,
                        reason: e.to_string(),
                    };
                    self.record_failure(&mut run, failure, &mut on_event);
                    continue;
                }
            };

            let file = FileEntry::new(entry.path(), entry.file_name());

            // Follows symlinks, so a link to a directory is left alone too.
            if file.path.is_dir() {
                continue;
            }

            let skip = if file.is_hidden() {
                Some(SkipReason::Hidden)
            } else if self.exclude.matches(&file.name.to_string_lossy()) {
                Some(SkipReason::Excluded)
            } else if file.extension.is_none() {
                Some(SkipReason::NoExtension)
            } else {
                None
            };
            if let Some(reason) = skip {
                debug!(path = %file.path.display(), reason = reason.describe(), "skipped");
                run.skipped += 1;
                on_event(&OrganizeEvent::Skipped {
                    path: &file.path,
                    reason,
                });
                continue;
            }

            let category = self.table.classify(file.extension.as_deref());
            self.place(&mut run, directory, &file, category, &mut on_event);
        }

        debug!(
            dir = %directory.display(),
            moved = run.moved,
            skipped = run.skipped,
            failures = run.failures.len(),
            "organize pass finished"
        );
        Ok(run)
    }

    fn place<F>(
        &self,
        run: &mut OrganizeRun,
        directory: &Path,
        file: &FileEntry,
        category: Category,
        on_event: &mut F,
    ) where
        F: FnMut(&OrganizeEvent<'_>),
    {
        let category_path = directory.join(category.name());
        match ensure_folder(&category_path) {
            Ok(true) => {
                debug!(folder = %category_path.display(), "created category folder");
                run.created_folders.push(category);
                on_event(&OrganizeEvent::FolderCreated {
                    category,
                    path: &category_path,
                });
            }
            Ok(false) => {}
            Err(e) => {
                let failure = FileFailure {
                    path: file.path.clone(),
                    kind: FailureKind::CreateFolder,
                    reason: format!("cannot create folder {}: {e}", category_path.display()),
                };
                self.record_failure(run, failure, on_event);
                return;
            }
        }

        match conflict::move_no_clobber(&file.path, &category_path, &file.name) {
            Ok(destination) => {
                debug!(
                    source = %file.path.display(),
                    dest = %destination.display(),
                    %category,
                    "moved"
                );
                run.moved += 1;
                *run.per_category.entry(category).or_insert(0) += 1;
                on_event(&OrganizeEvent::Moved {
                    source: &file.path,
                    destination: &destination,
                    category,
                });
            }
            Err(e) => {
                let failure = FileFailure {
                    path: file.path.clone(),
                    kind: FailureKind::Move,
                    reason: e.to_string(),
                };
                self.record_failure(run, failure, on_event);
            }
        }
    }

    fn record_failure<F>(&self, run: &mut OrganizeRun, failure: FileFailure, on_event: &mut F)
    where
        F: FnMut(&OrganizeEvent<'_>),
    {
        warn!(path = %failure.path.display(), kind = ?failure.kind, reason = %failure.reason, "file not organized");
        run.failures.push(failure);
        if let Some(failure) = run.failures.last() {
            on_event(&OrganizeEvent::Failed(failure));
        }
    }
}

/// Validates `directory` and snapshots its entries.
///
/// The listing is collected up front so moves and new folders do not
/// disturb the iteration.
fn list_directory(directory: &Path) -> OrganizeResult<Vec<io::Result<fs::DirEntry>>> {
    let meta = fs::metadata(directory).map_err(|e| match e.kind() {
        ErrorKind::NotFound => OrganizeError::NotFound {
            path: directory.to_path_buf(),
        },
        _ => OrganizeError::Unreadable {
            path: directory.to_path_buf(),
            source: e,
        },
    })?;

    if !meta.is_dir() {
        return Err(OrganizeError::NotADirectory {
            path: directory.to_path_buf(),
        });
    }

    let entries = fs::read_dir(directory).map_err(|e| OrganizeError::Unreadable {
        path: directory.to_path_buf(),
        source: e,
    })?;

    Ok(entries.collect())
}

/// Makes sure `path` is a directory. Returns `true` if it had to be created.
fn ensure_folder(path: &Path) -> io::Result<bool> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(false),
        Ok(_) => Err(io::Error::new(
            ErrorKind::NotADirectory,
            "a file with that name already exists",
        )),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            fs::create_dir_all(path)?;
            Ok(true)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(base: &Path, name: &str) {
        fs::write(base.join(name), name).expect("Failed to write test file");
    }

    #[test]
    fn test_scenario_mixed_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();
        for name in ["photo.jpg", "report.pdf", "backup.zip", ".hidden", "noext"] {
            write(base, name);
        }

        let run = Organizer::default().organize(base).expect("organize failed");

        assert_eq!(run.moved(), 3);
        assert_eq!(run.skipped(), 2);
        assert!(run.failures().is_empty());
        assert_eq!(run.category_count(Category::Images), 1);
        assert_eq!(run.category_count(Category::Documents), 1);
        assert_eq!(run.category_count(Category::Archives), 1);
        assert_eq!(run.per_category().len(), 3);

        assert!(base.join("Images/photo.jpg").is_file());
        assert!(base.join("Documents/report.pdf").is_file());
        assert!(base.join("Archives/backup.zip").is_file());
        assert!(base.join(".hidden").is_file());
        assert!(base.join("noext").is_file());
    }

    #[test]
    fn test_hidden_file_is_skipped_not_failed() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        write(temp_dir.path(), ".gitignore");

        let run = Organizer::default()
            .organize(temp_dir.path())
            .expect("organize failed");

        assert_eq!(run.moved(), 0);
        assert_eq!(run.skipped(), 1);
        assert!(!run.has_failures());
        assert!(temp_dir.path().join(".gitignore").exists());
    }

    #[test]
    fn test_subdirectories_are_untouched_and_uncounted() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();
        fs::create_dir(base.join("projects.old")).expect("Failed to create dir");
        fs::create_dir(base.join(".git")).expect("Failed to create dir");
        write(&base.join("projects.old"), "inner.txt");

        let run = Organizer::default().organize(base).expect("organize failed");

        assert_eq!(run.moved(), 0);
        assert_eq!(run.skipped(), 0);
        assert!(base.join("projects.old/inner.txt").exists());
    }

    #[test]
    fn test_unknown_extension_goes_to_other() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        write(temp_dir.path(), "mystery.xyz");

        let run = Organizer::default()
            .organize(temp_dir.path())
            .expect("organize failed");

        assert_eq!(run.category_count(Category::Other), 1);
        assert!(temp_dir.path().join("Other/mystery.xyz").exists());
    }

    #[test]
    fn test_trailing_dot_counts_as_no_extension() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        write(temp_dir.path(), "draft.");

        let run = Organizer::default()
            .organize(temp_dir.path())
            .expect("organize failed");

        assert_eq!(run.skipped(), 1);
        assert_eq!(run.moved(), 0);
    }

    #[test]
    fn test_conflict_is_renamed() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();
        fs::create_dir(base.join("Documents")).expect("Failed to create dir");
        fs::write(base.join("Documents/report.pdf"), "old").expect("Failed to write");
        fs::write(base.join("report.pdf"), "new").expect("Failed to write");

        let run = Organizer::default().organize(base).expect("organize failed");

        assert_eq!(run.moved(), 1);
        assert!(run.created_folders().is_empty());
        assert_eq!(
            fs::read_to_string(base.join("Documents/report_1.pdf")).unwrap(),
            "new"
        );
        assert_eq!(
            fs::read_to_string(base.join("Documents/report.pdf")).unwrap(),
            "old"
        );
    }

    #[test]
    fn test_blocked_category_folder_is_a_file_failure() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();
        // A regular file occupying the folder name makes creation fail.
        write(base, "Images");
        for name in ["photo.jpg", "report.pdf", "backup.zip"] {
            write(base, name);
        }

        let run = Organizer::default().organize(base).expect("organize failed");

        assert_eq!(run.moved(), 2);
        assert_eq!(run.failures().len(), 1);
        assert_eq!(run.failures()[0].kind, FailureKind::CreateFolder);
        assert_eq!(run.failures()[0].path, base.join("photo.jpg"));
        assert_eq!(run.category_count(Category::Images), 0);
        assert!(base.join("photo.jpg").exists());
    }

    #[test]
    fn test_second_pass_moves_nothing() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();
        for name in ["a.png", "b.mp3", "c.rs", "d.json"] {
            write(base, name);
        }

        let organizer = Organizer::default();
        let first = organizer.organize(base).expect("first pass failed");
        let second = organizer.organize(base).expect("second pass failed");

        assert_eq!(first.moved(), 4);
        assert_eq!(second.moved(), 0);
        assert!(second.per_category().is_empty());
        assert!(second.created_folders().is_empty());
    }

    #[test]
    fn test_excluded_files_stay() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();
        write(base, "keep.tmp.txt");
        write(base, "notes.txt");

        let exclude = ExcludeFilter::from_patterns(["*.tmp.*"]).expect("valid pattern");
        let run = Organizer::default()
            .with_exclude(exclude)
            .organize(base)
            .expect("organize failed");

        assert_eq!(run.moved(), 1);
        assert_eq!(run.skipped(), 1);
        assert!(base.join("keep.tmp.txt").exists());
    }

    #[test]
    fn test_events_are_reported() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();
        write(base, "song.mp3");
        write(base, ".env");

        let mut created = 0;
        let mut moved = 0;
        let mut skipped = 0;
        Organizer::default()
            .organize_with(base, |event| match event {
                OrganizeEvent::FolderCreated { .. } => created += 1,
                OrganizeEvent::Moved { category, .. } => {
                    assert_eq!(*category, Category::Audio);
                    moved += 1
                }
                OrganizeEvent::Skipped { reason, .. } => {
                    assert_eq!(*reason, SkipReason::Hidden);
                    skipped += 1
                }
                OrganizeEvent::Failed(_) => panic!("unexpected failure"),
            })
            .expect("organize failed");

        assert_eq!((created, moved, skipped), (1, 1, 1));
    }

    #[test]
    fn test_failed_move_does_not_stop_the_pass() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();
        for name in ["a.jpg", "b.jpg", "c.pdf"] {
            write(base, name);
        }

        // Once the first image is placed, the other one vanishes before
        // its turn comes.
        let mut removed = false;
        let run = Organizer::default()
            .organize_with(base, |event| {
                if let OrganizeEvent::Moved {
                    source,
                    category: Category::Images,
                    ..
                } = event
                    && !removed
                {
                    for name in ["a.jpg", "b.jpg"] {
                        let other = base.join(name);
                        if other != *source {
                            fs::remove_file(other).expect("Failed to remove test file");
                        }
                    }
                    removed = true;
                }
            })
            .expect("pass should complete despite the failed move");

        assert_eq!(run.moved(), 2);
        assert_eq!(run.failures().len(), 1);
        assert_eq!(run.failures()[0].kind, FailureKind::Move);
        assert_eq!(run.category_count(Category::Images), 1);
        assert_eq!(run.category_count(Category::Documents), 1);
        assert!(base.join("Documents/c.pdf").is_file());
    }

    #[test]
    fn test_missing_directory_is_top_level_error() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let missing = temp_dir.path().join("nope");

        let result = Organizer::default().organize(&missing);
        assert!(matches!(result, Err(OrganizeError::NotFound { .. })));
    }

    #[test]
    fn test_file_target_is_top_level_error() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        write(temp_dir.path(), "file.txt");

        let result = Organizer::default().organize(&temp_dir.path().join("file.txt"));
        assert!(matches!(result, Err(OrganizeError::NotADirectory { .. })));
        assert!(temp_dir.path().join("file.txt").exists());
    }
}
