//! Destination name conflict handling.
//!
//! Policy:
//! - A free name is used unchanged.
//! - A taken name gets `_1`, `_2`, ... appended to its stem, before the
//!   extension (`report.pdf` -> `report_1.pdf`).
//!
//! [`resolve`] only inspects the current directory state. [`move_no_clobber`]
//! closes the check-then-use window by placing the file with a hard link,
//! which fails instead of replacing an existing entry. When the destination
//! is on another filesystem the file is copied into a newly created entry
//! and the source removed afterwards.

use std::ffi::{OsStr, OsString};
use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Collisions tolerated in [`move_no_clobber`] before giving up.
const MAX_ATTEMPTS: usize = 16;

/// Returns a file name that is not taken in `dest_dir`.
///
/// # Examples
///
/// ```
/// use dirsweep::conflict::resolve;
/// use std::ffi::OsStr;
///
/// let dir = tempfile::tempdir().unwrap();
/// std::fs::write(dir.path().join("report.pdf"), b"").unwrap();
/// assert_eq!(resolve(dir.path(), OsStr::new("report.pdf")), "report_1.pdf");
/// assert_eq!(resolve(dir.path(), OsStr::new("notes.txt")), "notes.txt");
/// ```
pub fn resolve(dest_dir: &Path, desired: &OsStr) -> OsString {
    if !is_taken(&dest_dir.join(desired)) {
        return desired.to_os_string();
    }

    let base = Path::new(desired);
    let stem = base
        .file_stem()
        .map(OsStr::to_os_string)
        .unwrap_or_else(|| desired.to_os_string());
    let ext = base.extension();

    let mut n: u64 = 1;
    loop {
        let candidate = name_with_suffix(&stem, ext, n);
        if !is_taken(&dest_dir.join(&candidate)) {
            return candidate;
        }
        if n == 3 {
            trace!(name = ?desired, dir = %dest_dir.display(), "repeated name collisions");
        }
        n += 1;
    }
}

/// Moves `source` into `dest_dir` under a non-colliding variant of
/// `desired`, never replacing an existing entry.
///
/// Returns the final destination path.
///
/// # Errors
///
/// Returns the underlying I/O error if the file cannot be placed, or
/// `AlreadyExists` if every resolved name was taken by the time it was used.
pub fn move_no_clobber(source: &Path, dest_dir: &Path, desired: &OsStr) -> io::Result<PathBuf> {
    for _ in 0..MAX_ATTEMPTS {
        let destination = dest_dir.join(resolve(dest_dir, desired));

        match fs::hard_link(source, &destination) {
            Ok(()) => {
                if let Err(e) = fs::remove_file(source) {
                    // Leave exactly one copy behind.
                    let _ = fs::remove_file(&destination);
                    return Err(e);
                }
                return Ok(destination);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!(dest = %destination.display(), "destination appeared during move; resolving again");
            }
            Err(e) if e.kind() == ErrorKind::CrossesDevices => {
                trace!(dest = %destination.display(), "destination on another device; copying");
                match copy_new(source, &destination) {
                    Ok(()) => {
                        if let Err(e) = fs::remove_file(source) {
                            let _ = fs::remove_file(&destination);
                            return Err(e);
                        }
                        return Ok(destination);
                    }
                    Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                        debug!(dest = %destination.display(), "destination appeared during copy; resolving again");
                    }
                    Err(e) => return Err(e),
                }
            }
            Err(e) if links_unsupported(&e) => {
                trace!(error = %e, "hard link refused; falling back to rename");
                if is_taken(&destination) {
                    continue;
                }
                fs::rename(source, &destination)?;
                return Ok(destination);
            }
            Err(e) => return Err(e),
        }
    }

    Err(io::Error::new(
        ErrorKind::AlreadyExists,
        format!(
            "no free name for {} after {MAX_ATTEMPTS} attempts",
            desired.to_string_lossy()
        ),
    ))
}

/// Copies `source` into a new file at `destination`, failing with
/// `AlreadyExists` rather than replacing anything. A partial copy is removed.
fn copy_new(source: &Path, destination: &Path) -> io::Result<()> {
    let mut reader = File::open(source)?;
    let permissions = reader.metadata()?.permissions();
    let mut writer = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(destination)?;

    let copied = io::copy(&mut reader, &mut writer)
        .and_then(|_| writer.sync_all())
        .and_then(|()| fs::set_permissions(destination, permissions));
    if copied.is_err() {
        let _ = fs::remove_file(destination);
    }
    copied
}

fn is_taken(path: &Path) -> bool {
    // symlink_metadata so dangling links still count as taken
    fs::symlink_metadata(path).is_ok()
}

fn links_unsupported(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        ErrorKind::Unsupported | ErrorKind::PermissionDenied
    )
}

fn name_with_suffix(stem: &OsStr, ext: Option<&OsStr>, n: u64) -> OsString {
    let mut name = stem.to_os_string();
    name.push(format!("_{n}"));
    if let Some(ext) = ext {
        name.push(".");
        name.push(ext);
    }
    name
}
