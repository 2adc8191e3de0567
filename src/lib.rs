//! dirsweep - sort a directory's files into category folders
//!
//! This library classifies files by extension, moves them into per-category
//! subfolders without overwriting anything, and can repeat that on a daily,
//! weekly or fixed-interval schedule.

pub mod cli;
pub mod config;
pub mod conflict;
pub mod file_category;
pub mod file_organizer;
pub mod logging;
pub mod output;
pub mod scheduler;
pub mod shutdown;

pub use config::{ConfigError, ExcludeFilter, LogLevel};
pub use file_category::{Category, CategoryTable, TableError};
pub use file_organizer::{FileFailure, OrganizeError, OrganizeRun, Organizer};
pub use scheduler::{Clock, ScheduleError, ScheduleSpec, Scheduler, SchedulerState, SystemClock};
pub use shutdown::Shutdown;

pub use cli::{Cli, OrganizeCommand, run_cli};
