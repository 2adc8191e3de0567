//! Periodic re-organization.
//!
//! A [`Scheduler`] is a small state machine:
//!
//! ```text
//! Idle -> Waiting -> Running -> Waiting -> ... -> Stopped
//! ```
//!
//! Trigger times are computed from a [`ScheduleSpec`] and an injectable
//! [`Clock`], so timing can be tested without real waits. Each cycle
//! recomputes an absolute deadline rather than sleeping a fixed amount.
//!
//! Interval schedules are anchored to the schedule, not to run completion:
//! triggers fall on `start + N`, `start + 2N`, ... If a run overruns one or
//! more boundaries, those are skipped and the next boundary not yet passed is
//! used. Missed runs are never replayed.
//!
//! Deadlines are absolute UTC instants. Interval arithmetic happens entirely
//! in UTC, so daylight-saving changes never stretch or shrink a gap. Daily
//! and weekly times are local wall-clock times resolved in the clock's time
//! zone on the day they fall.

use crate::file_organizer::{OrganizeResult, OrganizeRun};
use crate::shutdown::Shutdown;
use chrono::{
    DateTime, Datelike, Local, LocalResult, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Utc,
    Weekday,
};
use std::fmt;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};

/// Display format for trigger times.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Longest uninterrupted sleep; bounds how long a shutdown request waits.
const SLEEP_SLICE: Duration = Duration::from_millis(250);

/// Errors in schedule arguments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("unknown frequency '{0}' (expected daily, hourly or weekly)")]
    UnknownFrequency(String),
    #[error("{frequency} schedule needs {expected}")]
    MissingArgument {
        frequency: &'static str,
        expected: &'static str,
    },
    #[error("unexpected argument '{0}'")]
    UnexpectedArgument(String),
    #[error("invalid time '{0}' (expected HH:MM, 24-hour)")]
    InvalidTime(String),
    #[error("invalid weekday '{0}'")]
    InvalidWeekday(String),
    #[error("invalid interval '{0}' (expected a positive number of minutes)")]
    InvalidInterval(String),
}

/// When the organizer should run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleSpec {
    /// Every day at a fixed local time.
    Daily { at: NaiveTime },
    /// Every `minutes` minutes.
    Interval { minutes: u32 },
    /// Once a week on `day` at a fixed local time.
    Weekly { day: Weekday, at: NaiveTime },
}

impl ScheduleSpec {
    /// Parses the frequency keyword and its parameters.
    ///
    /// ```text
    /// daily  <HH:MM>
    /// hourly <MINUTES>
    /// weekly <DAY> <HH:MM>
    /// ```
    ///
    /// # Examples
    ///
    /// ```
    /// use dirsweep::scheduler::ScheduleSpec;
    ///
    /// let spec = ScheduleSpec::from_args("hourly", &["30"]).unwrap();
    /// assert_eq!(spec, ScheduleSpec::Interval { minutes: 30 });
    /// assert!(ScheduleSpec::from_args("weekly", &["someday", "10:00"]).is_err());
    /// ```
    pub fn from_args<S: AsRef<str>>(frequency: &str, params: &[S]) -> Result<Self, ScheduleError> {
        let mut params = params.iter().map(AsRef::as_ref);

        let spec = match frequency.to_ascii_lowercase().as_str() {
            "daily" => {
                let time = params.next().ok_or(ScheduleError::MissingArgument {
                    frequency: "daily",
                    expected: "a time (HH:MM)",
                })?;
                ScheduleSpec::Daily {
                    at: parse_time(time)?,
                }
            }
            "hourly" => {
                let minutes = params.next().ok_or(ScheduleError::MissingArgument {
                    frequency: "hourly",
                    expected: "an interval in minutes",
                })?;
                ScheduleSpec::Interval {
                    minutes: parse_minutes(minutes)?,
                }
            }
            "weekly" => {
                let day = params.next().ok_or(ScheduleError::MissingArgument {
                    frequency: "weekly",
                    expected: "a weekday and a time (DAY HH:MM)",
                })?;
                let time = params.next().ok_or(ScheduleError::MissingArgument {
                    frequency: "weekly",
                    expected: "a time (HH:MM) after the weekday",
                })?;
                ScheduleSpec::Weekly {
                    day: day
                        .parse()
                        .map_err(|_| ScheduleError::InvalidWeekday(day.to_string()))?,
                    at: parse_time(time)?,
                }
            }
            _ => return Err(ScheduleError::UnknownFrequency(frequency.to_string())),
        };

        if let Some(extra) = params.next() {
            return Err(ScheduleError::UnexpectedArgument(extra.to_string()));
        }
        Ok(spec)
    }

    /// Computes the next trigger instant after `now`.
    ///
    /// `previous` is the last trigger, if any; only interval schedules use
    /// it as their anchor. Daily and weekly times are read in `now`'s zone.
    pub fn next_trigger<Tz: TimeZone>(
        &self,
        now: DateTime<Tz>,
        previous: Option<DateTime<Utc>>,
    ) -> DateTime<Utc> {
        match *self {
            ScheduleSpec::Daily { at } => {
                let today = now.date_naive().and_time(at);
                next_wall_clock(&now, today, TimeDelta::days(1))
            }
            ScheduleSpec::Weekly { day, at } => {
                let ahead = (7 + day.num_days_from_monday() - now.weekday().num_days_from_monday()) % 7;
                let candidate = (now.date_naive() + TimeDelta::days(i64::from(ahead))).and_time(at);
                next_wall_clock(&now, candidate, TimeDelta::weeks(1))
            }
            ScheduleSpec::Interval { minutes } => {
                let now = now.with_timezone(&Utc);
                let step = i64::from(minutes) * 60;
                match previous {
                    None => now + TimeDelta::seconds(step),
                    Some(anchor) => {
                        let elapsed = (now - anchor).num_seconds();
                        let periods = (elapsed + step - 1).div_euclid(step).max(1);
                        anchor + TimeDelta::seconds(step * periods)
                    }
                }
            }
        }
    }
}

/// Periods tried when a wall-clock time does not resolve to a future instant.
const MAX_WALL_CLOCK_PERIODS: usize = 8;

/// First occurrence of local time `candidate`, stepping by `period`, that
/// lies strictly after `now`.
fn next_wall_clock<Tz: TimeZone>(
    now: &DateTime<Tz>,
    mut candidate: NaiveDateTime,
    period: TimeDelta,
) -> DateTime<Utc> {
    let tz = now.timezone();
    for _ in 0..MAX_WALL_CLOCK_PERIODS {
        let resolved = match tz.from_local_datetime(&candidate) {
            // skipped by a forward clock change
            LocalResult::None => tz.from_local_datetime(&(candidate + TimeDelta::hours(1))),
            other => other,
        };
        if let Some(instant) = earliest_after(resolved, now) {
            return instant.with_timezone(&Utc);
        }
        candidate += period;
    }
    now.with_timezone(&Utc) + period
}

/// The earliest instant of `resolved`, if it is after `after`.
///
/// A repeated local time only counts at its first occurrence, so a daily
/// run does not fire twice when clocks fall back.
fn earliest_after<Tz: TimeZone>(
    resolved: LocalResult<DateTime<Tz>>,
    after: &DateTime<Tz>,
) -> Option<DateTime<Tz>> {
    resolved.earliest().filter(|instant| instant > after)
}

impl fmt::Display for ScheduleSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleSpec::Daily { at } => write!(f, "daily at {}", at.format("%H:%M")),
            ScheduleSpec::Interval { minutes } => write!(f, "every {minutes} minute(s)"),
            ScheduleSpec::Weekly { day, at } => {
                write!(f, "every {} at {}", weekday_name(*day), at.format("%H:%M"))
            }
        }
    }
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

fn parse_time(s: &str) -> Result<NaiveTime, ScheduleError> {
    NaiveTime::parse_from_str(s, "%H:%M").map_err(|_| ScheduleError::InvalidTime(s.to_string()))
}

fn parse_minutes(s: &str) -> Result<u32, ScheduleError> {
    match s.parse::<u32>() {
        Ok(minutes) if minutes > 0 => Ok(minutes),
        _ => Err(ScheduleError::InvalidInterval(s.to_string())),
    }
}

/// Outcome of a wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    /// The deadline was reached.
    Elapsed,
    /// Shutdown was requested before the deadline.
    Cancelled,
}

/// Source of wall-clock time and of waiting.
pub trait Clock {
    /// Zone in which daily and weekly times are read.
    type Tz: TimeZone;

    /// Current time in the clock's zone.
    fn now(&self) -> DateTime<Self::Tz>;

    /// Blocks until `deadline` or until `shutdown` is requested.
    fn sleep_until(&self, deadline: DateTime<Utc>, shutdown: &Shutdown) -> Wake;
}

impl<T: Clock + ?Sized> Clock for &T {
    type Tz = T::Tz;

    fn now(&self) -> DateTime<Self::Tz> {
        (**self).now()
    }

    fn sleep_until(&self, deadline: DateTime<Utc>, shutdown: &Shutdown) -> Wake {
        (**self).sleep_until(deadline, shutdown)
    }
}

/// The system clock in the local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    type Tz = Local;

    fn now(&self) -> DateTime<Local> {
        Local::now()
    }

    fn sleep_until(&self, deadline: DateTime<Utc>, shutdown: &Shutdown) -> Wake {
        loop {
            if shutdown.is_requested() {
                return Wake::Cancelled;
            }
            let remaining = match (deadline - Utc::now()).to_std() {
                Ok(remaining) if !remaining.is_zero() => remaining,
                // negative or zero: deadline reached
                _ => return Wake::Elapsed,
            };
            thread::sleep(remaining.min(SLEEP_SLICE));
        }
    }
}

/// Where the scheduler is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Waiting { until: DateTime<Utc> },
    Running { trigger: DateTime<Utc> },
    Stopped,
}

/// Re-runs the organizer on a schedule until shut down.
#[derive(Debug)]
pub struct Scheduler<C: Clock> {
    spec: ScheduleSpec,
    target: PathBuf,
    clock: C,
    state: SchedulerState,
    last_trigger: Option<DateTime<Utc>>,
    cycles: u64,
}

impl<C: Clock> Scheduler<C> {
    pub fn new(spec: ScheduleSpec, target: PathBuf, clock: C) -> Self {
        Self {
            spec,
            target,
            clock,
            state: SchedulerState::Idle,
            last_trigger: None,
            cycles: 0,
        }
    }

    pub fn spec(&self) -> ScheduleSpec {
        self.spec
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Runs started so far.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Loops until `shutdown` is requested, calling `job` at each trigger.
    ///
    /// A failed run is logged and the scheduler moves on to the next
    /// trigger. A run in progress always finishes before the scheduler
    /// stops. Returns the number of runs started.
    pub fn run<J>(&mut self, shutdown: &Shutdown, mut job: J) -> u64
    where
        J: FnMut(&Path) -> OrganizeResult<OrganizeRun>,
    {
        info!(dir = %self.target.display(), schedule = %self.spec, "scheduler started");

        while !shutdown.is_requested() {
            let now = self.clock.now();
            let tz = now.timezone();
            let until = self.spec.next_trigger(now, self.last_trigger);
            self.state = SchedulerState::Waiting { until };
            info!(
                next_run = %until.with_timezone(&tz).naive_local().format(TIMESTAMP_FORMAT),
                "waiting for next run"
            );

            if self.clock.sleep_until(until, shutdown) == Wake::Cancelled {
                break;
            }

            self.state = SchedulerState::Running { trigger: until };
            self.last_trigger = Some(until);
            self.cycles += 1;
            info!(cycle = self.cycles, dir = %self.target.display(), "running organizer");

            match job(&self.target) {
                Ok(run) => info!(
                    cycle = self.cycles,
                    moved = run.moved(),
                    skipped = run.skipped(),
                    failures = run.failures().len(),
                    "scheduled run completed"
                ),
                Err(e) => error!(cycle = self.cycles, error = %e, "scheduled run failed"),
            }
        }

        self.state = SchedulerState::Stopped;
        info!(cycles = self.cycles, "scheduler stopped");
        self.cycles
    }
}
