//! Leak checker: snapshot, diff, retry, report
//!
//! # Usage
//!
//! ```no_run
//! use leakcheck::Recorder;
//!
//! let reporter = Recorder::new();
//! {
//!     let _check = leakcheck::start(&reporter);
//!     // test body; threads spawned here must be gone when `_check` drops
//! }
//! reporter.assert_clean();
//! ```
//!
//! # Algorithm
//!
//! 1. `start*` enumerates live tasks and keeps their ids as the baseline
//! 2. Finishing enumerates again; tasks whose id is not in the baseline leaked
//! 3. No leaks: return at once, without arming any timer
//! 4. Otherwise re-check on every tick until the leaks are gone or the
//!    deadline fires
//! 5. On deadline: report the cause, then each leaked task's record

use crossbeam::channel;
use std::time::Duration;

use crate::classify::interesting_tasks;
use crate::config::Config;
use crate::deadline::Deadline;
use crate::error::Error;
use crate::reporter::ErrorReporter;
use crate::task::{leaked_tasks, Baseline, TaskDescriptor};

/// How long a finishing check may keep retrying
#[derive(Debug)]
enum Window {
    /// Timer armed when finishing starts
    Timeout(Duration),
    /// Caller-owned signal
    Signal(Deadline),
}

/// A running leak check
///
/// Created by [`start`], [`start_with_timeout`], [`start_with_deadline`] or
/// the matching [`Config`] methods. Call [`LeakCheck::finish`] at the point
/// where leak detection should happen; dropping an unfinished check runs it
/// too, so a guard bound at the top of a test covers every exit path.
///
/// Finishing blocks the calling thread for up to the retry window.
#[must_use = "a leak check does nothing until it is finished or dropped"]
pub struct LeakCheck<'r, R: ErrorReporter + ?Sized> {
    config: Config,
    reporter: &'r R,
    baseline: Baseline,
    window: Option<Window>,
}

impl Config {
    /// Snapshot live tasks; the check retries for `self.timeout`
    pub fn start<'r, R>(&self, reporter: &'r R) -> LeakCheck<'r, R>
    where
        R: ErrorReporter + ?Sized,
    {
        self.begin(reporter, Window::Timeout(self.timeout))
    }

    /// Like [`Config::start`] with a caller-supplied retry window
    pub fn start_with_timeout<'r, R>(&self, reporter: &'r R, timeout: Duration) -> LeakCheck<'r, R>
    where
        R: ErrorReporter + ?Sized,
    {
        self.begin(reporter, Window::Timeout(timeout))
    }

    /// Like [`Config::start`], but retries until `deadline` fires
    pub fn start_with_deadline<'r, R>(&self, deadline: Deadline, reporter: &'r R) -> LeakCheck<'r, R>
    where
        R: ErrorReporter + ?Sized,
    {
        self.begin(reporter, Window::Signal(deadline))
    }

    fn begin<'r, R>(&self, reporter: &'r R, window: Window) -> LeakCheck<'r, R>
    where
        R: ErrorReporter + ?Sized,
    {
        let baseline: Baseline = snapshot(self, reporter)
            .into_iter()
            .map(|task| task.id)
            .collect();
        tracing::debug!(tasks = baseline.len(), ?window, "leak check baseline captured");
        LeakCheck {
            config: self.clone(),
            reporter,
            baseline,
            window: Some(window),
        }
    }
}

/// Start a check with the default configuration and a 5 second window
pub fn start<R>(reporter: &R) -> LeakCheck<'_, R>
where
    R: ErrorReporter + ?Sized,
{
    Config::default().start(reporter)
}

/// Start a check with the default configuration and a custom window
pub fn start_with_timeout<R>(reporter: &R, timeout: Duration) -> LeakCheck<'_, R>
where
    R: ErrorReporter + ?Sized,
{
    Config::default().start_with_timeout(reporter, timeout)
}

/// Start a check with the default configuration that retries until
/// `deadline` fires
pub fn start_with_deadline<R>(deadline: Deadline, reporter: &R) -> LeakCheck<'_, R>
where
    R: ErrorReporter + ?Sized,
{
    Config::default().start_with_deadline(deadline, reporter)
}

impl<'r, R: ErrorReporter + ?Sized> LeakCheck<'r, R> {
    /// Ids of the tasks that were alive when the check started
    pub fn baseline(&self) -> &Baseline {
        &self.baseline
    }

    /// Run the check now
    pub fn finish(mut self) {
        self.run();
    }

    fn leaked(&self) -> Vec<TaskDescriptor> {
        leaked_tasks(&self.baseline, snapshot(&self.config, self.reporter))
    }

    fn run(&mut self) {
        let Some(window) = self.window.take() else {
            return;
        };

        let mut leaked = self.leaked();
        if leaked.is_empty() {
            tracing::debug!("no leaked tasks");
            return;
        }

        let deadline = match window {
            Window::Timeout(timeout) => Deadline::after(timeout),
            Window::Signal(deadline) => deadline,
        };
        let ticker = channel::tick(self.config.tick_interval);
        tracing::debug!(
            leaked = leaked.len(),
            tick = ?self.config.tick_interval,
            "waiting for leaked tasks to exit"
        );

        let cause = loop {
            if let Some(cause) = deadline.wait_tick(&ticker) {
                break cause;
            }

            leaked = self.leaked();
            tracing::trace!(leaked = leaked.len(), "re-checked live tasks");
            if leaked.is_empty() {
                tracing::debug!("leaked tasks exited before the deadline");
                return;
            }
        };

        tracing::debug!(%cause, leaked = leaked.len(), "leak check failed");
        self.reporter
            .error(format_args!("leakcheck: {}", Error::Deadline(cause)));
        for task in leaked {
            self.reporter
                .error(format_args!("leakcheck: {}", Error::Leaked(task.stack)));
        }
    }
}

impl<R: ErrorReporter + ?Sized> Drop for LeakCheck<'_, R> {
    fn drop(&mut self) {
        self.run();
    }
}

/// Interesting tasks right now; enumeration failures count as no tasks
fn snapshot<R>(config: &Config, reporter: &R) -> Vec<TaskDescriptor>
where
    R: ErrorReporter + ?Sized,
{
    match config.source().dump() {
        Ok(dump) => interesting_tasks(&dump, config.ignore_rules(), reporter),
        Err(err) => {
            tracing::warn!(error = %err, "task enumeration failed");
            reporter.error(format_args!("leakcheck: {}", err));
            Vec::new()
        }
    }
}
