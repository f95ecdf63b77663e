//! Test harness integration
//!
//! Rust tests fail by panicking, so [`assert_no_leaks`] collects every
//! report and panics once the check is done. [`check_main`] wraps a whole
//! `harness = false` test binary and turns leaks into a failing exit code.
//!
//! A check sees every thread of the process. Under `cargo test`'s default
//! parallelism the threads libtest runs other tests on show up as new
//! threads and are reported. Run checked tests one at a time (`#[serial]`
//! from `serial_test`, or `--test-threads=1`), or narrow the check to the
//! threads the test owns with [`Config::ignore`] and
//! [`IgnoreRule::predicate`](crate::IgnoreRule::predicate).

use crate::config::Config;
use crate::reporter::{Recorder, StderrReporter};

impl Config {
    /// Run `f` under a leak check and panic if anything was reported
    ///
    /// Not isolated from tests running in parallel; see the module docs.
    pub fn assert_no_leaks<F, T>(&self, f: F) -> T
    where
        F: FnOnce() -> T,
    {
        let recorder = Recorder::new();
        let value = {
            let check = self.start(&recorder);
            let value = f();
            check.finish();
            value
        };
        recorder.assert_clean();
        value
    }

    /// Run a whole test program under one leak check
    ///
    /// Returns `f`'s exit code when it is non-zero. Otherwise returns 1 if
    /// the check reported anything (printed to stderr) and 0 if not.
    pub fn check_main<F>(&self, f: F) -> i32
    where
        F: FnOnce() -> i32,
    {
        let reporter = StderrReporter::new();
        let check = self.start(&reporter);
        let code = f();
        check.finish();

        if code != 0 {
            code
        } else if reporter.count() > 0 {
            1
        } else {
            0
        }
    }
}

/// [`Config::assert_no_leaks`] with the default configuration
pub fn assert_no_leaks<F, T>(f: F) -> T
where
    F: FnOnce() -> T,
{
    Config::default().assert_no_leaks(f)
}

/// [`Config::check_main`] with configuration from the environment
pub fn check_main<F>(f: F) -> i32
where
    F: FnOnce() -> i32,
{
    Config::from_env().check_main(f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::ignore::IgnoreRule;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    const BASE: &str = "thread 1 [sleeping]:\nmain thread";
    const LEAKED: &str = "thread 1 [sleeping]:\nmain thread\n\nthread 2 [sleeping]:\nname: stuck";

    /// Clean for the first `clean_calls` enumerations, leaking afterwards
    fn leaking_after(clean_calls: usize) -> Config {
        let calls = Arc::new(AtomicUsize::new(0));
        Config::new()
            .with_tick_interval(Duration::from_millis(5))
            .with_timeout(Duration::from_millis(50))
            .with_source(move || -> Result<String> {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                Ok(if n < clean_calls { BASE } else { LEAKED }.to_string())
            })
    }

    #[test]
    fn test_assert_no_leaks_returns_value() {
        let value = leaking_after(usize::MAX).assert_no_leaks(|| 40 + 2);
        assert_eq!(value, 42);
    }

    #[test]
    #[should_panic(expected = "leakcheck: leaked task: thread 2")]
    fn test_assert_no_leaks_panics_on_leak() {
        leaking_after(1).assert_no_leaks(|| ());
    }

    #[test]
    fn test_name_filter_skips_parallel_test_threads() {
        // libtest names the thread of a running test after the test
        let calls = Arc::new(AtomicUsize::new(0));
        let config = Config::new()
            .with_tick_interval(Duration::from_millis(5))
            .with_timeout(Duration::from_millis(50))
            .with_source(move || -> Result<String> {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                let other = "thread 9 [running]:\nname: tests::other_test";
                Ok(if n == 0 { BASE.to_string() } else { format!("{BASE}\n\n{other}") })
            })
            .ignore(IgnoreRule::predicate(|body| !body.contains("name: mine-")));

        config.assert_no_leaks(|| ());
    }

    #[test]
    fn test_check_main_clean_is_zero() {
        assert_eq!(leaking_after(usize::MAX).check_main(|| 0), 0);
    }

    #[test]
    fn test_check_main_leak_is_one() {
        assert_eq!(leaking_after(1).check_main(|| 0), 1);
    }

    #[test]
    fn test_check_main_keeps_failing_code() {
        assert_eq!(leaking_after(usize::MAX).check_main(|| 101), 101);
        assert_eq!(leaking_after(1).check_main(|| 3), 3);
    }
}
