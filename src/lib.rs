//! leakcheck - detect threads leaked by tests
//!
//! Snapshot the live tasks of the process before a test body runs, check
//! again afterwards, and report every task that is new, is not part of the
//! runtime or harness, and does not go away within a retry window.
//!
//! ```no_run
//! leakcheck::assert_no_leaks(|| {
//!     std::thread::spawn(|| {}).join().unwrap();
//! });
//! ```
//!
//! Every thread in the process counts, including the ones libtest runs other
//! tests on. Keep checked tests from running in parallel with `#[serial]`
//! (`serial_test`) or `--test-threads=1`, or give the check a name filter:
//!
//! ```no_run
//! use leakcheck::{Config, IgnoreRule};
//!
//! let config = Config::default()
//!     .ignore(IgnoreRule::predicate(|body| !body.contains("name: my-worker")));
//! config.assert_no_leaks(|| {
//!     std::thread::Builder::new()
//!         .name("my-worker".into())
//!         .spawn(|| {})
//!         .unwrap()
//!         .join()
//!         .unwrap();
//! });
//! ```

pub mod checker;
pub mod classify;
pub mod cli;
pub mod config;
pub mod deadline;
pub mod error;
pub mod harness;
pub mod ignore;
pub mod reporter;
pub mod source;
pub mod task;

pub use checker::{start, start_with_deadline, start_with_timeout, LeakCheck};
pub use classify::{classify, classify_dump, interesting_tasks, MAIN_THREAD_MARKER};
pub use config::Config;
pub use deadline::{CancelHandle, Deadline, DeadlineCause};
pub use error::{Error, ParseError, Result};
pub use harness::{assert_no_leaks, check_main};
pub use ignore::{IgnoreRule, IgnoreRules};
pub use reporter::{ErrorReporter, Recorder, StderrReporter};
pub use source::{ProcThreads, StaticDump, TaskSource};
pub use task::TaskDescriptor;
