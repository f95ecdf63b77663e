//! Failure reporting
//!
//! The checker never fails a test by itself. Every finding goes through an
//! [`ErrorReporter`], and what a report means (failing the test, printing,
//! collecting) is up to the implementation.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

/// Receives one formatted failure per call
pub trait ErrorReporter {
    fn error(&self, args: fmt::Arguments<'_>);
}

impl<F> ErrorReporter for F
where
    F: Fn(fmt::Arguments<'_>),
{
    fn error(&self, args: fmt::Arguments<'_>) {
        self(args)
    }
}

/// Collects reported messages for later inspection
#[derive(Debug, Default)]
pub struct Recorder {
    messages: Mutex<Vec<String>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything reported so far
    pub fn messages(&self) -> Vec<String> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Panic with every recorded message if anything was reported
    pub fn assert_clean(&self) {
        let messages = self.lock();
        if !messages.is_empty() {
            panic!(
                "leak check reported {} failure(s):\n{}",
                messages.len(),
                messages.join("\n")
            );
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<String>> {
        // A panic while holding the lock cannot leave the Vec half-written
        self.messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ErrorReporter for Recorder {
    fn error(&self, args: fmt::Arguments<'_>) {
        self.lock().push(args.to_string());
    }
}

/// Prints each report to stderr and counts them
#[derive(Debug, Default)]
pub struct StderrReporter {
    count: AtomicUsize,
}

impl StderrReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }
}

impl ErrorReporter for StderrReporter {
    fn error(&self, args: fmt::Arguments<'_>) {
        self.count.fetch_add(1, Ordering::Relaxed);
        eprintln!("{}", args);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_recorder_collects_messages() {
        let recorder = Recorder::new();
        recorder.error(format_args!("leakcheck: {}", "one"));
        recorder.error(format_args!("leakcheck: {}", 2));
        assert_eq!(recorder.len(), 2);
        assert_eq!(
            recorder.messages(),
            vec!["leakcheck: one".to_string(), "leakcheck: 2".to_string()]
        );
    }

    #[test]
    fn test_recorder_clean_does_not_panic() {
        let recorder = Recorder::new();
        assert!(recorder.is_empty());
        recorder.assert_clean();
    }

    #[test]
    #[should_panic(expected = "leak check reported 1 failure(s)")]
    fn test_recorder_assert_clean_panics() {
        let recorder = Recorder::new();
        recorder.error(format_args!("leakcheck: leaked task"));
        recorder.assert_clean();
    }

    #[test]
    fn test_closure_reporter() {
        let seen = RefCell::new(Vec::new());
        let reporter = |args: fmt::Arguments<'_>| seen.borrow_mut().push(args.to_string());
        reporter.error(format_args!("x={}", 1));
        assert_eq!(seen.into_inner(), vec!["x=1".to_string()]);
    }

    #[test]
    fn test_stderr_reporter_counts() {
        let reporter = StderrReporter::new();
        reporter.error(format_args!("leakcheck: test output"));
        assert_eq!(reporter.count(), 1);
    }
}
