//! Deadline and cancellation signals for the poll loop
//!
//! A [`Deadline`] becomes ready once: either its timer elapses or its
//! [`CancelHandle`] is used, whichever happens first. The reason is a
//! [`DeadlineCause`] and stays readable from then on. Both halves are
//! crossbeam channels so the checker can wait on them together with its
//! ticker in one `select!`.

use crossbeam::channel::{self, Receiver, Sender};
use std::fmt;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

/// Why a deadline fired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadlineCause {
    /// The timer elapsed
    Exceeded,
    /// A cancel handle was used
    Cancelled,
}

impl fmt::Display for DeadlineCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exceeded => write!(f, "deadline exceeded"),
            Self::Cancelled => write!(f, "check cancelled"),
        }
    }
}

/// A one-shot signal that ends a leak check's retry window
#[derive(Debug)]
pub struct Deadline {
    timer: Receiver<Instant>,
    cancelled: Receiver<()>,
    // Keeps the cancel channel connected so it only fires on an explicit cancel
    _keepalive: Sender<()>,
    // Both channels deliver a single message; the first cause received sticks
    fired: OnceLock<DeadlineCause>,
}

impl Deadline {
    fn from_timer(timer: Receiver<Instant>) -> (Self, CancelHandle) {
        let (tx, rx) = channel::bounded(1);
        let deadline = Self {
            timer,
            cancelled: rx,
            _keepalive: tx.clone(),
            fired: OnceLock::new(),
        };
        (deadline, CancelHandle { tx })
    }

    /// Fires `duration` from now
    pub fn after(duration: Duration) -> Self {
        Self::from_timer(channel::after(duration)).0
    }

    /// Fires at `when` (immediately if `when` has passed)
    pub fn at(when: Instant) -> Self {
        Self::from_timer(channel::at(when)).0
    }

    /// Never fires on its own
    pub fn never() -> Self {
        Self::from_timer(channel::never()).0
    }

    /// Fires only when the returned handle cancels it
    pub fn cancellable() -> (Self, CancelHandle) {
        Self::from_timer(channel::never())
    }

    /// Fires after `duration` or on cancel, whichever comes first
    pub fn with_timeout(duration: Duration) -> (Self, CancelHandle) {
        Self::from_timer(channel::after(duration))
    }

    /// Why the deadline fired, if it has been seen firing
    pub fn fired(&self) -> Option<DeadlineCause> {
        self.fired.get().copied()
    }

    fn latch(&self, cause: DeadlineCause) -> DeadlineCause {
        *self.fired.get_or_init(|| cause)
    }

    /// Block until the deadline fires and return why
    ///
    /// Returns the same cause on every call once it has fired.
    pub fn wait(&self) -> DeadlineCause {
        if let Some(cause) = self.fired() {
            return cause;
        }
        let cause = crossbeam::select! {
            recv(self.timer) -> _ => DeadlineCause::Exceeded,
            recv(self.cancelled) -> _ => DeadlineCause::Cancelled,
        };
        self.latch(cause)
    }

    /// Block until `ticker` ticks (`None`) or the deadline fires
    pub(crate) fn wait_tick(&self, ticker: &Receiver<Instant>) -> Option<DeadlineCause> {
        if let Some(cause) = self.fired() {
            return Some(cause);
        }
        let fired = crossbeam::select! {
            recv(ticker) -> _ => None,
            recv(self.timer) -> _ => Some(DeadlineCause::Exceeded),
            recv(self.cancelled) -> _ => Some(DeadlineCause::Cancelled),
        };
        fired.map(|cause| self.latch(cause))
    }
}

/// Fires the [`Deadline`] it was created with
///
/// Cloning gives another handle to the same deadline. Dropping a handle does
/// nothing; only [`CancelHandle::cancel`] fires.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Sender<()>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        // Full means an earlier cancel already fired it
        let _ = self.tx.try_send(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cause_display() {
        assert_eq!(DeadlineCause::Exceeded.to_string(), "deadline exceeded");
        assert_eq!(DeadlineCause::Cancelled.to_string(), "check cancelled");
    }

    #[test]
    fn test_after_fires_exceeded() {
        let start = Instant::now();
        let deadline = Deadline::after(Duration::from_millis(20));
        assert_eq!(deadline.wait(), DeadlineCause::Exceeded);
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_at_in_the_past_fires_immediately() {
        let deadline = Deadline::at(Instant::now());
        assert_eq!(deadline.wait(), DeadlineCause::Exceeded);
    }

    #[test]
    fn test_cancel_fires_cancelled() {
        let (deadline, handle) = Deadline::cancellable();
        handle.cancel();
        handle.cancel();
        assert_eq!(deadline.wait(), DeadlineCause::Cancelled);
    }

    #[test]
    fn test_cancel_beats_long_timeout() {
        let (deadline, handle) = Deadline::with_timeout(Duration::from_secs(60));
        let other = handle.clone();
        other.cancel();
        assert_eq!(deadline.wait(), DeadlineCause::Cancelled);
    }

    #[test]
    fn test_dropped_handle_does_not_fire() {
        let (deadline, handle) = Deadline::cancellable();
        drop(handle);
        assert!(deadline.cancelled.try_recv().is_err());
        assert!(deadline.timer.try_recv().is_err());
    }

    #[test]
    fn test_fired_cause_stays_readable() {
        let deadline = Deadline::after(Duration::from_millis(5));
        assert_eq!(deadline.fired(), None);
        assert_eq!(deadline.wait(), DeadlineCause::Exceeded);
        assert_eq!(deadline.fired(), Some(DeadlineCause::Exceeded));
        assert_eq!(deadline.wait(), DeadlineCause::Exceeded);

        let ticker = channel::never();
        assert_eq!(deadline.wait_tick(&ticker), Some(DeadlineCause::Exceeded));
    }

    #[test]
    fn test_cancel_stays_readable_after_wait() {
        let (deadline, handle) = Deadline::cancellable();
        handle.cancel();
        assert_eq!(deadline.wait(), DeadlineCause::Cancelled);
        handle.cancel();
        assert_eq!(deadline.wait(), DeadlineCause::Cancelled);
    }

    #[test]
    fn test_wait_tick_returns_none_on_tick() {
        let deadline = Deadline::never();
        let ticker = channel::tick(Duration::from_millis(5));
        assert_eq!(deadline.wait_tick(&ticker), None);
        assert_eq!(deadline.fired(), None);
    }

    #[test]
    fn test_never_stays_pending() {
        let deadline = Deadline::never();
        let fired = crossbeam::select! {
            recv(deadline.timer) -> _ => true,
            recv(deadline.cancelled) -> _ => true,
            default(Duration::from_millis(20)) => false,
        };
        assert!(!fired);
    }
}
