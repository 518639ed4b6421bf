//! Export counters and the completion signal
//!
//! Save callbacks run on the browser's event thread while the exporter keeps
//! switching views, so the counters sit behind a mutex. The completion
//! signal fires exactly once: when the received count reaches the expected
//! count, or on the first failed write or malformed payload.

use crate::{Error, Result};
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;

struct State {
    expected: Option<usize>,
    written: Vec<PathBuf>,
    completion: Option<oneshot::Sender<Result<Vec<PathBuf>>>>,
}

impl State {
    fn complete_if_done(&mut self) {
        if self.expected == Some(self.written.len()) {
            if let Some(tx) = self.completion.take() {
                let _ = tx.send(Ok(self.written.clone()));
            }
        }
    }
}

/// Tracks expected versus received exports.
pub struct ExportTracker {
    state: Mutex<State>,
}

/// Receiving side of the tracker's completion signal.
///
/// Resolves with the written paths in arrival order, or with the first
/// error reported through [`ExportTracker::fail`].
pub struct ExportCompletion {
    rx: oneshot::Receiver<Result<Vec<PathBuf>>>,
}

impl ExportTracker {
    pub fn new() -> (Self, ExportCompletion) {
        let (tx, rx) = oneshot::channel();
        let tracker = Self {
            state: Mutex::new(State {
                expected: None,
                written: Vec::new(),
                completion: Some(tx),
            }),
        };
        (tracker, ExportCompletion { rx })
    }

    /// Set the expected count. Completes immediately when nothing is expected.
    pub fn set_expected(&self, expected: usize) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.expected = Some(expected);
        state.complete_if_done();
    }

    /// Record one written image and return the received count so far.
    pub fn record(&self, path: PathBuf) -> usize {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.written.push(path);
        state.complete_if_done();
        state.written.len()
    }

    /// Resolve the completion signal with `err` unless it already fired.
    pub fn fail(&self, err: Error) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(tx) = state.completion.take() {
            let _ = tx.send(Err(err));
        }
    }

    pub fn expected(&self) -> Option<usize> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).expected
    }

    pub fn actual(&self) -> usize {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).written.len()
    }
}

impl ExportCompletion {
    /// Block until the signal fires.
    ///
    /// Gives up with [`Error::Timeout`] once `idle_timeout` passes without a
    /// new image arriving at `tracker`. Must not be called from inside an
    /// async runtime.
    pub fn wait(
        mut self,
        tracker: &ExportTracker,
        idle_timeout: Duration,
        poll_interval: Duration,
    ) -> Result<Vec<PathBuf>> {
        let mut received = tracker.actual();
        let mut last_progress = Instant::now();
        loop {
            if let Some(res) = self.try_take() {
                return res;
            }
            let now = tracker.actual();
            if now != received {
                received = now;
                last_progress = Instant::now();
            } else if last_progress.elapsed() >= idle_timeout {
                return Err(Error::Timeout(idle_timeout.as_millis() as u64));
            }
            std::thread::sleep(poll_interval);
        }
    }

    /// Non-blocking check; `None` while exports are still outstanding.
    pub fn try_take(&mut self) -> Option<Result<Vec<PathBuf>>> {
        match self.rx.try_recv() {
            Ok(res) => Some(res),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(Error::Other(
                "export tracker dropped before completion".into(),
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const WAIT: Duration = Duration::from_secs(5);
    const POLL: Duration = Duration::from_millis(1);

    #[test]
    fn completes_only_when_count_is_reached() {
        let (tracker, mut completion) = ExportTracker::new();
        tracker.set_expected(3);

        assert_eq!(tracker.record(PathBuf::from("a.png")), 1);
        assert_eq!(tracker.record(PathBuf::from("a-key.png")), 2);
        assert!(completion.try_take().is_none());

        tracker.record(PathBuf::from("b.png"));
        let written = completion.try_take().unwrap().unwrap();
        assert_eq!(written.len(), 3);
        assert_eq!(tracker.actual(), 3);
    }

    #[test]
    fn zero_expected_completes_at_once() {
        let (tracker, completion) = ExportTracker::new();
        tracker.set_expected(0);
        assert!(completion.wait(&tracker, WAIT, POLL).unwrap().is_empty());
    }

    #[test]
    fn nothing_completes_before_expected_is_known() {
        let (tracker, mut completion) = ExportTracker::new();
        assert!(completion.try_take().is_none());
        assert_eq!(tracker.expected(), None);
    }

    #[test]
    fn first_failure_wins() {
        let (tracker, completion) = ExportTracker::new();
        tracker.set_expected(2);
        tracker.fail(Error::Other("disk full".into()));
        tracker.record(PathBuf::from("a.png"));
        tracker.record(PathBuf::from("b.png"));
        let err = completion.wait(&tracker, WAIT, POLL).unwrap_err();
        assert_eq!(err.to_string(), "disk full");
    }

    #[test]
    fn concurrent_records_complete_once() {
        let (tracker, completion) = ExportTracker::new();
        let tracker = Arc::new(tracker);
        tracker.set_expected(64);

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let tracker = tracker.clone();
                std::thread::spawn(move || {
                    for i in 0..8 {
                        tracker.record(PathBuf::from(format!("{}-{}.png", t, i)));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(completion.wait(&tracker, WAIT, POLL).unwrap().len(), 64);
    }

    #[test]
    fn wait_gives_up_without_progress() {
        let (tracker, completion) = ExportTracker::new();
        tracker.set_expected(2);
        tracker.record(PathBuf::from("a.png"));
        let err = completion
            .wait(&tracker, Duration::from_millis(30), POLL)
            .unwrap_err();
        assert!(matches!(err, Error::Timeout(30)));
    }

    #[test]
    fn progress_extends_the_wait() {
        let (tracker, completion) = ExportTracker::new();
        let tracker = Arc::new(tracker);
        tracker.set_expected(3);

        let feeder = tracker.clone();
        let handle = std::thread::spawn(move || {
            for i in 0..3 {
                std::thread::sleep(Duration::from_millis(40));
                feeder.record(PathBuf::from(format!("{}.png", i)));
            }
        });

        // Total delivery time exceeds the idle timeout, each gap does not.
        let written = completion
            .wait(&tracker, Duration::from_millis(100), POLL)
            .unwrap();
        handle.join().unwrap();
        assert_eq!(written.len(), 3);
    }
}
