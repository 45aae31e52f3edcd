//! Progress reporting and cooperative cancellation.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Broadcast cancellation flag.
///
/// Clones share the same flag, so one `cancel()` is observed by the job
/// generator, every worker and the writer.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

type ProgressFn<'a> = Box<dyn FnMut(u32) + Send + 'a>;
type CancelPollFn<'a> = Box<dyn FnMut() -> bool + Send + 'a>;

/// Caller hooks for one run: a progress callback, an optional cancellation
/// query, and the cancellation token.
pub struct RunControl<'a> {
    progress: Option<ProgressFn<'a>>,
    cancel_poll: Option<CancelPollFn<'a>>,
    token: CancelToken,
    last_progress: Option<u32>,
}

impl fmt::Debug for RunControl<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunControl")
            .field("has_progress", &self.progress.is_some())
            .field("has_cancel_poll", &self.cancel_poll.is_some())
            .field("token", &self.token)
            .field("last_progress", &self.last_progress)
            .finish()
    }
}

impl Default for RunControl<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> RunControl<'a> {
    pub fn new() -> Self {
        Self {
            progress: None,
            cancel_poll: None,
            token: CancelToken::new(),
            last_progress: None,
        }
    }

    /// Called with the integer percentage whenever it increases.
    pub fn on_progress(mut self, f: impl FnMut(u32) + Send + 'a) -> Self {
        self.progress = Some(Box::new(f));
        self
    }

    /// Polled before each track, and by the parallel encoder while the last
    /// tracks drain; returning `true` cancels the run.
    pub fn cancel_when(mut self, f: impl FnMut() -> bool + Send + 'a) -> Self {
        self.cancel_poll = Some(Box::new(f));
        self
    }

    pub fn with_token(mut self, token: CancelToken) -> Self {
        self.token = token;
        self
    }

    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    /// Check both cancellation sources. A positive poll trips the token so
    /// every other role sees it too.
    pub fn should_cancel(&mut self) -> bool {
        if self.token.is_cancelled() {
            return true;
        }
        if let Some(poll) = self.cancel_poll.as_mut() {
            if poll() {
                self.token.cancel();
                return true;
            }
        }
        false
    }

    /// Forward `percent` to the callback if it is larger than the last value.
    pub fn report_progress(&mut self, percent: u32) {
        if self.last_progress.is_some_and(|last| percent <= last) {
            return;
        }
        self.last_progress = Some(percent);
        tracing::debug!(percent, "encode progress");
        if let Some(progress) = self.progress.as_mut() {
            progress(percent);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_token_clones_share_state() {
        let token = CancelToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());
        token.cancel();
        assert!(other.is_cancelled());
    }

    #[test]
    fn test_progress_only_on_increase() {
        let seen = Mutex::new(Vec::new());
        {
            let mut control = RunControl::new().on_progress(|p| seen.lock().unwrap().push(p));
            for p in [0, 0, 1, 1, 1, 2, 1, 5, 5] {
                control.report_progress(p);
            }
        }
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2, 5]);
    }

    #[test]
    fn test_cancel_poll_trips_token() {
        let mut calls = 0;
        let mut control = RunControl::new().cancel_when(move || {
            calls += 1;
            calls >= 3
        });
        assert!(!control.should_cancel());
        assert!(!control.should_cancel());
        assert!(!control.token().is_cancelled());
        assert!(control.should_cancel());
        assert!(control.token().is_cancelled());
    }

    #[test]
    fn test_external_token() {
        let token = CancelToken::new();
        let mut control = RunControl::new().with_token(token.clone());
        assert!(!control.should_cancel());
        token.cancel();
        assert!(control.should_cancel());
    }
}
