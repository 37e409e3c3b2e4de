//! Debounced refresh state machine.
//!
//! ```text
//! Idle --request--> Pending(due) --due--> Running --+--> Idle
//!                      ^                            |
//!                      +----- mutation during run --+
//!                      +----- failure (retry) ------+
//! ```
//!
//! The scheduler holds no text and performs no I/O; the console feeds it
//! times from a [`super::Clock`] and reports how each run ended.

use tracing::debug;

/// How failed synchronizations are retried.
///
/// The delay for the n-th consecutive failure is
/// `period_ms * backoff^(n-1)`, capped at `max_period_ms`. With
/// `max_attempts` unset the scheduler retries forever.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub period_ms: u64,
    pub backoff: f64,
    pub max_period_ms: u64,
    pub max_attempts: Option<u32>,
}

impl RetryPolicy {
    /// Fixed period, unbounded attempts.
    pub const fn fixed(period_ms: u64) -> Self {
        Self {
            period_ms,
            backoff: 1.0,
            max_period_ms: period_ms,
            max_attempts: None,
        }
    }

    /// Delay before retrying after `failures` consecutive failures.
    pub fn delay_ms(&self, failures: u32) -> u64 {
        let exponent = i32::try_from(failures.saturating_sub(1)).unwrap_or(i32::MAX);
        let factor = self.backoff.max(1.0).powi(exponent);
        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let delay = (self.period_ms as f64 * factor).min(u64::MAX as f64) as u64;
        delay.min(self.max_period_ms.max(self.period_ms))
    }

    /// Whether another attempt is allowed after `failures` consecutive failures.
    pub fn allows(&self, failures: u32) -> bool {
        self.max_attempts.is_none_or(|max| failures < max)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(DEFAULT_DEBOUNCE_MS)
    }
}

/// Default debounce window in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u64 = 100;

/// Scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    /// A refresh is armed for `due_ms`.
    Pending { due_ms: u64 },
    /// A refresh is talking to the surface. `rearm` records requests that
    /// arrived meanwhile.
    Running { rearm: bool },
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The surface accepted the script.
    Synced,
    /// There was nothing to send.
    Nothing,
    Failed,
}

/// What the scheduler decided after a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    Idle,
    Rearmed { due_ms: u64 },
    Retry { due_ms: u64, attempt: u32 },
    /// The retry budget is spent; the scheduler idles until the next request.
    GaveUp { attempts: u32 },
}

/// Returned by [`SyncScheduler::begin`] when a run is already in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlreadyRunning;

#[derive(Debug, Clone)]
pub struct SyncScheduler {
    state: SyncState,
    debounce_ms: u64,
    retry: RetryPolicy,
    failures: u32,
}

impl SyncScheduler {
    pub const fn new(debounce_ms: u64, retry: RetryPolicy) -> Self {
        Self {
            state: SyncState::Idle,
            debounce_ms,
            retry,
            failures: 0,
        }
    }

    pub const fn state(&self) -> SyncState {
        self.state
    }

    pub const fn is_running(&self) -> bool {
        matches!(self.state, SyncState::Running { .. })
    }

    /// Consecutive failed runs since the last success.
    pub const fn failures(&self) -> u32 {
        self.failures
    }

    pub const fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Deadline of the armed refresh, if any.
    pub const fn due_ms(&self) -> Option<u64> {
        match self.state {
            SyncState::Pending { due_ms } => Some(due_ms),
            _ => None,
        }
    }

    pub const fn is_due(&self, now_ms: u64) -> bool {
        matches!(self.state, SyncState::Pending { due_ms } if now_ms >= due_ms)
    }

    /// Ask for a refresh. Bursts coalesce onto the first armed deadline.
    pub const fn request(&mut self, now_ms: u64) {
        match self.state {
            SyncState::Idle => {
                self.state = SyncState::Pending {
                    due_ms: now_ms.saturating_add(self.debounce_ms),
                };
            }
            SyncState::Pending { .. } => {}
            SyncState::Running { .. } => self.state = SyncState::Running { rearm: true },
        }
    }

    /// Enter `Running`. A call while already running only re-arms.
    ///
    /// # Errors
    /// Returns [`AlreadyRunning`] for a re-entrant call.
    pub fn begin(&mut self) -> Result<(), AlreadyRunning> {
        if self.is_running() {
            self.state = SyncState::Running { rearm: true };
            debug!("sync re-entered while running; re-armed");
            return Err(AlreadyRunning);
        }
        self.state = SyncState::Running { rearm: false };
        Ok(())
    }

    /// Leave `Running` without having touched the surface.
    pub const fn defer(&mut self, now_ms: u64) {
        self.state = SyncState::Pending {
            due_ms: now_ms.saturating_add(self.debounce_ms),
        };
    }

    /// Leave `Running` after a run ended with `outcome`.
    pub fn finish(&mut self, now_ms: u64, outcome: RunOutcome) -> Next {
        let rearm = matches!(self.state, SyncState::Running { rearm: true });
        let next = match outcome {
            RunOutcome::Synced | RunOutcome::Nothing => {
                self.failures = 0;
                if rearm {
                    let due_ms = now_ms.saturating_add(self.debounce_ms);
                    self.state = SyncState::Pending { due_ms };
                    Next::Rearmed { due_ms }
                } else {
                    self.state = SyncState::Idle;
                    Next::Idle
                }
            }
            RunOutcome::Failed => {
                self.failures = self.failures.saturating_add(1);
                if self.retry.allows(self.failures) {
                    let due_ms = now_ms.saturating_add(self.retry.delay_ms(self.failures));
                    self.state = SyncState::Pending { due_ms };
                    Next::Retry {
                        due_ms,
                        attempt: self.failures,
                    }
                } else {
                    let attempts = self.failures;
                    self.failures = 0;
                    self.state = SyncState::Idle;
                    Next::GaveUp { attempts }
                }
            }
        };
        debug!(?outcome, ?next, "sync run finished");
        next
    }
}

impl Default for SyncScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE_MS, RetryPolicy::default())
    }
}
