//! # Backoff-Wrapped Calls
//!
//! Every remote call goes through [`Backoff::call`]. A failing call is classified
//! once; retryable failures are retried after an exponentially growing wait, all
//! others surface immediately.
//!
//! The retry loop is an explicit state machine ([`RetryState`]) so that the number
//! of attempts and the total wait are bounded by [`RetryPolicy`] alone:
//!
//! ```text
//! Attempt(n) --deadline passed-------------------> FailedTerminal(Timeout)
//! Attempt(n) --ok--------------------------------> Succeeded
//! Attempt(n) --err, terminal or n == max---------> FailedTerminal
//! Attempt(n) --err, retryable--> Waiting(n, d) --> Attempt(n + 1)
//! Waiting(n, d) --deadline would pass------------> FailedTerminal(Timeout)
//! ```
//!
//! The deadline belongs to the whole request: once it has passed, no further
//! call is made through the same [`Backoff`].
//!
//! Time comes from a [`Clock`], so tests drive the loop with [`ManualClock`] and
//! observe the exact wait schedule without sleeping.

use crate::error::{Result, SheetsError};
use std::cell::{Cell, RefCell};
use std::time::{Duration, Instant};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Wait before the attempt following failed attempt `attempt` (1-based):
    /// `base * 2^(attempt - 1)`, raised to the server hint if larger, capped at
    /// `max_delay`.
    pub fn delay_after(&self, attempt: u32, hint: Option<Duration>) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        let exponential = self.base_delay.saturating_mul(factor);
        let wanted = match hint {
            Some(hint) if hint > exponential => hint,
            _ => exponential,
        };
        wanted.min(self.max_delay)
    }

    /// Worst-case total wait across all retries.
    pub fn max_total_wait(&self) -> Duration {
        (1..self.max_attempts).fold(Duration::ZERO, |acc, n| {
            acc.saturating_add(self.delay_after(n, Some(self.max_delay)))
        })
    }
}

/// How a failed call should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub retryable: bool,
    pub wait_hint: Option<Duration>,
}

impl Classification {
    pub fn terminal() -> Self {
        Self {
            retryable: false,
            wait_hint: None,
        }
    }
}

/// Rate limits and transient remote failures retry; everything else is terminal.
pub fn classify(err: &SheetsError) -> Classification {
    Classification {
        retryable: err.is_retryable(),
        wait_hint: err.wait_hint(),
    }
}

pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// A clock that only advances when slept on. Records every sleep.
#[derive(Debug)]
pub struct ManualClock {
    start: Instant,
    elapsed: Cell<Duration>,
    sleeps: RefCell<Vec<Duration>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            elapsed: Cell::new(Duration::ZERO),
            sleeps: RefCell::new(Vec::new()),
        }
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.borrow().clone()
    }

    pub fn total_slept(&self) -> Duration {
        self.sleeps.borrow().iter().sum()
    }

    /// Move time forward without recording a sleep, as a slow call would.
    pub fn advance(&self, duration: Duration) {
        self.elapsed.set(self.elapsed.get() + duration);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.start + self.elapsed.get()
    }

    fn sleep(&self, duration: Duration) {
        self.elapsed.set(self.elapsed.get() + duration);
        self.sleeps.borrow_mut().push(duration);
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

/// States of one backoff-wrapped call.
#[derive(Debug)]
pub enum RetryState<T> {
    Attempt(u32),
    Waiting {
        attempt: u32,
        delay: Duration,
        last: SheetsError,
    },
    Succeeded(T),
    FailedTerminal(SheetsError),
}

/// Runs remote calls under a [`RetryPolicy`] and an optional overall deadline.
#[derive(Debug)]
pub struct Backoff<C: Clock = SystemClock> {
    policy: RetryPolicy,
    clock: C,
    deadline: Option<Instant>,
    attempts: u32,
}

impl Backoff<SystemClock> {
    pub fn new(policy: RetryPolicy) -> Self {
        Self::with_clock(policy, SystemClock)
    }
}

impl<C: Clock> Backoff<C> {
    pub fn with_clock(policy: RetryPolicy, clock: C) -> Self {
        Self {
            policy,
            clock,
            deadline: None,
            attempts: 0,
        }
    }

    /// Abort pending waits that would end after `timeout` from now.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.deadline = timeout.map(|t| self.clock.now() + t);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Total attempts made through this caller, retries included.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Call `op` with the default classification.
    fn deadline_passed(&self) -> bool {
        self.deadline
            .is_some_and(|deadline| self.clock.now() >= deadline)
    }

    pub fn call<T>(&mut self, label: &str, op: impl FnMut() -> Result<T>) -> Result<T> {
        self.call_classified(label, op, classify)
    }

    pub fn call_classified<T>(
        &mut self,
        label: &str,
        mut op: impl FnMut() -> Result<T>,
        classify: impl Fn(&SheetsError) -> Classification,
    ) -> Result<T> {
        let mut state = RetryState::Attempt(1);
        loop {
            state = match state {
                RetryState::Attempt(_) if self.deadline_passed() => {
                    RetryState::FailedTerminal(SheetsError::Timeout(format!(
                        "{} was not attempted: the request deadline has passed",
                        label
                    )))
                }
                RetryState::Attempt(n) => {
                    self.attempts += 1;
                    match op() {
                        Ok(value) => RetryState::Succeeded(value),
                        Err(err) => {
                            let class = classify(&err);
                            if !class.retryable {
                                RetryState::FailedTerminal(err)
                            } else if n >= self.policy.max_attempts {
                                tracing::warn!(call = label, attempts = n, error = %err, "giving up after retries");
                                RetryState::FailedTerminal(err)
                            } else {
                                let delay = self.policy.delay_after(n, class.wait_hint);
                                tracing::warn!(
                                    call = label,
                                    attempt = n,
                                    delay_ms = delay.as_millis() as u64,
                                    error = %err,
                                    "retryable failure; backing off"
                                );
                                RetryState::Waiting {
                                    attempt: n,
                                    delay,
                                    last: err,
                                }
                            }
                        }
                    }
                }
                RetryState::Waiting {
                    attempt,
                    delay,
                    last,
                } => match self.deadline {
                    Some(deadline) if self.clock.now() + delay >= deadline => {
                        RetryState::FailedTerminal(SheetsError::Timeout(format!(
                            "{} did not succeed before the request deadline ({} attempts, last error: {})",
                            label, attempt, last
                        )))
                    }
                    _ => {
                        self.clock.sleep(delay);
                        RetryState::Attempt(attempt + 1)
                    }
                },
                RetryState::Succeeded(value) => return Ok(value),
                RetryState::FailedTerminal(err) => return Err(err),
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rate_limited() -> SheetsError {
        SheetsError::RateLimited {
            message: "quota exceeded".into(),
            retry_after: None,
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
        }
    }

    #[test]
    fn delays_double_and_cap() {
        let p = policy();
        let delays: Vec<_> = (1..=6).map(|n| p.delay_after(n, None)).collect();
        assert_eq!(
            delays,
            [100, 200, 400, 800, 1600, 2000].map(Duration::from_millis)
        );
        assert_eq!(p.delay_after(200, None), Duration::from_secs(2));
    }

    #[test]
    fn hint_raises_but_never_exceeds_cap() {
        let p = policy();
        assert_eq!(
            p.delay_after(1, Some(Duration::from_millis(700))),
            Duration::from_millis(700)
        );
        assert_eq!(
            p.delay_after(3, Some(Duration::from_millis(10))),
            Duration::from_millis(400)
        );
        assert_eq!(p.delay_after(1, Some(Duration::from_secs(60))), Duration::from_secs(2));
    }

    #[test]
    fn max_total_wait_is_bounded() {
        assert_eq!(policy().max_total_wait(), Duration::from_secs(8));
    }

    #[test]
    fn retries_rate_limits_then_succeeds() {
        let clock = ManualClock::new();
        let mut backoff = Backoff::with_clock(policy(), &clock);
        let mut calls = 0;

        let result = backoff.call("write", || {
            calls += 1;
            if calls <= 2 {
                Err(rate_limited())
            } else {
                Ok("done")
            }
        });

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls, 3);
        assert_eq!(backoff.attempts(), 3);
        assert_eq!(clock.sleeps(), [100, 200].map(Duration::from_millis));
        assert_eq!(clock.total_slept(), Duration::from_millis(300));
    }

    #[test]
    fn terminal_failures_are_not_retried() {
        let clock = ManualClock::new();
        let mut backoff = Backoff::with_clock(policy(), &clock);
        let mut calls = 0;

        let result: Result<()> = backoff.call("lookup", || {
            calls += 1;
            Err(SheetsError::NotFound("spreadsheet".into()))
        });

        assert!(matches!(result, Err(SheetsError::NotFound(_))));
        assert_eq!(calls, 1);
        assert!(clock.sleeps().is_empty());
    }

    #[test]
    fn exhausting_attempts_surfaces_last_failure() {
        let clock = ManualClock::new();
        let mut backoff = Backoff::with_clock(policy(), &clock);
        let mut calls = 0;

        let result: Result<()> = backoff.call("write", || {
            calls += 1;
            Err(rate_limited())
        });

        assert!(matches!(result, Err(SheetsError::RateLimited { .. })));
        assert_eq!(calls, 5);
        assert_eq!(clock.sleeps().len(), 4);
    }

    #[test]
    fn deadline_cancels_pending_wait() {
        let clock = ManualClock::new();
        let mut backoff =
            Backoff::with_clock(policy(), &clock).with_timeout(Some(Duration::from_millis(250)));
        let mut calls = 0;

        let result: Result<()> = backoff.call("write", || {
            calls += 1;
            Err(rate_limited())
        });

        // 100ms fits, the following 200ms wait would cross the deadline
        match result {
            Err(SheetsError::Timeout(message)) => {
                assert!(message.contains("quota exceeded"), "{}", message)
            }
            other => panic!("expected Timeout, got {:?}", other),
        }
        assert_eq!(calls, 2);
        assert_eq!(clock.sleeps(), [Duration::from_millis(100)]);
    }

    #[test]
    fn no_call_is_made_after_the_deadline() {
        let clock = ManualClock::new();
        let mut backoff =
            Backoff::with_clock(policy(), &clock).with_timeout(Some(Duration::from_secs(1)));
        clock.advance(Duration::from_secs(5));
        let mut calls = 0;

        let result = backoff.call("write", || {
            calls += 1;
            Ok(())
        });

        let err = result.unwrap_err();
        assert_eq!(err.kind(), crate::error::FailureKind::Timeout);
        assert_eq!(calls, 0);
        assert_eq!(backoff.attempts(), 0);
    }

    #[test]
    fn slow_call_exhausts_deadline_for_later_calls() {
        let clock = ManualClock::new();
        let mut backoff =
            Backoff::with_clock(policy(), &clock).with_timeout(Some(Duration::from_secs(30)));
        let mut calls = 0;

        let first = backoff.call("create", || {
            calls += 1;
            clock.advance(Duration::from_secs(31));
            Ok(())
        });
        assert!(first.is_ok());

        let second = backoff.call("write", || {
            calls += 1;
            Ok(())
        });
        assert!(matches!(second, Err(SheetsError::Timeout(_))));
        assert_eq!(calls, 1);
        assert!(clock.sleeps().is_empty());
    }

    #[test]
    fn custom_classification_is_respected() {
        let clock = ManualClock::new();
        let mut backoff = Backoff::with_clock(policy(), &clock);
        let mut calls = 0;

        let result = backoff.call_classified(
            "flaky",
            || {
                calls += 1;
                if calls == 1 {
                    Err(SheetsError::NotFound("eventually consistent".into()))
                } else {
                    Ok(calls)
                }
            },
            |_| Classification {
                retryable: true,
                wait_hint: Some(Duration::from_millis(150)),
            },
        );

        assert_eq!(result.unwrap(), 2);
        assert_eq!(clock.sleeps(), [Duration::from_millis(150)]);
    }
}
