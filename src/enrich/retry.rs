//! Bounded retry of analysis calls.
use std::thread;
use std::time::Duration;

use crate::analysis::AnalysisError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// How many times to call and how long to wait between calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// Result of running a call under a [`RetryPolicy`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome<T> {
    Succeeded { value: T, attempts: u32 },
    /// Every attempt failed with a retryable error; holds the last one.
    Exhausted { error: AnalysisError, attempts: u32 },
    /// A non-retryable error stopped the sequence.
    Fatal { error: AnalysisError, attempts: u32 },
}

impl<T> RetryOutcome<T> {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryOutcome::Succeeded { attempts, .. }
            | RetryOutcome::Exhausted { attempts, .. }
            | RetryOutcome::Fatal { attempts, .. } => *attempts,
        }
    }
}

impl RetryPolicy {
    /// Call `call` with the 1-based attempt number until it succeeds, fails
    /// fatally, or the attempt budget runs out. Sleeps only between attempts.
    pub fn run<T>(
        &self,
        mut call: impl FnMut(u32) -> Result<T, AnalysisError>,
    ) -> RetryOutcome<T> {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match call(attempt) {
                Ok(value) => {
                    return RetryOutcome::Succeeded {
                        value,
                        attempts: attempt,
                    }
                }
                Err(error) if !error.is_retryable() => {
                    return RetryOutcome::Fatal {
                        error,
                        attempts: attempt,
                    }
                }
                Err(error) if attempt >= max_attempts => {
                    return RetryOutcome::Exhausted {
                        error,
                        attempts: attempt,
                    }
                }
                Err(error) => {
                    tracing::warn!(
                        attempt,
                        max_attempts,
                        kind = error.kind(),
                        error = %error,
                        delay_ms = self.delay.as_millis() as u64,
                        "analysis call failed, retrying"
                    );
                    if !self.delay.is_zero() {
                        thread::sleep(self.delay);
                    }
                    attempt += 1;
                }
            }
        }
    }
}
