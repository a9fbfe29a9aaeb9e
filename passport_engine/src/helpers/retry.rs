use std::{fmt::Display, future::Future, time::Duration};

use log::*;
use rand::Rng;

/// How often, and how patiently, a best-effort cache operation is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Delay before the n-th retry is `n * backoff`.
    pub backoff: Duration,
    /// A random extra delay of up to `jitter` is added to every retry delay.
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, backoff: Duration::ZERO, jitter: Duration::ZERO }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts, ..Default::default() }
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    fn delay_before_retry(&self, retry: u32) -> Duration {
        let jitter = if self.jitter.is_zero() {
            Duration::ZERO
        } else {
            let max_millis = u64::try_from(self.jitter.as_millis()).unwrap_or(u64::MAX);
            Duration::from_millis(rand::thread_rng().gen_range(0..=max_millis))
        };
        self.backoff.checked_mul(retry).unwrap_or(Duration::MAX).saturating_add(jitter)
    }
}

/// Invokes `op(arg)` until it succeeds or the policy's attempts are used up.
///
/// Returns the number of attempts made together with the result of the last one. At least one attempt is always made.
pub async fn do_cache_op_with_retry<A, T, E, F, Fut>(policy: &RetryPolicy, arg: A, mut op: F) -> (u32, Result<T, E>)
where
    A: Clone + Display,
    E: Display,
    F: FnMut(A) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(arg.clone()).await {
            Ok(v) => return (attempt, Ok(v)),
            Err(e) if attempt >= max_attempts => {
                warn!("🧠️ Cache operation for {arg} failed after {attempt} attempts. {e}");
                return (attempt, Err(e));
            },
            Err(e) => {
                debug!("🧠️ Cache operation for {arg} failed on attempt {attempt}. {e}");
                let delay = policy.delay_before_retry(attempt);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                attempt += 1;
            },
        }
    }
}
