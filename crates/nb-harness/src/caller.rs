//! Generation calls with bounded exponential backoff.
//!
//! A trial either gets a complete generation or the run stops. Retries
//! never degrade into a partial result: after the last attempt the failure
//! is escalated to the orchestrator.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::client::ClientError;

/// A text generation service.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a reply to `prompt`. Errors are classified by [`classify`].
    async fn generate(&self, prompt: &str, max_output_tokens: u32) -> Result<String, ClientError>;
}

/// Whether a failure is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Network, rate limit, server side or malformed reply
    Transient,
    /// Local misconfiguration; retrying cannot help
    Fatal,
}

/// Classify a client error.
pub fn classify(error: &ClientError) -> FailureClass {
    match error {
        ClientError::MissingApiKey | ClientError::InvalidConfig(_) => FailureClass::Fatal,
        ClientError::Http(e) if e.is_builder() => FailureClass::Fatal,
        ClientError::Http(_) | ClientError::Api { .. } | ClientError::Malformed(_) => {
            FailureClass::Transient
        }
    }
}

/// Retry budget for a single call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first
    pub attempts_max: u32,
    /// Delay after the first failed attempt; doubles after each further one
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts_max: 5,
            backoff_base: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay after failed attempt `attempt` (0-based): `base * 2^attempt`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff_base.saturating_mul(1u32 << attempt.min(31))
    }

    /// Every delay the policy can sleep, in order.
    pub fn schedule(&self) -> Vec<Duration> {
        (0..self.attempts_max.saturating_sub(1))
            .map(|a| self.delay_after(a))
            .collect()
    }
}

/// A successful generation.
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    /// Generated text
    pub text: String,
    /// Latency of the successful attempt
    pub elapsed: Duration,
    /// Attempts used, including the successful one
    pub attempts: u32,
}

/// Escalated call failures.
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    #[error("Gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: ClientError },

    #[error("Non-retryable failure: {0}")]
    Fatal(ClientError),
}

/// Wraps a generator with a retry policy.
///
/// Each call gets a fresh budget; there is no state shared between calls.
pub struct ResilientCaller<G> {
    generator: G,
    policy: RetryPolicy,
}

impl<G: TextGenerator> ResilientCaller<G> {
    /// Wrap `generator`.
    pub fn new(generator: G, policy: RetryPolicy) -> Self {
        debug_assert!(policy.attempts_max > 0, "Need at least one attempt");
        Self { generator, policy }
    }

    /// The active policy.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// The wrapped generator.
    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// Generate with retries.
    pub async fn generate(&self, prompt: &str, max_output_tokens: u32) -> Result<Generation, CallError> {
        let mut attempt = 0;
        loop {
            let start = Instant::now();
            let error = match self.generator.generate(prompt, max_output_tokens).await {
                Ok(text) => {
                    let elapsed = start.elapsed();
                    debug!(attempt, elapsed_ms = elapsed.as_millis() as u64, "generation succeeded");
                    return Ok(Generation {
                        text,
                        elapsed,
                        attempts: attempt + 1,
                    });
                }
                Err(e) => e,
            };

            if classify(&error) == FailureClass::Fatal {
                return Err(CallError::Fatal(error));
            }

            if attempt + 1 >= self.policy.attempts_max {
                return Err(CallError::Exhausted {
                    attempts: attempt + 1,
                    last: error,
                });
            }

            let delay = self.policy.delay_after(attempt);
            warn!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "transient generation failure, backing off"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
