//! Generation client — transforms a document through the provider with bounded retries.
//!
//! The retry contract is an explicit state machine:
//!
//! ```text
//! Attempting(n) ──ok──────────────────────────────▶ Succeeded
//!       │
//!       └─err─┬─ retryable && n < max ─▶ BackingOff(delay) ─▶ Attempting(n + 1)
//!             └─ otherwise ─────────────────────────────────▶ Failed
//! ```
//!
//! Transitions are computed by [`RetryPolicy::on_outcome`], a pure function, and the
//! delay is served by an injected [`Sleeper`], so the whole contract is testable
//! without waiting on a real clock.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use crate::document::Document;
use crate::generation::instruction::TransformInstruction;
use crate::llm_client::{strip_code_fences, GenerationProvider, ProviderError};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(2000);

/// Substrings (case-sensitive) that mark a provider error as transient.
const RETRYABLE_MARKERS: &[&str] = &[
    "429",
    "503",
    "overloaded",
    "Service Unavailable",
    "Too Many Requests",
];

pub fn is_retryable(message: &str) -> bool {
    RETRYABLE_MARKERS.iter().any(|m| message.contains(m))
}

/// The provider gave up: either a terminal error or the retry budget ran out.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("generation failed after {attempts} attempt(s): {message}")]
pub struct GenerationError {
    pub attempts: u32,
    pub message: String,
    /// Whether the last failure was transient (rate limit, overload).
    pub retryable: bool,
}

// ────────────────────────────────────────────────────────────────────────────
// Retry state machine
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryState {
    Attempting(u32),
    BackingOff { next_attempt: u32, delay: Duration },
    Succeeded(Document),
    Failed(GenerationError),
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// `base_delay * 2^(attempt-1)`: 2s, 4s, 8s for the default policy.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exponent)
    }

    /// Next state after attempt `attempt` finished with `outcome`.
    pub fn on_outcome(&self, attempt: u32, outcome: Result<Document, ProviderError>) -> RetryState {
        match outcome {
            Ok(document) => RetryState::Succeeded(document),
            Err(error) => {
                let retryable = is_retryable(&error.message);
                if retryable && attempt < self.max_attempts {
                    RetryState::BackingOff {
                        next_attempt: attempt + 1,
                        delay: self.delay_after(attempt),
                    }
                } else {
                    RetryState::Failed(GenerationError {
                        attempts: attempt,
                        message: error.message,
                        retryable,
                    })
                }
            }
        }
    }
}

/// Suspends the current task. Swapped for a recording fake in tests.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Client
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct GenerationClient {
    provider: Arc<dyn GenerationProvider>,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl GenerationClient {
    pub fn new(
        provider: Arc<dyn GenerationProvider>,
        policy: RetryPolicy,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            provider,
            policy,
            sleeper,
        }
    }

    /// Runs the instruction against the provider and returns the unwrapped document.
    /// `original` is only read; the transformed text is a new `Document`.
    pub async fn transform(
        &self,
        instruction: &TransformInstruction,
        original: &Document,
    ) -> Result<Document, GenerationError> {
        let max = self.policy.max_attempts;
        let mut state = RetryState::Attempting(1);

        loop {
            state = match state {
                RetryState::Attempting(attempt) => {
                    info!(
                        "Generation attempt {attempt}/{max} (model: {}, original: {} chars)",
                        self.provider.model(),
                        original.len()
                    );
                    let outcome = self
                        .provider
                        .generate(instruction.as_str())
                        .await
                        .map(|raw| Document::from(strip_code_fences(&raw)));
                    if let Err(e) = &outcome {
                        warn!("Generation attempt {attempt}/{max} failed: {e}");
                    }
                    self.policy.on_outcome(attempt, outcome)
                }
                RetryState::BackingOff {
                    next_attempt,
                    delay,
                } => {
                    warn!("Retrying generation in {}ms...", delay.as_millis());
                    self.sleeper.sleep(delay).await;
                    RetryState::Attempting(next_attempt)
                }
                RetryState::Succeeded(document) => {
                    info!("Generation produced {} chars", document.len());
                    return Ok(document);
                }
                RetryState::Failed(error) => return Err(error),
            };
        }
    }
}
