//! Completion backend trait and normalized request/outcome types.
//!
//! The [`CompletionBackend`] trait abstracts over text-generation providers.
//! It is the single point of external-service coupling: everything above it
//! sees only a [`CompletionRequest`] going in and a [`Completion`] outcome
//! coming out.
//!
//! ```text
//! RequestExecutor ──► CompletionRequest ──► CompletionBackend::complete() ──► Completion
//!                                                    │
//!                                          ┌─────────┴─────────┐
//!                                     OpenAiBackend        MockBackend
//!                                  /v1/chat/completions   scripted outcomes
//! ```

pub mod mock;
pub mod openai;

pub use mock::MockBackend;
pub use openai::OpenAiBackend;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

/// A normalized completion request. Provider-agnostic.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Model identifier (e.g. `"gpt-4o-mini"`).
    pub model: String,

    /// Rendered system prompt.
    pub system_prompt: String,

    /// Rendered user prompt.
    pub user_prompt: String,
}

/// The outcome of one completion attempt.
///
/// A tagged result rather than an error hierarchy: the retry loop in
/// [`RequestExecutor`](crate::executor::RequestExecutor) matches on the tag
/// and stays decoupled from any provider's failure types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The service produced text. Backends trim surrounding whitespace.
    Generated(String),

    /// The service signalled rate limiting. The attempt may be retried.
    Throttled {
        /// Parsed `Retry-After` hint, when the provider sent one.
        retry_after: Option<Duration>,
    },

    /// Any other failure: transport, auth, malformed response, empty choice
    /// list. Not transient for this row; never retried.
    Failed(String),
}

/// Abstraction over text-generation providers.
///
/// Implementors translate a [`CompletionRequest`] into one provider call and
/// fold every possible result into a [`Completion`] tag.
///
/// # Object Safety
///
/// This trait is object-safe and designed to be used as `Arc<dyn CompletionBackend>`.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Execute one completion attempt.
    ///
    /// Never fails at the type level: all failure modes are folded into the
    /// returned [`Completion`].
    async fn complete(
        &self,
        client: &Client,
        base_url: &str,
        request: &CompletionRequest,
    ) -> Completion;

    /// Human-readable name for logging and diagnostics.
    fn name(&self) -> &'static str;
}
