//! Scripted backend for tests and offline runs.
//!
//! [`MockBackend`] returns pre-configured [`Completion`] outcomes in order,
//! allowing downstream consumers to write deterministic tests against this
//! crate, including throttling and failure sequences.
//!
//! # Example
//!
//! ```
//! use promptsheet::backend::{Completion, MockBackend};
//!
//! let mock = MockBackend::new(vec![
//!     Completion::Throttled { retry_after: None },
//!     Completion::Generated("Hello, world!".to_string()),
//! ]);
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use reqwest::Client;

use super::{Completion, CompletionBackend, CompletionRequest};

/// A test backend that returns scripted outcomes in order.
///
/// Cycles back to the beginning when all outcomes have been consumed. The
/// call counter lets tests assert exactly how many attempts were made.
#[derive(Debug)]
pub struct MockBackend {
    outcomes: Vec<Completion>,
    index: AtomicUsize,
}

impl MockBackend {
    /// Create a mock backend with the given scripted outcomes.
    pub fn new(outcomes: Vec<Completion>) -> Self {
        assert!(
            !outcomes.is_empty(),
            "MockBackend requires at least one outcome"
        );
        Self {
            outcomes,
            index: AtomicUsize::new(0),
        }
    }

    /// Create a mock that always generates the same text.
    pub fn fixed(text: impl Into<String>) -> Self {
        Self::new(vec![Completion::Generated(text.into())])
    }

    /// Number of completion calls made so far.
    pub fn calls(&self) -> usize {
        self.index.load(Ordering::Relaxed)
    }

    fn next_outcome(&self) -> Completion {
        let idx = self.index.fetch_add(1, Ordering::Relaxed) % self.outcomes.len();
        self.outcomes[idx].clone()
    }
}

#[async_trait]
impl CompletionBackend for MockBackend {
    async fn complete(
        &self,
        _client: &Client,
        _base_url: &str,
        _request: &CompletionRequest,
    ) -> Completion {
        self.next_outcome()
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
