//! # promptsheet
//!
//! Resumable bulk text generation over tabular data.
//!
//! Takes a rectangular dataset (headered CSV), a mapping from columns to
//! template variables, and a system/user prompt template pair; sends one
//! completion request per row to an OpenAI-compatible service; and collects
//! the responses into an exportable table. Processing is strictly sequential,
//! throttle-aware, and resumable: partial results are checkpointed to disk
//! and a restarted run skips the rows it already finished.
//!
//! The surrounding presentation layer (file upload, column-mapping form,
//! download button) is not part of this crate. It is an external collaborator
//! that supplies the dataset, the mapping, the templates, a credential, and a
//! progress sink, and receives the final table.
//!
//! ## Core Concepts
//!
//! - **[`Dataset`]** — ordered rows with named columns, addressed by 0-based
//!   index.
//! - **[`ColumnMapping`]** — column name → template variable name; builds the
//!   per-row substitution context.
//! - **[`PromptPair`]** — system + user templates with `{variable}`
//!   placeholders.
//! - **[`CompletionBackend`]** — the single point of service coupling,
//!   returning a tagged [`Completion`] outcome. Swap in [`MockBackend`] for
//!   tests.
//! - **[`RequestExecutor`]** — renders and sends one row, retrying throttled
//!   attempts with exponential backoff per its [`RetryPolicy`].
//! - **[`BatchProcessor`]** — drives the whole run: batching, resumption,
//!   checkpointing, progress reporting.
//! - **[`CheckpointStore`]** — sole owner of the intermediate-results file.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use promptsheet::{
//!     BatchProcessor, CheckpointStore, ColumnMapping, Dataset, OpenAiBackend,
//!     PromptPair, RequestExecutor,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dataset = Dataset::from_path("products.csv")?;
//!     let mapping = ColumnMapping::new()
//!         .map("product_name", "name")
//!         .map("product_topic", "topic");
//!     let prompts = PromptPair::new(
//!         "You are a copywriter for {name}.",
//!         "Write a short blurb about {topic}.",
//!     );
//!
//!     let backend = Arc::new(OpenAiBackend::new().with_api_key("sk-..."));
//!     let executor = RequestExecutor::new(backend, "https://api.openai.com", "gpt-4o-mini");
//!     let store = CheckpointStore::new("intermediate_responses.csv");
//!
//!     let table = BatchProcessor::new()
//!         .run(&dataset, &mapping, &prompts, &executor, &store, |progress| {
//!             println!("Processed batch {} of {}", progress.batch, progress.total_batches);
//!         })
//!         .await?;
//!
//!     table.to_writer(std::fs::File::create("responses.csv")?)?;
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod checkpoint;
pub mod dataset;
pub mod error;
pub mod executor;
pub mod processor;
pub mod prompt;

pub use backend::{Completion, CompletionBackend, CompletionRequest, MockBackend, OpenAiBackend};
pub use checkpoint::{Checkpoint, CheckpointStore, ProcessingRecord};
pub use dataset::{ColumnMapping, Dataset, ResultTable, Row, RESPONSE_COLUMN};
pub use error::{Error, Result, TemplateError};
pub use executor::{RequestExecutor, RetryPolicy};
pub use processor::{BatchProcessor, BatchProgress};
pub use prompt::{render, PromptPair, RenderedPrompts};
