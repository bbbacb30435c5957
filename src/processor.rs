//! Resumable batched processing of a dataset.
//!
//! [`BatchProcessor`] drives the whole run: it iterates row indices in fixed
//! batches, skips rows already present in a reloaded checkpoint, invokes the
//! executor per row, periodically rewrites the checkpoint, reports batch
//! progress to the caller's sink, and produces the final exportable table.
//!
//! All work is strictly sequential. The only suspension point is the backoff
//! sleep inside the executor, which blocks the whole pipeline on purpose: the
//! remote service's rate limit is global to the credential, not per-row.

use std::collections::HashSet;

use log::info;
use serde::{Deserialize, Serialize};

use crate::checkpoint::{CheckpointStore, ProcessingRecord};
use crate::dataset::{ColumnMapping, Dataset, ResultTable, RESPONSE_COLUMN};
use crate::error::Result;
use crate::executor::RequestExecutor;
use crate::prompt::PromptPair;

/// Progress update emitted after each completed batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchProgress {
    /// 1-based number of the batch that just finished.
    pub batch: usize,

    /// Total number of batches in this run.
    pub total_batches: usize,
}

/// Orchestrates a resumable, sequential run over the dataset.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use promptsheet::{
///     BatchProcessor, CheckpointStore, ColumnMapping, Dataset, MockBackend,
///     PromptPair, RequestExecutor,
/// };
///
/// # #[tokio::main]
/// # async fn main() -> promptsheet::Result<()> {
/// let dataset = Dataset::from_path("input.csv")?;
/// let mapping = ColumnMapping::new().map("product", "p");
/// let prompts = PromptPair::new("You are a copywriter.", "Describe {p}.");
/// let executor = RequestExecutor::new(
///     Arc::new(MockBackend::fixed("placeholder")),
///     "http://unused",
///     "mock-model",
/// );
/// let store = CheckpointStore::new("intermediate_responses.csv");
///
/// let table = BatchProcessor::new()
///     .run(&dataset, &mapping, &prompts, &executor, &store, |progress| {
///         println!("Processed batch {} of {}", progress.batch, progress.total_batches);
///     })
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct BatchProcessor {
    batch_size: usize,
    checkpoint_interval: usize,
}

impl Default for BatchProcessor {
    fn default() -> Self {
        Self {
            batch_size: 10,
            checkpoint_interval: 10,
        }
    }
}

impl BatchProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the batch size (rows per progress update). Clamped to 1+.
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Override how often, in row indices, the checkpoint is rewritten.
    /// Clamped to 1+.
    pub fn with_checkpoint_interval(mut self, interval: usize) -> Self {
        self.checkpoint_interval = interval.max(1);
        self
    }

    /// Run the dataset through the executor, resuming from `store` when a
    /// prior checkpoint exists.
    ///
    /// Per row: skip if its index is in the checkpoint's done-set, otherwise
    /// execute; a row whose executor call yields no text (or empty text) is
    /// silently excluded from the output. Best-effort, not a completeness
    /// guarantee. The checkpoint is rewritten in full after every processed
    /// row whose index is a multiple of the checkpoint interval (including
    /// index 0).
    ///
    /// On completion the records loaded from the checkpoint and the newly
    /// processed ones are merged by row index into a [`ResultTable`], the
    /// checkpoint file is removed, and the table returned.
    pub async fn run<F>(
        &self,
        dataset: &Dataset,
        mapping: &ColumnMapping,
        prompts: &PromptPair,
        executor: &RequestExecutor,
        store: &CheckpointStore,
        mut on_progress: F,
    ) -> Result<ResultTable>
    where
        F: FnMut(BatchProgress),
    {
        mapping.validate(dataset)?;

        let (mut records, done) = match store.load()? {
            Some(checkpoint) => {
                info!(
                    "resuming from checkpoint: {} rows already processed",
                    checkpoint.records.len()
                );
                let done = checkpoint.done_indices();
                (checkpoint.records, done)
            }
            None => (Vec::new(), HashSet::new()),
        };

        let total_batches = dataset.len().div_ceil(self.batch_size);
        for batch in 0..total_batches {
            let start = batch * self.batch_size;
            let end = (start + self.batch_size).min(dataset.len());

            for row in dataset.rows().skip(start).take(end - start) {
                let index = row.index();
                if done.contains(&index) {
                    continue;
                }

                if let Some(text) = executor.execute(&row, mapping, prompts).await? {
                    if !text.is_empty() {
                        records.push(ProcessingRecord {
                            index,
                            values: row.values().to_vec(),
                            response: text,
                        });
                    }
                }

                if index % self.checkpoint_interval == 0 {
                    store.save(dataset.columns(), &records)?;
                }
            }

            on_progress(BatchProgress {
                batch: batch + 1,
                total_batches,
            });
        }

        records.sort_by_key(|record| record.index);
        info!(
            "run complete: {} of {} rows produced a response",
            records.len(),
            dataset.len()
        );

        let mut columns = dataset.columns().to_vec();
        columns.push(RESPONSE_COLUMN.to_string());
        let rows = records
            .into_iter()
            .map(|record| {
                let ProcessingRecord {
                    values: mut row,
                    response,
                    ..
                } = record;
                row.push(response);
                row
            })
            .collect();
        let table = ResultTable::new(columns, rows);

        store.clear()?;
        Ok(table)
    }
}
