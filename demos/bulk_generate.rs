//! Bulk-generate text for every row of a CSV against an OpenAI-compatible
//! API. Every dataset column is exposed to the templates under its own name.
//!
//! Usage:
//!
//! ```text
//! OPENAI_API_KEY=sk-... cargo run --example bulk_generate -- \
//!     input.csv output.csv \
//!     "You are a concise marketing copywriter." \
//!     "Write one sentence of copy about {product}."
//! ```
//!
//! Interrupt it mid-run and start it again: rows recorded in the
//! intermediate file are skipped.

use std::sync::Arc;

use anyhow::Context;
use promptsheet::{
    BatchProcessor, CheckpointStore, ColumnMapping, Dataset, OpenAiBackend, PromptPair,
    RequestExecutor,
};

const USAGE: &str = "usage: bulk_generate <input.csv> <output.csv> <system template> <user template>";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let input = args.next().context(USAGE)?;
    let output = args.next().context(USAGE)?;
    let system_template = args.next().context(USAGE)?;
    let user_template = args.next().context(USAGE)?;
    let api_key = std::env::var("OPENAI_API_KEY").context("OPENAI_API_KEY is not set")?;

    let dataset = Dataset::from_path(&input)?;
    let mapping = dataset
        .columns()
        .iter()
        .fold(ColumnMapping::new(), |m, c| m.map(c.as_str(), c.as_str()));
    let prompts = PromptPair::new(system_template, user_template);

    let backend = Arc::new(OpenAiBackend::new().with_api_key(api_key));
    let executor = RequestExecutor::new(backend, "https://api.openai.com", "gpt-4o-mini");
    let store = CheckpointStore::new("intermediate_responses.csv");

    let table = BatchProcessor::new()
        .run(&dataset, &mapping, &prompts, &executor, &store, |progress| {
            println!(
                "Processed batch {} of {}",
                progress.batch, progress.total_batches
            );
        })
        .await?;

    table.to_writer(std::fs::File::create(&output)?)?;
    println!("Wrote {} rows to {}", table.len(), output);
    Ok(())
}
