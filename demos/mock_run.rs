//! Offline run against the scripted mock backend. No service or credential
//! needed; demonstrates batching, throttle retry, and checkpoint cleanup.
//!
//! Run with: `cargo run --example mock_run`

use std::sync::Arc;

use promptsheet::{
    BatchProcessor, CheckpointStore, ColumnMapping, Completion, Dataset, MockBackend, PromptPair,
    RequestExecutor, RetryPolicy,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let csv = "\
name,topic
Ada,analytical engines
Grace,compilers
Linus,version control
";
    let dataset = Dataset::from_reader(csv.as_bytes())?;
    let mapping = ColumnMapping::new().map("name", "n").map("topic", "t");
    let prompts = PromptPair::new("You are {n}.", "Write one line about {t}.");

    // The second row gets throttled once before succeeding, so the retry
    // path is visible in the logs (RUST_LOG=warn).
    let backend = Arc::new(MockBackend::new(vec![
        Completion::Generated("A line about analytical engines.".into()),
        Completion::Throttled { retry_after: None },
        Completion::Generated("A line about compilers.".into()),
        Completion::Generated("A line about version control.".into()),
    ]));
    let executor = RequestExecutor::new(backend, "http://unused", "mock-model")
        .with_policy(RetryPolicy::new(3, std::time::Duration::from_millis(100)));
    let store = CheckpointStore::new("mock_responses.partial.csv");

    let table = BatchProcessor::new()
        .run(&dataset, &mapping, &prompts, &executor, &store, |progress| {
            println!(
                "Processed batch {} of {}",
                progress.batch, progress.total_batches
            );
        })
        .await?;

    print!("{}", table.to_csv_string()?);
    Ok(())
}
