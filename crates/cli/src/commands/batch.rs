//! `rxpilot batch`: one batch inference run.

use rxpilot_core::{DocumentStore, Notifier, TimingSink};
use rxpilot_store::InMemoryTimingSink;
use rxpilot_workflow::{BatchError, BatchRunner, BatchSummary, LogNotifier};
use std::sync::Arc;

pub async fn run(dry_run: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;

    let gateway = Arc::new(rxpilot_providers::build_gateway(&config)?);
    let store: Arc<dyn DocumentStore> = Arc::new(rxpilot_store::DocumentStoreClient::from_config(
        &config.document_store,
    ));

    let (sink, notifier): (Arc<dyn TimingSink>, Arc<dyn Notifier>) = if dry_run {
        (Arc::new(InMemoryTimingSink::new()), Arc::new(LogNotifier))
    } else {
        (
            rxpilot_store::open_timing_sink(&config.persistence.database_url)?,
            rxpilot_workflow::notifier_from_config(&config.mail),
        )
    };

    println!("rxpilot batch{}", if dry_run { " (dry run)" } else { "" });
    println!("   Store:    {}", config.document_store.base_url);
    println!("   Records:  {}", sink.name());
    println!("   Notify:   {}", notifier.name());
    println!("   Policy:   {:?}", config.batch.on_item_failure);
    println!();

    let runner = BatchRunner::from_config(&config, gateway, store, sink, notifier);
    match runner.run().await {
        Ok(summary) => {
            print_summary(&summary);
            if summary.is_success() {
                Ok(())
            } else {
                Err(format!("{} item(s) failed", summary.failures.len()).into())
            }
        }
        Err(e) => {
            if let BatchError::Aborted { summary, .. } = &e {
                print_summary(summary);
            }
            Err(e.into())
        }
    }
}

fn print_summary(summary: &BatchSummary) {
    println!("  Pending:   {}", summary.total);
    println!("  Processed: {}", summary.processed);
    for failure in &summary.failures {
        println!("  Failed:    {failure}");
    }
}
