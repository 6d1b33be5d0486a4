use std::sync::Arc;

use anyhow::Result;
use uuid::Uuid;

use stalesweep_core::{cleanup::CleanupExecutor, storage::Database, AppConfig};

pub async fn run(
    db: Arc<Database>,
    config: Arc<AppConfig>,
    actor: Uuid,
    threshold_days: Option<u32>,
) -> Result<()> {
    let executor = CleanupExecutor::new(db, config);
    let outcome = executor.trigger_manual_cleanup(actor, threshold_days).await?;

    if outcome.deleted_count == 0 && outcome.failed_count == 0 {
        println!("No articles needed cleanup.");
    } else {
        println!(
            "Cleanup finished: {} deleted, {} failed.",
            outcome.deleted_count, outcome.failed_count
        );
    }

    for failure in &outcome.errors {
        println!("  failed {}: {}", failure.article_id, failure.reason);
    }

    println!("Run id: {}", outcome.run_id);

    Ok(())
}
