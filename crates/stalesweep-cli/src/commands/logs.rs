use anyhow::Result;
use chrono::Duration;

use stalesweep_core::{
    cleanup::CleanupLogFilter,
    storage::{CleanupLogRepository, Database},
    AppConfig,
};

pub async fn run(db: &Database, config: &AppConfig, filter: CleanupLogFilter) -> Result<()> {
    let repo = CleanupLogRepository::new(db);

    // Stranded runs surface as failed, not eternally running
    repo.fail_abandoned_runs(Duration::seconds(config.cleanup.run_timeout_secs as i64))
        .await?;

    let history = repo.get_cleanup_logs(&filter).await?;

    if history.logs.is_empty() {
        println!("No cleanup runs recorded.");
        return Ok(());
    }

    println!(
        "Cleanup runs (page {} of {}, {} total):\n",
        history.page, history.total_pages, history.total
    );

    for run in &history.logs {
        let completed = run
            .completed_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());

        println!(
            "  {} [{}] {}",
            run.started_at.format("%Y-%m-%d %H:%M"),
            run.cleanup_type,
            run.status
        );
        println!(
            "    deleted: {}, threshold: {} days, completed: {}",
            run.articles_deleted, run.threshold_days, completed
        );
        if let Some(actor) = run.triggered_by {
            println!("    triggered by: {}", actor);
        }
        if let Some(error) = &run.error_message {
            println!("    errors: {}", error);
        }
        println!();
    }

    Ok(())
}
