use anyhow::Result;
use chrono::Duration;

use stalesweep_core::{
    storage::{CleanupLogRepository, Database},
    AppConfig,
};

pub async fn run(db: &Database, config: &AppConfig, days: u32) -> Result<()> {
    let repo = CleanupLogRepository::new(db);

    repo.fail_abandoned_runs(Duration::seconds(config.cleanup.run_timeout_secs as i64))
        .await?;

    let stats = repo.get_cleanup_statistics(days).await?;
    let totals = &stats.total_stats;

    println!("Cleanup statistics, last {} days:\n", stats.period_days);
    println!(
        "  runs: {} ({} completed, {} failed)",
        totals.total_cleanups, totals.successful_cleanups, totals.failed_cleanups
    );
    println!("  articles deleted: {}", totals.total_deleted);

    if !stats.type_stats.is_empty() {
        println!("\n  By type:");
        for entry in &stats.type_stats {
            println!(
                "    {}: {} runs, {} deleted",
                entry.cleanup_type, entry.count, entry.deleted_count
            );
        }
    }

    if !stats.daily_stats.is_empty() {
        println!("\n  By day:");
        for entry in &stats.daily_stats {
            println!(
                "    {}: {} runs, {} deleted",
                entry.date, entry.cleanups, entry.deleted
            );
        }
    }

    Ok(())
}
