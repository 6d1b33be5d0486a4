use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{error, info};

use stalesweep_core::{
    cleanup::CleanupExecutor,
    scheduler::{CleanupScheduler, CronJob, JobFuture, TokioTimerHost},
    storage::Database,
    AppConfig,
};

pub async fn run(db: Arc<Database>, config: Arc<AppConfig>) -> Result<()> {
    let executor = Arc::new(CleanupExecutor::new(Arc::clone(&db), Arc::clone(&config)));
    let host = Arc::new(TokioTimerHost::new());
    let scheduler = CleanupScheduler::new(
        host,
        Duration::from_secs(config.schedule.auto_interval_secs),
    );

    let job: CronJob = {
        let executor = Arc::clone(&executor);
        Arc::new(move || -> JobFuture {
            let executor = Arc::clone(&executor);
            Box::pin(async move {
                // A failing run must never take the host down with it
                match executor.run_auto_cleanup().await {
                    Ok(Some(outcome)) => {
                        info!(
                            deleted = outcome.deleted_count,
                            failed = outcome.failed_count,
                            "Automatic cleanup finished"
                        );
                    }
                    Ok(None) => {}
                    Err(e) => error!(error = %e, "Automatic cleanup run failed"),
                }
            })
        })
    };

    scheduler.schedule_cleanup_task(job).await?;

    if let Some(next) = scheduler.next_run_time().await? {
        println!("Scheduler running; next cleanup at {}.", next.format("%Y-%m-%d %H:%M"));
    }
    println!("Press Ctrl-C to stop.");

    tokio::signal::ctrl_c().await?;

    scheduler.unschedule_cleanup_task().await?;
    println!("Scheduler stopped.");

    Ok(())
}
