use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::host::{CronHost, CronJob};
use crate::Result;

/// Handle under which the recurring auto-cleanup trigger is registered
pub const AUTO_CLEANUP_HANDLE: &str = "auto_cleanup";

/// Registration intent for the recurring auto-cleanup trigger. The timer
/// itself belongs to the host; this component only makes sure the single
/// registration exists (or does not), no matter how often callers ask.
pub struct CleanupScheduler {
    host: Arc<dyn CronHost>,
    interval: Duration,
}

impl CleanupScheduler {
    pub fn new(host: Arc<dyn CronHost>, interval: Duration) -> Self {
        Self { host, interval }
    }

    /// Register the recurring trigger. A no-op success when already registered.
    pub async fn schedule_cleanup_task(&self, job: CronJob) -> Result<()> {
        if self.host.next_run_time(AUTO_CLEANUP_HANDLE).await?.is_some() {
            debug!("Auto cleanup task already registered");
            return Ok(());
        }

        self.host
            .schedule(AUTO_CLEANUP_HANDLE, self.interval, job)
            .await?;
        info!(
            interval_secs = self.interval.as_secs(),
            "Auto cleanup task registered"
        );

        Ok(())
    }

    /// Remove the recurring trigger. A no-op success when not registered.
    pub async fn unschedule_cleanup_task(&self) -> Result<()> {
        if self.host.next_run_time(AUTO_CLEANUP_HANDLE).await?.is_none() {
            return Ok(());
        }

        self.host.unschedule(AUTO_CLEANUP_HANDLE).await?;
        info!("Auto cleanup task unregistered");

        Ok(())
    }

    /// Next fire time of the auto-cleanup trigger, if registered
    pub async fn next_run_time(&self) -> Result<Option<DateTime<Utc>>> {
        self.host.next_run_time(AUTO_CLEANUP_HANDLE).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::host::JobFuture;
    use crate::Error;
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn noop_job() -> CronJob {
        Arc::new(|| -> JobFuture { Box::pin(async {}) })
    }

    /// Records registrations without any real timers
    #[derive(Default)]
    struct RecordingHost {
        registered: Mutex<Vec<String>>,
        schedule_calls: Mutex<u32>,
        fail_next: Mutex<bool>,
    }

    #[async_trait]
    impl CronHost for RecordingHost {
        async fn schedule(&self, handle: &str, _interval: Duration, _job: CronJob) -> Result<()> {
            *self.schedule_calls.lock().unwrap() += 1;
            if *self.fail_next.lock().unwrap() {
                return Err(Error::Scheduling("host rejected the registration".to_string()));
            }
            self.registered.lock().unwrap().push(handle.to_string());
            Ok(())
        }

        async fn unschedule(&self, handle: &str) -> Result<()> {
            self.registered.lock().unwrap().retain(|h| h != handle);
            Ok(())
        }

        async fn next_run_time(&self, handle: &str) -> Result<Option<DateTime<Utc>>> {
            let registered = self.registered.lock().unwrap();
            Ok(registered
                .iter()
                .any(|h| h == handle)
                .then(|| Utc::now() + chrono::Duration::days(1)))
        }
    }

    #[tokio::test]
    async fn scheduling_twice_keeps_a_single_registration() {
        let host = Arc::new(RecordingHost::default());
        let scheduler = CleanupScheduler::new(Arc::clone(&host) as Arc<dyn CronHost>, Duration::from_secs(86400));

        scheduler.schedule_cleanup_task(noop_job()).await.unwrap();
        scheduler.schedule_cleanup_task(noop_job()).await.unwrap();

        assert_eq!(host.registered.lock().unwrap().len(), 1);
        // The second call never reached the host
        assert_eq!(*host.schedule_calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn unschedule_clears_the_registration_idempotently() {
        let host = Arc::new(RecordingHost::default());
        let scheduler = CleanupScheduler::new(Arc::clone(&host) as Arc<dyn CronHost>, Duration::from_secs(86400));

        scheduler.schedule_cleanup_task(noop_job()).await.unwrap();
        assert!(scheduler.next_run_time().await.unwrap().is_some());

        scheduler.unschedule_cleanup_task().await.unwrap();
        scheduler.unschedule_cleanup_task().await.unwrap();

        assert!(scheduler.next_run_time().await.unwrap().is_none());
        assert!(host.registered.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn host_failures_surface_without_mutating_state() {
        let host = Arc::new(RecordingHost::default());
        *host.fail_next.lock().unwrap() = true;
        let scheduler = CleanupScheduler::new(Arc::clone(&host) as Arc<dyn CronHost>, Duration::from_secs(86400));

        let result = scheduler.schedule_cleanup_task(noop_job()).await;
        assert!(matches!(result, Err(Error::Scheduling(_))));
        assert!(host.registered.lock().unwrap().is_empty());
        assert!(scheduler.next_run_time().await.unwrap().is_none());
    }
}
