use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::{Error, Result};

/// One tick's worth of work, produced by the job factory on every fire
pub type JobFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// A recurring job as the timer host sees it
pub type CronJob = Arc<dyn Fn() -> JobFuture + Send + Sync>;

/// The cron/timer host interface. The host owns the actual timers; callers
/// only express registration intent against named handles.
#[async_trait]
pub trait CronHost: Send + Sync {
    /// Register `job` to fire every `interval`. Fails if the handle is taken.
    async fn schedule(&self, handle: &str, interval: Duration, job: CronJob) -> Result<()>;

    /// Remove a registration. Unknown handles are a no-op.
    async fn unschedule(&self, handle: &str) -> Result<()>;

    /// Next fire time for a handle, if registered
    async fn next_run_time(&self, handle: &str) -> Result<Option<DateTime<Utc>>>;
}

struct Registration {
    next_run: Arc<Mutex<DateTime<Utc>>>,
    task: JoinHandle<()>,
}

/// Tokio-backed timer host: one interval task per registration
#[derive(Default)]
pub struct TokioTimerHost {
    registrations: Mutex<HashMap<String, Registration>>,
}

impl TokioTimerHost {
    pub fn new() -> Self {
        Self::default()
    }
}

fn registry_poisoned() -> Error {
    Error::Scheduling("timer host registry poisoned".to_string())
}

#[async_trait]
impl CronHost for TokioTimerHost {
    async fn schedule(&self, handle: &str, interval: Duration, job: CronJob) -> Result<()> {
        let period = chrono::Duration::from_std(interval)
            .map_err(|_| Error::Scheduling(format!("interval out of range: {:?}", interval)))?;

        let mut registrations = self.registrations.lock().map_err(|_| registry_poisoned())?;
        if registrations.contains_key(handle) {
            return Err(Error::Scheduling(format!(
                "task '{}' is already registered",
                handle
            )));
        }

        let next_run = Arc::new(Mutex::new(Utc::now() + period));
        let task = tokio::spawn({
            let next_run = Arc::clone(&next_run);
            async move {
                let mut ticker = tokio::time::interval(interval);
                // An interval's first tick fires immediately; the first real
                // run is one period out
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    if let Ok(mut next) = next_run.lock() {
                        *next = Utc::now() + period;
                    }
                    job().await;
                }
            }
        });

        registrations.insert(handle.to_string(), Registration { next_run, task });
        debug!(handle, ?interval, "Registered recurring task");

        Ok(())
    }

    async fn unschedule(&self, handle: &str) -> Result<()> {
        let mut registrations = self.registrations.lock().map_err(|_| registry_poisoned())?;
        if let Some(registration) = registrations.remove(handle) {
            registration.task.abort();
            debug!(handle, "Removed recurring task");
        }

        Ok(())
    }

    async fn next_run_time(&self, handle: &str) -> Result<Option<DateTime<Utc>>> {
        let registrations = self.registrations.lock().map_err(|_| registry_poisoned())?;
        match registrations.get(handle) {
            Some(registration) => {
                let next = registration.next_run.lock().map_err(|_| registry_poisoned())?;
                Ok(Some(*next))
            }
            None => Ok(None),
        }
    }
}

impl Drop for TokioTimerHost {
    fn drop(&mut self) {
        if let Ok(registrations) = self.registrations.get_mut() {
            for registration in registrations.values() {
                registration.task.abort();
            }
        }
    }
}
