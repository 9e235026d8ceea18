// ABOUTME: Cron-driven daily ingestion pass built on tokio-cron-scheduler.
// ABOUTME: start() is idempotent and stop() shuts the scheduler down; a failing pass is logged, never fatal.

use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::error::FeedError;
use crate::ingest::Intake;

/// Every day at 09:00 (seconds field first).
pub const DEFAULT_SCHEDULE: &str = "0 0 9 * * *";

pub struct IntakeScheduler {
    intake: Intake,
    schedule: String,
    running: Mutex<Option<JobScheduler>>,
}

impl IntakeScheduler {
    pub fn new(intake: Intake, schedule: impl Into<String>) -> Self {
        Self {
            intake,
            schedule: schedule.into(),
            running: Mutex::new(None),
        }
    }

    pub fn schedule(&self) -> &str {
        &self.schedule
    }

    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    /// Starts the daily job. Calling it again while running does nothing.
    pub async fn start(&self) -> Result<(), FeedError> {
        let mut running = self.running.lock().await;
        if running.is_some() {
            tracing::info!("RSS scheduler already running");
            return Ok(());
        }

        let sched = JobScheduler::new()
            .await
            .map_err(|e| FeedError::config(format!("creating scheduler: {}", e)))?;
        let intake = self.intake.clone();
        let job = Job::new_async(self.schedule.as_str(), move |_uuid, _l| {
            let intake = intake.clone();
            Box::pin(async move {
                tracing::info!("starting scheduled RSS check");
                let summary = intake.run_pass().await;
                tracing::info!(message = %summary.message, "scheduled RSS check completed");
            })
        })
        .map_err(|e| FeedError::config(format!("invalid schedule {:?}: {}", self.schedule, e)))?;
        sched
            .add(job)
            .await
            .map_err(|e| FeedError::config(format!("adding scheduler job: {}", e)))?;
        sched
            .start()
            .await
            .map_err(|e| FeedError::config(format!("starting scheduler: {}", e)))?;

        tracing::info!(schedule = %self.schedule, "daily RSS scheduler started");
        *running = Some(sched);
        Ok(())
    }

    pub async fn stop(&self) {
        let Some(mut sched) = self.running.lock().await.take() else {
            return;
        };
        if let Err(err) = sched.shutdown().await {
            tracing::warn!(error = %err, "RSS scheduler shutdown failed");
        }
        tracing::info!("RSS scheduler stopped");
    }
}
