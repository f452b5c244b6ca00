//! Periodic batch runs on a cron schedule.

use crate::batch::BatchRunner;
use rxpilot_core::cron::CronExpr;
use chrono::{DateTime, Utc};
use rxpilot_config::BatchConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

const POLL_INTERVAL: Duration = Duration::from_secs(30);

pub struct BatchScheduler {
    schedule: CronExpr,
    runner: Arc<BatchRunner>,
}

impl BatchScheduler {
    pub fn new(schedule: CronExpr, runner: Arc<BatchRunner>) -> Self {
        Self { schedule, runner }
    }

    /// A scheduler for `batch.schedule`, or `None` when no schedule is set.
    pub fn from_config(config: &BatchConfig, runner: Arc<BatchRunner>) -> Result<Option<Self>, String> {
        config
            .schedule
            .as_deref()
            .map(|expr| CronExpr::parse(expr).map(|schedule| Self::new(schedule, runner)))
            .transpose()
    }

    pub fn schedule(&self) -> &CronExpr {
        &self.schedule
    }

    /// Whether a run is due at `now`, given the previous run.
    pub fn is_due(&self, now: &DateTime<Utc>, last_run: Option<&DateTime<Utc>>) -> bool {
        self.schedule.matches(now)
            && last_run.is_none_or(|last| minute_of(last) != minute_of(now))
    }

    /// Run the batch if due. Returns whether a run was started.
    ///
    /// The run is awaited here, so ticks never overlap.
    pub async fn tick(&self, now: DateTime<Utc>, last_run: &mut Option<DateTime<Utc>>) -> bool {
        if !self.is_due(&now, last_run.as_ref()) {
            return false;
        }
        *last_run = Some(now);

        info!(schedule = %self.schedule, "Scheduled batch triggered");
        match self.runner.run().await {
            Ok(summary) => debug!(processed = summary.processed, total = summary.total, "Scheduled batch done"),
            Err(e) => error!(error = %e, "Scheduled batch failed"),
        }
        true
    }

    /// Spawn the polling loop.
    pub fn start(self) -> JoinHandle<()> {
        info!(schedule = %self.schedule, "Batch scheduler started");
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(POLL_INTERVAL);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut last_run = None;
            loop {
                interval.tick().await;
                self.tick(Utc::now(), &mut last_run).await;
            }
        })
    }
}

fn minute_of(at: &DateTime<Utc>) -> i64 {
    at.timestamp().div_euclid(60)
}
