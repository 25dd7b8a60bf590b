//! The `Scheduler` capability trait (spec §3 "Ownership": the Scheduler
//! owns cron job and run-log collections; callers see only this surface).
//! [`CronScheduler`](super::tokio_scheduler::CronScheduler) is the sole
//! implementation; the trait exists so a caller (the CLI binary, a future
//! IPC layer) can depend on the capability without the concrete tick-loop
//! type.

use crate::error::SchedulerError;
use crate::model::{CronJob, RunLog};

pub trait Scheduler: Send + Sync {
    fn add_job(&self, job: CronJob) -> Result<(), SchedulerError>;
    fn remove_job(&self, id: &str) -> Result<(), SchedulerError>;
    fn set_enabled(&self, id: &str, enabled: bool) -> Result<(), SchedulerError>;
    fn list_jobs(&self) -> Vec<CronJob>;
    fn run_logs(&self, job_id: &str) -> Vec<RunLog>;
}

impl Scheduler for super::tokio_scheduler::CronScheduler {
    fn add_job(&self, job: CronJob) -> Result<(), SchedulerError> {
        super::tokio_scheduler::CronScheduler::add_job(self, job)
    }

    fn remove_job(&self, id: &str) -> Result<(), SchedulerError> {
        super::tokio_scheduler::CronScheduler::remove_job(self, id)
    }

    fn set_enabled(&self, id: &str, enabled: bool) -> Result<(), SchedulerError> {
        super::tokio_scheduler::CronScheduler::set_enabled(self, id, enabled)
    }

    fn list_jobs(&self) -> Vec<CronJob> {
        super::tokio_scheduler::CronScheduler::list_jobs(self)
    }

    fn run_logs(&self, job_id: &str) -> Vec<RunLog> {
        super::tokio_scheduler::CronScheduler::run_logs(self, job_id)
    }
}
