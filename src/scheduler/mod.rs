//! Scheduler (spec §4.11): parses cron expressions, ticks every 60 s by
//! default, and fires due jobs' message/tool/agent actions under a per-job
//! non-reentrancy guard, recording a Run Log entry per fire.

pub mod cron_expr;
pub mod store;
pub mod tokio_scheduler;
pub mod traits;

pub use cron_expr::{next_occurrence, validate};
pub use store::{CronStore, JsonCronStore};
pub use tokio_scheduler::CronScheduler;
pub use traits::Scheduler;
