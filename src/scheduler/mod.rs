//! Background interval scheduler.

mod job;
mod service;

pub use job::{FnJob, JobArgs, JobConfig, JobSnapshot, JobStatus, JobTask};
pub use service::{SchedulerService, MAX_INTERVAL_MINUTES};
