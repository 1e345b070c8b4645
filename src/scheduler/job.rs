use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::future::{BoxFuture, FutureExt};
use serde::Serialize;
use serde_json::{Map, Value};

/// Fixed argument bundle handed to every execution of a job.
pub type JobArgs = Map<String, Value>;

/// Work a scheduled job performs on each tick.
///
/// Errors are logged by the scheduler and never unschedule the job.
#[async_trait]
pub trait JobTask: Send + Sync {
    async fn run(&self, args: JobArgs) -> anyhow::Result<()>;
}

type BoxedJobFn = dyn Fn(JobArgs) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync;

/// Adapts an async closure into a [`JobTask`].
pub struct FnJob {
    func: Box<BoxedJobFn>,
}

impl FnJob {
    pub fn new<F, Fut>(func: F) -> Self
    where
        F: Fn(JobArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            func: Box::new(move |args| func(args).boxed()),
        }
    }
}

#[async_trait]
impl JobTask for FnJob {
    async fn run(&self, args: JobArgs) -> anyhow::Result<()> {
        (self.func)(args).await
    }
}

/// Everything needed to register a periodic job.
#[derive(Clone)]
pub struct JobConfig {
    pub id: String,
    pub interval_minutes: u64,
    pub task: Arc<dyn JobTask>,
    pub args: JobArgs,
}

impl JobConfig {
    pub fn new(id: impl Into<String>, interval_minutes: u64, task: Arc<dyn JobTask>) -> Self {
        Self {
            id: id.into(),
            interval_minutes,
            task,
            args: JobArgs::new(),
        }
    }

    pub fn with_args(mut self, args: JobArgs) -> Self {
        self.args = args;
        self
    }
}

impl fmt::Debug for JobConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobConfig")
            .field("id", &self.id)
            .field("interval_minutes", &self.interval_minutes)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobSnapshot {
    pub id: String,
    pub interval_minutes: u64,
    pub next_run_time: Option<DateTime<Utc>>,
}

/// Scheduling status of one job id.
///
/// `Running` means a future run is armed; it says nothing about whether the
/// last execution succeeded.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobStatus {
    NotFound,
    Running(JobSnapshot),
    Stopped(JobSnapshot),
}

impl JobStatus {
    pub fn is_found(&self) -> bool {
        !matches!(self, JobStatus::NotFound)
    }

    pub fn snapshot(&self) -> Option<&JobSnapshot> {
        match self {
            JobStatus::NotFound => None,
            JobStatus::Running(snapshot) | JobStatus::Stopped(snapshot) => Some(snapshot),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            JobStatus::NotFound => "not_found",
            JobStatus::Running(_) => "running",
            JobStatus::Stopped(_) => "stopped",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn fn_job_passes_args_through() {
        let job = FnJob::new(|args: JobArgs| async move {
            anyhow::ensure!(args.get("channel") == Some(&json!("C1")), "missing channel");
            anyhow::Ok(())
        });

        let mut args = JobArgs::new();
        args.insert("channel".to_string(), json!("C1"));
        assert!(job.run(args).await.is_ok());
        assert!(job.run(JobArgs::new()).await.is_err());
    }

    #[test]
    fn status_serializes_flat_with_tag() {
        assert_eq!(
            serde_json::to_value(JobStatus::NotFound).unwrap(),
            json!({ "status": "not_found" })
        );

        let stopped = JobStatus::Stopped(JobSnapshot {
            id: "mail".to_string(),
            interval_minutes: 30,
            next_run_time: None,
        });
        assert_eq!(
            serde_json::to_value(&stopped).unwrap(),
            json!({
                "status": "stopped",
                "id": "mail",
                "interval_minutes": 30,
                "next_run_time": null
            })
        );
        assert_eq!(stopped.label(), "stopped");
    }
}
