use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::job::{JobArgs, JobConfig, JobSnapshot, JobStatus, JobTask};
use crate::core::errors::RagError;

type NextRun = Arc<Mutex<Option<DateTime<Utc>>>>;

/// One year.
pub const MAX_INTERVAL_MINUTES: u64 = 525_600;

struct JobEntry {
    config: JobConfig,
    paused: bool,
    next_run: NextRun,
    handle: Option<JoinHandle<()>>,
}

impl JobEntry {
    /// Aborts the loop. The slot is swapped so a loop still finishing its
    /// current poll cannot re-publish a next run.
    fn disarm(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        self.next_run = Arc::new(Mutex::new(None));
    }

    fn snapshot(&self) -> JobStatus {
        let snapshot = JobSnapshot {
            id: self.config.id.clone(),
            interval_minutes: self.config.interval_minutes,
            next_run_time: read_next_run(&self.next_run),
        };
        if snapshot.next_run_time.is_some() {
            JobStatus::Running(snapshot)
        } else {
            JobStatus::Stopped(snapshot)
        }
    }
}

#[derive(Default)]
struct SchedulerState {
    running: bool,
    jobs: HashMap<String, JobEntry>,
}

impl Drop for SchedulerState {
    fn drop(&mut self) {
        for entry in self.jobs.values_mut() {
            entry.disarm();
        }
    }
}

/// Interval scheduler.
///
/// Every armed job owns one tokio task that sleeps until its next tick, then
/// spawns the execution on its own task and waits for it. A job therefore
/// never overlaps itself, and a slow job holds up nobody else. Methods that
/// arm jobs must be called from within a Tokio runtime.
#[derive(Clone, Default)]
pub struct SchedulerService {
    state: Arc<Mutex<SchedulerState>>,
}

impl SchedulerService {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SchedulerState> {
        // Poisoning only means a panic elsewhere; the job map is still usable.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    pub fn start(&self) -> Result<(), RagError> {
        let mut state = self.lock();
        if state.running {
            return Err(RagError::AlreadyRunning);
        }
        state.running = true;
        for entry in state.jobs.values_mut().filter(|entry| !entry.paused) {
            arm(entry);
        }
        tracing::info!("Scheduler started with {} jobs", state.jobs.len());
        Ok(())
    }

    /// Stops every job loop. Executions already in flight finish on their own.
    pub fn stop(&self) -> Result<(), RagError> {
        let mut state = self.lock();
        if !state.running {
            return Err(RagError::NotRunning);
        }
        state.running = false;
        for entry in state.jobs.values_mut() {
            entry.disarm();
        }
        tracing::info!("Scheduler stopped");
        Ok(())
    }

    /// Registers `config`, replacing any job with the same id.
    pub fn add_job(&self, config: JobConfig) -> Result<(), RagError> {
        if config.id.trim().is_empty() {
            return Err(RagError::InvalidArgument("job id cannot be empty".to_string()));
        }
        if config.interval_minutes == 0 || config.interval_minutes > MAX_INTERVAL_MINUTES {
            return Err(RagError::InvalidArgument(format!(
                "interval_minutes must be between 1 and {}",
                MAX_INTERVAL_MINUTES
            )));
        }

        let mut state = self.lock();
        if let Some(mut previous) = state.jobs.remove(&config.id) {
            previous.disarm();
            tracing::info!("Replacing job {}", config.id);
        }

        let id = config.id.clone();
        let interval_minutes = config.interval_minutes;
        let mut entry = JobEntry {
            config,
            paused: false,
            next_run: Arc::new(Mutex::new(None)),
            handle: None,
        };
        if state.running {
            arm(&mut entry);
        }
        state.jobs.insert(id.clone(), entry);

        tracing::info!("Job {} added with interval {} minutes", id, interval_minutes);
        Ok(())
    }

    /// Cancels and forgets `job_id`. Returns whether it existed.
    pub fn remove_job(&self, job_id: &str) -> bool {
        let removed = self.lock().jobs.remove(job_id);
        match removed {
            Some(mut entry) => {
                entry.disarm();
                tracing::info!("Job {} removed", job_id);
                true
            }
            None => false,
        }
    }

    /// Keeps the registration but clears the next run. Returns whether the job exists.
    pub fn pause_job(&self, job_id: &str) -> bool {
        let mut state = self.lock();
        let Some(entry) = state.jobs.get_mut(job_id) else {
            return false;
        };
        entry.paused = true;
        entry.disarm();
        tracing::info!("Job {} paused", job_id);
        true
    }

    pub fn resume_job(&self, job_id: &str) -> bool {
        let mut state = self.lock();
        let running = state.running;
        let Some(entry) = state.jobs.get_mut(job_id) else {
            return false;
        };
        entry.paused = false;
        if running && entry.handle.is_none() {
            arm(entry);
        }
        tracing::info!("Job {} resumed", job_id);
        true
    }

    pub fn get_job_status(&self, job_id: &str) -> JobStatus {
        self.lock()
            .jobs
            .get(job_id)
            .map(JobEntry::snapshot)
            .unwrap_or(JobStatus::NotFound)
    }

    /// Snapshot of every registered job, keyed by id.
    pub fn get_all_jobs(&self) -> BTreeMap<String, JobStatus> {
        self.lock()
            .jobs
            .iter()
            .map(|(id, entry)| (id.clone(), entry.snapshot()))
            .collect()
    }
}

fn arm(entry: &mut JobEntry) {
    let interval = Duration::from_secs(entry.config.interval_minutes * 60);
    let next_run: NextRun = Arc::new(Mutex::new(Some(next_run_after(interval))));
    entry.next_run = next_run.clone();

    entry.handle = Some(tokio::spawn(run_job_loop(
        entry.config.id.clone(),
        interval,
        entry.config.task.clone(),
        entry.config.args.clone(),
        next_run,
    )));
}

async fn run_job_loop(
    id: String,
    interval: Duration,
    task: Arc<dyn JobTask>,
    args: JobArgs,
    next_run: NextRun,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        set_next_run(&next_run, Some(next_run_after(interval)));
        tracing::debug!("Running job {}", id);

        let execution = {
            let task = task.clone();
            let args = args.clone();
            tokio::spawn(async move { task.run(args).await })
        };

        match execution.await {
            Ok(Ok(())) => tracing::debug!("Job {} finished", id),
            Ok(Err(e)) => tracing::error!("Job {} failed: {:#}", id, e),
            Err(e) if e.is_panic() => tracing::error!("Job {} panicked", id),
            Err(e) => tracing::warn!("Job {} execution aborted: {}", id, e),
        }
    }
}

fn next_run_after(interval: Duration) -> DateTime<Utc> {
    Utc::now() + chrono::Duration::seconds(interval.as_secs() as i64)
}

fn set_next_run(slot: &NextRun, value: Option<DateTime<Utc>>) {
    *slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = value;
}

fn read_next_run(slot: &NextRun) -> Option<DateTime<Utc>> {
    *slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
