//! Scheduled ingestion: fetch from a source, push into the pipeline.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::core::config::settings::AppConfig;
use crate::core::config::AppPaths;
use crate::rag::RagPipeline;
use crate::scheduler::{JobArgs, JobConfig, JobTask, SchedulerService};
use crate::sources::{build_source, window_start, MessageSource};

/// Pulls new items from one source on every tick.
///
/// The first run covers the last `days_back` days. Later runs only ask for
/// items newer than the start of the last successful run, so an unchanged
/// source is not stored twice.
pub struct IngestJob {
    source: Arc<dyn MessageSource>,
    pipeline: Arc<RagPipeline>,
    days_back: u32,
    last_fetch: Mutex<Option<DateTime<Utc>>>,
}

impl IngestJob {
    pub fn new(source: Arc<dyn MessageSource>, pipeline: Arc<RagPipeline>, days_back: u32) -> Self {
        Self {
            source,
            pipeline,
            days_back,
            last_fetch: Mutex::new(None),
        }
    }

    /// Start of the last run whose items were all stored.
    pub fn last_fetch(&self) -> Option<DateTime<Utc>> {
        *self.last_fetch.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn advance_to(&self, started: DateTime<Utc>) {
        *self.last_fetch.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(started);
    }
}

#[async_trait]
impl JobTask for IngestJob {
    /// `days_back` in `args` overrides the configured first-run window.
    async fn run(&self, args: JobArgs) -> anyhow::Result<()> {
        let days_back = args
            .get("days_back")
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(self.days_back);

        let started = Utc::now();
        let since = self
            .last_fetch()
            .unwrap_or_else(|| window_start(days_back, started));

        let report = self.source.fetch(since).await;
        if let Some(error) = report.error {
            tracing::warn!("{} fetch failed, skipping ingest: {}", self.source.name(), error);
            return Ok(());
        }
        if report.documents.is_empty() {
            tracing::info!("{} returned nothing new", self.source.name());
            self.advance_to(started);
            return Ok(());
        }

        let ingested = self.pipeline.process_documents(report.documents).await?;
        self.advance_to(started);
        tracing::info!(
            "{} ingest stored {} documents as {} chunks",
            self.source.name(),
            ingested.documents,
            ingested.chunks
        );
        Ok(())
    }
}

/// Registers every job declared under `scheduler.jobs`.
///
/// A job whose source cannot be built (e.g. missing token) is skipped with a
/// warning; the rest are still registered. Returns the registered ids.
pub fn register_configured_jobs(
    scheduler: &SchedulerService,
    settings: &AppConfig,
    paths: &AppPaths,
    pipeline: &Arc<RagPipeline>,
) -> Vec<String> {
    let mut registered = Vec::new();
    for spec in &settings.scheduler.jobs {
        let source = match build_source(&spec.source, &settings.sources, paths) {
            Ok(source) => source,
            Err(e) => {
                tracing::warn!("Skipping job {}: {}", spec.id, e);
                continue;
            }
        };

        let task = Arc::new(IngestJob::new(source, pipeline.clone(), spec.days_back));
        match scheduler.add_job(JobConfig::new(spec.id.clone(), spec.interval_minutes, task)) {
            Ok(()) => registered.push(spec.id.clone()),
            Err(e) => tracing::warn!("Failed to register job {}: {}", spec.id, e),
        }
    }
    registered
}
