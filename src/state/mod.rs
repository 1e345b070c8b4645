use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::core::config::{AppConfig, AppPaths, ConfigService};
use crate::embedding::build_embedder;
use crate::flags::ResultParser;
use crate::jobs::register_configured_jobs;
use crate::rag::{
    AdapterOptions, PipelineOptions, PromptConfig, RagPipeline, SqliteVectorStore,
    VectorStoreAdapter,
};
use crate::scheduler::SchedulerService;

pub mod error;

use error::InitializationError;

/// Services shared by every route and background job.
///
/// Built once at startup and handed out by `Arc`; nothing here is global.
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: ConfigService,
    pub settings: Arc<AppConfig>,
    pub pipeline: Arc<RagPipeline>,
    pub parser: Arc<ResultParser>,
    pub scheduler: SchedulerService,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Resolves paths, loads configuration and builds every service.
    pub async fn initialize() -> Result<Arc<Self>, InitializationError> {
        let paths = Arc::new(AppPaths::new());
        let config = ConfigService::new(paths.clone());
        let settings = config
            .load_settings()
            .map_err(|e| InitializationError::Config(e.into()))?;
        Self::build(paths, settings).await
    }

    /// Builds the services from already-loaded settings.
    ///
    /// 1. Opens the vector index and the embedding provider
    /// 2. Resumes the query flow if the index already holds data
    /// 3. Registers configured ingestion jobs (the scheduler is not started)
    pub async fn build(
        paths: Arc<AppPaths>,
        settings: AppConfig,
    ) -> Result<Arc<Self>, InitializationError> {
        let config = ConfigService::new(paths.clone());

        let index_dir = resolve_index_dir(&paths, &settings);
        let store = Arc::new(
            SqliteVectorStore::open(&index_dir)
                .await
                .map_err(|e| InitializationError::Store(e.into()))?,
        );
        let embedder = build_embedder(&settings.embedding)
            .map_err(|e| InitializationError::Embedding(e.into()))?;
        tracing::info!("Using {} embedding provider", embedder.name());

        let adapter = VectorStoreAdapter::new(
            embedder,
            store,
            AdapterOptions {
                batch_size: settings.embedding.batch_size,
                timeout: Duration::from_secs(settings.embedding.timeout_secs),
            },
        );
        let pipeline = Arc::new(RagPipeline::new(
            adapter,
            PipelineOptions {
                max_words: settings.chunking.max_words,
                default_k: settings.search.default_k,
                prompt: PromptConfig {
                    max_context_length: settings.search.max_context_length,
                    include_citations: settings.search.include_citations,
                },
            },
        ));
        match pipeline.resume().await {
            Ok(true) => {}
            Ok(false) => tracing::info!("Vector index is empty; ingest documents before searching"),
            Err(e) => tracing::warn!("Failed to inspect existing vector index: {}", e),
        }

        let parser = Arc::new(ResultParser::new(settings.flags.keywords.clone()));
        let scheduler = SchedulerService::new();
        let registered = register_configured_jobs(&scheduler, &settings, &paths, &pipeline);
        if !registered.is_empty() {
            tracing::info!("Registered jobs: {}", registered.join(", "));
        }

        Ok(Arc::new(AppState {
            paths,
            config,
            settings: Arc::new(settings),
            pipeline,
            parser,
            scheduler,
            started_at: Utc::now(),
        }))
    }
}

fn resolve_index_dir(paths: &AppPaths, settings: &AppConfig) -> PathBuf {
    settings
        .storage
        .index_dir
        .as_deref()
        .map(|dir| paths.resolve(dir))
        .unwrap_or_else(|| paths.index_dir.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::settings::StorageConfig;
    use crate::core::config::EmbeddingProviderKind;

    fn temp_paths(dir: &tempfile::TempDir) -> Arc<AppPaths> {
        Arc::new(AppPaths::with_data_dir(
            dir.path().to_path_buf(),
            dir.path().join("data"),
        ))
    }

    #[tokio::test]
    async fn builds_with_defaults_and_custom_index_dir() {
        let dir = tempfile::tempdir().unwrap();
        let settings = AppConfig {
            storage: StorageConfig {
                index_dir: Some("vectors".to_string()),
            },
            ..Default::default()
        };

        let state = AppState::build(temp_paths(&dir), settings).await.unwrap();
        assert!(dir.path().join("data").join("vectors").join("index.db").exists());
        assert!(!state.pipeline.is_initialized());
        assert!(!state.scheduler.is_running());
    }

    #[tokio::test]
    async fn openai_without_key_fails_initialization() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = AppConfig::default();
        settings.embedding.provider = EmbeddingProviderKind::Openai;
        settings.embedding.api_key = None;

        let err = AppState::build(temp_paths(&dir), settings).await.err().unwrap();
        assert!(matches!(err, InitializationError::Embedding(_)));
    }

    #[tokio::test]
    async fn restart_resumes_persisted_index() {
        let dir = tempfile::tempdir().unwrap();
        {
            let state = AppState::build(temp_paths(&dir), AppConfig::default())
                .await
                .unwrap();
            state
                .pipeline
                .process_and_store(vec!["renewal notice for the lease".to_string()], None)
                .await
                .unwrap();
        }

        let state = AppState::build(temp_paths(&dir), AppConfig::default())
            .await
            .unwrap();
        assert!(state.pipeline.is_initialized());
        let hits = state.pipeline.similarity_search("lease", 1).await.unwrap();
        assert_eq!(hits[0].content, "renewal notice for the lease");
    }
}
