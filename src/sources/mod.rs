//! Message and document sources feeding scheduled ingestion.
//!
//! Every source reports through [`FetchReport`] so that "the fetch failed" and
//! "nothing new in the window" stay distinguishable.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::core::config::settings::SourcesConfig;
use crate::core::config::{AppPaths, SourceSpec};
use crate::core::errors::RagError;
use crate::rag::types::Document;

mod directory;
mod gmail;
mod slack;

pub use directory::DirectorySource;
pub use gmail::GmailSource;
pub use slack::SlackSource;

#[derive(Debug, Clone, Default, Serialize)]
pub struct FetchReport {
    pub documents: Vec<Document>,
    /// Set when the fetch failed; `documents` is then empty.
    pub error: Option<String>,
}

impl FetchReport {
    pub fn ok(documents: Vec<Document>) -> Self {
        Self {
            documents,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            documents: Vec::new(),
            error: Some(error.into()),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

impl From<Result<Vec<Document>, RagError>> for FetchReport {
    fn from(result: Result<Vec<Document>, RagError>) -> Self {
        match result {
            Ok(documents) => FetchReport::ok(documents),
            Err(e) => FetchReport::failed(e.to_string()),
        }
    }
}

#[async_trait]
pub trait MessageSource: Send + Sync {
    fn name(&self) -> &str;

    /// Fetches items newer than `since`. Never returns an error; failures are
    /// carried in the report.
    async fn fetch(&self, since: DateTime<Utc>) -> FetchReport;
}

/// Start of a `days_back` window ending at `now`.
pub fn window_start(days_back: u32, now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::days(i64::from(days_back))
}

/// Builds the source a job spec refers to, checking credentials up front.
pub fn build_source(
    spec: &SourceSpec,
    config: &SourcesConfig,
    paths: &AppPaths,
) -> Result<Arc<dyn MessageSource>, RagError> {
    match spec {
        SourceSpec::Gmail => {
            let gmail = config.gmail.clone().unwrap_or_default();
            let token = gmail.access_token.clone().ok_or_else(|| {
                RagError::InvalidArgument(
                    "sources.gmail.access_token (or GMAIL_ACCESS_TOKEN) is required".to_string(),
                )
            })?;
            Ok(Arc::new(GmailSource::new(
                gmail.base_url,
                token,
                gmail.max_results,
            )))
        }
        SourceSpec::Slack { channel_id } => {
            let slack = config.slack.clone().unwrap_or_default();
            let token = slack.bot_token.clone().ok_or_else(|| {
                RagError::InvalidArgument(
                    "sources.slack.bot_token (or SLACK_BOT_TOKEN) is required".to_string(),
                )
            })?;
            Ok(Arc::new(SlackSource::new(
                slack.base_url,
                token,
                channel_id.clone(),
            )))
        }
        SourceSpec::Directory { path } => {
            let root: PathBuf = paths.resolve(path);
            Ok(Arc::new(DirectorySource::new(root)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::settings::SlackConfig;

    #[test]
    fn failed_fetch_is_not_an_empty_fetch() {
        let empty = FetchReport::ok(Vec::new());
        let failed: FetchReport = Err(RagError::Source("invalid_auth".to_string())).into();

        assert!(!empty.is_failure());
        assert!(failed.is_failure());
        assert!(failed.documents.is_empty());
        assert!(failed.error.unwrap().contains("invalid_auth"));
    }

    #[test]
    fn token_sources_require_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let paths = AppPaths::with_data_dir(dir.path().to_path_buf(), dir.path().join("data"));

        let err = build_source(&SourceSpec::Gmail, &SourcesConfig::default(), &paths)
            .err()
            .unwrap();
        assert!(matches!(err, RagError::InvalidArgument(_)));

        let config = SourcesConfig {
            slack: Some(SlackConfig {
                bot_token: Some("xoxb-test".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let source = build_source(
            &SourceSpec::Slack {
                channel_id: "C1".to_string(),
            },
            &config,
            &paths,
        )
        .unwrap();
        assert_eq!(source.name(), "slack");
    }
}
