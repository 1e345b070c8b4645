use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use super::{FetchReport, MessageSource};
use crate::core::errors::RagError;
use crate::rag::loader;
use crate::rag::types::{Document, Metadata};

/// Picks up supported files dropped into a folder.
///
/// Only files modified after the requested instant are returned. A file that fails to
/// extract is skipped with a warning; a missing folder fails the fetch.
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl MessageSource for DirectorySource {
    fn name(&self) -> &str {
        "directory"
    }

    async fn fetch(&self, since: DateTime<Utc>) -> FetchReport {
        let root = self.root.clone();
        let cutoff = SystemTime::from(since);
        let result = tokio::task::spawn_blocking(move || scan_directory(&root, cutoff))
            .await
            .map_err(|e| RagError::Source(format!("directory scan task failed: {}", e)))
            .and_then(|inner| inner);

        let report: FetchReport = result.into();
        match &report.error {
            Some(error) => tracing::warn!("Directory fetch from {} failed: {}", self.root.display(), error),
            None => tracing::info!(
                "Loaded {} files from {}",
                report.documents.len(),
                self.root.display()
            ),
        }
        report
    }
}

fn scan_directory(root: &Path, cutoff: SystemTime) -> Result<Vec<Document>, RagError> {
    if !root.is_dir() {
        return Err(RagError::Source(format!(
            "{} is not a directory",
            root.display()
        )));
    }
    let mut files = Vec::new();
    collect_files(root, cutoff, &mut files)?;
    files.sort();

    let mut documents = Vec::with_capacity(files.len());
    for path in files {
        let mut metadata = Metadata::new();
        metadata.insert("source".to_string(), Value::from("file"));
        metadata.insert(
            "path".to_string(),
            Value::from(path.to_string_lossy().to_string()),
        );
        match loader::load_document(&path, metadata) {
            Ok(doc) => documents.push(doc),
            Err(e) => tracing::warn!("Skipping {}: {}", path.display(), e),
        }
    }
    Ok(documents)
}

fn collect_files(dir: &Path, cutoff: SystemTime, out: &mut Vec<PathBuf>) -> Result<(), RagError> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            collect_files(&path, cutoff, out)?;
            continue;
        }
        if !file_type.is_file() || !loader::is_supported_file(&path) {
            continue;
        }
        let modified = entry
            .metadata()?
            .modified()
            .unwrap_or(SystemTime::UNIX_EPOCH);
        if modified > cutoff {
            out.push(path);
        }
    }
    Ok(())
}
