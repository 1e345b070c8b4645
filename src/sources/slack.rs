use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use super::{FetchReport, MessageSource};
use crate::core::errors::RagError;
use crate::rag::types::{Document, Metadata};

/// Reads one channel's history through the Slack Web API.
pub struct SlackSource {
    base_url: String,
    bot_token: String,
    channel_id: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    messages: Vec<SlackMessage>,
}

#[derive(Debug, Deserialize)]
struct SlackMessage {
    ts: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    user: Option<String>,
}

impl SlackSource {
    pub fn new(base_url: String, bot_token: String, channel_id: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            bot_token,
            channel_id,
            client: Client::new(),
        }
    }

    async fn fetch_messages(&self, oldest: DateTime<Utc>) -> Result<Vec<Document>, RagError> {
        let url = format!("{}/conversations.history", self.base_url);

        let res = self
            .client
            .get(&url)
            .bearer_auth(&self.bot_token)
            .query(&[
                ("channel", self.channel_id.clone()),
                ("oldest", oldest.timestamp().to_string()),
            ])
            .send()
            .await
            .map_err(|e| RagError::Source(format!("slack request failed: {}", e)))?;

        let status = res.status();
        if !status.is_success() {
            return Err(RagError::Source(format!("slack returned {}", status)));
        }
        let payload: HistoryResponse = res
            .json()
            .await
            .map_err(|e| RagError::Source(format!("invalid slack response: {}", e)))?;

        history_to_documents(payload)
    }
}

#[async_trait]
impl MessageSource for SlackSource {
    fn name(&self) -> &str {
        "slack"
    }

    async fn fetch(&self, since: DateTime<Utc>) -> FetchReport {
        let report: FetchReport = self.fetch_messages(since).await.into();
        match &report.error {
            Some(error) => tracing::warn!("Slack fetch for {} failed: {}", self.channel_id, error),
            None => tracing::info!(
                "Fetched {} Slack messages from {}",
                report.documents.len(),
                self.channel_id
            ),
        }
        report
    }
}

/// Slack reports API failures in-band with `ok: false`.
fn history_to_documents(payload: HistoryResponse) -> Result<Vec<Document>, RagError> {
    if !payload.ok {
        return Err(RagError::Source(format!(
            "slack api error: {}",
            payload.error.unwrap_or_else(|| "unknown".to_string())
        )));
    }

    Ok(payload
        .messages
        .into_iter()
        .map(|message| {
            let mut metadata = Metadata::new();
            metadata.insert("source".to_string(), Value::from("slack"));
            metadata.insert("user".to_string(), Value::from(message.user.unwrap_or_default()));
            metadata.insert("date".to_string(), Value::from(ts_to_rfc3339(&message.ts)));
            metadata.insert("id".to_string(), Value::from(message.ts));
            Document::new(message.text, metadata)
        })
        .collect())
}

fn ts_to_rfc3339(ts: &str) -> String {
    let Ok(seconds) = ts.parse::<f64>() else {
        return String::new();
    };
    let secs = seconds.trunc() as i64;
    let nanos = ((seconds.fract()) * 1e9).round() as u32;
    DateTime::<Utc>::from_timestamp(secs, nanos.min(999_999_999))
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_default()
}
