use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use super::{FetchReport, MessageSource};
use crate::core::errors::RagError;
use crate::rag::types::{Document, Metadata};

/// Gmail REST client using a pre-issued OAuth access token.
pub struct GmailSource {
    base_url: String,
    access_token: String,
    max_results: u32,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct MessageList {
    #[serde(default)]
    messages: Vec<MessageRef>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct GmailMessage {
    id: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    payload: Option<MessagePayload>,
}

#[derive(Debug, Default, Deserialize)]
struct MessagePayload {
    #[serde(default)]
    headers: Vec<Header>,
}

#[derive(Debug, Deserialize)]
struct Header {
    name: String,
    value: String,
}

impl GmailSource {
    pub fn new(base_url: String, access_token: String, max_results: u32) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token,
            max_results,
            client: Client::new(),
        }
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, RagError> {
        let res = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .query(query)
            .send()
            .await
            .map_err(|e| RagError::Source(format!("gmail request failed: {}", e)))?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(RagError::Source(format!("gmail returned {}: {}", status, text)));
        }
        res.json::<T>()
            .await
            .map_err(|e| RagError::Source(format!("invalid gmail response: {}", e)))
    }

    async fn fetch_emails(&self, since: DateTime<Utc>) -> Result<Vec<Document>, RagError> {
        let list_url = format!("{}/users/me/messages", self.base_url);
        let list: MessageList = self
            .get_json(
                &list_url,
                &[
                    ("q", search_query(since)),
                    ("maxResults", self.max_results.to_string()),
                ],
            )
            .await?;

        let mut documents = Vec::with_capacity(list.messages.len());
        for message in list.messages {
            let url = format!("{}/users/me/messages/{}", self.base_url, message.id);
            let full: GmailMessage = self
                .get_json(
                    &url,
                    &[
                        ("format", "metadata".to_string()),
                        ("metadataHeaders", "Subject".to_string()),
                        ("metadataHeaders", "Date".to_string()),
                    ],
                )
                .await?;
            documents.push(message_to_document(full));
        }
        Ok(documents)
    }
}

#[async_trait]
impl MessageSource for GmailSource {
    fn name(&self) -> &str {
        "gmail"
    }

    async fn fetch(&self, since: DateTime<Utc>) -> FetchReport {
        let report: FetchReport = self.fetch_emails(since).await.into();
        if let Some(error) = &report.error {
            tracing::warn!("Gmail fetch failed: {}", error);
        } else {
            tracing::info!("Fetched {} emails from Gmail", report.documents.len());
        }
        report
    }
}

/// Gmail accepts epoch seconds in `after:`, which keeps repeated polls from
/// re-listing the rest of the day.
fn search_query(since: DateTime<Utc>) -> String {
    format!("after:{}", since.timestamp())
}

fn header_value(payload: &MessagePayload, name: &str) -> String {
    payload
        .headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.clone())
        .unwrap_or_default()
}

fn message_to_document(message: GmailMessage) -> Document {
    let payload = message.payload.unwrap_or_default();
    let mut metadata = Metadata::new();
    metadata.insert("source".to_string(), Value::from("gmail"));
    metadata.insert("id".to_string(), Value::from(message.id));
    metadata.insert("subject".to_string(), Value::from(header_value(&payload, "Subject")));
    metadata.insert("date".to_string(), Value::from(header_value(&payload, "Date")));
    Document::new(message.snippet, metadata)
}
