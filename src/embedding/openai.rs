use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::Embedder;
use crate::core::errors::RagError;

/// Client for any OpenAI-compatible `/embeddings` endpoint.
#[derive(Clone)]
pub struct OpenAiEmbedder {
    base_url: String,
    model: String,
    api_key: String,
    client: Client,
}

impl OpenAiEmbedder {
    pub fn new(base_url: String, model: String, api_key: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            api_key,
            client: Client::new(),
        }
    }
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn name(&self) -> &str {
        "openai"
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/embeddings", self.base_url);
        let body = json!({
            "model": self.model,
            "input": inputs,
        });

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(RagError::embedding)?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(RagError::EmbeddingService(format!(
                "{} returned {}: {}",
                url, status, text
            )));
        }

        let mut payload: EmbeddingsResponse = res.json().await.map_err(RagError::embedding)?;
        if payload.data.len() != inputs.len() {
            return Err(RagError::EmbeddingService(format!(
                "expected {} embeddings, got {}",
                inputs.len(),
                payload.data.len()
            )));
        }

        payload.data.sort_by_key(|item| item.index);
        Ok(payload.data.into_iter().map(|item| item.embedding).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::Value;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/v1", addr)
    }

    fn embedder(base_url: String) -> OpenAiEmbedder {
        OpenAiEmbedder::new(
            base_url,
            "text-embedding-3-small".to_string(),
            "sk-test".to_string(),
        )
    }

    fn inputs() -> Vec<String> {
        vec!["first".to_string(), "second".to_string()]
    }

    #[tokio::test]
    async fn results_follow_input_order_not_response_order() {
        let router = Router::new().route(
            "/v1/embeddings",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                let authorized = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    == Some("Bearer sk-test");
                if !authorized || body["model"] != "text-embedding-3-small" {
                    return (StatusCode::UNAUTHORIZED, Json(json!({})));
                }
                assert_eq!(body["input"], json!(["first", "second"]));
                (
                    StatusCode::OK,
                    Json(json!({
                        "data": [
                            { "index": 1, "embedding": [0.0, 1.0] },
                            { "index": 0, "embedding": [1.0, 0.0] }
                        ]
                    })),
                )
            }),
        );
        let embedder = embedder(serve(router).await);

        let vectors = embedder.embed(&inputs()).await.unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[tokio::test]
    async fn short_response_is_an_embedding_error() {
        let router = Router::new().route(
            "/v1/embeddings",
            post(|| async { Json(json!({ "data": [{ "index": 0, "embedding": [1.0] }] })) }),
        );
        let embedder = embedder(serve(router).await);

        let err = embedder.embed(&inputs()).await.unwrap_err();
        match err {
            RagError::EmbeddingService(message) => {
                assert!(message.contains("expected 2 embeddings, got 1"))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn error_status_is_an_embedding_error() {
        let router = Router::new().route(
            "/v1/embeddings",
            post(|| async { (StatusCode::TOO_MANY_REQUESTS, "quota exceeded") }),
        );
        let embedder = embedder(serve(router).await);

        let err = embedder.embed(&inputs()).await.unwrap_err();
        match err {
            RagError::EmbeddingService(message) => {
                assert!(message.contains("429"));
                assert!(message.contains("quota exceeded"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_input_skips_the_request() {
        let embedder = embedder("http://127.0.0.1:9/v1".to_string());
        assert!(embedder.embed(&[]).await.unwrap().is_empty());
    }
}
