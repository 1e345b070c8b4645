//! Embedding providers.
//!
//! The pipeline only sees the [`Embedder`] trait; `build_embedder` picks the
//! concrete provider from configuration.

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::config::{settings::EmbeddingConfig, EmbeddingProviderKind};
use crate::core::errors::RagError;

mod hashing;
mod openai;

pub use hashing::HashingEmbedder;
pub use openai::OpenAiEmbedder;

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Provider name for logs and status output.
    fn name(&self) -> &str;

    /// Embeds every input, returning one vector per input in the same order.
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, RagError>;
}

pub fn build_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>, RagError> {
    match config.provider {
        EmbeddingProviderKind::Openai => {
            let api_key = config.api_key.clone().ok_or_else(|| {
                RagError::InvalidArgument(
                    "embedding.api_key (or OPENAI_API_KEY) is required for the openai provider"
                        .to_string(),
                )
            })?;
            Ok(Arc::new(OpenAiEmbedder::new(
                config.base_url.clone(),
                config.model.clone(),
                api_key,
            )))
        }
        EmbeddingProviderKind::Hashing => Ok(Arc::new(HashingEmbedder::new(config.dimensions))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openai_provider_requires_a_key() {
        let config = EmbeddingConfig {
            provider: EmbeddingProviderKind::Openai,
            api_key: None,
            ..Default::default()
        };
        assert!(matches!(
            build_embedder(&config),
            Err(RagError::InvalidArgument(_))
        ));
    }

    #[test]
    fn hashing_provider_is_the_default() {
        let embedder = build_embedder(&EmbeddingConfig::default()).unwrap();
        assert_eq!(embedder.name(), "hashing");
    }
}
