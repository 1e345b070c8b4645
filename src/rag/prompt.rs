//! Prompt assembly from retrieved chunks.
//!
//! Turns similarity-search hits into a context block with source citations
//! and wraps it together with the user query.

use serde::{Deserialize, Serialize};

use super::types::QueryResult;
use crate::core::config::defaults::DEFAULT_MAX_CONTEXT_CHARS;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Maximum context length in characters
    pub max_context_length: usize,
    pub include_citations: bool,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            max_context_length: DEFAULT_MAX_CONTEXT_CHARS,
            include_citations: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PromptAssembler {
    config: PromptConfig,
}

impl PromptAssembler {
    pub fn new(config: PromptConfig) -> Self {
        Self { config }
    }

    pub fn assemble(&self, results: &[QueryResult], query: &str) -> String {
        let context = self.format_context(results);
        format!(
            "Based on the following context and query, provide a detailed response:\n\n\
             Context:\n{}\n\n\
             Query: {}\n\n\
             Please analyze the information and provide a comprehensive answer.",
            context, query
        )
    }

    fn format_context(&self, results: &[QueryResult]) -> String {
        let mut context = String::new();
        let mut current_length = 0;

        for (i, hit) in results.iter().enumerate() {
            // Extra for the citation line.
            let addition_length = hit.content.len() + 50;
            if current_length + addition_length > self.config.max_context_length && i > 0 {
                break;
            }

            if self.config.include_citations {
                let source = hit
                    .metadata
                    .get("source")
                    .and_then(|v| v.as_str())
                    .unwrap_or("unknown");
                context.push_str(&format!(
                    "[{}] (Source: {}, relevance: {:.2})\n{}\n\n",
                    i + 1,
                    source,
                    hit.score,
                    hit.content
                ));
            } else {
                context.push_str(&hit.content);
                context.push_str("\n\n");
            }

            current_length += addition_length;
        }

        context.trim().to_string()
    }
}
