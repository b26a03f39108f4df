//! LLM-assisted file analysis
//!
//! This module handles:
//! - Talking to a chat-completion endpoint
//! - Building the per-file prompt
//! - Turning the reply into an [`AnalysisRecord`], degrading gracefully

mod client;
mod prompts;

pub use client::{ChatMessage, ChatModel, LlmClient, LlmConfig, LlmResponse, MockChatModel, Role};
pub use prompts::{truncate_content, FileAnalysisPrompt};

use crate::analysis::{parse_reply, AnalysisRecord, ParsedReply};
use std::sync::Arc;

/// Default character budget for file content sent to the model
pub const DEFAULT_MAX_CONTENT_CHARS: usize = 8000;

/// Outcome of analyzing one file
#[derive(Debug, Clone)]
pub struct Analysis {
    pub record: AnalysisRecord,
    /// True when the reply could not be parsed and a placeholder was used
    pub degraded: bool,
}

/// Analyzer that asks a chat model to classify and summarize files
pub struct FileAnalyzer {
    model: Arc<dyn ChatModel>,
    max_content_chars: usize,
    response_language: String,
}

impl FileAnalyzer {
    /// Create a new file analyzer
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self {
            model,
            max_content_chars: DEFAULT_MAX_CONTENT_CHARS,
            response_language: "English".to_string(),
        }
    }

    pub fn with_max_content_chars(mut self, max_content_chars: usize) -> Self {
        self.max_content_chars = max_content_chars;
        self
    }

    pub fn with_response_language(mut self, language: impl Into<String>) -> Self {
        self.response_language = language.into();
        self
    }

    /// Analyze a file.
    ///
    /// Returns `None` only when the model could not be reached; an
    /// unparseable reply still yields a (degraded) record.
    pub async fn analyze(&self, file_path: &str, content: &str) -> Option<Analysis> {
        let content = truncate_content(content, self.max_content_chars);
        let messages = FileAnalysisPrompt::messages(file_path, content, &self.response_language);

        let response = match self.model.chat(&messages).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Failed to analyze {}: {:#}", file_path, e);
                return None;
            }
        };

        if let Some(tokens) = response.tokens_used {
            tracing::debug!("Analyzed {} using {} tokens", file_path, tokens);
        }

        match parse_reply(&response.content) {
            ParsedReply::Parsed(record) => Some(Analysis {
                record,
                degraded: false,
            }),
            ParsedReply::Unparseable(reason) => {
                tracing::warn!(
                    "Failed to parse model reply for {}: {}; reply began: {}",
                    file_path,
                    reason,
                    truncate_content(&response.content, 500)
                );
                Some(Analysis {
                    record: AnalysisRecord::degraded(file_path),
                    degraded: true,
                })
            }
        }
    }
}
