//! Answer requests against a chat-completion service.
//!
//! Defines the [`Answerer`] trait and the Together AI implementation
//! ([`TogetherClient`]). Each call sends the whole aggregated document as the
//! system turn and the question as the user turn:
//!
//! ```json
//! {
//!   "model": "mistralai/Mixtral-8x7B-Instruct-v0.1",
//!   "messages": [
//!     { "role": "system", "content": "You are a helpful assistant based on this documentation:\n..." },
//!     { "role": "user", "content": "How do I deploy?" }
//!   ],
//!   "temperature": 0.3,
//!   "max_tokens": 300
//! }
//! ```
//!
//! Exactly one request per question: no retry, no streaming. The answer is
//! `choices[0].message.content`, trimmed.
//!
//! Requires the `TOGETHER_API_KEY` environment variable.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::config::{Config, LlmConfig};
use crate::error::{truncate_body, AnswerError};
use crate::models::{ChatMessage, ChatRequest};

const SYSTEM_PREFIX: &str = "You are a helpful assistant based on this documentation:\n";

/// Something that can answer a question given documentation context.
#[async_trait]
pub trait Answerer: Send + Sync {
    /// Model identifier, for display.
    fn model_name(&self) -> &str;

    async fn ask_with_context(&self, question: &str, context: &str)
        -> Result<String, AnswerError>;
}

/// Read `TOGETHER_API_KEY`.
pub fn together_api_key() -> Result<String> {
    std::env::var("TOGETHER_API_KEY").context("TOGETHER_API_KEY environment variable not set")
}

/// Build the request body for one question.
pub fn build_request(config: &LlmConfig, question: &str, context: &str) -> ChatRequest {
    ChatRequest {
        model: config.model.clone(),
        messages: vec![
            ChatMessage::system(format!("{}{}", SYSTEM_PREFIX, context)),
            ChatMessage::user(question),
        ],
        temperature: config.temperature,
        max_tokens: config.max_tokens,
    }
}

/// Pull the trimmed answer out of a chat-completion response body.
pub fn parse_answer(json: &serde_json::Value) -> Result<String, AnswerError> {
    let choice = json
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .ok_or_else(|| AnswerError::ResponseShape("missing choices[0]".to_string()))?;

    let content = choice
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .ok_or_else(|| {
            AnswerError::ResponseShape("missing choices[0].message.content".to_string())
        })?;

    Ok(content.trim().to_string())
}

/// Chat-completion client for Together AI (or any OpenAI-compatible endpoint).
pub struct TogetherClient {
    client: reqwest::Client,
    config: LlmConfig,
    api_key: String,
}

impl TogetherClient {
    pub fn new(config: LlmConfig, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
            api_key: api_key.into(),
        }
    }

    /// Build from `[llm]` config and `TOGETHER_API_KEY`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = together_api_key()?;

        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.llm.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            client: builder.build()?,
            config: config.llm.clone(),
            api_key,
        })
    }
}

#[async_trait]
impl Answerer for TogetherClient {
    fn model_name(&self) -> &str {
        &self.config.model
    }

    async fn ask_with_context(
        &self,
        question: &str,
        context: &str,
    ) -> Result<String, AnswerError> {
        let body = build_request(&self.config, question, context);
        tracing::debug!(
            model = %self.config.model,
            context_chars = context.len(),
            "sending chat completion request"
        );

        let resp = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AnswerError::Request(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body_text = resp.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "chat completion failed");
            return Err(AnswerError::Request(format!(
                "HTTP {}: {}",
                status,
                truncate_body(&body_text)
            )));
        }

        let json: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| AnswerError::ResponseShape(e.to_string()))?;

        parse_answer(&json)
    }
}

/// `cqa ask`: load the document, ask once, print the answer.
pub async fn run_ask(
    config: &Config,
    question: &str,
    page_id: Option<&str>,
    progress: crate::progress::ProgressMode,
) -> Result<()> {
    let answerer = TogetherClient::from_config(config)?;
    let document = crate::confluence::load_document(config, page_id, progress).await?;

    let mut session = crate::session::Session::new(document);
    let pair = session
        .ask(&answerer, question)
        .await
        .context("Error getting answer")?;

    println!("{}", pair.answer);
    Ok(())
}
