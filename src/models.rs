//! Wire and session data types.
//!
//! The listing types mirror the subset of the Confluence REST payload this
//! crate reads; unknown fields are ignored. The chat types follow the
//! OpenAI-compatible schema served by Together AI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Heading used for pages that come back without a title.
pub const UNTITLED: &str = "No Title";

/// `GET /rest/api/content` response.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentListing {
    #[serde(default)]
    pub results: Vec<PageRecord>,
}

/// One page as returned with `expand=body.storage`.
#[derive(Debug, Clone, Deserialize)]
pub struct PageRecord {
    #[serde(default)]
    pub title: Option<String>,
    pub body: PageBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PageBody {
    pub storage: StorageBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageBody {
    pub value: String,
}

impl PageRecord {
    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or(UNTITLED)
    }

    pub fn markup(&self) -> &str {
        &self.body.storage.value
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// `POST /v1/chat/completions` body.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f64,
    pub max_tokens: u32,
}

/// One answered question in a session transcript.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct QaPair {
    pub question: String,
    pub answer: String,
    pub asked_at: DateTime<Utc>,
}
