//! Error types for the two external calls.
//!
//! Both are terminal for the operation that raised them; nothing here is
//! retried. Callers above the library boundary wrap them in `anyhow`.

use thiserror::Error;

/// Failure while listing or reading pages from the wiki.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport failure (DNS, connect, TLS, body read).
    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The endpoint answered with a non-2xx status.
    #[error("{url} returned HTTP {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    /// The body was not the expected listing JSON.
    #[error("unexpected response from {url}: {message}")]
    Decode { url: String, message: String },
}

/// Failure while asking the chat-completion service.
#[derive(Debug, Error)]
pub enum AnswerError {
    #[error("question must not be empty")]
    EmptyQuestion,

    /// Non-success status or transport failure.
    #[error("chat completion request failed: {0}")]
    Request(String),

    /// The response could not be parsed down to an answer string.
    #[error("unexpected chat completion response: {0}")]
    ResponseShape(String),
}

/// Keep error bodies readable in a terminal.
pub(crate) fn truncate_body(body: &str) -> String {
    body.chars().take(500).collect()
}
