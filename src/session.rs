//! Interactive session state: the aggregated document plus the transcript.
//!
//! A [`Session`] is owned by whichever shell drives it (the REPL or the HTTP
//! surface). The document is fixed at construction; the transcript only
//! grows, and only when an answer actually comes back.

use chrono::Utc;

use crate::answer::Answerer;
use crate::error::AnswerError;
use crate::models::QaPair;

#[derive(Debug, Clone)]
pub struct Session {
    document: String,
    transcript: Vec<QaPair>,
}

impl Session {
    pub fn new(document: String) -> Self {
        Self {
            document,
            transcript: Vec::new(),
        }
    }

    pub fn document(&self) -> &str {
        &self.document
    }

    /// Ask `question` against the session document.
    ///
    /// Blank questions are rejected before any request is made. On failure
    /// the transcript is left untouched.
    pub async fn ask(
        &mut self,
        answerer: &dyn Answerer,
        question: &str,
    ) -> Result<&QaPair, AnswerError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AnswerError::EmptyQuestion);
        }

        let answer = answerer.ask_with_context(question, &self.document).await?;

        self.transcript.push(QaPair {
            question: question.to_string(),
            answer,
            asked_at: Utc::now(),
        });
        tracing::info!(entries = self.transcript.len(), "answer recorded");

        Ok(&self.transcript[self.transcript.len() - 1])
    }

    /// Oldest first.
    pub fn transcript(&self) -> &[QaPair] {
        &self.transcript
    }

    pub fn latest(&self) -> Option<&QaPair> {
        self.transcript.last()
    }

    /// Newest first.
    pub fn history(&self) -> impl Iterator<Item = &QaPair> {
        self.transcript.iter().rev()
    }
}
