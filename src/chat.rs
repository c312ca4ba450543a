//! Interactive question loop (`cqa chat`).
//!
//! ```text
//! You: how do I rotate the API keys?
//! AI: Open Settings → Security and ...
//!
//! You: history
//! Q1: how do I rotate the API keys?
//!     AI: Open Settings → Security and ...
//! ```
//!
//! | Input | Effect |
//! |-------|--------|
//! | `exit`, `quit` | end the loop (case-insensitive) |
//! | `history` | previous Q&A, newest first |
//! | `last` | the most recent Q&A |
//! | empty line | reminder to type a question |
//! | anything else | asked against the loaded document |
//!
//! A failed request prints the error and the loop keeps going.

use anyhow::Result;
use std::io::{BufRead, Write};

use crate::answer::{Answerer, TogetherClient};
use crate::config::Config;
use crate::progress::ProgressMode;
use crate::session::Session;

/// `cqa chat`: load the document once, then answer questions from stdin.
pub async fn run_chat(config: &Config, page_id: Option<&str>, progress: ProgressMode) -> Result<()> {
    let answerer = TogetherClient::from_config(config)?;

    eprintln!("Loading Confluence content... This might take a few seconds.");
    let document = crate::confluence::load_document(config, page_id, progress).await?;
    eprintln!("Content loaded ({} chars).", document.len());

    let mut session = Session::new(document);
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    chat_loop(&mut session, &answerer, stdin.lock(), stdout.lock()).await
}

/// Drive a session from `input`, writing prompts and answers to `out`.
pub async fn chat_loop<R, W>(
    session: &mut Session,
    answerer: &dyn Answerer,
    mut input: R,
    mut out: W,
) -> Result<()>
where
    R: BufRead,
    W: Write,
{
    writeln!(
        out,
        "Start chatting with {}! Type 'exit' to quit.",
        answerer.model_name()
    )?;

    let mut line = String::new();
    loop {
        write!(out, "You: ")?;
        out.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        let question = line.trim();

        match question.to_lowercase().as_str() {
            "exit" | "quit" => break,
            "" => {
                writeln!(out, "Please enter a question first.")?;
                continue;
            }
            "history" => {
                write_history(session, &mut out)?;
                continue;
            }
            "last" => {
                match session.latest() {
                    Some(pair) => writeln!(out, "Q: {}\nAI: {}\n", pair.question, pair.answer)?,
                    None => writeln!(out, "No questions asked yet.")?,
                }
                continue;
            }
            _ => {}
        }

        match session.ask(answerer, question).await {
            Ok(pair) => writeln!(out, "AI: {}\n", pair.answer)?,
            Err(e) => {
                tracing::warn!(error = %e, "question failed");
                writeln!(out, "Error getting answer: {}\n", e)?;
            }
        }
    }

    Ok(())
}

fn write_history<W: Write>(session: &Session, out: &mut W) -> Result<()> {
    if session.transcript().is_empty() {
        writeln!(out, "No questions asked yet.")?;
        return Ok(());
    }
    for (idx, pair) in session.history().enumerate() {
        writeln!(out, "Q{}: {}\n    AI: {}", idx + 1, pair.question, pair.answer)?;
    }
    writeln!(out)?;
    Ok(())
}
