//! # Confluence QA
//!
//! Ask questions about a Confluence space using a chat-completion model.
//!
//! The whole space is pulled once per session through the Confluence REST
//! API, each page's storage-format body is reduced to plain text, and the
//! concatenated text is sent as system context with every question.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │  Confluence  │──▶│  Aggregator  │──▶│   Session    │
//! │  REST API    │   │ page + html  │   │ doc + Q&A    │
//! └──────────────┘   └──────────────┘   └──────┬───────┘
//!                                              │ question + doc
//!                           ┌──────────────────┤
//!                           ▼                  ▼
//!                     ┌──────────┐       ┌──────────────┐
//!                     │ CLI/HTTP │       │ Together AI  │
//!                     │  (cqa)   │       │ chat endpoint│
//!                     └──────────┘       └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! export CONFLUENCE_EMAIL=me@acme.io CONFLUENCE_API_TOKEN=... TOGETHER_API_KEY=...
//! cqa sources                       # check configuration
//! cqa fetch --preview 1000          # peek at the aggregated document
//! cqa ask "How do we deploy?"       # one-shot question
//! cqa chat                          # interactive loop
//! cqa serve                         # JSON API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and environment overrides |
//! | [`confluence`] | Paginated space aggregation |
//! | [`html`] | Storage-format markup to text |
//! | [`answer`] | Chat-completion requests |
//! | [`session`] | Document plus Q&A transcript |
//! | [`chat`] | Interactive REPL |
//! | [`server`] | HTTP surface |
//! | [`sources`] | Service status |
//! | [`progress`] | Loading progress on stderr |

pub mod answer;
pub mod chat;
pub mod config;
pub mod confluence;
pub mod error;
pub mod html;
pub mod logging;
pub mod models;
pub mod progress;
pub mod server;
pub mod session;
pub mod sources;
