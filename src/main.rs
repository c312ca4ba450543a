//! # Confluence QA CLI (`cqa`)
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `cqa sources` | Show which services are configured and have credentials |
//! | `cqa fetch` | Aggregate the space and print (or save) the document |
//! | `cqa ask "<question>"` | Ask one question against the space |
//! | `cqa chat` | Interactive question loop |
//! | `cqa serve` | JSON API for questions and history |
//!
//! ## Examples
//!
//! ```bash
//! cqa fetch --preview 1000 --config ./config/cqa.toml
//! cqa ask "Where is the on-call rota?" --page 983041
//! cqa chat --progress json
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use confluence_qa::progress::ProgressMode;
use confluence_qa::{answer, chat, config, confluence, logging, server, sources};

/// Confluence QA: ask questions about a Confluence space.
///
/// Credentials come from the environment (a `.env` file in the working
/// directory is loaded first): `CONFLUENCE_EMAIL`, `CONFLUENCE_API_TOKEN`,
/// `TOGETHER_API_KEY`. `CONFLUENCE_BASE_URL` and `CONFLUENCE_SPACE_KEY`
/// override the config file.
#[derive(Parser)]
#[command(
    name = "cqa",
    about = "Confluence QA: ask questions about a Confluence space",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Missing file means defaults.
    #[arg(long, global = true, default_value = "./config/cqa.toml")]
    config: PathBuf,

    /// Loading progress on stderr: `off`, `human`, or `json`.
    /// Defaults to `human` when stderr is a terminal.
    #[arg(long, global = true)]
    progress: Option<String>,

    /// Debug logging for this crate (overridden by `RUST_LOG`).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show configuration and credential status of Confluence and Together AI.
    Sources,

    /// Aggregate the space into one document.
    Fetch {
        /// Fetch a single page by id instead of the whole space.
        #[arg(long)]
        page: Option<String>,

        /// Write the document to this file instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Print only the first N characters.
        #[arg(long)]
        preview: Option<usize>,
    },

    /// Ask a single question.
    Ask {
        /// The question.
        question: String,

        /// Use a single page as context instead of the whole space.
        #[arg(long)]
        page: Option<String>,
    },

    /// Interactive question loop. Type `exit` to quit.
    Chat {
        /// Use a single page as context instead of the whole space.
        #[arg(long)]
        page: Option<String>,
    },

    /// Serve `/ask`, `/history` and `/health` on `[server].bind`.
    Serve {
        /// Use a single page as context instead of the whole space.
        #[arg(long)]
        page: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let cfg = config::load_config(&cli.config)?;
    let progress = ProgressMode::from_flag(cli.progress.as_deref())?;

    match cli.command {
        Commands::Sources => {
            sources::list_sources(&cfg)?;
        }
        Commands::Fetch {
            page,
            output,
            preview,
        } => {
            confluence::run_fetch(
                &cfg,
                page.as_deref(),
                output.as_deref(),
                preview,
                progress,
            )
            .await?;
        }
        Commands::Ask { question, page } => {
            answer::run_ask(&cfg, &question, page.as_deref(), progress).await?;
        }
        Commands::Chat { page } => {
            chat::run_chat(&cfg, page.as_deref(), progress).await?;
        }
        Commands::Serve { page } => {
            server::run_server(&cfg, page.as_deref(), progress).await?;
        }
    }

    Ok(())
}
