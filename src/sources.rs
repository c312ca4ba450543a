//! Status of the two external services.
//!
//! Used by `cqa sources` to check configuration before fetching anything.
//!
//! | Service | Configured When | Ready When |
//! |---------|-----------------|------------|
//! | `confluence` | `base_url` and `space_key` set | also `CONFLUENCE_EMAIL` and `CONFLUENCE_API_TOKEN` set |
//! | `together` | endpoint and model set | also `TOGETHER_API_KEY` set |
//!
//! No network calls are made.

use anyhow::Result;
use serde::Serialize;

use crate::config::Config;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SourceStatus {
    pub name: String,
    pub configured: bool,
    pub ready: bool,
    pub notes: Option<String>,
}

/// Compute service status using `lookup` for environment variables.
pub fn get_sources_with<F>(config: &Config, lookup: F) -> Vec<SourceStatus>
where
    F: Fn(&str) -> Option<String>,
{
    let present = |key: &str| lookup(key).map(|v| !v.is_empty()).unwrap_or(false);

    let confluence_configured = !config.confluence.base_url.trim().is_empty()
        && !config.confluence.space_key.trim().is_empty();
    let missing: Vec<&str> = ["CONFLUENCE_EMAIL", "CONFLUENCE_API_TOKEN"]
        .into_iter()
        .filter(|k| !present(*k))
        .collect();
    let confluence_notes = if !confluence_configured {
        Some("base_url or space_key not set".to_string())
    } else if !missing.is_empty() {
        Some(format!("missing {}", missing.join(", ")))
    } else {
        Some(format!(
            "space {} at {}",
            config.confluence.space_key,
            config.base_url()
        ))
    };

    let together_configured =
        !config.llm.endpoint.trim().is_empty() && !config.llm.model.trim().is_empty();
    let has_key = present("TOGETHER_API_KEY");
    let together_notes = if has_key {
        Some(format!("model {}", config.llm.model))
    } else {
        Some("missing TOGETHER_API_KEY".to_string())
    };

    vec![
        SourceStatus {
            name: "confluence".to_string(),
            configured: confluence_configured,
            ready: confluence_configured && missing.is_empty(),
            notes: confluence_notes,
        },
        SourceStatus {
            name: "together".to_string(),
            configured: together_configured,
            ready: together_configured && has_key,
            notes: together_notes,
        },
    ]
}

pub fn get_sources(config: &Config) -> Vec<SourceStatus> {
    get_sources_with(config, |key| std::env::var(key).ok())
}

pub fn list_sources(config: &Config) -> Result<()> {
    println!("{:<12} {:<12} {:<7} NOTES", "SERVICE", "CONFIGURED", "READY");
    for s in get_sources(config) {
        println!(
            "{:<12} {:<12} {:<7} {}",
            s.name,
            s.configured,
            s.ready,
            s.notes.unwrap_or_default()
        );
    }
    Ok(())
}
