//! Palaver CLI
//!
//! Runs the conversation loop in a terminal and manages local credentials.

#![allow(clippy::print_stdout)]

mod chat;

use std::io::{BufRead, IsTerminal};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ai_core::{AiBackend, ApiKey, CredentialStore, KeySource};
use anyhow::Context;
use clap::{Parser, Subcommand};
use infrastructure::{AppConfig, credential_store, init_logging};
use secrecy::SecretString;

/// Palaver CLI
#[derive(Parser)]
#[command(name = "palaver")]
#[command(author, version, about = "Palaver voice companion", long_about = None)]
struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Configuration file (defaults to ./palaver.toml when present)
    #[arg(short, long, env = "PALAVER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a conversation
    ///
    /// Each typed line is treated as one recognized utterance.
    Chat,

    /// Store an API key for a backend
    ///
    /// Reads the key from stdin when it is not given as an argument.
    /// Example: palaver set-key --backend anthropic
    SetKey {
        /// Backend the key belongs to (defaults to the configured one)
        #[arg(short, long)]
        backend: Option<AiBackend>,

        /// The API key
        key: Option<String>,
    },

    /// Forget the stored API key of a backend
    ClearKey {
        /// Backend whose key is removed (defaults to the configured one)
        #[arg(short, long)]
        backend: Option<AiBackend>,
    },

    /// Show the text that would be spoken for a reply
    ///
    /// Reads from stdin when no text is given.
    Filter {
        /// Reply text
        text: Vec<String>,
    },

    /// Print the effective configuration without secrets
    Config,
}

fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => AppConfig::load().context("Failed to load configuration")?,
    };
    Ok(config)
}

fn store_for(config: &AppConfig) -> anyhow::Result<Arc<dyn CredentialStore>> {
    credential_store(config).context(
        "No location for the credential file; set [credentials] path in palaver.toml",
    )
}

fn read_stdin() -> anyhow::Result<String> {
    let mut text = String::new();
    for line in std::io::stdin().lock().lines() {
        text.push_str(&line?);
        text.push('\n');
    }
    Ok(text)
}

fn backend_or_default(config: &AppConfig, backend: Option<AiBackend>) -> anyhow::Result<AiBackend> {
    let backend = backend.unwrap_or(config.ai.backend);
    if !backend.requires_api_key() {
        anyhow::bail!("{} does not use an API key", backend.display_name());
    }
    Ok(backend)
}

const fn describe(source: KeySource) -> &'static str {
    match source {
        KeySource::Stored => "stored",
        KeySource::Config => "configuration file",
        KeySource::Environment => "environment",
        KeySource::Missing => "missing",
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    init_logging(&config.telemetry, cli.verbose)?;

    match cli.command {
        Commands::Chat => chat::run(config).await?,

        Commands::SetKey { backend, key } => {
            let backend = backend_or_default(&config, backend)?;
            let key = match key {
                Some(key) => key,
                None => {
                    if std::io::stdin().is_terminal() {
                        println!("Paste the {} API key and press Enter:", backend.display_name());
                    }
                    read_stdin()?
                },
            };

            let api_key = ApiKey::resolve(backend, None, Some(store_for(&config)?), false).await;
            api_key.set(SecretString::from(key.trim().to_string())).await?;
            println!("Saved API key for {}", backend.display_name());
        },

        Commands::ClearKey { backend } => {
            let backend = backend_or_default(&config, backend)?;
            store_for(&config)?.remove(backend).await?;
            println!("Removed stored API key for {}", backend.display_name());
        },

        Commands::Filter { text } => {
            let text = if text.is_empty() {
                read_stdin()?
            } else {
                text.join(" ")
            };
            println!("{}", domain::response_filter::filter(&text));
        },

        Commands::Config => {
            print!("{}", config.to_redacted_toml()?);

            let store = credential_store(&config);
            let allow_env = config.environment.allows_env_credentials();
            println!();
            println!("# API keys");
            for backend in AiBackend::ALL.into_iter().filter(|b| b.requires_api_key()) {
                let key = ApiKey::resolve(
                    backend,
                    config.ai.configured_key(backend),
                    store.clone(),
                    allow_env,
                )
                .await;
                println!("# {}: {}", backend.id(), describe(key.source()));
            }
        },
    }

    Ok(())
}
