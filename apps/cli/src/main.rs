//! vaultdrop entry point.

mod commands;
mod config;

use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Connection settings shared by every command.
#[derive(Args, Debug, Clone)]
pub struct Connection {
    /// Server base URL (e.g. https://note.example.com)
    #[arg(long, env = "FAST_NOTE_URL", global = true)]
    url: Option<String>,

    /// API token
    #[arg(long, env = "FAST_NOTE_TOKEN", global = true, hide_env_values = true)]
    token: Option<String>,

    /// Vault name
    #[arg(long, short = 'v', env = "FAST_NOTE_VAULT", default_value = "Obsidian", global = true)]
    vault: String,
}

impl Connection {
    /// Base URL and token, both required.
    pub fn credentials(&self) -> anyhow::Result<(&str, &str)> {
        match (self.url.as_deref(), self.token.as_deref()) {
            (Some(url), Some(token)) if !url.trim().is_empty() && !token.trim().is_empty() => {
                Ok((url, token))
            }
            _ => anyhow::bail!("FAST_NOTE_URL and FAST_NOTE_TOKEN must be set"),
        }
    }

    pub fn vault(&self) -> &str {
        &self.vault
    }
}

#[derive(Parser)]
#[command(name = "vaultdrop", version, about = "Push attachments and notes into a synced vault")]
struct Cli {
    #[command(flatten)]
    connection: Connection,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload attachments over the sync channel
    Upload {
        /// Local files to upload
        #[arg(required = true)]
        files: Vec<String>,

        /// Vault folder to place the files in
        #[arg(long)]
        prefix: Option<String>,

        /// Maximum concurrent transfers (default: unlimited)
        #[arg(long)]
        max_parallel: Option<usize>,

        /// Print per-chunk progress
        #[arg(long)]
        verbose: bool,
    },

    /// Write notes through the note store API
    Note {
        #[command(subcommand)]
        command: NoteCommands,
    },
}

#[derive(Subcommand)]
enum NoteCommands {
    /// Create or replace a note
    Save {
        /// Markdown file to upload
        file: Option<String>,

        /// Read content from stdin
        #[arg(long, conflicts_with = "content")]
        stdin: bool,

        /// Content given inline
        #[arg(long)]
        content: Option<String>,

        /// Note path inside the vault (required with --stdin or --content)
        #[arg(long, short = 'p')]
        path: Option<String>,
    },

    /// Update frontmatter fields of a note
    Frontmatter {
        /// Note path inside the vault
        #[arg(long, short = 'p')]
        path: String,

        /// Fields to set, as a JSON object
        #[arg(long, short = 'u')]
        updates: String,
    },

    /// Create or refresh a folder's Dataview index page
    Index {
        /// Vault folder
        #[arg(long, short = 'f', default_value = vaultdrop_note_store::index::DEFAULT_INDEX_FOLDER)]
        folder: String,

        /// Page title (default: derived from the folder)
        #[arg(long, short = 't')]
        title: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr; stdout carries the JSON result.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match config::CliConfig::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: failed to load config: {e:#}");
            return ExitCode::from(commands::EXIT_FATAL);
        }
    };

    let result = match cli.command {
        Commands::Upload {
            files,
            prefix,
            max_parallel,
            verbose,
        } => {
            commands::upload::run_upload(
                &cli.connection,
                &config,
                &files,
                prefix.as_deref(),
                max_parallel,
                verbose,
            )
            .await
        }
        Commands::Note { command } => match command {
            NoteCommands::Save {
                file,
                stdin,
                content,
                path,
            } => {
                let source = if stdin {
                    commands::note::NoteSource::Stdin
                } else if let Some(content) = content {
                    commands::note::NoteSource::Inline(content)
                } else if let Some(file) = file {
                    commands::note::NoteSource::File(file.into())
                } else {
                    eprintln!("Error: provide a FILE, --stdin or --content");
                    return ExitCode::from(commands::EXIT_FATAL);
                };
                commands::note::run_save(&cli.connection, source, path.as_deref()).await
            }
            NoteCommands::Frontmatter { path, updates } => {
                commands::note::run_frontmatter(&cli.connection, &path, &updates).await
            }
            NoteCommands::Index { folder, title } => {
                commands::note::run_index(&cli.connection, &folder, title.as_deref()).await
            }
        },
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(commands::EXIT_FATAL)
        }
    }
}
