//! CLI for the RUM upload manager.

mod commands;
mod control_socket;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rum_core::config;
use rum_core::session_db::SessionDb;

use commands::{
    run_add, run_cancel, run_clear_completed, run_fingerprint, run_pause, run_remove,
    run_resume, run_status, run_uploads, run_watch, AddArgs,
};

/// Top-level CLI for the RUM upload manager.
#[derive(Debug, Parser)]
#[command(name = "rum")]
#[command(about = "RUM: resumable chunked upload manager", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Queue a new upload session for a local video file.
    Add {
        /// Path to the video file.
        file: String,

        /// Target collection (series/season) id.
        #[arg(long)]
        collection: String,

        /// Episode sequence number within the collection.
        #[arg(long)]
        sequence: u32,

        /// Episode title (defaults to the file stem).
        #[arg(long)]
        title: Option<String>,

        /// Optional episode description.
        #[arg(long)]
        description: Option<String>,

        /// Ingest endpoint (overrides the configured default).
        #[arg(long)]
        endpoint: Option<String>,
    },

    /// Process queued sessions, transferring up to N concurrently.
    Run {
        /// Run up to N sessions concurrently (default from config).
        #[arg(long, value_name = "N")]
        jobs: Option<usize>,

        /// After byte transfer, follow the server's post-processing channel
        /// and record the outcome.
        #[arg(long)]
        watch: bool,
    },

    /// Show status of all sessions.
    Status,

    /// Pause a queued or transferring session by its ID.
    Pause {
        /// Session identifier.
        id: i64,
    },

    /// Re-queue a paused session, re-validating the source file first.
    Resume {
        /// Session identifier.
        id: i64,

        /// Re-supply the source from a different path (must match the
        /// original file's size and content fingerprint).
        #[arg(long)]
        file: Option<String>,
    },

    /// Cancel a session: abort the transfer and remove it.
    Cancel {
        /// Session identifier.
        id: i64,

        /// Keep the partial data on the server instead of deleting it.
        #[arg(long)]
        keep_remote: bool,
    },

    /// Remove a session record (not allowed while it is transferring).
    Remove {
        /// Session identifier.
        id: i64,
    },

    /// Remove all completed sessions.
    ClearCompleted,

    /// Follow a byte-complete session's post-processing channel until the
    /// terminal event.
    Watch {
        /// Session identifier.
        id: i64,
    },

    /// Print the content fingerprint of a file.
    Fingerprint {
        /// Path to the file.
        path: String,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);
        let db = SessionDb::open_default().await?;

        match cli.command {
            CliCommand::Add {
                file,
                collection,
                sequence,
                title,
                description,
                endpoint,
            } => {
                run_add(
                    &db,
                    &cfg,
                    AddArgs {
                        file,
                        collection,
                        sequence,
                        title,
                        description,
                        endpoint,
                    },
                )
                .await?
            }
            CliCommand::Run { jobs, watch } => run_uploads(&db, &cfg, jobs, watch).await?,
            CliCommand::Status => run_status(&db).await?,
            CliCommand::Pause { id } => run_pause(&db, id).await?,
            CliCommand::Resume { id, file } => run_resume(&db, id, file.as_deref()).await?,
            CliCommand::Cancel { id, keep_remote } => {
                run_cancel(&db, &cfg, id, keep_remote).await?
            }
            CliCommand::Remove { id } => run_remove(&db, id).await?,
            CliCommand::ClearCompleted => run_clear_completed(&db).await?,
            CliCommand::Watch { id } => run_watch(&db, &cfg, id).await?,
            CliCommand::Fingerprint { path } => run_fingerprint(&path)?,
        }

        Ok(())
    }
}
