//! drive_backup CLI - Back up local directories to Google Drive.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use drive_backup::server::{self, AppState};
use drive_backup::{
    parse_folder_id, CredentialProvider, RemoteStore, Settings, SyncOrchestrator, SyncReport,
};

/// CLI tool for pushing local directories into Google Drive.
#[derive(Parser)]
#[command(name = "drive_backup")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Back up the source directory into Backups/<today>. Meant for cron.
    Backup,

    /// Upload the files of a local directory into a folder under the root.
    Sync {
        /// Folder name under the root.
        #[arg(long, short = 't')]
        target: String,

        /// Local directory whose files are uploaded (not recursive).
        #[arg(long, short = 'p')]
        path: PathBuf,

        /// Optional subfolder, usually a date like 2024-05-01.
        #[arg(long)]
        date: Option<String>,
    },

    /// List files in a folder (the root by default).
    List {
        /// Folder URL or ID.
        #[arg(long, value_parser = parse_folder_id)]
        folder: Option<String>,
    },

    /// Serve the HTTP trigger endpoints.
    Serve {
        #[arg(long, default_value = "127.0.0.1", env = "DRIVE_BACKUP_HOST")]
        host: String,

        #[arg(long, default_value = "8080", env = "DRIVE_BACKUP_PORT")]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let provider = Arc::new(CredentialProvider::new(cli.settings.clone()));

    match cli.command {
        Commands::Backup => {
            info!("Starting memory backup from {}", cli.settings.source_dir.display());

            let client = provider.client().await.with_context(|| {
                format!("Failed to load credentials from {:?}", cli.settings.key_path)
            })?;
            let orchestrator = SyncOrchestrator::from_settings(client, &cli.settings);

            let report = orchestrator
                .backup_memory_snapshot()
                .await
                .context("Backup failed")?;
            finish(&report, "Backed up")?;
        }

        Commands::Sync { target, path, date } => {
            let client = provider.client().await.with_context(|| {
                format!("Failed to load credentials from {:?}", cli.settings.key_path)
            })?;
            let orchestrator = SyncOrchestrator::from_settings(client, &cli.settings);

            let report = orchestrator
                .sync_directory(&target, &path, date.as_deref())
                .await
                .with_context(|| format!("Failed to sync {:?} to {}", path, target))?;
            finish(&report, "Synced")?;
        }

        Commands::List { folder } => {
            let folder_id = folder.unwrap_or_else(|| cli.settings.root_folder_id.clone());
            let client = provider.client().await.with_context(|| {
                format!("Failed to load credentials from {:?}", cli.settings.key_path)
            })?;

            let files = client
                .list_children(&folder_id)
                .await
                .with_context(|| format!("Failed to list files in folder: {}", folder_id))?;

            if files.is_empty() {
                println!("No files found.");
            } else {
                println!("ID\tSIZE\tTYPE\tNAME");
                for file in files {
                    println!("{}", file);
                }
            }
        }

        Commands::Serve { host, port } => {
            let app = server::router(AppState::new(provider));

            let addr = format!("{}:{}", host, port);
            let listener = TcpListener::bind(&addr)
                .await
                .with_context(|| format!("Failed to bind {}", addr))?;
            info!("Listening on http://{}", addr);

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            info!("Server shutdown complete");
        }
    }

    Ok(())
}

/// Print the per-file outcome; any failed file makes the run fail.
fn finish(report: &SyncReport, verb: &str) -> Result<()> {
    for file in &report.succeeded {
        println!("OK      {} ({})", file.name, file.id);
    }
    for file in &report.failed {
        println!("FAILED  {}: {}", file.name, file.reason);
    }

    if report.folder.is_none() {
        println!("Nothing to upload.");
        return Ok(());
    }

    println!(
        "{} {} files to Drive/{}/",
        verb,
        report.uploaded_count(),
        report.remote_path
    );

    if let Some(reason) = &report.aborted {
        error!("Run stopped early: {}", reason);
    }
    if !report.is_success() {
        error!(
            "{} of {} files failed",
            report.failed.len(),
            report.failed.len() + report.uploaded_count()
        );
        anyhow::bail!("{} file(s) failed to upload", report.failed.len());
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, initiating shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("Received SIGTERM, initiating shutdown");
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
