//! filedock command line uploader.

mod config;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, ensure};
use clap::{Parser, Subcommand};
use filedock_http::HttpStorageServer;
use filedock_protocol::MenuId;
use filedock_upload::{BatchCallbacks, BatchCoordinator, BatchFile, BatchSummary, scan_directory};
use tracing_subscriber::EnvFilter;

use crate::config::CliConfig;

#[derive(Debug, Parser)]
#[command(name = "filedock", version, about = "Upload files to a filedock storage server")]
struct Cli {
    /// Configuration file (defaults to ~/.config/filedock/config.json).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Uploads files and directories.
    Upload {
        /// Files or directories to upload.
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Target directory id for files with no configured mapping.
        #[arg(long)]
        menu_id: Option<i64>,

        /// Storage server base URL.
        #[arg(long)]
        base_url: Option<String>,

        /// Session token.
        #[arg(long)]
        token: Option<String>,

        /// Fail files whose name is already taken in the target directory.
        #[arg(long)]
        check_names: bool,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,filedock=debug")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = match CliConfig::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(error = %e, "failed to load config, using defaults");
            CliConfig::default()
        }
    };

    match cli.command {
        Commands::Upload {
            paths,
            menu_id,
            base_url,
            token,
            check_names,
        } => {
            if let Some(url) = base_url {
                config.base_url = url;
            }
            if let Some(token) = token {
                config.token = token;
            }
            if check_names {
                config.upload.check_duplicate_names = true;
            }
            let summary = upload(&config, &paths, menu_id.map(MenuId)).await?;
            print_summary(&summary);
            Ok(if summary.failed == 0 {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

async fn upload(config: &CliConfig, paths: &[PathBuf], menu_id: Option<MenuId>) -> Result<BatchSummary> {
    let server = HttpStorageServer::new(&config.base_url, &config.token, config.timeout())
        .context("failed to create HTTP client")?;

    let mut files = Vec::new();
    for path in paths {
        files.extend(collect(path).await?);
    }
    tracing::info!(files = files.len(), server = %server.base_url(), "starting upload");

    let coordinator = BatchCoordinator::new(&server, config.upload.clone())
        .with_resolver(config.resolver(menu_id))
        .with_callbacks(log_callbacks());
    Ok(coordinator.run(files).await?)
}

/// Expands `path` into batch files: a directory is scanned, a file is
/// uploaded under its own name.
async fn collect(path: &Path) -> Result<Vec<BatchFile>> {
    ensure!(path.exists(), "not found: {}", path.display());

    if path.is_dir() {
        return scan_directory(path)
            .await
            .with_context(|| format!("failed to scan {}", path.display()));
    }

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("invalid file path {}", path.display()))?;
    let file = BatchFile::from_path(name, path)
        .await
        .with_context(|| format!("failed to open {}", path.display()))?;
    Ok(vec![file])
}

fn log_callbacks() -> BatchCallbacks {
    BatchCallbacks::default()
        .on_file_start(|f| tracing::info!(file = %f.relative_path, size = f.size(), "uploading"))
        .on_file_progress(|f, p| tracing::debug!(file = %f.relative_path, percent = p, "progress"))
        .on_file_complete(|f, outcome| {
            tracing::info!(file = %f.relative_path, path = ?outcome.path, "uploaded")
        })
        .on_progress(|done, total| tracing::info!("{done}/{total} files finished"))
}

fn print_summary(summary: &BatchSummary) {
    println!(
        "{} files, {} uploaded, {} failed, {:.2} MiB in {:.1}s",
        summary.total_files,
        summary.succeeded,
        summary.failed,
        summary.total_bytes as f64 / (1024.0 * 1024.0),
        summary.elapsed.as_secs_f64()
    );
    for report in &summary.files {
        if let Err(e) = &report.result {
            println!("  failed: {}: {e}", report.relative_path);
        }
    }
}
