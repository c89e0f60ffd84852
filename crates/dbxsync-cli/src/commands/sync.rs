//! Sync command - Keep every configured folder pair in sync
//!
//! 1. Obtains an access token (stored, or through an interactive login)
//! 2. Creates any missing local root
//! 3. Starts both drain loops of every folder pair
//! 4. Waits until a loop fails or a shutdown signal arrives
//!
//! The first failure cancels every other loop; it is returned once all of
//! them have stopped.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use dbxsync_core::config::{Config, FolderConfig};
use dbxsync_core::ports::remote_store::IRemoteStore;
use dbxsync_dropbox::client::DropboxClient;
use dbxsync_sync::engine::Synchronizer;

use crate::commands::auth;
use crate::output::OutputFormatter;

#[derive(Debug, Default, Args)]
pub struct SyncCommand;

impl SyncCommand {
    pub async fn execute(&self, config: &Config, fmt: &dyn OutputFormatter) -> Result<()> {
        let token = auth::obtain_token(config, fmt).await?;
        let store: Arc<dyn IRemoteStore> = Arc::new(DropboxClient::new(token));

        for folder in &config.folders {
            create_local_root(&folder.local_path).await?;
        }

        let shutdown = CancellationToken::new();
        tokio::spawn(shutdown_signal(shutdown.clone()));

        for folder in &config.folders {
            fmt.folder_pair(&folder.local_path, &folder.remote_path);
        }
        run_pairs(store, &config.folders, shutdown).await?;
        fmt.sync_stopped(config.folders.len());
        Ok(())
    }
}

/// Creates a missing local root (mode 0750 on Unix)
async fn create_local_root(path: &Path) -> Result<()> {
    let mut builder = tokio::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(0o750);

    builder
        .create(path)
        .await
        .with_context(|| format!("can't create local folder {}", path.display()))
}

/// Runs both loops of every folder pair until they have all stopped
///
/// Returns the first error any loop reported. That error also cancels
/// `shutdown`, which stops the remaining loops.
pub(crate) async fn run_pairs(
    store: Arc<dyn IRemoteStore>,
    folders: &[FolderConfig],
    shutdown: CancellationToken,
) -> Result<()> {
    let mut tasks = JoinSet::new();

    for folder in folders {
        let sync = Arc::new(Synchronizer::new(
            store.clone(),
            folder.local_path.clone(),
            folder.remote_path.clone(),
        ));
        info!(
            local = %folder.local_path.display(),
            remote = %folder.remote_path,
            "Starting folder pair"
        );

        let (remote_sync, remote_token) = (sync.clone(), shutdown.clone());
        tasks.spawn(async move {
            remote_sync
                .sync_remote_to_local(&remote_token)
                .await
                .with_context(|| {
                    format!(
                        "Dropbox to local sync of {} stopped",
                        remote_sync.local_root().display()
                    )
                })
        });

        let (local_sync, local_token) = (sync, shutdown.clone());
        tasks.spawn(async move {
            local_sync
                .sync_local_to_remote(&local_token)
                .await
                .with_context(|| {
                    format!(
                        "local to Dropbox sync of {} stopped",
                        local_sync.local_root().display()
                    )
                })
        });
    }

    let mut first_error = None;
    while let Some(joined) = tasks.join_next().await {
        let result = joined
            .context("sync task panicked")
            .and_then(|result| result);

        if let Err(e) = result {
            if first_error.is_none() {
                error!(error = %format!("{e:#}"), "Stopping all folders");
                shutdown.cancel();
                first_error = Some(e);
            } else {
                debug!(error = %format!("{e:#}"), "Further error while stopping");
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Cancels `token` on SIGINT or SIGTERM
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Can't listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Can't listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
        _ = token.cancelled() => return,
    }

    token.cancel();
}
