//! Login and logout commands
//!
//! - `login` runs the interactive Dropbox code flow and stores the access
//!   token in the system keyring
//! - `logout` removes the stored token
//!
//! Tokens are keyed by the configured app key, so each app has its own.

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use dbxsync_core::config::Config;
use dbxsync_dropbox::auth::{DropboxAuthAdapter, KeyringTokenStorage, OAuth2Config};

use crate::output::OutputFormatter;

#[derive(Debug, Args)]
pub struct LoginCommand;

impl LoginCommand {
    pub async fn execute(&self, config: &Config, fmt: &dyn OutputFormatter) -> Result<()> {
        login(config).await?;
        fmt.success("Access token stored in the system keyring");
        Ok(())
    }
}

#[derive(Debug, Args)]
pub struct LogoutCommand;

impl LogoutCommand {
    pub async fn execute(&self, config: &Config, fmt: &dyn OutputFormatter) -> Result<()> {
        KeyringTokenStorage::clear(&config.authentication.client_id)
            .context("can't remove the stored access token")?;
        fmt.success("Logged out");
        Ok(())
    }
}

/// Runs the interactive login and stores the resulting token
pub async fn login(config: &Config) -> Result<String> {
    let auth = &config.authentication;
    info!(client_id = %auth.client_id, "Starting Dropbox login");

    let adapter = DropboxAuthAdapter::new(OAuth2Config::new(&auth.client_id, &auth.client_secret));
    let token = adapter.login().await.context("Dropbox login failed")?;

    KeyringTokenStorage::store(&auth.client_id, &token)
        .context("can't store the access token")?;
    Ok(token)
}

/// Returns the stored access token, logging in first if there is none
pub async fn obtain_token(config: &Config, fmt: &dyn OutputFormatter) -> Result<String> {
    let client_id = &config.authentication.client_id;
    if let Some(token) =
        KeyringTokenStorage::load(client_id).context("can't read the stored access token")?
    {
        return Ok(token);
    }

    fmt.warn("No stored access token, starting login");
    login(config).await
}
