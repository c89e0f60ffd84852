//! OAuth2 authorization code flow for the Dropbox API
//!
//! Dropbox apps without a redirect URI show the authorization code to the
//! user, who pastes it back into the terminal. The code is then exchanged
//! for an access token using the app's client id and secret.
//!
//! ## Components
//!
//! - [`OAuth2Config`] - App credentials and endpoint URLs
//! - [`KeyringTokenStorage`] - Access token storage in the system keyring
//! - [`CodeFlow`] - Authorization URL and code exchange
//! - [`DropboxAuthAdapter`] - Interactive login from the terminal

use std::io::Write;

use anyhow::{bail, Context, Result};
use oauth2::{
    basic::BasicClient, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken,
    EndpointNotSet, EndpointSet, TokenResponse, TokenUrl,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

/// Dropbox OAuth2 authorization endpoint
const AUTH_URL: &str = "https://www.dropbox.com/oauth2/authorize";

/// Dropbox OAuth2 token endpoint
const TOKEN_URL: &str = "https://api.dropboxapi.com/oauth2/token";

/// Keyring service name for storing tokens
const KEYRING_SERVICE: &str = "dbxsync";

// ============================================================================
// OAuth2Config
// ============================================================================

/// Configuration for the OAuth2 code flow
#[derive(Debug, Clone)]
pub struct OAuth2Config {
    /// App key from the Dropbox app console
    pub client_id: String,
    /// App secret from the Dropbox app console
    pub client_secret: String,
    pub auth_url: String,
    pub token_url: String,
}

impl OAuth2Config {
    /// Creates a config for the public Dropbox endpoints
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            auth_url: AUTH_URL.to_string(),
            token_url: TOKEN_URL.to_string(),
        }
    }

    /// Overrides the token endpoint (useful for testing)
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }
}

// ============================================================================
// KeyringTokenStorage
// ============================================================================

/// Stores and retrieves access tokens from the system keyring
///
/// Tokens are stored under the service name "dbxsync" with the app's
/// client id as the username, so switching apps never reuses a token.
pub struct KeyringTokenStorage;

impl KeyringTokenStorage {
    /// Stores the access token for `username`
    pub fn store(username: &str, access_token: &str) -> Result<()> {
        let entry = keyring::Entry::new(KEYRING_SERVICE, username)
            .context("Failed to create keyring entry")?;

        entry
            .set_password(access_token)
            .context("Failed to store token in keyring")?;

        debug!("Stored token in keyring for {}", username);
        Ok(())
    }

    /// Loads the access token for `username`, `None` if there isn't one
    pub fn load(username: &str) -> Result<Option<String>> {
        let entry = keyring::Entry::new(KEYRING_SERVICE, username)
            .context("Failed to create keyring entry")?;

        match entry.get_password() {
            Ok(token) => {
                debug!("Loaded token from keyring for {}", username);
                Ok(Some(token))
            }
            Err(keyring::Error::NoEntry) => {
                debug!("No token found in keyring for {}", username);
                Ok(None)
            }
            Err(e) => Err(anyhow::Error::new(e).context("Failed to read from keyring")),
        }
    }

    /// Removes the access token for `username`
    pub fn clear(username: &str) -> Result<()> {
        let entry = keyring::Entry::new(KEYRING_SERVICE, username)
            .context("Failed to create keyring entry")?;

        match entry.delete_credential() {
            Ok(()) => {
                info!("Cleared token from keyring for {}", username);
                Ok(())
            }
            Err(keyring::Error::NoEntry) => {
                debug!("No token to clear for {}", username);
                Ok(())
            }
            Err(e) => Err(anyhow::Error::new(e).context("Failed to delete from keyring")),
        }
    }
}

// ============================================================================
// CodeFlow
// ============================================================================

/// OAuth2 authorization code flow using the `oauth2` crate
pub struct CodeFlow {
    client: BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>,
}

impl CodeFlow {
    /// Creates a new CodeFlow with the given configuration
    pub fn new(config: &OAuth2Config) -> Result<Self> {
        let client = BasicClient::new(ClientId::new(config.client_id.clone()))
            .set_client_secret(ClientSecret::new(config.client_secret.clone()))
            .set_auth_uri(AuthUrl::new(config.auth_url.clone()).context("Invalid authorization URL")?)
            .set_token_uri(TokenUrl::new(config.token_url.clone()).context("Invalid token URL")?);

        Ok(Self { client })
    }

    /// URL the user opens to authorize the app
    pub fn authorize_url(&self) -> String {
        let (url, _csrf_token) = self.client.authorize_url(CsrfToken::new_random).url();
        url.to_string()
    }

    /// Exchanges an authorization code for an access token
    pub async fn exchange_code(&self, code: String) -> Result<String> {
        info!("Exchanging authorization code for an access token");

        let http_client = reqwest::ClientBuilder::new()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("Failed to build HTTP client")?;

        let token = self
            .client
            .exchange_code(AuthorizationCode::new(code))
            .request_async(&http_client)
            .await
            .context("can't exchange code")?;

        Ok(token.access_token().secret().to_string())
    }
}

// ============================================================================
// DropboxAuthAdapter
// ============================================================================

/// Interactive login from the terminal
///
/// 1. Prints the authorization URL and tries to open it in a browser
/// 2. Reads the code the user copies from the Dropbox page
/// 3. Exchanges the code for an access token
pub struct DropboxAuthAdapter {
    config: OAuth2Config,
}

impl DropboxAuthAdapter {
    pub fn new(config: OAuth2Config) -> Self {
        Self { config }
    }

    /// Runs the interactive login and returns the access token
    pub async fn login(&self) -> Result<String> {
        let flow = CodeFlow::new(&self.config)?;
        let url = flow.authorize_url();

        println!("1. Go to: {url}");
        println!("2. Click \"Allow\" (you might have to log in first).");
        println!("3. Copy the authorization code.");
        if let Err(e) = webbrowser::open(&url) {
            warn!("Could not open a browser: {e}");
        }

        print!("Enter the authorization code here: ");
        std::io::stdout().flush().ok();

        let mut code = String::new();
        BufReader::new(tokio::io::stdin())
            .read_line(&mut code)
            .await
            .context("can't read authorization code")?;

        let code = code.trim();
        if code.is_empty() {
            bail!("no authorization code entered");
        }

        flow.exchange_code(code.to_string()).await
    }

    /// Returns a reference to the current configuration
    pub fn config(&self) -> &OAuth2Config {
        &self.config
    }
}
