//! Dropbox API v2 client
//!
//! Dropbox spreads its API over three hosts:
//! - `api.dropboxapi.com` for RPC endpoints (JSON in, JSON out)
//! - `content.dropboxapi.com` for uploads and downloads, where the JSON
//!   argument travels in the `Dropbox-API-Arg` header
//! - `notify.dropboxapi.com` for the unauthenticated long-poll endpoint
//!
//! ## Usage
//!
//! ```rust,no_run
//! use dbxsync_dropbox::client::DropboxClient;
//! use dbxsync_dropbox::files;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = DropboxClient::new("access-token-here");
//! let entry = files::get_metadata(&client, "/notes/todo.txt").await?;
//! println!("{:?}", entry.content_hash);
//! # Ok(())
//! # }
//! ```

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::DropboxError;

/// Base URL for RPC endpoints
const API_URL: &str = "https://api.dropboxapi.com";

/// Base URL for content upload/download endpoints
const CONTENT_URL: &str = "https://content.dropboxapi.com";

/// Base URL for the long-poll endpoint
const NOTIFY_URL: &str = "https://notify.dropboxapi.com";

/// Header carrying the JSON argument of content endpoints
const API_ARG_HEADER: &str = "Dropbox-API-Arg";

// ============================================================================
// DropboxClient
// ============================================================================

/// HTTP client for Dropbox API calls
///
/// Wraps `reqwest::Client` with the bearer token and the per-host base URLs.
pub struct DropboxClient {
    /// The underlying HTTP client
    client: Client,
    api_url: String,
    content_url: String,
    notify_url: String,
    /// OAuth2 access token
    access_token: String,
}

impl DropboxClient {
    /// Creates a new DropboxClient with the given access token
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_url: API_URL.to_string(),
            content_url: CONTENT_URL.to_string(),
            notify_url: NOTIFY_URL.to_string(),
            access_token: access_token.into(),
        }
    }

    /// Creates a client that sends every request to `base_url` (useful for testing)
    pub fn with_base_url(access_token: impl Into<String>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            client: Client::new(),
            api_url: base_url.clone(),
            content_url: base_url.clone(),
            notify_url: base_url,
            access_token: access_token.into(),
        }
    }

    /// Returns a reference to the current access token
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    fn authorized(&self, base_url: &str, endpoint: &str) -> RequestBuilder {
        self.client
            .post(format!("{base_url}{endpoint}"))
            .bearer_auth(&self.access_token)
    }

    /// Calls an RPC endpoint on the API host
    pub(crate) async fn rpc<A, T>(&self, endpoint: &str, arg: &A) -> Result<T, DropboxError>
    where
        A: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!(endpoint, "Dropbox RPC request");
        let response = self
            .authorized(&self.api_url, endpoint)
            .json(arg)
            .send()
            .await?;
        decode(endpoint, check_status(endpoint, response).await?).await
    }

    /// Calls the long-poll endpoint, which must not carry an Authorization header
    pub(crate) async fn notify_rpc<A, T>(&self, endpoint: &str, arg: &A) -> Result<T, DropboxError>
    where
        A: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!(endpoint, "Dropbox notify request");
        let response = self
            .client
            .post(format!("{}{endpoint}", self.notify_url))
            .json(arg)
            .send()
            .await?;
        decode(endpoint, check_status(endpoint, response).await?).await
    }

    /// Downloads from a content endpoint; the body of the response is the file
    pub(crate) async fn content_download<A>(
        &self,
        endpoint: &str,
        arg: &A,
    ) -> Result<Vec<u8>, DropboxError>
    where
        A: Serialize + ?Sized,
    {
        debug!(endpoint, "Dropbox content download");
        let response = self
            .authorized(&self.content_url, endpoint)
            .header(API_ARG_HEADER, api_arg_header(arg)?)
            .send()
            .await?;
        let bytes = check_status(endpoint, response).await?.bytes().await?;
        Ok(bytes.to_vec())
    }

    /// Uploads `data` to a content endpoint and decodes the JSON answer
    pub(crate) async fn content_upload<A, T>(
        &self,
        endpoint: &str,
        arg: &A,
        data: Vec<u8>,
    ) -> Result<T, DropboxError>
    where
        A: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!(endpoint, bytes = data.len(), "Dropbox content upload");
        let response = self
            .authorized(&self.content_url, endpoint)
            .header(API_ARG_HEADER, api_arg_header(arg)?)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(data)
            .send()
            .await?;
        decode(endpoint, check_status(endpoint, response).await?).await
    }
}

/// Turns any status >= 400 into [`DropboxError::Api`] carrying the body
async fn check_status(endpoint: &str, response: Response) -> Result<Response, DropboxError> {
    let status = response.status();
    if status.as_u16() < 400 {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(DropboxError::Api {
        endpoint: endpoint.to_string(),
        status: status.as_u16(),
        body,
    })
}

async fn decode<T: DeserializeOwned>(endpoint: &str, response: Response) -> Result<T, DropboxError> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| DropboxError::InvalidResponse {
        endpoint: endpoint.to_string(),
        message: format!("{e}: {body}"),
    })
}

/// Serializes a `Dropbox-API-Arg` header value
///
/// HTTP header values must be ASCII, so every non-ASCII character is written
/// as a JSON `\uXXXX` escape (UTF-16 surrogate pairs above the BMP).
pub fn api_arg_header<A: Serialize + ?Sized>(arg: &A) -> Result<String, DropboxError> {
    let json =
        serde_json::to_string(arg).map_err(|e| DropboxError::InvalidArgument(e.to_string()))?;

    let mut escaped = String::with_capacity(json.len());
    for c in json.chars() {
        if c.is_ascii() {
            escaped.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                escaped.push_str(&format!("\\u{unit:04x}"));
            }
        }
    }
    Ok(escaped)
}
