//! Fetching scripts for `:load`.
//!
//! Each URL is fetched on its own tokio task. The outcome comes back through
//! a channel and the session turns it into exactly one output line.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::{ConsoleError, Result};

/// Source of script text for `:load`.
#[async_trait]
pub trait ScriptLoader: Send + Sync {
    /// Fetches the script at `url`.
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// Loads scripts over HTTP(S).
#[derive(Debug, Clone, Default)]
pub struct HttpScriptLoader {
    client: reqwest::Client,
}

impl HttpScriptLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ScriptLoader for HttpScriptLoader {
    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ConsoleError::load(url, e.to_string()))?
            .error_for_status()
            .map_err(|e| ConsoleError::load(url, e.to_string()))?;

        let body = response.text().await?;
        tracing::debug!(url, bytes = body.len(), "Fetched script");
        Ok(body)
    }
}

/// Result of one fetch, delivered back to the session.
#[derive(Debug)]
pub struct LoadOutcome {
    pub url: String,
    pub result: Result<String>,
}

/// Starts fetching `url` in the background.
///
/// Fails immediately when no tokio runtime is available to run the fetch.
pub(crate) fn spawn_load(
    loader: Arc<dyn ScriptLoader>,
    url: String,
    sender: mpsc::UnboundedSender<LoadOutcome>,
) -> Result<()> {
    let handle = tokio::runtime::Handle::try_current()
        .map_err(|e| ConsoleError::load(url.clone(), e.to_string()))?;

    handle.spawn(async move {
        let result = loader.fetch(&url).await;
        if let Err(e) = &result {
            tracing::warn!(url = %url, error = %e, "Script load failed");
        }
        // Non-blocking send - if the session is gone, we just skip
        let _ = sender.send(LoadOutcome { url, result });
    });
    Ok(())
}
