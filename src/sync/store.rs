use std::ops::Deref;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use thiserror::Error;

use super::config::SyncConfig;

/// A document as the store returns it: transfer encoded content plus the version token that
/// identifies exactly this content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteDocument {
    pub content: String,
    pub version: String,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document not found")]
    NotFound,

    /// The version token presented with a write is no longer the latest one.
    #[error("version conflict, the document was changed by someone else")]
    Conflict,

    #[error("credential rejected ({status})")]
    Unauthorized { status: u16 },

    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("parse error: {0}")]
    Parse(String),
}

/// Interface of a versioned blob store addressed by owner, repository and path.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Retrieves the document at `path`. Absence is reported as [StoreError::NotFound].
    async fn fetch(&self, config: &SyncConfig, path: &str) -> Result<RemoteDocument, StoreError>;

    /// Creates or replaces the document at `path` and returns the new version token. `version`
    /// must be the token of the last observed content, or `None` when the document is believed
    /// not to exist yet. A stale token fails with [StoreError::Conflict].
    async fn write(
        &self,
        config: &SyncConfig,
        path: &str,
        content: String,
        version: Option<String>,
    ) -> Result<String, StoreError>;
}

#[async_trait]
impl<P> RemoteStore for P
where
    P: Deref + Send + Sync,
    P::Target: RemoteStore,
{
    async fn fetch(&self, config: &SyncConfig, path: &str) -> Result<RemoteDocument, StoreError> {
        self.deref().fetch(config, path).await
    }

    async fn write(
        &self,
        config: &SyncConfig,
        path: &str,
        content: String,
        version: Option<String>,
    ) -> Result<String, StoreError> {
        self.deref().write(config, path, content, version).await
    }
}
