use std::{sync::Arc, time::Duration};

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

use crate::utils::clock::Clock;

use super::{
    codec::{self, CodecError},
    config::SyncConfig,
    store::{RemoteStore, StoreError},
};

/// Bounds the conflict retry of [SyncEngine::push].
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of write attempts, the first one included.
    pub max_attempts: u32,
    /// Delay before the first retry. Doubles with every further retry.
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(4),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the failed attempt number `attempt` (starting from 1).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// No credential configured, nothing was requested.
    Disabled,
    /// The document doesn't exist remotely yet.
    Missing,
    /// Local value and version token were replaced with the remote state.
    Updated,
    /// The request or decoding failed. Nothing changed.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Disabled,
    Written { attempts: u32 },
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("failed to encode document: {0}")]
    Encode(#[from] CodecError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("write kept conflicting after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    #[error("sync module is not running")]
    Stopped,
}

/// Mirror of a single remote JSON document.
///
/// The local value is published through a [watch] channel so views can re-render whenever it
/// changes. The version token is whatever the store returned on the last successful read or write.
pub struct SyncEngine<T, S> {
    store: S,
    config: SyncConfig,
    path: String,
    version: Option<String>,
    local: Arc<watch::Sender<T>>,
    retry: RetryPolicy,
    clock: Box<dyn Clock>,
}

impl<T, S> SyncEngine<T, S>
where
    T: Serialize + DeserializeOwned + Clone + PartialEq + Send + Sync + 'static,
    S: RemoteStore,
{
    pub fn new(
        store: S,
        config: SyncConfig,
        path: impl Into<String>,
        initial: T,
        clock: Box<dyn Clock>,
    ) -> Self {
        let (local, _) = watch::channel(initial);
        Self {
            store,
            config,
            path: path.into(),
            version: None,
            local: Arc::new(local),
            retry: RetryPolicy::default(),
            clock,
        }
    }

    pub fn with_retry_policy(self, retry: RetryPolicy) -> Self {
        Self { retry, ..self }
    }

    pub fn value(&self) -> T {
        self.local.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.local.subscribe()
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub(crate) fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub(crate) fn local_sender(&self) -> Arc<watch::Sender<T>> {
        self.local.clone()
    }

    /// Optimistic local update. Doesn't touch the network.
    pub fn set_local(&self, next: T) {
        publish(&self.local, next);
    }

    /// Replaces the local value with the remote document. Failures are logged and leave the state
    /// as it was, a missing document is not an error.
    #[instrument(skip(self), fields(path = %self.path))]
    pub async fn read(&mut self) -> ReadOutcome {
        if !self.config.is_enabled() {
            debug!("No credential configured, skipping read");
            return ReadOutcome::Disabled;
        }

        let document = match self.store.fetch(&self.config, &self.path).await {
            Ok(document) => document,
            Err(StoreError::NotFound) => {
                debug!("Document doesn't exist yet");
                return ReadOutcome::Missing;
            }
            Err(e) => {
                error!("Failed to fetch document: {e}");
                return ReadOutcome::Failed;
            }
        };

        // The token is kept even for an undecodable payload, so a push can overwrite it.
        let decoded = codec::decode::<T>(&document.content);
        self.version = Some(document.version);
        match decoded {
            Ok(value) => {
                debug!(version = ?self.version, "Fetched document");
                publish(&self.local, value);
                ReadOutcome::Updated
            }
            Err(e) => {
                error!(version = ?self.version, "Failed to decode document: {e}");
                ReadOutcome::Failed
            }
        }
    }

    /// Writes `next` to the store. On a version conflict the latest version is fetched and the
    /// write retried, up to [RetryPolicy::max_attempts] attempts with exponential backoff.
    /// Once written `next` is also the local value.
    #[instrument(skip(self, next), fields(path = %self.path))]
    pub async fn push(&mut self, next: T) -> Result<PushOutcome, SyncError> {
        if !self.config.is_enabled() {
            debug!("No credential configured, skipping push");
            return Ok(PushOutcome::Disabled);
        }

        let content = codec::encode(&next)
            .inspect_err(|e| error!("Failed to encode document: {e}"))?;

        let mut attempt = 1;
        loop {
            let result = self
                .store
                .write(
                    &self.config,
                    &self.path,
                    content.clone(),
                    self.version.clone(),
                )
                .await;

            match result {
                Ok(version) => {
                    info!(%version, attempt, "Pushed document");
                    self.version = Some(version);
                    publish(&self.local, next);
                    return Ok(PushOutcome::Written { attempts: attempt });
                }
                Err(StoreError::Conflict) if attempt < self.retry.max_attempts => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(attempt, ?delay, "Write conflict, refreshing before retrying");
                    self.clock.sleep(delay).await;
                    self.read().await;
                    attempt += 1;
                }
                Err(StoreError::Conflict) => {
                    error!(attempt, "Write conflict persisted, giving up");
                    return Err(SyncError::RetriesExhausted { attempts: attempt });
                }
                Err(e) => {
                    error!("Push failed: {e}");
                    return Err(e.into());
                }
            }
        }
    }

    /// Switches to another location or credential. Returns `false` when nothing changed. The
    /// version token belongs to the previous location and is dropped, the caller is expected to
    /// [read](Self::read) again.
    pub fn reconfigure(&mut self, config: SyncConfig) -> bool {
        if config == self.config {
            return false;
        }
        info!(owner = %config.owner, repo = %config.repo, "Sync reconfigured");
        self.config = config;
        self.version = None;
        true
    }
}

/// Replaces the watched value, only waking subscribers when it actually changed.
pub(crate) fn publish<T: PartialEq>(local: &watch::Sender<T>, next: T) {
    local.send_if_modified(|current| {
        if *current == next {
            false
        } else {
            *current = next;
            true
        }
    });
}
