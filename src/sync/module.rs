use std::{sync::Arc, time::Duration};

use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use super::{
    config::SyncConfig,
    engine::{publish, PushOutcome, SyncEngine, SyncError},
    store::RemoteStore,
};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);

const COMMAND_BUFFER: usize = 16;

type PushReply = oneshot::Sender<Result<PushOutcome, SyncError>>;

enum SyncCommand<T> {
    Push { next: T, reply: Option<PushReply> },
    Reconfigure(SyncConfig),
    Refresh,
}

/// Runs a [SyncEngine]: reads once on start, then on every poll interval, and executes commands
/// sent through [SyncHandle] one at a time. Because everything goes through this single loop at
/// most one request per document is in flight and a poll never lands in the middle of a push.
pub struct SyncModule<T, S> {
    engine: SyncEngine<T, S>,
    commands: mpsc::Receiver<SyncCommand<T>>,
    shutdown: CancellationToken,
    poll_interval: Duration,
}

/// Front end of a running [SyncModule]. Cheap to clone. The module stops once the shutdown token
/// is cancelled or every handle is dropped.
pub struct SyncHandle<T> {
    commands: mpsc::Sender<SyncCommand<T>>,
    local: Arc<watch::Sender<T>>,
    shutdown: CancellationToken,
}

impl<T> Clone for SyncHandle<T> {
    fn clone(&self) -> Self {
        Self {
            commands: self.commands.clone(),
            local: self.local.clone(),
            shutdown: self.shutdown.clone(),
        }
    }
}

impl<T, S> SyncModule<T, S>
where
    T: Serialize + DeserializeOwned + Clone + PartialEq + Send + Sync + 'static,
    S: RemoteStore,
{
    pub fn new(
        engine: SyncEngine<T, S>,
        poll_interval: Duration,
        shutdown: CancellationToken,
    ) -> (Self, SyncHandle<T>) {
        let (sender, receiver) = mpsc::channel(COMMAND_BUFFER);
        let handle = SyncHandle {
            commands: sender,
            local: engine.local_sender(),
            shutdown: shutdown.clone(),
        };
        let module = Self {
            engine,
            commands: receiver,
            shutdown,
            poll_interval,
        };
        (module, handle)
    }

    /// Executes the sync event loop. Returns the engine once stopped.
    pub async fn run(mut self) -> SyncEngine<T, S> {
        info!(path = self.engine.path(), "Starting document sync");
        self.engine.read().await;

        let mut poll_point = self.engine.clock().instant() + self.poll_interval;
        loop {
            tokio::select! {
                // Cancellation also drops the pending poll timer, nothing fires after this.
                _ = self.shutdown.cancelled() => {
                    info!("Document sync stopped");
                    break;
                }
                command = self.commands.recv() => match command {
                    Some(command) => self.handle(command).await,
                    None => {
                        debug!("Every sync handle was dropped");
                        break;
                    }
                },
                _ = self.engine.clock().sleep_until(poll_point) => {
                    poll_point += self.poll_interval;
                    self.engine
                        .read()
                        .instrument(info_span!("Polling document"))
                        .await;
                }
            }
        }
        self.engine
    }

    async fn handle(&mut self, command: SyncCommand<T>) {
        match command {
            SyncCommand::Push { next, reply } => {
                let result = self.engine.push(next).await;
                match reply {
                    Some(reply) => {
                        let _ = reply.send(result);
                    }
                    None => {
                        if let Err(e) = result {
                            warn!("Document was not stored remotely: {e}");
                        }
                    }
                }
            }
            SyncCommand::Reconfigure(config) => {
                self.engine.reconfigure(config);
                self.engine.read().await;
            }
            SyncCommand::Refresh => {
                self.engine.read().await;
            }
        }
    }
}

impl<T: Clone + PartialEq> SyncHandle<T> {
    pub fn value(&self) -> T {
        self.local.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.local.subscribe()
    }

    /// Optimistic local update, no network involved.
    pub fn set_local(&self, next: T) {
        publish(&self.local, next);
    }

    /// Applies `next` locally and queues it for writing. The outcome is only logged.
    pub async fn push(&self, next: T) -> Result<(), SyncError> {
        self.set_local(next.clone());
        self.send(SyncCommand::Push { next, reply: None }).await
    }

    /// Like [push](Self::push) but waits until the module has finished writing.
    pub async fn push_and_wait(&self, next: T) -> Result<PushOutcome, SyncError> {
        self.set_local(next.clone());
        let (reply, outcome) = oneshot::channel();
        self.send(SyncCommand::Push {
            next,
            reply: Some(reply),
        })
        .await?;
        outcome.await.map_err(|_| SyncError::Stopped)?
    }

    /// Points the module at `config`, which may be unchanged, and fetches from there right away.
    pub async fn reconfigure(&self, config: SyncConfig) -> Result<(), SyncError> {
        self.send(SyncCommand::Reconfigure(config)).await
    }

    /// Requests a read right away instead of waiting for the next poll.
    pub async fn refresh(&self) -> Result<(), SyncError> {
        self.send(SyncCommand::Refresh).await
    }

    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    async fn send(&self, command: SyncCommand<T>) -> Result<(), SyncError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SyncError::Stopped)
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use anyhow::Result;
    use chrono::{TimeZone, Utc};
    use tokio_util::sync::CancellationToken;

    use crate::{
        sync::{
            codec,
            config::SyncConfig,
            engine::{PushOutcome, SyncEngine, SyncError},
            memory::MemoryStore,
        },
        tally::{PenaltyDocument, PenaltyKind, PenaltyRecord, User},
        utils::{clock::DefaultClock, logging::TEST_LOGGING},
    };

    use super::SyncModule;

    const PATH: &str = "data/penalties-2024-07.json";
    const INTERVAL: Duration = Duration::from_secs(15);

    fn config() -> SyncConfig {
        SyncConfig::new("household", "penalties", "secret-token")
    }

    fn record(id: &str) -> PenaltyRecord {
        PenaltyRecord {
            id: id.into(),
            user: User::B,
            kind: PenaltyKind::Dishes,
            timestamp: Utc.with_ymd_and_hms(2024, 7, 2, 9, 0, 0).unwrap(),
        }
    }

    fn engine(
        store: Arc<MemoryStore>,
        config: SyncConfig,
    ) -> SyncEngine<PenaltyDocument, Arc<MemoryStore>> {
        SyncEngine::new(store, config, PATH, Vec::new(), Box::new(DefaultClock))
    }

    #[tokio::test(start_paused = true)]
    async fn polls_on_start_and_every_interval_until_cancelled() -> Result<()> {
        *TEST_LOGGING;
        let store = Arc::new(MemoryStore::new());
        let shutdown = CancellationToken::new();
        let (module, handle) = SyncModule::new(
            engine(store.clone(), config()),
            INTERVAL,
            shutdown.clone(),
        );
        let running = tokio::spawn(module.run());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(store.fetches(), 1);

        tokio::time::sleep(INTERVAL * 2).await;
        assert_eq!(store.fetches(), 3);

        handle.shutdown();
        running.await?;
        tokio::time::sleep(INTERVAL * 4).await;
        assert_eq!(store.fetches(), 3);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn poll_picks_up_external_changes() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let (module, handle) = SyncModule::new(
            engine(store.clone(), config()),
            INTERVAL,
            CancellationToken::new(),
        );
        let mut changes = handle.subscribe();
        let running = tokio::spawn(module.run());

        let external = vec![record("from-partner")];
        store.put_external(&config(), PATH, codec::encode(&external)?);
        changes.changed().await?;

        assert_eq!(*changes.borrow_and_update(), external);
        drop(changes);
        drop(handle);
        running.await?;
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn pushes_are_written_in_order() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let (module, handle) = SyncModule::new(
            engine(store.clone(), config()),
            INTERVAL,
            CancellationToken::new(),
        );
        let running = tokio::spawn(module.run());

        handle.push(vec![record("a")]).await?;
        handle.push(vec![record("a"), record("b")]).await?;
        let last = vec![record("b")];
        let outcome = handle.push_and_wait(last.clone()).await?;

        assert_eq!(outcome, PushOutcome::Written { attempts: 1 });
        assert_eq!(store.writes(), 3);
        assert_eq!(store.decoded::<PenaltyDocument>(&config(), PATH), Some(last.clone()));
        assert_eq!(handle.value(), last);

        handle.shutdown();
        let engine = running.await?;
        assert_eq!(engine.version(), store.version(&config(), PATH).as_deref());
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn push_updates_value_before_it_is_written() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let (module, handle) = SyncModule::new(
            engine(store.clone(), config()),
            INTERVAL,
            CancellationToken::new(),
        );

        // Not running yet, so nothing can have been written.
        handle.push(vec![record("optimistic")]).await?;
        assert_eq!(handle.value(), vec![record("optimistic")]);
        assert_eq!(store.writes(), 0);

        handle.shutdown();
        module.run().await;
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn reconfigure_fetches_from_new_location() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let moved = SyncConfig::new("household", "archive", "secret-token");
        let archived = vec![record("archived")];
        store.put_external(&moved, PATH, codec::encode(&archived)?);

        let (module, handle) = SyncModule::new(
            engine(store.clone(), config()),
            INTERVAL,
            CancellationToken::new(),
        );
        let running = tokio::spawn(module.run());
        handle.push_and_wait(vec![record("current")]).await?;

        handle.reconfigure(moved.clone()).await?;
        handle.refresh().await?;
        // Commands run in order, so a completed push means the reconfiguration is done.
        handle.push_and_wait(archived.clone()).await?;

        handle.shutdown();
        let engine = running.await?;
        assert_eq!(engine.config(), &moved);
        assert_eq!(engine.version(), store.version(&moved, PATH).as_deref());
        assert_eq!(
            store.decoded::<PenaltyDocument>(&config(), PATH),
            Some(vec![record("current")])
        );
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn handle_reports_stopped_module() {
        let store = Arc::new(MemoryStore::new());
        let (module, handle) = SyncModule::new(
            engine(store, config()),
            INTERVAL,
            CancellationToken::new(),
        );
        drop(module);

        assert!(matches!(
            handle.push_and_wait(Vec::new()).await,
            Err(SyncError::Stopped)
        ));
    }
}
