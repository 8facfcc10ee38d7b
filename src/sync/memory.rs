//! In-memory versioned store used by the sync tests. Counts calls and can simulate another
//! writer landing right before the next write.

use std::{collections::HashMap, sync::Mutex};

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use super::{
    codec,
    config::SyncConfig,
    store::{RemoteDocument, RemoteStore, StoreError},
};

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    files: HashMap<String, RemoteDocument>,
    next_version: u64,
    fetches: usize,
    writes: usize,
    external_writes: Vec<(String, String)>,
}

impl Inner {
    fn store(&mut self, location: String, content: String) -> String {
        self.next_version += 1;
        let version = format!("v{}", self.next_version);
        self.files.insert(
            location,
            RemoteDocument {
                content,
                version: version.clone(),
            },
        );
        version
    }
}

fn location(config: &SyncConfig, path: &str) -> String {
    format!("{}/{}/{}", config.owner, config.repo, path)
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes as some other client would, without going through the engine.
    pub fn put_external(&self, config: &SyncConfig, path: &str, content: String) -> String {
        self.inner
            .lock()
            .unwrap()
            .store(location(config, path), content)
    }

    /// The next [RemoteStore::write] first applies this content as an external write.
    pub fn conflict_on_next_write(&self, config: &SyncConfig, path: &str, content: String) {
        self.inner
            .lock()
            .unwrap()
            .external_writes
            .push((location(config, path), content));
    }

    pub fn version(&self, config: &SyncConfig, path: &str) -> Option<String> {
        let inner = self.inner.lock().unwrap();
        inner
            .files
            .get(&location(config, path))
            .map(|v| v.version.clone())
    }

    pub fn decoded<T: DeserializeOwned>(&self, config: &SyncConfig, path: &str) -> Option<T> {
        let inner = self.inner.lock().unwrap();
        inner
            .files
            .get(&location(config, path))
            .map(|v| codec::decode(&v.content).unwrap())
    }

    pub fn fetches(&self) -> usize {
        self.inner.lock().unwrap().fetches
    }

    pub fn writes(&self) -> usize {
        self.inner.lock().unwrap().writes
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn fetch(&self, config: &SyncConfig, path: &str) -> Result<RemoteDocument, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.fetches += 1;
        inner
            .files
            .get(&location(config, path))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn write(
        &self,
        config: &SyncConfig,
        path: &str,
        content: String,
        version: Option<String>,
    ) -> Result<String, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.writes += 1;
        for (external_location, external_content) in std::mem::take(&mut inner.external_writes) {
            inner.store(external_location, external_content);
        }

        let location = location(config, path);
        let current = inner.files.get(&location).map(|v| v.version.clone());
        if current != version {
            return Err(StoreError::Conflict);
        }
        Ok(inner.store(location, content))
    }
}
