//! Keeps one JSON document mirrored between memory and a remote versioned file store.
//!
//!  - [store::RemoteStore] is the contract of the remote side: fetch a document with its version
//!    token, write a document presenting the last known token, fail with a conflict otherwise.
//!  - [github::GithubStore] implements it on top of the GitHub repository contents API.
//!  - [engine::SyncEngine] owns the local value and the version token and implements reading,
//!    pushing and the conflict retry.
//!  - [module::SyncModule] drives an engine: periodic polling plus a command queue, so at most
//!    one request is in flight per document.

pub mod codec;
pub mod config;
pub mod engine;
pub mod github;
pub mod module;
pub mod store;

#[cfg(test)]
pub(crate) mod memory;

pub use config::SyncConfig;
pub use engine::{PushOutcome, ReadOutcome, RetryPolicy, SyncEngine, SyncError};
pub use module::{SyncHandle, SyncModule};
pub use store::{RemoteDocument, RemoteStore, StoreError};
