use std::fmt::{self, Debug};

/// Where the document lives and how to authenticate. `owner` and `repo` address the repository,
/// `token` is sent as a bearer credential. An empty token means sync is switched off.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct SyncConfig {
    pub owner: String,
    pub repo: String,
    pub token: String,
}

impl SyncConfig {
    pub fn new(
        owner: impl Into<String>,
        repo: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            token: token.into(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.token.is_empty()
    }
}

impl Debug for SyncConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncConfig")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("token", &redact(&self.token))
            .finish()
    }
}

/// Printable stand-in for a credential.
pub fn redact(token: &str) -> &'static str {
    if token.is_empty() {
        "<not set>"
    } else {
        "<redacted>"
    }
}
