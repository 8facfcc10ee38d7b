//! Settings persisted on this device: where the shared document lives, the credential, and the
//! names shown for both users. Kept as JSON in the application directory.

use std::{
    fmt::{self, Debug},
    io::ErrorKind,
    path::PathBuf,
};

use anyhow::{anyhow, Result};
use fs4::tokio::AsyncFileExt;
use serde::{Deserialize, Serialize};
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncWriteExt},
};
use tracing::{debug, info};

use crate::{
    sync::{config::redact, SyncConfig},
    tally::User,
};

pub const SETTINGS_FILE: &str = "settings.json";

fn default_name_a() -> String {
    "Ksyusha".into()
}

fn default_name_b() -> String {
    "Kirill".into()
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub repo: String,
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_name_a")]
    pub name_a: String,
    #[serde(default = "default_name_b")]
    pub name_b: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            owner: String::new(),
            repo: String::new(),
            token: String::new(),
            name_a: default_name_a(),
            name_b: default_name_b(),
        }
    }
}

impl Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("token", &redact(&self.token))
            .field("name_a", &self.name_a)
            .field("name_b", &self.name_b)
            .finish()
    }
}

impl Settings {
    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig::new(&self.owner, &self.repo, &self.token)
    }

    pub fn name(&self, user: User) -> &str {
        match user {
            User::A => &self.name_a,
            User::B => &self.name_b,
        }
    }
}

/// Reads and writes [Settings] at a fixed path. Readers take a shared lock and writers an
/// exclusive one, so a running `watch` never sees a half written file.
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Missing file means nothing was configured yet.
    pub async fn load(&self) -> Result<Settings> {
        let mut file = match File::open(&self.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No settings at {:?}, using defaults", self.path);
                return Ok(Settings::default());
            }
            Err(e) => Err(e)?,
        };

        file.lock_shared()?;
        let mut raw = String::new();
        let read = file.read_to_string(&mut raw).await;
        file.unlock_async().await?;
        read?;

        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("Settings file {:?} is corrupted: {e}", self.path))
    }

    pub async fn save(&self, settings: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = File::options()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .await?;
        restrict_permissions(&file).await?;

        let buffer = serde_json::to_vec_pretty(settings)?;
        file.lock_exclusive()?;
        let result = Self::overwrite(&mut file, &buffer).await;
        file.unlock_async().await?;
        result?;

        info!("Saved settings {settings:?}");
        Ok(())
    }

    async fn overwrite(file: &mut File, buffer: &[u8]) -> Result<()> {
        file.set_len(0).await?;
        file.write_all(buffer).await?;
        file.flush().await?;
        Ok(())
    }
}

/// The file holds a credential, only the owner may read it.
async fn restrict_permissions(file: &File) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))
            .await?;
    }
    #[cfg(not(unix))]
    let _ = file;
    Ok(())
}
