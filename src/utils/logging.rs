use std::{path::Path, sync::LazyLock};

use anyhow::Result;
use tracing::level_filters::LevelFilter;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::{
    fmt::{format::FmtSpan, writer::MakeWriterExt},
    EnvFilter,
};

pub const CLI_PREFIX: &str = "cli";

const LOG_DIR: &str = "logs";
const KEPT_LOG_FILES: usize = 5;
const DEFAULT_LEVEL: &str = "info";

/// Where log lines go besides the rotated file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleLog {
    Off,
    /// Stdout carries the scoreboard, so console logs go to stderr.
    Stderr,
}

impl ConsoleLog {
    /// `watch` redraws the whole screen, console logs would be wiped or tear the board apart.
    pub fn for_session(requested: bool, redraws_screen: bool) -> Self {
        if requested && !redraws_screen {
            ConsoleLog::Stderr
        } else {
            ConsoleLog::Off
        }
    }
}

/// Only this crate's events pass. `level` wins over `RUST_LOG`, which wins over the default.
fn crate_filter(level: Option<LevelFilter>, env_level: Option<String>) -> String {
    let level = level
        .map(|v| v.to_string().to_lowercase())
        .or(env_level)
        .unwrap_or_else(|| DEFAULT_LEVEL.into());
    format!("{}={level}", env!("CARGO_PKG_NAME").replace('-', "_"))
}

/// Logs always go to a daily rotated file under `<application dir>/logs`. Tokens must never be
/// passed to any event, see [crate::sync::config::redact].
pub fn enable_logging(
    prefix: &str,
    application_data_path: &Path,
    log_level: Option<LevelFilter>,
    console: ConsoleLog,
) -> Result<()> {
    let appender = tracing_appender::rolling::Builder::new()
        .rotation(Rotation::DAILY)
        .max_log_files(KEPT_LOG_FILES)
        .filename_prefix(prefix)
        .build(application_data_path.join(LOG_DIR))?;

    let stderr = std::io::stderr.with_filter(move |_| console == ConsoleLog::Stderr);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(crate_filter(
            log_level,
            std::env::var("RUST_LOG").ok(),
        )))
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(stderr.and(appender))
        .with_ansi(false)
        .init();
    Ok(())
}

pub static TEST_LOGGING: LazyLock<()> = LazyLock::new(|| {
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::TRACE)
        .with_test_writer()
        .pretty()
        .init()
});
