use std::time::Duration;

use anyhow::Result;
use chrono::Local;
use clap::ValueEnum;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::watch,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::{
    settings::{Settings, SettingsStore},
    sync::{
        github::GithubStore, PushOutcome, ReadOutcome, SyncEngine, SyncError, SyncHandle,
        SyncModule,
    },
    tally::{
        add_penalty, document_path, find_penalty, undo_penalty, PenaltyDocument, PenaltyKind,
        PenaltyRecord, User,
    },
    utils::clock::{Clock, DefaultClock},
};

use super::{
    shutdown::detect_shutdown,
    view::{describe_read, render_board, Palette},
};

const CLEAR_SCREEN: &str = "\x1B[2J\x1B[H";
/// Month progress moves even when nobody adds anything.
const REDRAW_INTERVAL: Duration = Duration::from_secs(60);
const WATCH_HELP: &str = "Type `a <kind>` or `b <kind>` (kinds: trash, dishes, stove), \
    `undo <id>`, `r` to reload settings and refresh, `q` to quit";

type PenaltyEngine = SyncEngine<PenaltyDocument, GithubStore>;

/// The month key is computed once here and reused for the whole session, even if it runs past
/// midnight of the last day.
fn open_engine(settings: &Settings, clock: DefaultClock) -> Result<PenaltyEngine> {
    let path = document_path(clock.local_time().date_naive());
    info!(%path, "Opening penalty document");
    Ok(SyncEngine::new(
        GithubStore::new()?,
        settings.sync_config(),
        path,
        Vec::new(),
        Box::new(clock),
    ))
}

fn print_board(document: &[PenaltyRecord], settings: &Settings) {
    println!(
        "{}",
        render_board(document, settings, Local::now(), &Palette::new(true))
    );
}

fn report_push(result: Result<PushOutcome, SyncError>) {
    match result {
        Ok(PushOutcome::Written { .. }) => println!("Saved to the shared document"),
        Ok(PushOutcome::Disabled) => println!("Not saved anywhere, sync is off"),
        Err(e) => eprintln!("Couldn't save to the shared document: {e}"),
    }
}

pub async fn show_board(settings: Settings) -> Result<()> {
    let mut engine = open_engine(&settings, DefaultClock)?;
    if let Some(message) = describe_read(engine.read().await) {
        eprintln!("{message}");
    }
    print_board(&engine.value(), &settings);
    Ok(())
}

pub async fn add(settings: Settings, user: User, kind: PenaltyKind) -> Result<()> {
    let clock = DefaultClock;
    let record = PenaltyRecord::new(user, kind, clock.time());
    let mut engine = open_engine(&settings, clock)?;
    if let Some(message) = describe_read(engine.read().await) {
        eprintln!("{message}");
    }

    info!(id = %record.id, ?user, ?kind, "Adding penalty");
    let next = add_penalty(&engine.value(), record);
    engine.set_local(next.clone());
    report_push(engine.push(next).await);
    print_board(&engine.value(), &settings);
    Ok(())
}

pub async fn undo(settings: Settings, id: String) -> Result<()> {
    let mut engine = open_engine(&settings, DefaultClock)?;
    if let Some(message) = describe_read(engine.read().await) {
        eprintln!("{message}");
    }

    let current = engine.value();
    let record = find_penalty(&current, &id)?;
    info!(id = %record.id, "Undoing penalty");
    let next = undo_penalty(&current, &record.id);
    engine.set_local(next.clone());
    report_push(engine.push(next).await);
    print_board(&engine.value(), &settings);
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Action {
    Add(User, PenaltyKind),
    Undo(String),
    Refresh,
    Quit,
}

fn parse_action(line: &str) -> Option<Action> {
    let mut words = line.split_whitespace();
    let first = words.next()?;
    let action = match first {
        "q" | "quit" => Action::Quit,
        "r" | "refresh" => Action::Refresh,
        "undo" => Action::Undo(words.next()?.to_string()),
        user => {
            let user = User::from_str(user, true).ok()?;
            let kind = PenaltyKind::from_str(words.next()?, true).ok()?;
            Action::Add(user, kind)
        }
    };
    words.next().is_none().then_some(action)
}

async fn apply_action(
    handle: &SyncHandle<PenaltyDocument>,
    store: &SettingsStore,
    settings: &watch::Sender<Settings>,
    action: Action,
) -> Result<String> {
    match action {
        Action::Add(user, kind) => {
            let record = PenaltyRecord::new(user, kind, DefaultClock.time());
            let message = format!("Added {kind} [{}]", record.short_id());
            handle.push(add_penalty(&handle.value(), record)).await?;
            Ok(message)
        }
        Action::Undo(id) => {
            let current = handle.value();
            let record = find_penalty(&current, &id)?;
            let message = format!("Removed {} [{}]", record.kind, record.short_id());
            handle.push(undo_penalty(&current, &record.id)).await?;
            Ok(message)
        }
        // Picks up `config set` from another terminal. Reconfiguring fetches as well.
        Action::Refresh => {
            let loaded = store.load().await?;
            handle.reconfigure(loaded.sync_config()).await?;
            settings.send_replace(loaded);
            Ok("Refreshing".into())
        }
        Action::Quit => {
            handle.shutdown();
            Ok("Bye".into())
        }
    }
}

/// Reads actions from stdin until it closes or the session ends.
async fn read_actions(
    handle: &SyncHandle<PenaltyDocument>,
    store: &SettingsStore,
    settings: &watch::Sender<Settings>,
    status: &watch::Sender<String>,
    shutdown: &CancellationToken,
) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = shutdown.cancelled() => return,
            line = lines.next_line() => line,
        };
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => return,
            Err(e) => {
                error!("Failed to read input {e:?}");
                return;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        let message = match parse_action(&line) {
            Some(action) => apply_action(handle, store, settings, action)
                .await
                .unwrap_or_else(|e| format!("{e}")),
            None => format!("Unknown command {:?}", line.trim()),
        };
        status.send_replace(message);
    }
}

async fn redraw(
    mut settings: watch::Receiver<Settings>,
    mut changes: watch::Receiver<PenaltyDocument>,
    mut status: watch::Receiver<String>,
    shutdown: &CancellationToken,
) {
    loop {
        let board = render_board(
            &changes.borrow_and_update(),
            &settings.borrow_and_update(),
            Local::now(),
            &Palette::new(true),
        );
        println!(
            "{CLEAR_SCREEN}{board}\n\n{WATCH_HELP}\n{}",
            *status.borrow_and_update()
        );

        tokio::select! {
            _ = shutdown.cancelled() => return,
            changed = changes.changed() => if changed.is_err() { return },
            _ = status.changed() => (),
            _ = settings.changed() => (),
            _ = tokio::time::sleep(REDRAW_INTERVAL) => (),
        }
    }
}

/// Live scoreboard. Polls the shared document and redraws on every change while accepting
/// actions on stdin.
pub async fn watch(store: &SettingsStore, interval: Duration) -> Result<()> {
    let settings = store.load().await?;
    let engine = open_engine(&settings, DefaultClock)?;
    if !engine.config().is_enabled() {
        if let Some(message) = describe_read(ReadOutcome::Disabled) {
            eprintln!("{message}");
        }
    }

    let shutdown = CancellationToken::new();
    let (module, handle) = SyncModule::new(engine, interval, shutdown.clone());
    let (status, status_changes) = watch::channel(String::new());
    let (settings, settings_changes) = watch::channel(settings);

    tokio::join!(
        detect_shutdown(shutdown.clone()),
        module.run(),
        redraw(settings_changes, handle.subscribe(), status_changes, &shutdown),
        read_actions(&handle, store, &settings, &status, &shutdown),
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use anyhow::Result;
    use tempfile::tempdir;
    use tokio::sync::watch;
    use tokio_util::sync::CancellationToken;

    use crate::{
        settings::{Settings, SettingsStore, SETTINGS_FILE},
        sync::{memory::MemoryStore, SyncConfig, SyncEngine, SyncModule},
        tally::{PenaltyDocument, PenaltyKind, User},
        utils::clock::DefaultClock,
    };

    use super::{apply_action, parse_action, Action};

    #[test]
    fn parses_penalty_actions() {
        assert_eq!(
            parse_action("a dishes"),
            Some(Action::Add(User::A, PenaltyKind::Dishes))
        );
        assert_eq!(
            parse_action("  B   Stove "),
            Some(Action::Add(User::B, PenaltyKind::Stove))
        );
        assert_eq!(parse_action("undo 5b0c"), Some(Action::Undo("5b0c".into())));
        assert_eq!(parse_action("q"), Some(Action::Quit));
        assert_eq!(parse_action("refresh"), Some(Action::Refresh));
    }

    #[test]
    fn rejects_malformed_actions() {
        assert_eq!(parse_action("c trash"), None);
        assert_eq!(parse_action("a laundry"), None);
        assert_eq!(parse_action("a"), None);
        assert_eq!(parse_action("undo"), None);
        assert_eq!(parse_action("a trash now"), None);
    }

    #[tokio::test]
    async fn refresh_applies_saved_settings_and_fetches_once() -> Result<()> {
        let dir = tempdir()?;
        let store = SettingsStore::new(dir.path().join(SETTINGS_FILE));
        let saved = Settings {
            owner: "household".into(),
            repo: "penalties".into(),
            token: "secret-token".into(),
            name_a: "Alex".into(),
            ..Settings::default()
        };
        store.save(&saved).await?;

        let remote = Arc::new(MemoryStore::new());
        let engine: SyncEngine<PenaltyDocument, _> = SyncEngine::new(
            remote.clone(),
            SyncConfig::default(),
            "data/penalties-2024-08.json",
            Vec::new(),
            Box::new(DefaultClock),
        );
        let (module, handle) =
            SyncModule::new(engine, Duration::from_secs(3600), CancellationToken::new());
        let running = tokio::spawn(module.run());
        let (settings, mut settings_changes) = watch::channel(Settings::default());

        apply_action(&handle, &store, &settings, Action::Refresh).await?;
        // Commands run in order, so once this is written the reconfiguration is done.
        handle.push_and_wait(Vec::new()).await?;

        assert_eq!(remote.fetches(), 1);
        assert!(settings_changes.has_changed()?);
        assert_eq!(settings_changes.borrow_and_update().name(User::A), "Alex");

        apply_action(&handle, &store, &settings, Action::Refresh).await?;
        handle.push_and_wait(Vec::new()).await?;
        assert_eq!(remote.fetches(), 2);

        handle.shutdown();
        running.await?;
        Ok(())
    }
}
