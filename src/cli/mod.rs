pub mod config;
pub mod penalties;
pub mod shutdown;
pub mod view;

use std::{path::PathBuf, time::Duration};

use anyhow::Result;
use clap::{Parser, Subcommand};
use config::{process_config_command, ConfigCommand};
use tracing::level_filters::LevelFilter;

use crate::{
    settings::{SettingsStore, SETTINGS_FILE},
    sync::module::DEFAULT_POLL_INTERVAL,
    tally::{PenaltyKind, User},
    utils::{
        dir::create_application_default_path,
        logging::{enable_logging, ConsoleLog, CLI_PREFIX},
    },
};

#[derive(Parser, Debug)]
#[command(name = "penalty-tracker", version, long_about = None)]
#[command(about = "Shared monthly tally of missed household chores", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(
        long,
        global = true,
        help = "Verbose logging, also printed to stderr except during `watch`"
    )]
    log: bool,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Show this month's scoreboard and history")]
    Show {},
    #[command(about = "Record a missed chore")]
    Add {
        #[arg(value_enum, help = "Who missed it")]
        user: User,
        #[arg(value_enum, help = "What was missed")]
        kind: PenaltyKind,
    },
    #[command(about = "Remove a penalty recorded this month")]
    Undo {
        #[arg(help = "Id of the penalty, or a unique prefix of it as shown in the history")]
        id: String,
    },
    #[command(about = "Live scoreboard that follows changes from the other device")]
    Watch {
        #[arg(
            long,
            default_value_t = DEFAULT_POLL_INTERVAL.as_secs(),
            help = "Seconds between fetches"
        )]
        interval: u64,
    },
    #[command(about = "Manage sync settings and names")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let app_dir = match args.dir {
        Some(dir) => {
            std::fs::create_dir_all(&dir)?;
            dir
        }
        None => create_application_default_path()?,
    };
    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    let console = ConsoleLog::for_session(
        args.log,
        matches!(args.commands, Commands::Watch { .. }),
    );
    enable_logging(CLI_PREFIX, &app_dir, logging_level, console)?;

    let store = SettingsStore::new(app_dir.join(SETTINGS_FILE));
    match args.commands {
        Commands::Show {} => penalties::show_board(store.load().await?).await,
        Commands::Add { user, kind } => penalties::add(store.load().await?, user, kind).await,
        Commands::Undo { id } => penalties::undo(store.load().await?, id).await,
        Commands::Watch { interval } => {
            penalties::watch(&store, Duration::from_secs(interval.max(1))).await
        }
        Commands::Config { command } => process_config_command(&store, command).await,
    }
}
