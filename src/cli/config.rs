use anyhow::Result;
use clap::Subcommand;

use crate::{
    settings::{Settings, SettingsStore},
    sync::config::redact,
};

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    #[command(about = "Change sync settings. Options that aren't given stay as they are")]
    Set {
        #[arg(long, help = "Owner of the repository holding the shared document")]
        owner: Option<String>,
        #[arg(long, help = "Repository holding the shared document")]
        repo: Option<String>,
        #[arg(
            long,
            help = "Access token with write access to the repository contents. Pass an empty string to turn sync off"
        )]
        token: Option<String>,
        #[arg(long = "name-a", help = "Name shown for user a")]
        name_a: Option<String>,
        #[arg(long = "name-b", help = "Name shown for user b")]
        name_b: Option<String>,
    },
    #[command(about = "Print current settings. The token is never printed")]
    Show {},
}

pub async fn process_config_command(store: &SettingsStore, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Set {
            owner,
            repo,
            token,
            name_a,
            name_b,
        } => {
            let current = store.load().await?;
            let next = Settings {
                owner: owner.unwrap_or(current.owner),
                repo: repo.unwrap_or(current.repo),
                token: token.unwrap_or(current.token),
                name_a: name_a.unwrap_or(current.name_a),
                name_b: name_b.unwrap_or(current.name_b),
            };
            store.save(&next).await?;
            println!("Settings saved");
            print_settings(&next);
            Ok(())
        }
        ConfigCommand::Show {} => {
            print_settings(&store.load().await?);
            Ok(())
        }
    }
}

fn print_settings(settings: &Settings) {
    println!("owner\t{}", settings.owner);
    println!("repo\t{}", settings.repo);
    println!("token\t{}", redact(&settings.token));
    println!("user a\t{}", settings.name_a);
    println!("user b\t{}", settings.name_b);
}
