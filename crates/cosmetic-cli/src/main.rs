mod cli;
mod commands;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use cosmetic_browser::RethreadClient;
use cosmetic_config::Settings;
use cosmetic_storage::FilterStore;

use cli::Commands;
use commands::Session;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    // Diagnostics go to stderr; stdout carries command output only
    let filter = if cli.quiet {
        tracing_subscriber::EnvFilter::new("off")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let command = cli.command.unwrap_or(Commands::Add {
        host: None,
        detach: false,
    });

    match command {
        Commands::Add { host, detach: true } => {
            return commands::add::detach(host.as_deref(), cli.quiet, cli.config_dir.as_deref());
        }
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut cli::Cli::command(),
                "cosmetic-filters",
                &mut std::io::stdout(),
            );
            return Ok(());
        }
        _ => {}
    }

    let config_dir = cli
        .config_dir
        .clone()
        .or_else(cosmetic_config::config_dir)
        .context("Unable to locate the config directory; set XDG_CONFIG_HOME or pass --config-dir")?;
    let settings = Settings::load(&config_dir);
    let store = FilterStore::in_dir(&config_dir);
    let browser = RethreadClient::new(settings.control_binary.clone())
        .with_profile(settings.profile.clone())
        .with_user_data_dir(settings.user_data_dir.clone());

    let session = Session {
        browser: &browser,
        settings: &settings,
        store: &store,
        config_dir: &config_dir,
    };

    let mut stdout = std::io::stdout().lock();
    match command {
        Commands::Add { host, .. } => commands::add::handle(&session, host).await,
        Commands::List => commands::list::handle(&session, &mut stdout),
        Commands::Rm { host, index } => commands::rm::handle(&session, &host, index).await,
        Commands::Sync => commands::sync::handle(&session).await,
        Commands::Preview { host } => commands::preview::handle(&session, &host, &mut stdout),
        Commands::Completions { .. } => Ok(()),
    }
}
