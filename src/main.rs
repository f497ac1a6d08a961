mod api;
mod app;
mod cache;
mod cli;
mod commands;
mod config;
mod debounce;
mod event;
mod logging;
mod query;
mod retry;
mod session;
mod ui;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "pgdesk")]
#[command(about = "A terminal console for hostel and PG administration")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/pgdesk/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Backend base URL, overriding api.url from the config
  #[arg(long)]
  api_url: Option<String>,

  /// Run one command instead of the console
  #[command(subcommand)]
  command: Option<cli::Command>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let mut config = config::Config::load(args.config.as_deref())?;

  // Override the backend if specified on command line
  if let Some(url) = args.api_url {
    config.api.url = url;
  }

  // The console owns the terminal, so it logs to a file
  let target = if args.command.is_some() {
    logging::LogTarget::Stderr
  } else {
    logging::LogTarget::File
  };
  let _log_guard = logging::init_logging(target)?;

  let sessions = session::SessionStore::open()?;
  let token = match config::Config::token_override() {
    Some(token) => Some(token),
    None => sessions.load()?.map(|s| s.token),
  };
  debug!(has_token = token.is_some(), api = %config.api.url, "Starting");

  let service = api::HostelService::from_config(&config, token, Some(sessions.clone()))?;

  match args.command {
    Some(command) => cli::run(command, &config, &service, &sessions).await,
    None => {
      let mut app = app::App::new(config, service, sessions);
      app.run().await
    }
  }
}
