use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Where log lines go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
  /// Daily-rolling file under the data dir; the terminal belongs to the UI
  File,
  /// Standard error, for one-shot commands
  Stderr,
}

fn env_filter() -> EnvFilter {
  EnvFilter::try_from_env("PGDESK_LOG")
    .or_else(|_| EnvFilter::try_from_default_env())
    .unwrap_or_else(|_| EnvFilter::new("info"))
}

pub fn log_dir() -> Result<PathBuf> {
  dirs::data_dir()
    .map(|dir| dir.join("pgdesk").join("logs"))
    .ok_or_else(|| eyre!("Could not determine data directory"))
}

/// Initialize logging. Keep the returned guard alive until exit so buffered
/// file output is flushed.
pub fn init_logging(target: LogTarget) -> Result<Option<WorkerGuard>> {
  match target {
    LogTarget::File => {
      let dir = log_dir()?;
      std::fs::create_dir_all(&dir)
        .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;

      let appender = tracing_appender::rolling::daily(&dir, "pgdesk.log");
      let (writer, guard) = tracing_appender::non_blocking(appender);

      tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_writer(writer).with_ansi(false).with_target(true))
        .try_init()
        .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;

      tracing::info!(dir = %dir.display(), "Logging initialized");
      Ok(Some(guard))
    }
    LogTarget::Stderr => {
      tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init()
        .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;
      Ok(None)
    }
  }
}
