use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE_BASENAME: &str = "game-shuffler.log";
const LOG_DIR_ENV: &str = "GAME_SHUFFLER_LOG_PATH";
const LOG_RETENTION: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Console plus daily-rolling file logging. Keep the guard alive for the
/// life of the process so buffered lines are flushed.
pub fn init_logging() -> Result<WorkerGuard> {
    let log_dir = match std::env::var_os(LOG_DIR_ENV) {
        Some(dir) => PathBuf::from(dir),
        None => default_log_dir()?,
    };
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory: {:?}", log_dir))?;
    prune_old_logs(&log_dir, LOG_RETENTION);

    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&log_dir, LOG_FILE_BASENAME));

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false),
        )
        .init();

    Ok(guard)
}

/// `logs` under the state dir where the platform has one, else local data
fn default_log_dir() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("dev", "game-shuffler", "shuffler")
        .context("Failed to determine project directories for log path")?;
    let base = dirs.state_dir().unwrap_or_else(|| dirs.data_local_dir());
    Ok(base.join("logs"))
}

/// Delete rolled log files last modified before `max_age` ago
fn prune_old_logs(log_dir: &Path, max_age: Duration) {
    let (Ok(entries), Some(cutoff)) = (
        std::fs::read_dir(log_dir),
        SystemTime::now().checked_sub(max_age),
    ) else {
        return;
    };

    let stale = entries.flatten().filter(|entry| {
        let is_log = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with(LOG_FILE_BASENAME));
        let modified = entry
            .metadata()
            .ok()
            .filter(|m| m.is_file())
            .and_then(|m| m.modified().ok());
        is_log && modified.is_some_and(|t| t < cutoff)
    });

    for entry in stale {
        let _ = std::fs::remove_file(entry.path());
    }
}
