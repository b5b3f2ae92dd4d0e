//! Logging setup and log file retention.
//!
//! Logs go to the console and to a daily-rotated `gifbot.log.YYYY-MM-DD` file.
//! Timestamps use the local timezone.

use chrono::{Local, NaiveDate};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::Writer, time::FormatTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Default log filter directive.
pub const DEFAULT_LOG_FILTER: &str = "gifbot=info,process_utils=info,reqwest=warn";

/// Filter used with `--verbose`.
pub const VERBOSE_LOG_FILTER: &str = "gifbot=debug,process_utils=debug,reqwest=info";

/// Log file name prefix; the appender adds `.YYYY-MM-DD`.
const LOG_FILE_PREFIX: &str = "gifbot.log";

/// How often the retention task runs.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Custom timer that uses the local timezone via chrono.
#[derive(Debug, Clone, Copy)]
struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = Local::now();
        write!(w, "{}", now.format("%Y-%m-%dT%H:%M:%S%.3f%:z"))
    }
}

/// Choose the filter directive.
///
/// `--verbose` wins, then `RUST_LOG`, then the configured directive, then the
/// default.
pub fn filter_directive(verbose: bool, env: Option<&str>, configured: &str) -> String {
    if verbose {
        return VERBOSE_LOG_FILTER.to_string();
    }
    if let Some(env) = env.map(str::trim).filter(|s| !s.is_empty()) {
        return env.to_string();
    }
    if !configured.trim().is_empty() {
        return configured.trim().to_string();
    }
    DEFAULT_LOG_FILTER.to_string()
}

/// Active logging setup.
///
/// Holds the file writer guard; dropping it flushes and stops file logging,
/// so keep it alive for the lifetime of the process.
pub struct LoggingHandle {
    log_dir: PathBuf,
    retention_days: u32,
    _guard: WorkerGuard,
}

impl LoggingHandle {
    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Start the log retention cleanup task.
    ///
    /// Runs once immediately, then daily. Does nothing when retention is `0`.
    pub fn start_retention_cleanup(&self, cancel_token: CancellationToken) -> Option<JoinHandle<()>> {
        if self.retention_days == 0 {
            return None;
        }
        let log_dir = self.log_dir.clone();
        let retention_days = self.retention_days;

        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(CLEANUP_INTERVAL);
            loop {
                tokio::select! {
                    _ = cancel_token.cancelled() => {
                        debug!("Log retention cleanup task shutting down");
                        break;
                    }
                    _ = ticker.tick() => {
                        if let Err(e) = cleanup_old_logs(&log_dir, retention_days).await {
                            warn!(error = %e, "Failed to cleanup old logs");
                        }
                    }
                }
            }
        }))
    }
}

/// Delete log files older than `retention_days`.
async fn cleanup_old_logs(log_dir: &Path, retention_days: u32) -> std::io::Result<usize> {
    let cutoff = Local::now().date_naive() - chrono::Duration::days(i64::from(retention_days));
    cleanup_logs_before(log_dir, cutoff).await
}

/// Delete `gifbot.log.YYYY-MM-DD` files dated before `cutoff`.
async fn cleanup_logs_before(log_dir: &Path, cutoff: NaiveDate) -> std::io::Result<usize> {
    let mut entries = tokio::fs::read_dir(log_dir).await?;
    let mut deleted_count = 0;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let Some(file_date) = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(log_file_date)
        else {
            continue;
        };

        if file_date < cutoff {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                warn!(path = %path.display(), error = %e, "Failed to delete old log file");
            } else {
                deleted_count += 1;
                debug!(path = %path.display(), "Deleted old log file");
            }
        }
    }

    if deleted_count > 0 {
        info!(count = deleted_count, "Cleaned up old log files");
    }

    Ok(deleted_count)
}

fn log_file_date(file_name: &str) -> Option<NaiveDate> {
    let date = file_name.strip_prefix(LOG_FILE_PREFIX)?.strip_prefix('.')?;
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

/// Initialize console and file logging.
pub fn init_logging(log_dir: &Path, directive: &str, retention_days: u32) -> crate::Result<LoggingHandle> {
    std::fs::create_dir_all(log_dir)?;

    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_new(directive)
        .map_err(|e| crate::Error::config(format!("Invalid log filter '{}': {}", directive, e)))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_ansi(true).with_timer(LocalTimer))
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_timer(LocalTimer),
        )
        .try_init()
        .map_err(|e| crate::Error::Other(format!("Failed to set global default subscriber: {}", e)))?;

    Ok(LoggingHandle {
        log_dir: log_dir.to_path_buf(),
        retention_days,
        _guard: guard,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_directive_precedence() {
        assert_eq!(filter_directive(true, Some("trace"), "warn"), VERBOSE_LOG_FILTER);
        assert_eq!(filter_directive(false, Some("gifbot=trace"), "warn"), "gifbot=trace");
        assert_eq!(filter_directive(false, Some("  "), "warn"), "warn");
        assert_eq!(filter_directive(false, None, ""), DEFAULT_LOG_FILTER);
    }

    #[test]
    fn test_default_filters_parse() {
        assert!(EnvFilter::try_new(DEFAULT_LOG_FILTER).is_ok());
        assert!(EnvFilter::try_new(VERBOSE_LOG_FILTER).is_ok());
    }

    #[test]
    fn test_log_file_date() {
        assert_eq!(
            log_file_date("gifbot.log.2024-03-09"),
            NaiveDate::from_ymd_opt(2024, 3, 9)
        );
        assert_eq!(log_file_date("gifbot.log"), None);
        assert_eq!(log_file_date("other.log.2024-03-09"), None);
        assert_eq!(log_file_date("gifbot.log.garbage"), None);
    }

    #[tokio::test]
    async fn test_cleanup_logs_before() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "gifbot.log.2024-01-01",
            "gifbot.log.2024-01-10",
            "gifbot.log.2024-01-11",
            "notes.txt",
        ] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }

        let cutoff = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let deleted = cleanup_logs_before(dir.path(), cutoff).await.unwrap();
        assert_eq!(deleted, 1);

        let mut remaining: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        remaining.sort();
        assert_eq!(
            remaining,
            vec!["gifbot.log.2024-01-10", "gifbot.log.2024-01-11", "notes.txt"]
        );
    }
}
