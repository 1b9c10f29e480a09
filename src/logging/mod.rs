//! Logging setup for Tabscribe
//! Desktop builds log through tauri-plugin-log into the logs dir (7-day retention);
//! the headless CLI installs a tracing-subscriber backend for the `log` facade.

use crate::utils::get_logs_dir;
use log::info;
use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tracing_subscriber::EnvFilter;

const LOG_RETENTION_DAYS: u64 = 7;
pub const LOG_FILE_NAME: &str = "tabscribe";

/// Console logger for the headless front end. `RUST_LOG` overrides the level.
pub fn init_console_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(feature = "desktop")]
pub fn plugin<R: tauri::Runtime>() -> tauri::plugin::TauriPlugin<R> {
    use tauri_plugin_log::{Target, TargetKind};

    tauri_plugin_log::Builder::new()
        .targets([
            Target::new(TargetKind::Stdout),
            Target::new(TargetKind::Folder {
                path: get_logs_dir(),
                file_name: Some(LOG_FILE_NAME.to_string()),
            }),
        ])
        .level(log::LevelFilter::Info)
        .build()
}

pub fn cleanup_old_logs() -> usize {
    remove_logs_older_than(&get_logs_dir(), Duration::from_secs(LOG_RETENTION_DAYS * 24 * 60 * 60))
}

fn remove_logs_older_than(logs_dir: &Path, retention: Duration) -> usize {
    if !logs_dir.exists() {
        return 0;
    }

    let now = SystemTime::now();
    let mut removed = 0;

    if let Ok(entries) = fs::read_dir(logs_dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().map_or(true, |ext| ext != "log") {
                continue;
            }
            let age = fs::metadata(&path)
                .and_then(|meta| meta.modified())
                .ok()
                .and_then(|modified| now.duration_since(modified).ok());

            if matches!(age, Some(age) if age > retention) && fs::remove_file(&path).is_ok() {
                info!("Cleaned up old log: {:?}", path.file_name());
                removed += 1;
            }
        }
    }

    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleanup_only_touches_expired_log_files() {
        let dir = std::env::temp_dir().join(format!("tabscribe-logs-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("old.log"), "x").unwrap();
        fs::write(dir.join("notes.txt"), "x").unwrap();

        // Nothing is older than an hour yet
        assert_eq!(remove_logs_older_than(&dir, Duration::from_secs(3600)), 0);
        assert!(dir.join("old.log").exists());

        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(remove_logs_older_than(&dir, Duration::from_millis(1)), 1);
        assert!(!dir.join("old.log").exists());
        assert!(dir.join("notes.txt").exists());
    }

    #[test]
    fn test_cleanup_missing_dir() {
        let dir = std::env::temp_dir().join(format!("tabscribe-nologs-{}", uuid::Uuid::new_v4()));
        assert_eq!(remove_logs_older_than(&dir, Duration::from_secs(1)), 0);
    }
}
