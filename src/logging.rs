// Logging
// One log file per server run plus console output in debug builds.
// Components prefix their lines with a tag: [CONFIG], [GATEWAY], [DETECTOR], [DISPATCH].

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

pub const LOG_FILE_PREFIX: &str = "fallacyGuard_";
pub const DEFAULT_LOGS_TO_KEEP: usize = 30;
const DEFAULT_FILTER: &str = "fallacy_guard_lib=info,tower_http=info";

/// Where and how a run logs. Read once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct LogSettings {
    pub file_logging: bool,
    pub cleanup: bool,
    pub dir: PathBuf,
    pub keep: usize,
}

impl LogSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// `FALLACY_GUARD_DISABLE_FILE_LOG`, `FALLACY_GUARD_DISABLE_LOG_CLEANUP`, `FALLACY_GUARD_LOG_DIR`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |key: &str| matches!(lookup(key).as_deref(), Some("1") | Some("true") | Some("TRUE"));
        let dir = lookup("FALLACY_GUARD_LOG_DIR")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_logs_dir);

        Self {
            file_logging: !flag("FALLACY_GUARD_DISABLE_FILE_LOG"),
            cleanup: !flag("FALLACY_GUARD_DISABLE_LOG_CLEANUP"),
            dir,
            keep: DEFAULT_LOGS_TO_KEEP,
        }
    }
}

/// Install the global subscriber. Falls back to console output when the log
/// directory cannot be created.
pub fn init(settings: &LogSettings) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    if !settings.file_logging {
        init_console_only(env_filter);
        info!("File logging disabled via FALLACY_GUARD_DISABLE_FILE_LOG");
        return;
    }

    if let Err(e) = fs::create_dir_all(&settings.dir) {
        eprintln!("Failed to create logs directory {}: {}", settings.dir.display(), e);
        init_console_only(env_filter);
        info!("Falling back to console-only logging (log dir not writable)");
        return;
    }

    let log_filename = run_log_name(chrono::Local::now());
    let (file_writer, file_guard) =
        tracing_appender::non_blocking(rolling::never(&settings.dir, &log_filename));
    let _ = LOG_GUARD.set(file_guard);

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    let console_layer = cfg!(debug_assertions).then(|| {
        fmt::layer()
            .with_writer(std::io::stdout)
            .with_ansi(true)
            .with_target(true)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    info!("=== fallacyGuard Started ===");
    info!("Log file: {}", settings.dir.join(&log_filename).display());
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    if settings.cleanup {
        let dir = settings.dir.clone();
        let keep = settings.keep;
        std::thread::spawn(move || {
            let removed = prune_run_logs(&dir, keep);
            if removed > 0 {
                info!("Removed {} old log file(s)", removed);
            }
        });
    }
}

fn init_console_only(env_filter: EnvFilter) {
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(cfg!(debug_assertions))
        .with_target(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .init();
}

fn run_log_name(now: chrono::DateTime<chrono::Local>) -> String {
    format!("{}{}.log", LOG_FILE_PREFIX, now.format("%Y%m%d_%H%M%S"))
}

fn default_logs_dir() -> PathBuf {
    if cfg!(debug_assertions) {
        return PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("logs");
    }
    dirs::data_local_dir()
        .map(|d| d.join("fallacyGuard").join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}

/// Delete the oldest run logs beyond `keep`. Other files in the directory are left alone.
pub fn prune_run_logs(logs_dir: &Path, keep: usize) -> usize {
    let mut run_logs: Vec<_> = match fs::read_dir(logs_dir) {
        Ok(rd) => rd
            .filter_map(|e| e.ok())
            .filter(|e| {
                let name = e.file_name().to_string_lossy().to_string();
                name.starts_with(LOG_FILE_PREFIX) && name.ends_with(".log")
            })
            .collect(),
        Err(_) => return 0,
    };

    if run_logs.len() <= keep {
        return 0;
    }

    // Names embed the start time, so ties on mtime still sort oldest first.
    run_logs.sort_by_key(|e| {
        let modified = e
            .metadata()
            .and_then(|m| m.modified())
            .unwrap_or(std::time::SystemTime::UNIX_EPOCH);
        (modified, e.file_name())
    });

    let excess = run_logs.len() - keep;
    run_logs
        .into_iter()
        .take(excess)
        .filter(|e| fs::remove_file(e.path()).is_ok())
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashMap;

    fn lookup_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_settings_defaults() {
        let settings = LogSettings::from_lookup(lookup_of(&[]));
        assert!(settings.file_logging);
        assert!(settings.cleanup);
        assert_eq!(settings.keep, DEFAULT_LOGS_TO_KEEP);
        assert!(settings.dir.ends_with("logs"));
    }

    #[test]
    fn test_settings_from_env_switches() {
        let settings = LogSettings::from_lookup(lookup_of(&[
            ("FALLACY_GUARD_DISABLE_FILE_LOG", "1"),
            ("FALLACY_GUARD_DISABLE_LOG_CLEANUP", "true"),
            ("FALLACY_GUARD_LOG_DIR", "/var/log/fallacy"),
        ]));
        assert!(!settings.file_logging);
        assert!(!settings.cleanup);
        assert_eq!(settings.dir, PathBuf::from("/var/log/fallacy"));

        let blank_dir = LogSettings::from_lookup(lookup_of(&[
            ("FALLACY_GUARD_DISABLE_FILE_LOG", "yes"),
            ("FALLACY_GUARD_LOG_DIR", "  "),
        ]));
        assert!(blank_dir.file_logging);
        assert!(blank_dir.dir.ends_with("logs"));
    }

    #[test]
    fn test_run_log_name() {
        let at = chrono::Local.with_ymd_and_hms(2026, 10, 18, 9, 5, 7).unwrap();
        assert_eq!(run_log_name(at), "fallacyGuard_20261018_090507.log");
    }

    #[test]
    fn test_prune_keeps_newest_run_logs() {
        let dir = std::env::temp_dir().join(format!("fallacy-guard-logs-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        for i in 0..5 {
            fs::write(dir.join(format!("{}2026010{}_000000.log", LOG_FILE_PREFIX, i)), "x").unwrap();
        }
        fs::write(dir.join("unrelated.log"), "x").unwrap();

        assert_eq!(prune_run_logs(&dir, 2), 3);

        let mut remaining: Vec<_> = fs::read_dir(&dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        remaining.sort();
        assert_eq!(
            remaining,
            vec![
                "fallacyGuard_20260103_000000.log".to_string(),
                "fallacyGuard_20260104_000000.log".to_string(),
                "unrelated.log".to_string(),
            ]
        );
        assert_eq!(prune_run_logs(&dir, 2), 0);
    }

    #[test]
    fn test_prune_missing_dir() {
        let dir = std::env::temp_dir().join(format!("fallacy-guard-none-{}", uuid::Uuid::new_v4()));
        assert_eq!(prune_run_logs(&dir, 1), 0);
    }
}
