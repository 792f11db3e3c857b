//! Tracing initialization driven by `[common]`'s `LogFile`/`LogLevel`/
//! `LogMaxDays`. `RUST_LOG` still wins when set, matching the teacher's
//! `init_logging` precedent of preferring the env filter over a fixed
//! default directive.

use std::fs::OpenOptions;
use std::path::Path;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tunnel_config::{CommonConfig, LogLevel, LogTarget};

fn level_str(level: &LogLevel) -> &'static str {
    match level {
        LogLevel::Debug => "debug",
        LogLevel::Info => "info",
        LogLevel::Warning => "warn",
        LogLevel::Error => "error",
    }
}

/// Install the global tracing subscriber for the process. Console targets
/// get ANSI-colored output; file targets get one plain-text file per
/// calendar day, with siblings older than `LogMaxDays` pruned on startup.
pub fn init(common: &CommonConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level_str(&common.log_level)))?;

    match &common.log_target {
        LogTarget::Console => {
            tracing_subscriber::registry().with(filter).with(fmt::layer()).init();
        }
        LogTarget::File(path) => {
            let path = Path::new(path);
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir)?;
            }
            let dated_path = dated_log_path(path);
            let file = OpenOptions::new().create(true).append(true).open(&dated_path)?;
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(file).with_ansi(false))
                .init();
            prune_old_logs(path, common.log_max_days);
        }
    }
    Ok(())
}

fn dated_log_path(base: &Path) -> std::path::PathBuf {
    let today = chrono::Local::now().date_naive();
    let name = base.file_name().and_then(|n| n.to_str()).unwrap_or("ptunnel.log");
    let dated_name = format!("{name}.{today}");
    match base.parent().filter(|d| !d.as_os_str().is_empty()) {
        Some(dir) => dir.join(dated_name),
        None => std::path::PathBuf::from(dated_name),
    }
}

/// Delete rotated log files under `base`'s directory older than
/// `max_days`, matching the `{base_name}.<date>` siblings this module
/// itself writes.
fn prune_old_logs(base: &Path, max_days: u32) {
    let dir = base.parent().filter(|d| !d.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    let base_name = base.file_name().and_then(|n| n.to_str()).unwrap_or("ptunnel.log");
    let prefix = format!("{base_name}.");
    let cutoff = chrono::Local::now().date_naive() - chrono::Duration::days(max_days as i64);

    for entry in entries.flatten() {
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else { continue };
        let Some(date_str) = file_name.strip_prefix(&prefix) else { continue };
        let Ok(date) = chrono::NaiveDate::parse_from_str(date_str, "%Y-%m-%d") else { continue };
        if date < cutoff {
            let _ = std::fs::remove_file(entry.path());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dated_log_path_appends_todays_date() {
        let today = chrono::Local::now().date_naive();
        let path = dated_log_path(Path::new("/var/log/ptunnel.log"));
        assert_eq!(path, Path::new(&format!("/var/log/ptunnel.log.{today}")));
    }

    #[test]
    fn prune_removes_only_stale_dated_siblings() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("ptunnel.log");

        let old_date = chrono::Local::now().date_naive() - chrono::Duration::days(10);
        let fresh_date = chrono::Local::now().date_naive();
        let old_path = dir.path().join(format!("ptunnel.log.{old_date}"));
        let fresh_path = dir.path().join(format!("ptunnel.log.{fresh_date}"));
        std::fs::write(&old_path, b"old").unwrap();
        std::fs::write(&fresh_path, b"fresh").unwrap();

        prune_old_logs(&base, 7);

        assert!(!old_path.exists());
        assert!(fresh_path.exists());
    }
}
