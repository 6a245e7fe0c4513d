// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Logging initialization
//!
//! Console output always; with the `file-logging` feature, an additional JSON
//! log per run in a timestamped folder:
//! ```text
//! ./logs/
//!   └── run_20250101_120000/
//!       └── tmfc.log
//! ```

use std::path::Path;
#[cfg(feature = "file-logging")]
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{NaiveDateTime, Utc};
use tracing_subscriber::EnvFilter;

use crate::cli::CrateDebugFlags;

const RUN_PREFIX: &str = "run_";
const RUN_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

pub const DEFAULT_RETENTION_RUNS: usize = 10;
pub const DEFAULT_RETENTION_DAYS: u64 = 30;

fn env_filter(debug_flags: &CrateDebugFlags, base_level: &str) -> Result<EnvFilter> {
    let filter = debug_flags.to_filter_string_with_base(base_level);
    EnvFilter::try_new(&filter).with_context(|| format!("Invalid log filter: {}", filter))
}

/// Install a stderr subscriber filtered by `base_level` and the debug flags.
pub fn init_console_logging(debug_flags: &CrateDebugFlags, base_level: &str) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(debug_flags, base_level)?)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install log subscriber: {}", e))
}

/// Keeps the file writer alive; logs are flushed on drop.
#[cfg(feature = "file-logging")]
pub struct LoggingGuard {
    _file_guard: tracing_appender::non_blocking::WorkerGuard,
    run_dir: PathBuf,
}

#[cfg(feature = "file-logging")]
impl LoggingGuard {
    /// Folder holding this run's log file
    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }
}

/// Console logging plus a JSON log file in a new run folder under `log_dir`
/// (default `./logs`). Older run folders are pruned first.
#[cfg(feature = "file-logging")]
pub fn init_logging(
    debug_flags: &CrateDebugFlags,
    base_level: &str,
    log_dir: Option<PathBuf>,
    retention_runs: Option<usize>,
) -> Result<LoggingGuard> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{Layer, Registry};

    let base_log_dir = log_dir.unwrap_or_else(|| PathBuf::from("./logs"));
    prune_run_folders(
        &base_log_dir,
        retention_runs.unwrap_or(DEFAULT_RETENTION_RUNS).saturating_sub(1),
        DEFAULT_RETENTION_DAYS,
    )?;

    let run_dir = base_log_dir.join(format!(
        "{}{}",
        RUN_PREFIX,
        Utc::now().format(RUN_TIMESTAMP_FORMAT)
    ));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("Failed to create log directory: {}", run_dir.display()))?;

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(env_filter(debug_flags, base_level)?);

    let (writer, file_guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(&run_dir, "tmfc.log"));
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .json()
        .with_filter(env_filter(debug_flags, base_level)?);

    Registry::default()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install log subscriber: {}", e))?;

    Ok(LoggingGuard {
        _file_guard: file_guard,
        run_dir,
    })
}

/// Remove `run_*` folders older than `retention_days`, then all but the
/// `retention_runs` most recent. Returns the number of folders removed.
pub fn prune_run_folders(
    base_log_dir: &Path,
    retention_runs: usize,
    retention_days: u64,
) -> Result<usize> {
    if !base_log_dir.exists() {
        return Ok(0);
    }
    let cutoff = Utc::now() - chrono::Duration::days(retention_days as i64);

    let mut runs = Vec::new();
    for entry in std::fs::read_dir(base_log_dir)
        .with_context(|| format!("Failed to read log directory: {}", base_log_dir.display()))?
    {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        let stamp = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_prefix(RUN_PREFIX))
            .and_then(|s| NaiveDateTime::parse_from_str(s, RUN_TIMESTAMP_FORMAT).ok());
        if let Some(stamp) = stamp {
            runs.push((path, stamp.and_utc()));
        }
    }

    // oldest first
    runs.sort_by_key(|(_, stamp)| *stamp);
    let excess = runs.len().saturating_sub(retention_runs);

    let mut removed = 0;
    for (index, (path, stamp)) in runs.iter().enumerate() {
        if index >= excess && *stamp >= cutoff {
            continue;
        }
        match std::fs::remove_dir_all(path) {
            Ok(()) => removed += 1,
            Err(e) => eprintln!(
                "Warning: Failed to remove old log directory {}: {}",
                path.display(),
                e
            ),
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_runs(base: &Path, names: &[&str]) {
        for name in names {
            std::fs::create_dir_all(base.join(name)).unwrap();
        }
    }

    #[test]
    fn test_missing_dir_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let removed = prune_run_folders(&dir.path().join("absent"), 3, 30).unwrap();
        assert_eq!(removed, 0);
    }

    #[test]
    fn test_keeps_most_recent_runs() {
        let dir = tempfile::tempdir().unwrap();
        make_runs(
            dir.path(),
            &[
                "run_20250101_000000",
                "run_20250102_000000",
                "run_20250103_000000",
                "notes",
                "run_garbage",
            ],
        );

        let removed = prune_run_folders(dir.path(), 2, 365_000).unwrap();
        assert_eq!(removed, 1);
        assert!(!dir.path().join("run_20250101_000000").exists());
        assert!(dir.path().join("run_20250102_000000").exists());
        assert!(dir.path().join("run_20250103_000000").exists());
        assert!(dir.path().join("notes").exists());
        assert!(dir.path().join("run_garbage").exists());
    }

    #[test]
    fn test_age_cutoff() {
        let dir = tempfile::tempdir().unwrap();
        let recent = format!("run_{}", Utc::now().format(RUN_TIMESTAMP_FORMAT));
        make_runs(dir.path(), &["run_20200101_000000", &recent]);

        let removed = prune_run_folders(dir.path(), 10, 30).unwrap();
        assert_eq!(removed, 1);
        assert!(dir.path().join(&recent).exists());
    }

    #[test]
    fn test_invalid_level_rejected() {
        let flags = CrateDebugFlags::default();
        assert!(env_filter(&flags, "info").is_ok());
        assert!(env_filter(&flags, "tmfc=loud").is_err());
    }
}
