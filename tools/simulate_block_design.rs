// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Run a block-design simulation from a TOML configuration and write the
//! accumulated series and time-index map as JSON.
//!
//! Per-crate debug logging uses `--debug-<crate>` / `--debug-all` or the
//! `TMFC_DEBUG` environment variable.

use std::collections::HashMap;
use std::env;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};

use tmfc::config::{load_config, validate_config};
use tmfc::observability::{debug_flags_help, CrateDebugFlags, DEBUG_ENV_VAR};
use tmfc::simulation::run_from_config;

/// TMFC block-design simulator
#[derive(Parser, Debug)]
#[command(name = "tmfc-simulate", version, author, long_about = None, after_help = debug_flags_help())]
struct Args {
    /// Configuration file (default: search for tmfc_configuration.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output JSON file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Override a configuration key, e.g. `--set bold.mode=batch` (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    overrides: Vec<String>,

    /// Pretty-print the JSON output
    #[arg(long, default_value_t = false)]
    pretty: bool,

    /// Directory for per-run log folders
    #[cfg(feature = "file-logging")]
    #[arg(long, default_value = "./logs")]
    log_dir: PathBuf,
}

fn parse_overrides(pairs: &[String]) -> Result<HashMap<String, String>> {
    let mut overrides = HashMap::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("Override '{}' is not of the form KEY=VALUE", pair);
        };
        overrides.insert(key.trim().to_string(), value.to_string());
    }
    Ok(overrides)
}

fn main() -> Result<()> {
    // clap would reject the open-ended --debug-<crate> flags
    let (debug_args, clap_args): (Vec<String>, Vec<String>) =
        env::args().partition(|arg| arg.starts_with("--debug-"));
    let args = Args::parse_from(clap_args);

    let mut debug_flags = CrateDebugFlags::from_args(debug_args);
    if let Ok(value) = env::var(DEBUG_ENV_VAR) {
        debug_flags.merge_env_value(&value);
    }

    let overrides = parse_overrides(&args.overrides)?;
    let config = load_config(args.config.as_deref(), Some(&overrides))
        .context("Failed to load configuration")?;

    #[cfg(feature = "file-logging")]
    let _logging_guard = tmfc::observability::init_logging(
        &debug_flags,
        &config.logging.level,
        Some(args.log_dir.clone()),
        None,
    )?;
    #[cfg(not(feature = "file-logging"))]
    tmfc::observability::init_console_logging(&debug_flags, &config.logging.level)?;

    validate_config(&config)?;
    info!("tmfc-simulate v{}", tmfc::VERSION);

    let report = run_from_config(&config).context("Simulation failed")?;
    for conflict in &report.conflicts {
        warn!("{}", conflict);
    }

    let writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(
            File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    };
    let mut writer = BufWriter::new(writer);
    if args.pretty {
        serde_json::to_writer_pretty(&mut writer, &report)?;
    } else {
        serde_json::to_writer(&mut writer, &report)?;
    }
    writeln!(writer)?;
    writer.flush()?;

    if let Some(path) = &args.output {
        info!("Wrote {}", path.display());
    }
    Ok(())
}
