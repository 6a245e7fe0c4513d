// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # tmfc-observability
//!
//! Logging setup shared by the TMFC tools, with per-crate debug flags.
//!
//! ## Features
//! - `file-logging`: per-run JSON log files with retention (desktop only)

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod init;

pub use cli::*;
pub use init::*;

/// Known TMFC crate names for debug flags
pub const KNOWN_CRATES: &[&str] = &[
    "tmfc",
    "tmfc-structures",
    "tmfc-config",
    "tmfc-sim-neural",
    "tmfc-sim-hemodynamics",
    "tmfc-sim-engine",
];
