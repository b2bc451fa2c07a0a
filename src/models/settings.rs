// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Runtime configuration.
//!
//! Every option can be given as a command line flag or through the matching
//! environment variable. Unset options fall back to the defaults below.

use clap::{Args, Parser, ValueEnum};
use std::fmt;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_SCRAPER_PROGRAM: &str = "python";
pub const DEFAULT_SCRAPER_ARGS: &str = "scraper.py --vinted";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_DATABASE_FILE: &str = "scraped_data.db";
pub const DEFAULT_USERS_FILE: &str = "users.txt";
pub const DEFAULT_NO_IMAGES_FLAG: &str = "--no-images";

/// Top-level service configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "vinted-agent", about = "HTTP front-end for the Vinted scraper")]
pub struct Config {
    /// Port to listen on (all interfaces)
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Comma-separated CORS origin allowlist; any origin when unset
    #[arg(long, env = "CORS_ALLOWED_ORIGINS")]
    pub cors_allowed_origins: Option<String>,

    #[command(flatten)]
    pub scraper: ScraperConfig,
}

/// How the scraper learns where its input and output live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InvocationStyle {
    /// Pass `--users <file> --database <db>` on the command line.
    #[value(name = "explicit_paths", alias = "explicit-paths")]
    ExplicitPaths,
    /// Run with the workspace as current directory; the scraper reads and
    /// writes its well-known file names there.
    #[value(name = "working_dir", alias = "working-dir")]
    WorkingDir,
}

impl fmt::Display for InvocationStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvocationStyle::ExplicitPaths => write!(f, "explicit_paths"),
            InvocationStyle::WorkingDir => write!(f, "working_dir"),
        }
    }
}

/// External scraper invocation settings.
#[derive(Debug, Clone, Args)]
pub struct ScraperConfig {
    /// Scraper executable
    #[arg(long = "scraper-program", env = "SCRAPER_PROGRAM", default_value = DEFAULT_SCRAPER_PROGRAM)]
    pub program: String,

    /// Leading scraper arguments, whitespace separated
    #[arg(
        long = "scraper-args",
        env = "SCRAPER_ARGS",
        default_value = DEFAULT_SCRAPER_ARGS,
        allow_hyphen_values = true
    )]
    pub args: String,

    #[arg(
        long = "scraper-invocation",
        env = "SCRAPER_INVOCATION",
        value_enum,
        default_value_t = InvocationStyle::ExplicitPaths
    )]
    pub invocation: InvocationStyle,

    /// Hard wall-clock limit for one scraper run
    #[arg(long = "scraper-timeout-secs", env = "SCRAPER_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// Database file the scraper produces, relative to the workspace
    #[arg(long = "scraper-database-file", env = "SCRAPER_DATABASE_FILE", default_value = DEFAULT_DATABASE_FILE)]
    pub database_file: String,

    /// Input list file written into the workspace
    #[arg(long = "scraper-users-file", env = "SCRAPER_USERS_FILE", default_value = DEFAULT_USERS_FILE)]
    pub users_file: String,

    /// Flag appended when images are not requested; empty to disable
    #[arg(
        long = "scraper-no-images-flag",
        env = "SCRAPER_NO_IMAGES_FLAG",
        default_value = DEFAULT_NO_IMAGES_FLAG,
        allow_hyphen_values = true
    )]
    pub no_images_flag: String,
}

impl ScraperConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn base_args(&self) -> Vec<String> {
        self.args.split_whitespace().map(str::to_string).collect()
    }

    /// Reject values that would let the scraper escape its workspace.
    pub fn validate(&self) -> Result<(), String> {
        if self.program.trim().is_empty() {
            return Err("scraper program must not be empty".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("scraper timeout must be at least one second".to_string());
        }
        for (name, value) in [
            ("database file", &self.database_file),
            ("users file", &self.users_file),
        ] {
            if value.is_empty()
                || value.contains('/')
                || value.contains('\\')
                || value == "."
                || value == ".."
            {
                return Err(format!("{} must be a plain file name, got {:?}", name, value));
            }
        }
        Ok(())
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_SCRAPER_PROGRAM.to_string(),
            args: DEFAULT_SCRAPER_ARGS.to_string(),
            invocation: InvocationStyle::ExplicitPaths,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            database_file: DEFAULT_DATABASE_FILE.to_string(),
            users_file: DEFAULT_USERS_FILE.to_string(),
            no_images_flag: DEFAULT_NO_IMAGES_FLAG.to_string(),
        }
    }
}
