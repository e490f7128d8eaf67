// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// Three subcommands:
// - build:  scan GitHub and rewrite the catalog documents
// - mirror: clone/checkout the selected repositories of a version
// - show:   print what a cached catalog contains
//
// Flags shared by every subcommand (--debug, --data-dir) are `global`.
// =============================================================================

use crate::catalog::DEFAULT_DATA_DIR;
use crate::github::{DEFAULT_API_URL, DEFAULT_POLL_INTERVAL, DEFAULT_QUOTA_FLOOR};
use crate::mirror::DEFAULT_MIRROR_ROOT;
use crate::scan::DEFAULT_MODULE_CONCURRENCY;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "github-modules",
    version,
    about = "Catalog addon modules hosted on GitHub and mirror selected repositories",
    long_about = "github-modules walks the repositories of a few GitHub accounts, reads the \
                  __manifest__.py of every top-level module directory and caches the result \
                  as one JSON document per version. It can then clone and check out the \
                  repositories listed in a selection document."
)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Directory holding the catalog and selection documents
    #[arg(
        long,
        global = true,
        env = "GITHUB_MODULES_DATA_DIR",
        default_value = DEFAULT_DATA_DIR
    )]
    pub data_dir: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan GitHub and rebuild the catalog of one or more versions
    ///
    /// Example: github-modules build --version 14.0 --account OCA
    Build(BuildArgs),

    /// Clone and check out the repositories selected for a version
    ///
    /// Example: github-modules mirror 14.0
    Mirror {
        /// Version to check out, e.g. 14.0
        version: String,

        /// Where local clones are kept
        #[arg(long, default_value = DEFAULT_MIRROR_ROOT)]
        mirror_root: PathBuf,
    },

    /// Summarize the cached catalog of a version
    Show {
        /// Version of the catalog, e.g. 14.0
        version: String,

        /// Print the raw JSON document instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Version (branch) to scan; repeat for several. All known versions when omitted
    #[arg(long = "version", value_name = "VERSION")]
    pub versions: Vec<String>,

    /// GitHub user or organization to scan; repeat for several
    #[arg(long = "account", value_name = "NAME")]
    pub accounts: Vec<String>,

    /// Personal access token, for a higher rate limit
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Base URL of the GitHub REST API
    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Wait for quota when fewer calls than this remain
    #[arg(long, default_value_t = DEFAULT_QUOTA_FLOOR)]
    pub quota_floor: u64,

    /// Seconds between two quota checks while waiting
    #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL.as_secs())]
    pub poll_interval: u64,

    /// Give up after this many quota checks while waiting (waits forever when omitted)
    #[arg(long)]
    pub max_quota_polls: Option<u32>,

    /// Module directories of one repository inspected at once
    #[arg(long, default_value_t = DEFAULT_MODULE_CONCURRENCY)]
    pub jobs: usize,
}
