// src/config.rs
// =============================================================================
// Settings for a catalog build, resolved from the command line.
//
// No --account falls back to the built-in accounts, and no --version
// rebuilds every default version, so a plain `github-modules build`
// rebuilds everything.
// =============================================================================

use crate::catalog::DEFAULT_ACCOUNTS;
use crate::cli::BuildArgs;
use crate::github::{GithubClient, RateGate, Result};
use crate::scan::{RemoteReader, RepositoryScanner};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    pub data_dir: PathBuf,
    pub api_url: String,
    pub token: Option<String>,
    pub accounts: Vec<String>,
    /// Empty means every default version
    pub versions: Vec<String>,
    pub quota_floor: u64,
    pub poll_interval: Duration,
    pub max_quota_polls: Option<u32>,
    pub module_concurrency: usize,
}

impl BuildConfig {
    pub fn from_args(data_dir: PathBuf, args: BuildArgs) -> Self {
        let accounts = if args.accounts.is_empty() {
            DEFAULT_ACCOUNTS.iter().map(|a| a.to_string()).collect()
        } else {
            args.accounts
        };
        Self {
            data_dir,
            api_url: args.api_url,
            token: args.token.filter(|t| !t.trim().is_empty()),
            accounts,
            versions: args.versions,
            quota_floor: args.quota_floor,
            poll_interval: Duration::from_secs(args.poll_interval),
            max_quota_polls: args.max_quota_polls,
            // zero would stall the scan
            module_concurrency: args.jobs.max(1),
        }
    }

    /// The API client and the process-wide rate gate built from these settings
    pub fn connect(&self) -> Result<(GithubClient, RateGate)> {
        let client = GithubClient::new(&self.api_url, self.token.as_deref())?;
        let gate = RateGate::new(client.clone())
            .with_floor(self.quota_floor)
            .with_interval(self.poll_interval)
            .with_max_polls(self.max_quota_polls);
        Ok((client, gate))
    }

    /// A repository scanner sharing one rate gate across every request
    pub fn scanner(&self) -> Result<RepositoryScanner> {
        let (client, gate) = self.connect()?;
        let reader = RemoteReader::new(client, Arc::new(gate));
        Ok(RepositoryScanner::new(reader).with_concurrency(self.module_concurrency))
    }
}
