// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging
// 3. Dispatch to the appropriate subcommand handler
// 4. Exit with proper code (0 = success, 1 = failure, 2 = bad arguments)
// =============================================================================

// Module declarations - tells Rust about our other source files
mod catalog;   // src/catalog/ - data model, JSON store, catalog builder
mod cli;       // src/cli.rs - command-line parsing
mod config;    // src/config.rs - build settings
mod github;    // src/github/ - GitHub API client and rate gate
mod logging;   // src/logging.rs - tracing setup
mod mirror;    // src/mirror/ - local clones of selected repositories
mod scan;      // src/scan/ - module discovery inside repositories
mod session;   // src/session.rs - per-version working state

use anyhow::{Context, Result};
use catalog::{CatalogBuilder, CatalogStore, DocumentKind};
use clap::Parser;
use cli::{Cli, Commands};
use config::BuildConfig;
use mirror::{MirrorManager, SystemGit};
use session::Session;
use std::path::PathBuf;

#[tokio::main]
async fn main() {
    // clap prints usage and exits with code 2 on malformed arguments,
    // and exits with 0 after --help / --version
    let cli = Cli::parse();
    logging::init(cli.debug);

    let exit_code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{e:#}");
            1
        }
    };

    std::process::exit(exit_code);
}

async fn run(cli: Cli) -> Result<i32> {
    let store = CatalogStore::new(&cli.data_dir);

    match cli.command {
        Commands::Build(args) => {
            let config = BuildConfig::from_args(cli.data_dir, args);
            handle_build(&config).await
        }
        Commands::Mirror { version, mirror_root } => handle_mirror(&store, &version, mirror_root).await,
        Commands::Show { version, json } => handle_show(&store, &version, json),
    }
}

async fn handle_build(config: &BuildConfig) -> Result<i32> {
    let scanner = config.scanner().context("setting up the GitHub client")?;
    let builder = CatalogBuilder::new(
        scanner,
        CatalogStore::new(&config.data_dir),
        config.accounts.clone(),
    );

    if config.versions.is_empty() {
        builder.build_all().await?;
    } else {
        builder
            .build_versions(config.versions.iter().map(String::as_str))
            .await?;
    }
    Ok(0)
}

async fn handle_mirror(store: &CatalogStore, version: &str, mirror_root: PathBuf) -> Result<i32> {
    let mut session = Session::open(store, version);
    if session.selection.is_empty() {
        tracing::warn!(
            path = %store.path(DocumentKind::Selection, version).display(),
            "selection document is empty, nothing to mirror"
        );
    }

    tracing::info!(
        version = session.normalized_version(),
        repositories = session.selection.len(),
        root = %mirror_root.display(),
        "mirroring selection"
    );
    let manager = MirrorManager::new(mirror_root, SystemGit);
    let report = session.mirror(&manager).await?;

    for path in &session.addons_paths {
        println!("{}", path.display());
    }

    if !report.skipped.is_empty() {
        tracing::info!(count = report.skipped.len(), "entries skipped without a clone URL");
    }

    if report.is_success() {
        Ok(0)
    } else {
        for failure in &report.failures {
            tracing::error!("{failure}");
        }
        Ok(1)
    }
}

fn handle_show(store: &CatalogStore, version: &str, json: bool) -> Result<i32> {
    let catalog = store.load_catalog(version);

    if json {
        println!("{}", serde_json::to_string_pretty(&catalog)?);
        return Ok(0);
    }

    if catalog.is_empty() {
        println!(
            "No catalog cached for version {} ({})",
            version,
            store.path(DocumentKind::Catalog, version).display()
        );
        return Ok(0);
    }

    println!("{:<20} {:<40} {:>8}", "ACCOUNT", "REPOSITORY", "MODULES");
    println!("{}", "=".repeat(70));

    let mut total = 0;
    for (account, repositories) in &catalog {
        for (name, repo) in &repositories.repositories {
            println!("{:<20} {:<40} {:>8}", account, name, repo.modules.len());
            total += repo.modules.len();
        }
    }

    println!();
    println!("Total: {} module(s)", total);
    Ok(0)
}
