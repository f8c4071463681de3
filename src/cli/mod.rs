// src/cli/mod.rs
//! CLI definitions for raptly
//!
//! Lifecycle commands, in promotion order:
//! - `create` - Create a repository with an empty unstable distribution
//! - `deploy` / `undeploy` - Add or remove packages in unstable
//! - `test` - Build a release candidate and publish it as testing
//! - `stage` - Promote a release candidate from testing to staging
//! - `release` - Promote a release candidate from staging to stable
//!
//! Inspection:
//! - `check` - Validate packages against stable in a private check repo
//! - `show` - List repositories, distributions or packages
//! - `version` - Client and server versions
//!
//! The actual command implementations are in the `commands` module.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "raptly")]
#[command(version)]
#[command(about = "Promote Debian package sets through an Aptly server", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Connection and identity options shared by every command
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Aptly API URL
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Config file (default: ~/.raptly/config)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Don't verify the server's TLS certificate
    #[arg(short = 'k', long, global = true)]
    pub skip_ssl: bool,

    /// Client private key (PEM)
    #[arg(long, global = true, value_name = "PATH")]
    pub key: Option<String>,

    /// Client certificate (PEM)
    #[arg(long, global = true, value_name = "PATH")]
    pub cert: Option<String>,

    /// Basic auth credentials
    #[arg(short, long, global = true, value_name = "USER:PASSWORD")]
    pub user: Option<String>,

    /// Name used to tag snapshots and check repos (default: login name)
    #[arg(long, global = true, value_name = "NAME")]
    pub local_user: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a repository and publish an empty unstable distribution
    Create {
        /// Repository name, e.g. team/project
        repo: String,
    },

    /// Upload packages and re-publish a distribution
    Deploy {
        /// Repository name
        repo: String,

        /// Package files to upload
        files: Vec<PathBuf>,

        /// GPG key to sign the publication with
        #[arg(short, long)]
        gpg_key: Option<String>,

        /// Distribution to re-publish
        #[arg(short, long = "distribution", visible_alias = "dist", default_value = "unstable")]
        dist: String,
    },

    /// Remove packages matching a query from unstable
    Undeploy {
        /// Repository name
        repo: String,

        /// Package query, e.g. 'Name (= foo)'
        query: String,

        /// Only list what would be removed
        #[arg(short, long)]
        dry_run: bool,
    },

    /// Validate packages against stable in a private check repo
    Check {
        /// Repository name
        repo: String,

        /// Package files to check
        files: Vec<PathBuf>,

        /// Keep every version instead of only the latest
        #[arg(short, long)]
        no_prune: bool,

        /// Remove the check repo instead
        #[arg(short, long)]
        clean: bool,
    },

    /// Build a release candidate and publish it as testing
    Test {
        /// Repository name
        repo: String,

        /// Release identifier, e.g. a ticket number
        release_id: String,

        /// Query selecting the unstable packages to include
        #[arg(short = 'p', long = "packages", value_name = "QUERY")]
        query: Option<String>,

        /// Only list what would be published
        #[arg(short, long)]
        dry_run: bool,

        /// Keep every version instead of only the latest
        #[arg(short, long)]
        no_prune: bool,
    },

    /// Promote a release candidate from testing to staging
    Stage {
        /// Repository name
        repo: String,

        /// Release identifier
        release_id: String,
    },

    /// Promote a release candidate from staging to stable
    Release {
        /// Repository name
        repo: String,

        /// Release identifier
        release_id: String,
    },

    /// List repositories, distributions or packages
    Show {
        /// Repository name (lists all published repositories if omitted)
        repo: Option<String>,

        /// Distribution (lists distributions if omitted)
        dist: Option<String>,

        /// Print raw records as JSON
        #[arg(short, long)]
        json: bool,

        /// Only show the latest version of each package
        #[arg(short, long)]
        prune: bool,

        /// Include the invoking user's check distributions
        #[arg(short, long)]
        with_checks: bool,
    },

    /// Show client and server versions
    Version {
        /// Print as JSON
        #[arg(short, long)]
        json: bool,
    },
}
