// src/main.rs

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands, GlobalArgs};
use raptly::config::{self, Overrides, Settings};
use raptly::engine::{EngineConfig, PromotionEngine};
use raptly::gateway::AptlyClient;
use std::process::ExitCode;
use tracing::debug;

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_settings(global: &GlobalArgs) -> Result<Settings> {
    let path = match &global.config {
        Some(path) => path.clone(),
        None => config::default_config_path()
            .ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?,
    };
    debug!("Reading config from {}", path.display());
    let file = config::load_config(&path)?;

    let overrides = Overrides {
        url: global.url.clone(),
        cert: global.cert.clone(),
        key: global.key.clone(),
        user: global.user.clone(),
        local_user: global.local_user.clone(),
        skip_ssl: global.skip_ssl,
    };
    let env_user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .ok();
    Ok(config::resolve(&file, &overrides, env_user)?)
}

fn run(cli: Cli, settings: &Settings) -> Result<()> {
    let gpg_key = match &cli.command {
        Commands::Deploy {
            gpg_key: Some(key), ..
        } => Some(key.clone()),
        _ => settings.gpg_key.clone(),
    };
    let client = AptlyClient::new(&settings.client)?;
    let engine = PromotionEngine::new(
        client,
        EngineConfig::new(settings.local_user.clone()).with_gpg_key(gpg_key),
    );

    match cli.command {
        Commands::Create { repo } => commands::cmd_create(&engine, &repo),
        Commands::Deploy {
            repo, files, dist, ..
        } => commands::cmd_deploy(&engine, &repo, &files, &dist),
        Commands::Undeploy {
            repo,
            query,
            dry_run,
        } => commands::cmd_undeploy(&engine, &repo, &query, dry_run),
        Commands::Check {
            repo,
            files,
            no_prune,
            clean,
        } => commands::cmd_check(&engine, &repo, &files, no_prune, clean),
        Commands::Test {
            repo,
            release_id,
            query,
            dry_run,
            no_prune,
        } => commands::cmd_test(
            &engine,
            &repo,
            &release_id,
            query.as_deref(),
            dry_run,
            no_prune,
        ),
        Commands::Stage { repo, release_id } => commands::cmd_stage(&engine, &repo, &release_id),
        Commands::Release { repo, release_id } => {
            commands::cmd_release(&engine, &repo, &release_id)
        }
        Commands::Show {
            repo,
            dist,
            json,
            prune,
            with_checks,
        } => commands::cmd_show(
            &engine,
            repo.as_deref(),
            dist.as_deref(),
            json,
            prune,
            with_checks,
        ),
        Commands::Version { json } => commands::cmd_version(&engine, json),
    }
}

/// Render an error the way the user should see it
fn report(err: &anyhow::Error, url: &str) -> String {
    let Some(err) = err.downcast_ref::<raptly::Error>() else {
        return format!("Error: {:#}", err);
    };
    match err {
        raptly::Error::RemoteApi {
            status,
            message,
            detail,
        } => {
            let prefix = match status {
                401 => "Unauthorized! ",
                404 => "Not Found! ",
                _ => "",
            };
            match detail {
                Some(detail) => format!("{prefix}{message}\n{detail}"),
                None => format!("{prefix}{message}"),
            }
        }
        raptly::Error::Transport(msg) => format!("Connection failed: {url}\n{msg}"),
        other => format!("Error: {other}"),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);

    let settings = match load_settings(&cli.global) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{}", report(&e, ""));
            return ExitCode::FAILURE;
        }
    };
    let url = settings.client.url.clone();

    match run(cli, &settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", report(&e, &url));
            ExitCode::FAILURE
        }
    }
}
