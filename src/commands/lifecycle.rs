// src/commands/lifecycle.rs
//! Commands that move packages through the distributions

use super::print_packages;
use anyhow::Result;
use raptly::engine::PromotionEngine;
use raptly::gateway::RepositoryGateway;
use raptly::repo_name::RepoName;
use std::path::PathBuf;
use tracing::info;

/// Create a repository
pub fn cmd_create<G: RepositoryGateway>(engine: &PromotionEngine<G>, repo: &str) -> Result<()> {
    let repo: RepoName = repo.parse()?;
    info!("Creating repository: {}", repo);
    let snapshot = engine.create(&repo)?;
    println!("Created repo {}", repo);
    println!(
        "  {} published from {}",
        engine.config().distributions.unstable,
        snapshot
    );
    Ok(())
}

/// Upload package files and re-publish a distribution
pub fn cmd_deploy<G: RepositoryGateway>(
    engine: &PromotionEngine<G>,
    repo: &str,
    files: &[PathBuf],
    dist: &str,
) -> Result<()> {
    let repo: RepoName = repo.parse()?;
    for file in files {
        if !file.is_file() {
            anyhow::bail!("Package file not found: {}", file.display());
        }
    }

    info!("Deploying {} file(s) to {} {}", files.len(), repo, dist);
    let snapshot = engine.deploy(&repo, files, dist)?;

    for file in files {
        println!("Deployed {}", file.display());
    }
    println!("{} {} published from {}", repo, dist, snapshot);
    Ok(())
}

/// Remove packages matching a query from unstable
pub fn cmd_undeploy<G: RepositoryGateway>(
    engine: &PromotionEngine<G>,
    repo: &str,
    query: &str,
    dry_run: bool,
) -> Result<()> {
    let repo: RepoName = repo.parse()?;
    let unstable = engine.config().distributions.unstable.clone();
    let removed = engine.undeploy(&repo, query, &unstable, dry_run)?;

    if removed.is_empty() {
        println!("No packages match '{}'", query);
        return Ok(());
    }

    if dry_run {
        println!("Would remove from {} {}:", repo, unstable);
    } else {
        println!("Removed from {} {}:", repo, unstable);
    }
    print_packages(&removed);
    Ok(())
}

/// Build a release candidate and publish it as testing
pub fn cmd_test<G: RepositoryGateway>(
    engine: &PromotionEngine<G>,
    repo: &str,
    release_id: &str,
    query: Option<&str>,
    dry_run: bool,
    no_prune: bool,
) -> Result<()> {
    let repo: RepoName = repo.parse()?;
    let testing = engine.config().distributions.testing.clone();
    let outcome = engine.test(&repo, query, release_id, dry_run, no_prune)?;

    if !outcome.new_packages.is_empty() {
        println!("New packages:");
        print_packages(&outcome.new_packages);
    }

    if outcome.packages.is_empty() {
        println!("Nothing to publish for release {}", release_id);
        return Ok(());
    }

    match &outcome.snapshot {
        Some(snapshot) => println!(
            "Release {} published as {} {} from {}:",
            release_id, repo, testing, snapshot
        ),
        None => println!("Release {} would contain:", release_id),
    }
    print_packages(&outcome.packages);
    Ok(())
}

/// Promote a release candidate from testing to staging
pub fn cmd_stage<G: RepositoryGateway>(
    engine: &PromotionEngine<G>,
    repo: &str,
    release_id: &str,
) -> Result<()> {
    let repo: RepoName = repo.parse()?;
    let snapshot = engine.stage(&repo, release_id)?;
    println!(
        "Release {} published as {} {} from {}",
        release_id,
        repo,
        engine.config().distributions.staging,
        snapshot
    );
    Ok(())
}

/// Promote a release candidate from staging to stable
pub fn cmd_release<G: RepositoryGateway>(
    engine: &PromotionEngine<G>,
    repo: &str,
    release_id: &str,
) -> Result<()> {
    let repo: RepoName = repo.parse()?;
    let snapshot = engine.release(&repo, release_id)?;
    println!(
        "Release {} published as {} {} from {}",
        release_id,
        repo,
        engine.config().distributions.stable,
        snapshot
    );
    Ok(())
}
