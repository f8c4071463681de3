// src/commands/check.rs
//! Check packages against stable in a private check repo

use super::print_packages;
use anyhow::Result;
use raptly::engine::PromotionEngine;
use raptly::gateway::RepositoryGateway;
use raptly::repo_name::RepoName;
use std::path::PathBuf;
use tracing::info;

/// Publish stable plus `files` as the invoking user's check distribution,
/// or remove the check repo with `clean`
pub fn cmd_check<G: RepositoryGateway>(
    engine: &PromotionEngine<G>,
    repo: &str,
    files: &[PathBuf],
    no_prune: bool,
    clean: bool,
) -> Result<()> {
    let repo: RepoName = repo.parse()?;

    if clean {
        engine.check_clean(&repo)?;
        println!("Removed check repo for {}", repo);
        return Ok(());
    }

    for file in files {
        if !file.is_file() {
            anyhow::bail!("Package file not found: {}", file.display());
        }
    }

    info!("Checking {} file(s) against {} stable", files.len(), repo);
    let check_repo = engine.check(&repo, files, no_prune)?;
    let check_dist = &engine.config().distributions.check;

    println!("Published {} {}:", check_repo, check_dist);
    print_packages(&engine.pkg_list(&check_repo, check_dist)?);
    Ok(())
}
