// src/commands/show.rs
//! Read-only inspection commands

use super::print_packages;
use anyhow::Result;
use raptly::engine::PromotionEngine;
use raptly::gateway::{Publication, RepositoryGateway};
use raptly::package_ref::PackageRef;
use raptly::prune::{prune, sort_by_name_then_version};
use raptly::repo_name::RepoName;
use serde::Serialize;

/// List published repositories, the distributions of one repository, or the
/// packages of one distribution
pub fn cmd_show<G: RepositoryGateway>(
    engine: &PromotionEngine<G>,
    repo: Option<&str>,
    dist: Option<&str>,
    json: bool,
    prune_versions: bool,
    with_checks: bool,
) -> Result<()> {
    let Some(repo) = repo else {
        let repos = engine.published_repos()?;
        if json {
            println!("{}", serde_json::to_string_pretty(&repos)?);
        } else if repos.is_empty() {
            println!("No published repositories");
        } else {
            for repo in repos {
                println!("{}", repo);
            }
        }
        return Ok(());
    };
    let repo: RepoName = repo.parse()?;

    let Some(dist) = dist else {
        let mut publications = engine.list_distributions(&repo)?;
        if with_checks {
            publications.extend(engine.list_checks(&repo)?);
        }
        if json {
            println!("{}", serde_json::to_string_pretty(&publications)?);
        } else {
            print_publications(&publications);
        }
        return Ok(());
    };

    let mut packages = engine.pkg_list(&repo, dist)?;
    if prune_versions {
        packages = prune(&packages);
    }
    if json {
        let refs: Vec<String> = sort_by_name_then_version(&packages)
            .iter()
            .map(PackageRef::encode)
            .collect();
        println!("{}", serde_json::to_string_pretty(&refs)?);
    } else {
        println!("{} {}:", repo, dist);
        print_packages(&packages);
    }
    Ok(())
}

fn print_publications(publications: &[Publication]) {
    for publication in publications {
        let sources: Vec<&str> = publication.sources.iter().map(|s| s.name.as_str()).collect();
        println!(
            "{} {}: {}",
            publication.prefix,
            publication.distribution,
            sources.join(", ")
        );
    }
}

#[derive(Serialize)]
struct VersionReport {
    client: String,
    server: Option<String>,
}

/// Print client and server versions
///
/// An unreachable server is reported, not treated as a failure.
pub fn cmd_version<G: RepositoryGateway>(engine: &PromotionEngine<G>, json: bool) -> Result<()> {
    let server = match engine.server_version() {
        Ok(version) => Some(version.version),
        Err(e) => {
            tracing::debug!("Server version unavailable: {}", e);
            None
        }
    };
    let report = VersionReport {
        client: env!("CARGO_PKG_VERSION").to_string(),
        server,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Client version: {}", report.client);
        println!(
            "Server version: {}",
            report.server.as_deref().unwrap_or("(no connection)")
        );
    }
    Ok(())
}
