// src/engine/mod.rs

//! Promotion engine
//!
//! Moves frozen package sets through the distributions of a repository:
//!
//! ```text
//! deploy ──> unstable ──test──> testing ──stage──> staging ──release──> stable
//! ```
//!
//! Every change to a distribution creates a new snapshot and re-points the
//! publication at it; snapshots themselves are never modified. `stage` and
//! `release` do not create snapshots at all: they publish the very snapshot
//! that was validated in the previous distribution, guarded by the release
//! id embedded in its name.
//!
//! The engine issues one blocking gateway call at a time and never retries.
//! An interrupted operation leaves whatever the last completed call
//! committed; re-running it is safe because snapshot names are unique and
//! release candidates are looked up by name before anything is created.

mod config;

pub use config::{Distributions, EngineConfig};

use crate::error::{LogicError, Result};
use crate::gateway::{
    LocalRepoInfo, Publication, PublishRequest, RepositoryGateway, ServerVersion, SourceKind,
};
use crate::package_ref::PackageRef;
use crate::prune::prune;
use crate::repo_name::RepoName;
use crate::snapshot::{self, SnapshotVerb};
use std::collections::{BTreeSet, HashSet};
use std::path::PathBuf;
use tracing::{debug, info};

/// Result of putting a release candidate into testing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestOutcome {
    /// Full package set of the candidate (stable plus new)
    pub packages: Vec<PackageRef>,
    /// Packages taken from unstable that were not already in stable
    pub new_packages: Vec<PackageRef>,
    /// Snapshot now published as testing; `None` for dry runs or empty sets
    pub snapshot: Option<String>,
}

/// Orchestrates create/deploy/undeploy/check/test/stage/release
pub struct PromotionEngine<G> {
    gateway: G,
    config: EngineConfig,
}

impl<G: RepositoryGateway> PromotionEngine<G> {
    pub fn new(gateway: G, config: EngineConfig) -> Self {
        Self { gateway, config }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn dists(&self) -> &Distributions {
        &self.config.distributions
    }

    /// The invoking user, checked before it is embedded in any name
    fn local_user(&self) -> Result<&str> {
        snapshot::validate_user(&self.config.local_user)?;
        Ok(&self.config.local_user)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    fn find_local_repo(&self, repo: &RepoName) -> Result<Option<LocalRepoInfo>> {
        let local = repo.local();
        Ok(self
            .gateway
            .list_local_repos()?
            .into_iter()
            .find(|r| r.name == local))
    }

    /// Whether the local repo behind `repo` exists on the server
    pub fn repo_exists(&self, repo: &RepoName) -> Result<bool> {
        Ok(self.find_local_repo(repo)?.is_some())
    }

    fn require_repo(&self, repo: &RepoName) -> Result<()> {
        if self.repo_exists(repo)? {
            Ok(())
        } else {
            Err(LogicError::RepoNotFound(repo.to_string()).into())
        }
    }

    /// The publication of `distribution` under `repo`, if any
    ///
    /// Fails with `RepoNotFound` when the repo itself does not exist.
    pub fn find_publication(&self, repo: &RepoName, distribution: &str) -> Result<Option<Publication>> {
        self.require_repo(repo)?;
        Ok(self
            .gateway
            .list_publications()?
            .into_iter()
            .find(|p| p.prefix == repo.public() && p.distribution == distribution))
    }

    /// Like [`find_publication`](Self::find_publication), but a missing
    /// distribution is an error
    pub fn publication(&self, repo: &RepoName, distribution: &str) -> Result<Publication> {
        self.find_publication(repo, distribution)?.ok_or_else(|| {
            LogicError::DistributionNotFound {
                repo: repo.to_string(),
                distribution: distribution.to_string(),
            }
            .into()
        })
    }

    /// The single snapshot backing a publication
    fn single_snapshot(&self, repo: &RepoName, publication: &Publication) -> Result<String> {
        let repo = repo.to_string();
        let distribution = publication.distribution.clone();

        if publication.source_kind != SourceKind::Snapshot {
            return Err(LogicError::NotPublishedFromSnapshot { repo, distribution }.into());
        }
        match publication.sources.as_slice() {
            [] => Err(LogicError::NoPublicationSource { repo, distribution }.into()),
            [source] => Ok(source.name.clone()),
            _ => Err(LogicError::AmbiguousPublication { repo, distribution }.into()),
        }
    }

    /// Name of the one snapshot `distribution` is published from
    pub fn snapshot_for_publication(&self, repo: &RepoName, distribution: &str) -> Result<String> {
        let publication = self.publication(repo, distribution)?;
        self.single_snapshot(repo, &publication)
    }

    /// All packages reachable from a publication's sources
    pub fn publication_packages(&self, publication: &Publication) -> Result<Vec<PackageRef>> {
        let mut packages = Vec::new();
        for source in &publication.sources {
            let mut found = match publication.source_kind {
                SourceKind::Snapshot => self.gateway.snapshot_packages(&source.name)?,
                SourceKind::Local => self.gateway.local_repo_packages(&source.name)?,
            };
            packages.append(&mut found);
        }
        Ok(packages)
    }

    /// Packages currently published in `distribution`
    pub fn pkg_list(&self, repo: &RepoName, distribution: &str) -> Result<Vec<PackageRef>> {
        debug!("Listing packages of {} {}", repo, distribution);
        let publication = self.publication(repo, distribution)?;
        self.publication_packages(&publication)
    }

    /// Packages of `distribution` matching a server-side package query
    pub fn query_packages(
        &self,
        repo: &RepoName,
        distribution: &str,
        query: &str,
    ) -> Result<Vec<PackageRef>> {
        debug!("Querying {} {} for '{}'", repo, distribution, query);
        let snapshot = self.snapshot_for_publication(repo, distribution)?;
        self.gateway.filter_snapshot_packages(&snapshot, query)
    }

    /// Published distributions of `repo`, sorted by name
    pub fn list_distributions(&self, repo: &RepoName) -> Result<Vec<Publication>> {
        self.require_repo(repo)?;
        self.publications_with_prefix(repo.public())
    }

    /// Published distributions of the invoking user's check repo for `repo`
    pub fn list_checks(&self, repo: &RepoName) -> Result<Vec<Publication>> {
        let check_repo = repo.check_repo(self.local_user()?)?;
        self.publications_with_prefix(check_repo.public())
    }

    fn publications_with_prefix(&self, prefix: &str) -> Result<Vec<Publication>> {
        let mut publications: Vec<Publication> = self
            .gateway
            .list_publications()?
            .into_iter()
            .filter(|p| p.prefix == prefix)
            .collect();
        publications.sort_by(|a, b| a.distribution.cmp(&b.distribution));
        Ok(publications)
    }

    /// Distinct prefixes of all publications on the server
    pub fn published_repos(&self) -> Result<Vec<String>> {
        let prefixes: BTreeSet<String> = self
            .gateway
            .list_publications()?
            .into_iter()
            .map(|p| p.prefix)
            .collect();
        Ok(prefixes.into_iter().collect())
    }

    pub fn server_version(&self) -> Result<ServerVersion> {
        self.gateway.server_version()
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Create a repository with an empty `unstable` distribution
    ///
    /// Returns the name of the initial (empty) snapshot.
    pub fn create(&self, repo: &RepoName) -> Result<String> {
        let unstable = self.dists().unstable.clone();
        self.create_with_distribution(repo, &unstable)
    }

    fn create_with_distribution(&self, repo: &RepoName, distribution: &str) -> Result<String> {
        if self.repo_exists(repo)? {
            return Err(LogicError::RepoAlreadyExists(repo.to_string()).into());
        }

        let local = repo.local();
        let snapshot_name = snapshot::new_name(
            &local,
            SnapshotVerb::Create,
            snapshot::timestamp(),
            self.local_user()?,
        );

        info!("Creating repo {} ({})", repo, local);
        self.gateway.create_local_repo(&local)?;
        self.gateway.create_snapshot_from_refs(&snapshot_name, &[], &[])?;
        self.gateway.publish(&self.publish_request(&local, distribution, &snapshot_name))?;
        Ok(snapshot_name)
    }

    /// Upload package files into the repo and re-publish `distribution`
    ///
    /// With no files, the current contents of the local repo are simply
    /// snapshotted and re-published. Returns the new snapshot name.
    pub fn deploy(&self, repo: &RepoName, files: &[PathBuf], distribution: &str) -> Result<String> {
        self.require_repo(repo)?;
        self.local_user()?;
        if !files.is_empty() {
            self.upload_packages(repo, files)?;
        }
        self.republish(repo, distribution, SnapshotVerb::Deploy)
    }

    /// Snapshot the whole local repo and point `distribution` at it
    pub fn republish(&self, repo: &RepoName, distribution: &str, verb: SnapshotVerb) -> Result<String> {
        let local = repo.local();
        let snapshot_name = snapshot::new_name(
            &local,
            verb,
            snapshot::timestamp(),
            self.local_user()?,
        );

        self.gateway.create_snapshot_from_repo(&local, &snapshot_name)?;
        if self.find_publication(repo, distribution)?.is_some() {
            self.gateway.drop_publication(&local, distribution)?;
        }
        self.gateway
            .publish(&self.publish_request(&local, distribution, &snapshot_name))?;

        info!("{} {} now published from {}", repo, distribution, snapshot_name);
        Ok(snapshot_name)
    }

    /// Remove the packages matching `query` from the repo
    ///
    /// The query is resolved against the snapshot currently published as
    /// `distribution`. A dry run, or a query matching nothing, changes
    /// nothing on the server. Returns the matched packages.
    pub fn undeploy(
        &self,
        repo: &RepoName,
        query: &str,
        distribution: &str,
        dry_run: bool,
    ) -> Result<Vec<PackageRef>> {
        self.local_user()?;
        let refs = self.query_packages(repo, distribution, query)?;
        if dry_run || refs.is_empty() {
            debug!("Undeploy of '{}' leaves {} untouched", query, repo);
            return Ok(refs);
        }

        self.gateway.delete_package_refs(&repo.local(), &refs)?;
        self.republish(repo, distribution, SnapshotVerb::Undeploy)?;
        Ok(refs)
    }

    /// Put a release candidate into `testing`
    ///
    /// If a candidate snapshot for `release_id` already exists, it is
    /// re-published as testing unchanged; supplying a package query in that
    /// case is rejected, since a release cannot be altered once created.
    ///
    /// Otherwise the candidate is stable plus the packages of unstable that
    /// match `query` and are not already in stable, pruned to the latest
    /// version of each package unless `no_prune` is set.
    pub fn test(
        &self,
        repo: &RepoName,
        query: Option<&str>,
        release_id: &str,
        dry_run: bool,
        no_prune: bool,
    ) -> Result<TestOutcome> {
        snapshot::validate_release_id(release_id)?;
        let user = self.local_user()?;
        self.require_repo(repo)?;
        let local = repo.local();
        let testing = self.dists().testing.clone();

        let snapshots = self.gateway.list_snapshots()?;
        if let Some(existing) = snapshot::find_release_candidates(&snapshots, &local, release_id).first() {
            if query.is_some() {
                return Err(LogicError::ReleaseImmutable(release_id.to_string()).into());
            }
            let name = existing.name.clone();
            info!("Release {} already exists as {}", release_id, name);
            let packages = self.gateway.snapshot_packages(&name)?;
            if dry_run {
                return Ok(TestOutcome {
                    packages,
                    new_packages: Vec::new(),
                    snapshot: None,
                });
            }
            self.publish_or_republish(repo, &testing, &name)?;
            return Ok(TestOutcome {
                packages,
                new_packages: Vec::new(),
                snapshot: Some(name),
            });
        }

        let unstable_snapshot = self.snapshot_for_publication(repo, &self.dists().unstable)?;

        let stable_packages = match self.find_publication(repo, &self.dists().stable)? {
            Some(publication) => self.publication_packages(&publication)?,
            None => Vec::new(),
        };

        let new_packages: Vec<PackageRef> = match query {
            Some(query) => {
                let in_stable: HashSet<&PackageRef> = stable_packages.iter().collect();
                self.gateway
                    .filter_snapshot_packages(&unstable_snapshot, query)?
                    .into_iter()
                    .filter(|p| !in_stable.contains(p))
                    .collect()
            }
            None => Vec::new(),
        };

        let mut union: Vec<PackageRef> = stable_packages;
        union.extend(new_packages.iter().cloned());
        if !no_prune {
            union = prune(&union);
        }

        if dry_run || union.is_empty() {
            return Ok(TestOutcome {
                packages: union,
                new_packages,
                snapshot: None,
            });
        }

        let temp_snapshot = snapshot::temp_new_packages_name(&local);
        self.gateway.drop_snapshot(&temp_snapshot)?;
        self.gateway
            .create_snapshot_from_refs(&temp_snapshot, &[unstable_snapshot], &new_packages)?;

        let candidate = snapshot::release_candidate_name(
            &local,
            release_id,
            snapshot::timestamp(),
            user,
        );
        self.gateway
            .create_snapshot_from_refs(&candidate, &[temp_snapshot], &union)?;
        self.publish_or_republish(repo, &testing, &candidate)?;

        info!("Release candidate {} published as {}", candidate, testing);
        Ok(TestOutcome {
            packages: union,
            new_packages,
            snapshot: Some(candidate),
        })
    }

    /// Promote `release_id` from testing to staging
    pub fn stage(&self, repo: &RepoName, release_id: &str) -> Result<String> {
        let dists = self.dists();
        self.promote(repo, &dists.testing, &dists.staging, release_id)
    }

    /// Promote `release_id` from staging to stable
    pub fn release(&self, repo: &RepoName, release_id: &str) -> Result<String> {
        let dists = self.dists();
        self.promote(repo, &dists.staging, &dists.stable, release_id)
    }

    /// Publish the snapshot behind `source` as `dest`
    ///
    /// The source must be published from a release candidate of this repo
    /// for `release_id`. No snapshot is created: `dest` ends up pointing at the
    /// identical set that was validated in `source`. Returns its name.
    pub fn promote(&self, repo: &RepoName, source: &str, dest: &str, release_id: &str) -> Result<String> {
        snapshot::validate_release_id(release_id)?;
        info!("Promoting release {} from {} to {}", release_id, source, dest);
        let not_promotable = || LogicError::NotPromotable {
            release_id: release_id.to_string(),
            source_dist: source.to_string(),
        };

        let publication = self
            .find_publication(repo, source)?
            .ok_or_else(not_promotable)?;
        let snapshot_name = self.single_snapshot(repo, &publication)?;
        if !snapshot::is_release_candidate(&snapshot_name, &repo.local(), release_id) {
            return Err(not_promotable().into());
        }

        self.publish_or_republish(repo, dest, &snapshot_name)?;
        Ok(snapshot_name)
    }

    /// Validate package files against stable in the user's private check repo
    ///
    /// The check repo `<repo>.@<user>@` is created on first use. Its `check`
    /// distribution is re-published as stable plus the uploaded packages,
    /// pruned unless `no_prune` is set. Returns the check repo name.
    pub fn check(&self, repo: &RepoName, files: &[PathBuf], no_prune: bool) -> Result<RepoName> {
        let check_dist = self.dists().check.clone();
        let stable_snapshot = self.snapshot_for_publication(repo, &self.dists().stable)?;
        let stable_packages = self.gateway.snapshot_packages(&stable_snapshot)?;

        let check_repo = repo.check_repo(self.local_user()?)?;
        if !self.repo_exists(&check_repo)? {
            self.create_with_distribution(&check_repo, &check_dist)?;
        }
        let check_local = check_repo.local();

        let mut sources = vec![stable_snapshot];
        let mut check_packages = Vec::new();
        if !files.is_empty() {
            self.upload_packages(&check_repo, files)?;
            let temp_snapshot = snapshot::temp_new_packages_name(&check_local);
            self.gateway.drop_snapshot(&temp_snapshot)?;
            self.gateway
                .create_snapshot_from_repo(&check_local, &temp_snapshot)?;
            check_packages = self.gateway.snapshot_packages(&temp_snapshot)?;
            sources.push(temp_snapshot);
        }

        let mut union = stable_packages;
        union.append(&mut check_packages);
        if !no_prune {
            union = prune(&union);
        }

        let target = snapshot::new_name(
            &check_local,
            SnapshotVerb::Check,
            snapshot::timestamp(),
            self.local_user()?,
        );
        self.gateway.create_snapshot_from_refs(&target, &sources, &union)?;
        self.publish_or_republish(&check_repo, &check_dist, &target)?;
        Ok(check_repo)
    }

    /// Tear down the user's check publication and check repo
    pub fn check_clean(&self, repo: &RepoName) -> Result<()> {
        let check_dist = &self.dists().check;
        let check_repo = repo.check_repo(self.local_user()?)?;
        let check_local = check_repo.local();

        if self.find_publication(&check_repo, check_dist)?.is_some() {
            self.gateway.drop_publication(&check_local, check_dist)?;
        }
        self.gateway.delete_local_repo(&check_local)?;
        info!("Removed check repo {}", check_repo);
        Ok(())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn publish_request<'a>(
        &'a self,
        local: &'a str,
        distribution: &'a str,
        snapshot: &'a str,
    ) -> PublishRequest<'a> {
        PublishRequest {
            local_repo: local,
            distribution,
            snapshot,
            architectures: &self.config.architectures,
            gpg_key: self.config.gpg_key.as_deref(),
        }
    }

    fn publish_or_republish(&self, repo: &RepoName, distribution: &str, snapshot: &str) -> Result<()> {
        let local = repo.local();
        if self.find_publication(repo, distribution)?.is_some() {
            self.gateway.republish(&local, distribution, snapshot)
        } else {
            self.gateway
                .publish(&self.publish_request(&local, distribution, snapshot))
        }
    }

    fn upload_packages(&self, repo: &RepoName, files: &[PathBuf]) -> Result<()> {
        let local = repo.local();
        let paths = self.gateway.upload_files(self.config.upload_dir(), files)?;
        for path in &paths {
            debug!("Adding {} to {}", path, local);
            self.gateway.add_uploaded_file(&local, path)?;
        }
        Ok(())
    }
}
