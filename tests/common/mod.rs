// tests/common/mod.rs

//! Shared test utilities: an in-memory repository server and fixtures.

#![allow(dead_code)]

use raptly::engine::{EngineConfig, PromotionEngine};
use raptly::gateway::{
    LocalRepoInfo, Publication, PublishRequest, RepositoryGateway, ServerVersion, SnapshotInfo,
    SourceKind, SourceRef,
};
use raptly::repo_name::to_public;
use raptly::{Error, PackageRef, Result};
use std::cell::{Ref, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::hash::{DefaultHasher, Hash, Hasher};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Everything the fake server holds
#[derive(Debug, Default)]
pub struct ServerState {
    pub local_repos: BTreeMap<String, Vec<PackageRef>>,
    /// In creation order
    pub snapshots: Vec<(String, Vec<PackageRef>)>,
    pub publications: Vec<Publication>,
    pub uploads: HashMap<String, PackageRef>,
    /// Every mutating call, in order
    pub mutations: Vec<String>,
}

impl ServerState {
    pub fn snapshot(&self, name: &str) -> Option<&Vec<PackageRef>> {
        self.snapshots
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, refs)| refs)
    }

    /// Snapshot name a distribution is published from
    pub fn published_snapshot(&self, public: &str, dist: &str) -> Option<String> {
        self.publications
            .iter()
            .find(|p| p.prefix == public && p.distribution == dist)
            .and_then(|p| p.sources.first())
            .map(|s| s.name.clone())
    }
}

/// In-memory stand-in for an Aptly server
#[derive(Debug, Default)]
pub struct MemoryGateway {
    state: RefCell<ServerState>,
}

fn not_found(what: &str) -> Error {
    Error::remote(404, format!("[HTTP 404] - {what}"), "")
}

fn conflict(what: &str) -> Error {
    Error::remote(400, format!("[HTTP 400] - {what}"), "")
}

fn matches_query(package: &PackageRef, query: &str) -> bool {
    query
        .split('|')
        .map(str::trim)
        .any(|q| q == package.name || q == package.key())
}

fn content_hash(name: &str, version: &str, arch: &str) -> String {
    let mut hasher = DefaultHasher::new();
    (name, version, arch).hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> Ref<'_, ServerState> {
        self.state.borrow()
    }

    pub fn mutation_count(&self) -> usize {
        self.state.borrow().mutations.len()
    }

    pub fn snapshot_count(&self) -> usize {
        self.state.borrow().snapshots.len()
    }

    /// Put a publication in place directly, bypassing the engine
    pub fn seed_publication(&self, local: &str, dist: &str, snapshot: &str, refs: Vec<PackageRef>) {
        let mut state = self.state.borrow_mut();
        state.local_repos.entry(local.to_string()).or_default();
        state.snapshots.push((snapshot.to_string(), refs));
        state.publications.push(Publication {
            prefix: to_public(local),
            distribution: dist.to_string(),
            source_kind: SourceKind::Snapshot,
            sources: vec![SourceRef {
                component: "main".to_string(),
                name: snapshot.to_string(),
            }],
            architectures: vec!["amd64".to_string(), "all".to_string()],
        });
    }

    /// Put a publication with arbitrary sources in place, bypassing the engine
    ///
    /// Lets tests build publications the engine never creates itself: ones
    /// backed by the local repo, by several snapshots, or by nothing.
    pub fn seed_raw_publication(&self, local: &str, dist: &str, kind: SourceKind, sources: &[&str]) {
        let mut state = self.state.borrow_mut();
        state.local_repos.entry(local.to_string()).or_default();
        state.publications.push(Publication {
            prefix: to_public(local),
            distribution: dist.to_string(),
            source_kind: kind,
            sources: sources
                .iter()
                .map(|name| SourceRef {
                    component: "main".to_string(),
                    name: name.to_string(),
                })
                .collect(),
            architectures: vec!["amd64".to_string(), "all".to_string()],
        });
    }

    pub fn seed_snapshot(&self, name: &str, refs: Vec<PackageRef>) {
        self.state
            .borrow_mut()
            .snapshots
            .push((name.to_string(), refs));
    }

    fn record(&self, mutation: String) {
        self.state.borrow_mut().mutations.push(mutation);
    }
}

impl RepositoryGateway for MemoryGateway {
    fn create_local_repo(&self, local_repo: &str) -> Result<()> {
        if self.state.borrow().local_repos.contains_key(local_repo) {
            return Err(conflict(&format!("local repo {local_repo} already exists")));
        }
        self.state
            .borrow_mut()
            .local_repos
            .insert(local_repo.to_string(), Vec::new());
        self.record(format!("create_local_repo {local_repo}"));
        Ok(())
    }

    fn delete_local_repo(&self, local_repo: &str) -> Result<()> {
        if self.state.borrow_mut().local_repos.remove(local_repo).is_none() {
            return Err(not_found(&format!("local repo {local_repo}")));
        }
        self.record(format!("delete_local_repo {local_repo}"));
        Ok(())
    }

    fn list_local_repos(&self) -> Result<Vec<LocalRepoInfo>> {
        Ok(self
            .state
            .borrow()
            .local_repos
            .keys()
            .map(|name| LocalRepoInfo {
                name: name.clone(),
                comment: String::new(),
            })
            .collect())
    }

    fn create_snapshot_from_repo(&self, local_repo: &str, snapshot: &str) -> Result<()> {
        let refs = self
            .state
            .borrow()
            .local_repos
            .get(local_repo)
            .cloned()
            .ok_or_else(|| not_found(&format!("local repo {local_repo}")))?;
        if self.state.borrow().snapshot(snapshot).is_some() {
            return Err(conflict(&format!("snapshot {snapshot} already exists")));
        }
        self.state
            .borrow_mut()
            .snapshots
            .push((snapshot.to_string(), refs));
        self.record(format!("create_snapshot {snapshot}"));
        Ok(())
    }

    fn create_snapshot_from_refs(
        &self,
        snapshot: &str,
        source_snapshots: &[String],
        refs: &[PackageRef],
    ) -> Result<()> {
        {
            let state = self.state.borrow();
            if state.snapshot(snapshot).is_some() {
                return Err(conflict(&format!("snapshot {snapshot} already exists")));
            }
            if let Some(missing) = source_snapshots.iter().find(|s| state.snapshot(s).is_none()) {
                return Err(not_found(&format!("source snapshot {missing}")));
            }
        }
        self.state
            .borrow_mut()
            .snapshots
            .push((snapshot.to_string(), refs.to_vec()));
        self.record(format!("create_snapshot {snapshot}"));
        Ok(())
    }

    fn drop_snapshot(&self, snapshot: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let before = state.snapshots.len();
        state.snapshots.retain(|(name, _)| name != snapshot);
        if state.snapshots.len() != before {
            state.mutations.push(format!("drop_snapshot {snapshot}"));
        }
        Ok(())
    }

    fn list_snapshots(&self) -> Result<Vec<SnapshotInfo>> {
        Ok(self
            .state
            .borrow()
            .snapshots
            .iter()
            .map(|(name, _)| SnapshotInfo {
                name: name.clone(),
                description: name.clone(),
            })
            .collect())
    }

    fn snapshot_packages(&self, snapshot: &str) -> Result<Vec<PackageRef>> {
        self.state
            .borrow()
            .snapshot(snapshot)
            .cloned()
            .ok_or_else(|| not_found(&format!("snapshot {snapshot}")))
    }

    fn local_repo_packages(&self, local_repo: &str) -> Result<Vec<PackageRef>> {
        self.state
            .borrow()
            .local_repos
            .get(local_repo)
            .cloned()
            .ok_or_else(|| not_found(&format!("local repo {local_repo}")))
    }

    fn filter_snapshot_packages(&self, snapshot: &str, query: &str) -> Result<Vec<PackageRef>> {
        Ok(self
            .snapshot_packages(snapshot)?
            .into_iter()
            .filter(|p| matches_query(p, query))
            .collect())
    }

    fn list_publications(&self) -> Result<Vec<Publication>> {
        Ok(self.state.borrow().publications.clone())
    }

    fn publish(&self, request: &PublishRequest<'_>) -> Result<()> {
        let prefix = to_public(request.local_repo);
        {
            let state = self.state.borrow();
            if state
                .publications
                .iter()
                .any(|p| p.prefix == prefix && p.distribution == request.distribution)
            {
                return Err(conflict(&format!(
                    "{prefix} {} already published",
                    request.distribution
                )));
            }
            if state.snapshot(request.snapshot).is_none() {
                return Err(not_found(&format!("snapshot {}", request.snapshot)));
            }
        }
        self.state.borrow_mut().publications.push(Publication {
            prefix,
            distribution: request.distribution.to_string(),
            source_kind: SourceKind::Snapshot,
            sources: vec![SourceRef {
                component: "main".to_string(),
                name: request.snapshot.to_string(),
            }],
            architectures: request.architectures.to_vec(),
        });
        self.record(format!(
            "publish {} {} {}",
            request.local_repo, request.distribution, request.snapshot
        ));
        Ok(())
    }

    fn republish(&self, local_repo: &str, distribution: &str, snapshot: &str) -> Result<()> {
        let prefix = to_public(local_repo);
        {
            let mut state = self.state.borrow_mut();
            let publication = state
                .publications
                .iter_mut()
                .find(|p| p.prefix == prefix && p.distribution == distribution)
                .ok_or_else(|| not_found(&format!("publication {prefix} {distribution}")))?;
            publication.sources = vec![SourceRef {
                component: "main".to_string(),
                name: snapshot.to_string(),
            }];
        }
        self.record(format!("republish {local_repo} {distribution} {snapshot}"));
        Ok(())
    }

    fn drop_publication(&self, local_repo: &str, distribution: &str) -> Result<()> {
        let prefix = to_public(local_repo);
        {
            let mut state = self.state.borrow_mut();
            let before = state.publications.len();
            state
                .publications
                .retain(|p| !(p.prefix == prefix && p.distribution == distribution));
            if state.publications.len() == before {
                return Err(not_found(&format!("publication {prefix} {distribution}")));
            }
        }
        self.record(format!("drop_publication {local_repo} {distribution}"));
        Ok(())
    }

    /// Accepts files named `name_version_arch.deb`
    fn upload_files(&self, upload_dir: &str, files: &[PathBuf]) -> Result<Vec<String>> {
        let mut paths = Vec::new();
        for file in files {
            if !file.is_file() {
                return Err(Error::Io(format!("Failed to read {}", file.display())));
            }
            let file_name = file
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let stem = file_name.trim_end_matches(".deb");
            let parts: Vec<&str> = stem.split('_').collect();
            let [name, version, arch] = parts.as_slice() else {
                return Err(conflict(&format!("unable to parse {file_name}")));
            };

            let path = format!("{upload_dir}/{file_name}");
            let package = PackageRef::new(*arch, *name, *version, content_hash(name, version, arch));
            self.state.borrow_mut().uploads.insert(path.clone(), package);
            paths.push(path);
        }
        self.record(format!("upload_files {upload_dir} {}", paths.len()));
        Ok(paths)
    }

    fn add_uploaded_file(&self, local_repo: &str, server_path: &str) -> Result<()> {
        {
            let mut state = self.state.borrow_mut();
            let package = state
                .uploads
                .remove(server_path)
                .ok_or_else(|| not_found(&format!("upload {server_path}")))?;
            let repo = state
                .local_repos
                .get_mut(local_repo)
                .ok_or_else(|| not_found(&format!("local repo {local_repo}")))?;
            repo.retain(|p| p.key() != package.key());
            repo.push(package);
        }
        self.record(format!("add_uploaded_file {local_repo} {server_path}"));
        Ok(())
    }

    fn delete_package_refs(&self, local_repo: &str, refs: &[PackageRef]) -> Result<()> {
        {
            let mut state = self.state.borrow_mut();
            let repo = state
                .local_repos
                .get_mut(local_repo)
                .ok_or_else(|| not_found(&format!("local repo {local_repo}")))?;
            repo.retain(|p| !refs.contains(p));
        }
        self.record(format!("delete_package_refs {local_repo} {}", refs.len()));
        Ok(())
    }

    fn server_version(&self) -> Result<ServerVersion> {
        Ok(ServerVersion {
            version: "1.5.0".to_string(),
        })
    }
}

/// Engine over a fresh in-memory server, acting as user `alice`
pub fn setup_engine() -> PromotionEngine<MemoryGateway> {
    PromotionEngine::new(MemoryGateway::new(), EngineConfig::new("alice"))
}

/// A package reference with a hash derived from its identity
pub fn pkg(name: &str, version: &str) -> PackageRef {
    PackageRef::new("all", name, version, content_hash(name, version, "all"))
}

/// Write dummy `.deb` files named `name_version_all.deb`
///
/// Returns (TempDir, paths) - keep the TempDir alive to prevent cleanup.
pub fn write_debs(packages: &[(&str, &str)]) -> (TempDir, Vec<PathBuf>) {
    let temp_dir = tempfile::tempdir().unwrap();
    let paths = packages
        .iter()
        .map(|(name, version)| write_deb(temp_dir.path(), name, version))
        .collect();
    (temp_dir, paths)
}

pub fn write_deb(dir: &Path, name: &str, version: &str) -> PathBuf {
    let path = dir.join(format!("{name}_{version}_all.deb"));
    std::fs::write(&path, b"!<arch>\n").unwrap();
    path
}

/// Sorted `name_version` labels, for compact assertions
pub fn labels(refs: &[PackageRef]) -> Vec<String> {
    let mut labels: Vec<String> = refs
        .iter()
        .map(|p| format!("{}_{}", p.name, p.version))
        .collect();
    labels.sort();
    labels
}
