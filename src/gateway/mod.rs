// src/gateway/mod.rs

//! Boundary to the remote repository server
//!
//! The promotion engine only sees [`RepositoryGateway`]; [`AptlyClient`] is the
//! implementation that talks to an Aptly REST API. Every method is a single
//! bounded request that the server commits on its own. Nothing here retries.

mod client;

pub use client::{AptlyClient, ClientConfig};

use crate::error::Result;
use crate::package_ref::PackageRef;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How a publication is sourced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Snapshot,
    Local,
}

/// One source of a publication
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    #[serde(rename = "Component", default)]
    pub component: String,
    #[serde(rename = "Name")]
    pub name: String,
}

/// A distribution published under a repository prefix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publication {
    #[serde(rename = "Prefix")]
    pub prefix: String,
    #[serde(rename = "Distribution")]
    pub distribution: String,
    #[serde(rename = "SourceKind")]
    pub source_kind: SourceKind,
    #[serde(rename = "Sources", default)]
    pub sources: Vec<SourceRef>,
    #[serde(rename = "Architectures", default)]
    pub architectures: Vec<String>,
}

/// A snapshot as listed by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotInfo {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Description", default)]
    pub description: String,
}

/// A local repo as listed by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalRepoInfo {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Comment", default)]
    pub comment: String,
}

/// Server version report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerVersion {
    #[serde(rename = "Version")]
    pub version: String,
}

/// First-time publication of a distribution from a snapshot
#[derive(Debug, Clone)]
pub struct PublishRequest<'a> {
    pub local_repo: &'a str,
    pub distribution: &'a str,
    pub snapshot: &'a str,
    pub architectures: &'a [String],
    pub gpg_key: Option<&'a str>,
}

/// Capabilities the promotion engine needs from the repository server
///
/// Names passed in are always local (underscore) forms; publication
/// prefixes come back in public form.
pub trait RepositoryGateway {
    fn create_local_repo(&self, local_repo: &str) -> Result<()>;

    /// Delete a local repo, forcing removal of its snapshots' references
    fn delete_local_repo(&self, local_repo: &str) -> Result<()>;

    fn list_local_repos(&self) -> Result<Vec<LocalRepoInfo>>;

    /// Freeze the current contents of a local repo
    fn create_snapshot_from_repo(&self, local_repo: &str, snapshot: &str) -> Result<()>;

    /// Create a snapshot holding exactly `refs`; empty lists give an empty snapshot
    fn create_snapshot_from_refs(
        &self,
        snapshot: &str,
        source_snapshots: &[String],
        refs: &[PackageRef],
    ) -> Result<()>;

    /// Drop a snapshot; a missing snapshot is not an error
    fn drop_snapshot(&self, snapshot: &str) -> Result<()>;

    /// All snapshots, oldest first
    fn list_snapshots(&self) -> Result<Vec<SnapshotInfo>>;

    fn snapshot_packages(&self, snapshot: &str) -> Result<Vec<PackageRef>>;

    fn local_repo_packages(&self, local_repo: &str) -> Result<Vec<PackageRef>>;

    /// Packages of a snapshot matching a server-side package query
    fn filter_snapshot_packages(&self, snapshot: &str, query: &str) -> Result<Vec<PackageRef>>;

    fn list_publications(&self) -> Result<Vec<Publication>>;

    fn publish(&self, request: &PublishRequest<'_>) -> Result<()>;

    /// Switch an existing publication to another snapshot
    fn republish(&self, local_repo: &str, distribution: &str, snapshot: &str) -> Result<()>;

    fn drop_publication(&self, local_repo: &str, distribution: &str) -> Result<()>;

    /// Upload package files; returns the server-side paths
    fn upload_files(&self, upload_dir: &str, files: &[PathBuf]) -> Result<Vec<String>>;

    fn add_uploaded_file(&self, local_repo: &str, server_path: &str) -> Result<()>;

    fn delete_package_refs(&self, local_repo: &str, refs: &[PackageRef]) -> Result<()>;

    fn server_version(&self) -> Result<ServerVersion>;
}
