// src/lib.rs

//! raptly: Debian package promotion on an Aptly server
//!
//! Packages move through four distributions of a repository:
//! `unstable` (continuous deploys), `testing` (a release candidate),
//! `staging` and `stable`. Every change creates a new immutable snapshot and
//! re-points a publication at it, so what reaches stable is bit-for-bit the
//! set that was tested.
//!
//! # Architecture
//!
//! - [`engine`]: the promotion state machine, generic over a gateway
//! - [`gateway`]: the server boundary and its Aptly REST implementation
//! - [`package_ref`], [`version`], [`prune`]: package sets and Debian
//!   version ordering
//! - [`repo_name`], [`snapshot`]: naming conventions on the server

pub mod config;
pub mod engine;
mod error;
pub mod gateway;
pub mod package_ref;
pub mod prune;
pub mod repo_name;
pub mod snapshot;
pub mod version;

pub use engine::{EngineConfig, PromotionEngine, TestOutcome};
pub use error::{Error, ErrorKind, LogicError, Result};
pub use gateway::{AptlyClient, RepositoryGateway};
pub use package_ref::PackageRef;
pub use repo_name::RepoName;
pub use version::DebianVersion;
