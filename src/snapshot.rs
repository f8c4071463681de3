// src/snapshot.rs

//! Snapshot naming and release-candidate lookup
//!
//! Snapshot names carry enough context to trace who created them and why:
//!
//! - `<local>.<verb>.<rand8>.<timestamp>.<user>` for create/deploy/undeploy/check
//! - `<local>.test.<release_id>.<timestamp>.<user>` for release candidates
//! - `<local>.<release_id>.<timestamp>` for release candidates made by older
//!   clients, still recognised when looking candidates up
//!
//! Uniqueness across concurrent invocations comes from the random component
//! and the timestamp, with no coordination between clients.

use crate::error::{LogicError, Result};
use crate::gateway::SnapshotInfo;
use regex::Regex;

/// Operation that produced a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotVerb {
    Create,
    Deploy,
    Undeploy,
    Check,
    Test,
}

impl SnapshotVerb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Deploy => "deploy",
            Self::Undeploy => "undeploy",
            Self::Check => "check",
            Self::Test => "test",
        }
    }
}

/// Build a snapshot name for `verb`
pub fn new_name(local_repo: &str, verb: SnapshotVerb, timestamp: i64, user: &str) -> String {
    let uuid = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "{}.{}.{}.{}.{}",
        local_repo,
        verb.as_str(),
        &uuid[..8],
        timestamp,
        user
    )
}

/// Build the name of a release-candidate snapshot
pub fn release_candidate_name(local_repo: &str, release_id: &str, timestamp: i64, user: &str) -> String {
    format!(
        "{}.{}.{}.{}.{}",
        local_repo,
        SnapshotVerb::Test.as_str(),
        release_id,
        timestamp,
        user
    )
}

/// Name of the scratch snapshot holding newly added packages
///
/// It is dropped and recreated on every run, so repeated invocations never
/// collide on it.
pub fn temp_new_packages_name(local_repo: &str) -> String {
    format!("{local_repo}-snap-temp-new-pkgs")
}

/// Current Unix timestamp in seconds
pub fn timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Check that `value` can be embedded as one dot-delimited name component
fn check_component(value: &str) -> std::result::Result<(), &'static str> {
    if value.is_empty() {
        Err("must not be empty")
    } else if value.contains('.') {
        Err("'.' separates snapshot name components")
    } else if value.contains('/') {
        Err("'/' is not allowed")
    } else if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
        Err("whitespace and control characters are not allowed")
    } else {
        Ok(())
    }
}

/// Validate a release id before it is used to build or match snapshot names
pub fn validate_release_id(release_id: &str) -> Result<()> {
    check_component(release_id).map_err(|reason| {
        LogicError::InvalidReleaseId {
            release_id: release_id.to_string(),
            reason: reason.to_string(),
        }
        .into()
    })
}

/// Validate the user name that tags snapshots and check repos
pub fn validate_user(user: &str) -> Result<()> {
    check_component(user).map_err(|reason| {
        LogicError::InvalidUser {
            user: user.to_string(),
            reason: reason.to_string(),
        }
        .into()
    })
}

/// Matches exactly the two release-candidate shapes of one repo:
/// `<local>.test.<rid>.<ts>.<user>` and `<local>.<rid>.<ts>`
fn release_candidate_pattern(local_repo: &str, release_id: &str) -> Regex {
    let pattern = format!(
        r"^{local}\.(?:{verb}\.{rid}\.(\d+)\.[^.]+|{rid}\.(\d+))$",
        local = regex::escape(local_repo),
        verb = SnapshotVerb::Test.as_str(),
        rid = regex::escape(release_id)
    );
    Regex::new(&pattern).expect("repo name and release id are escaped")
}

fn candidate_timestamp(pattern: &Regex, snapshot_name: &str) -> Option<u64> {
    let caps = pattern.captures(snapshot_name)?;
    let ts = caps.get(1).or_else(|| caps.get(2))?;
    Some(ts.as_str().parse().unwrap_or(u64::MAX))
}

/// Find the release-candidate snapshots of `release_id`, newest first
///
/// `snapshots` is expected in creation order (oldest first), as the server
/// lists them. Candidates are ordered by the timestamp embedded in their
/// name; equal timestamps fall back to listing order, later first.
pub fn find_release_candidates<'a>(
    snapshots: &'a [SnapshotInfo],
    local_repo: &str,
    release_id: &str,
) -> Vec<&'a SnapshotInfo> {
    let pattern = release_candidate_pattern(local_repo, release_id);
    let mut matches: Vec<(u64, &SnapshotInfo)> = snapshots
        .iter()
        .rev()
        .filter_map(|snap| Some((candidate_timestamp(&pattern, &snap.name)?, snap)))
        .collect();
    matches.sort_by(|a, b| b.0.cmp(&a.0));
    matches.into_iter().map(|(_, snap)| snap).collect()
}

/// Whether `snapshot_name` is a release candidate of `release_id` in `local_repo`
pub fn is_release_candidate(snapshot_name: &str, local_repo: &str, release_id: &str) -> bool {
    release_candidate_pattern(local_repo, release_id).is_match(snapshot_name)
}
