// src/repo_name.rs

//! Public and local forms of repository names
//!
//! Repositories are addressed publicly with slashes (`team/project`), which is
//! also the prefix they are published under. The server's local repos and
//! snapshots use the same name with `/` replaced by `_`.

use crate::error::{LogicError, Result};
use std::fmt;
use std::str::FromStr;

/// Character that stands in for `/` in local names
const SUBSTITUTE: char = '_';

/// A repository name, stored in its public form
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RepoName {
    public: String,
}

impl RepoName {
    /// Validate a public repository name
    ///
    /// The name must be non-empty and must not contain `_`, otherwise the
    /// local form could not be mapped back.
    pub fn new(public: impl Into<String>) -> Result<Self> {
        let public = public.into();
        let invalid = |reason: &str| LogicError::InvalidRepoName {
            name: public.clone(),
            reason: reason.to_string(),
        };

        if public.is_empty() {
            return Err(invalid("name is empty").into());
        }
        if public.contains(SUBSTITUTE) {
            return Err(invalid("'_' is reserved for the local form of '/'").into());
        }
        if public.starts_with('/') || public.ends_with('/') || public.contains("//") {
            return Err(invalid("empty path component").into());
        }
        if public.chars().any(char::is_whitespace) {
            return Err(invalid("whitespace is not allowed").into());
        }
        Ok(Self { public })
    }

    /// Recover the public name from a local name
    pub fn from_local(local: &str) -> Result<Self> {
        Self::new(to_public(local))
    }

    /// Public (slash-delimited) form
    pub fn public(&self) -> &str {
        &self.public
    }

    /// Local (underscore-delimited) form
    pub fn local(&self) -> String {
        to_local(&self.public)
    }

    /// Name of the private check repo for `user`: `<repo>.@<user>@`
    pub fn check_repo(&self, user: &str) -> Result<Self> {
        Self::new(format!("{}.@{}@", self.public, user))
    }
}

impl fmt::Display for RepoName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.public)
    }
}

impl FromStr for RepoName {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self> {
        RepoName::new(s)
    }
}

/// Local form of a public name
pub fn to_local(public: &str) -> String {
    public.replace('/', "_")
}

/// Public form of a local name
pub fn to_public(local: &str) -> String {
    local.replace(SUBSTITUTE, "/")
}
