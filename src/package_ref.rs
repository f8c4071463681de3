// src/package_ref.rs

//! Compact package references exchanged with the repository server
//!
//! A reference is a single line such as `Pamd64 pesto 9.32.1 58f826d62d1e9010`:
//! a one-character kind indicator glued to the architecture, then the package
//! name, the Debian version and the content hash, separated by whitespace.

use crate::error::{Error, Result};
use crate::version::DebianVersion;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One package build, as the server identifies it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PackageRef {
    /// Kind indicator (`P` for binary packages)
    pub kind: char,
    pub architecture: String,
    pub name: String,
    pub version: String,
    pub content_hash: String,
}

impl PackageRef {
    /// Create a binary package reference
    pub fn new(
        architecture: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
        content_hash: impl Into<String>,
    ) -> Self {
        Self {
            kind: 'P',
            architecture: architecture.into(),
            name: name.into(),
            version: version.into(),
            content_hash: content_hash.into(),
        }
    }

    /// Decode a raw reference record
    ///
    /// Fails with [`Error::MalformedRecord`] unless the record is exactly a
    /// kind character, an architecture and three further fields.
    pub fn decode(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let mut chars = raw.chars();
        let kind = chars
            .next()
            .ok_or_else(|| Error::MalformedRecord("empty record".to_string()))?;

        let mut fields = chars.as_str().split_whitespace();
        let architecture = fields
            .next()
            .ok_or_else(|| Error::MalformedRecord(format!("missing architecture: '{raw}'")))?;

        let rest: Vec<&str> = fields.collect();
        let [name, version, content_hash] = rest.as_slice() else {
            return Err(Error::MalformedRecord(format!(
                "expected name, version and hash after architecture, found {} field(s): '{raw}'",
                rest.len()
            )));
        };

        Ok(Self {
            kind,
            architecture: architecture.to_string(),
            name: name.to_string(),
            version: version.to_string(),
            content_hash: content_hash.to_string(),
        })
    }

    /// Encode back to the single-line record form
    pub fn encode(&self) -> String {
        self.to_string()
    }

    /// Parsed Debian version of this build
    pub fn debian_version(&self) -> DebianVersion {
        DebianVersion::parse(&self.version)
    }

    /// Package key in the `name_version_arch` form used by package queries
    pub fn key(&self) -> String {
        format!("{}_{}_{}", self.name, self.version, self.architecture)
    }
}

impl fmt::Display for PackageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{} {} {} {}",
            self.kind, self.architecture, self.name, self.version, self.content_hash
        )
    }
}

impl FromStr for PackageRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        PackageRef::decode(s)
    }
}

impl TryFrom<String> for PackageRef {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        PackageRef::decode(&s)
    }
}

impl From<PackageRef> for String {
    fn from(r: PackageRef) -> Self {
        r.encode()
    }
}
