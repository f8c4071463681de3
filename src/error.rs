// src/error.rs

//! Error types for the promotion engine and the Aptly gateway
//!
//! Four kinds of failure are distinguished, because the CLI reports each
//! one differently:
//! - [`Error::RemoteApi`] - the server answered with a non-2xx status
//! - [`Error::Logic`] - a precondition of the promotion state machine failed
//! - [`Error::MalformedRecord`] - a package reference could not be parsed
//! - [`Error::Transport`] - the server could not be reached at all

use serde::Deserialize;
use thiserror::Error;

/// Result alias used throughout the library
pub type Result<T> = std::result::Result<T, Error>;

/// Library error type
#[derive(Error, Debug)]
pub enum Error {
    /// Non-success response from the repository server
    #[error("{message}")]
    RemoteApi {
        status: u16,
        message: String,
        detail: Option<String>,
    },

    /// The promotion state machine refused the operation
    #[error(transparent)]
    Logic(#[from] LogicError),

    /// A package reference from the server could not be decoded
    #[error("Malformed package reference: {0}")]
    MalformedRecord(String),

    /// Connection or TLS failure talking to the server
    #[error("Transport error: {0}")]
    Transport(String),

    /// Local I/O failure (reading package files, config)
    #[error("I/O error: {0}")]
    Io(String),

    /// Invalid local configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Violations of the promotion state machine
///
/// These are detected before any further remote call is made.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LogicError {
    #[error("Specified repo '{0}' doesn't exist")]
    RepoNotFound(String),

    #[error("Repo '{0}' already exists")]
    RepoAlreadyExists(String),

    #[error("There is no '{distribution}' distribution for repo '{repo}'")]
    DistributionNotFound { repo: String, distribution: String },

    #[error("{repo} {distribution} not published from snapshot")]
    NotPublishedFromSnapshot { repo: String, distribution: String },

    #[error("No source found for publication {repo} {distribution}")]
    NoPublicationSource { repo: String, distribution: String },

    #[error("More than one source found for publication {repo} {distribution}")]
    AmbiguousPublication { repo: String, distribution: String },

    #[error("Cannot modify existing release \"{0}\"")]
    ReleaseImmutable(String),

    #[error(
        "Cannot promote release {release_id}. It is not published as {source_dist}. Please promote to {source_dist} first."
    )]
    NotPromotable {
        release_id: String,
        source_dist: String,
    },

    #[error("Invalid repo name '{name}': {reason}")]
    InvalidRepoName { name: String, reason: String },

    #[error("Invalid release id '{release_id}': {reason}")]
    InvalidReleaseId { release_id: String, reason: String },

    #[error("Invalid local user '{user}': {reason}")]
    InvalidUser { user: String, reason: String },
}

/// Coarse classification used by the CLI to pick a message format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    RemoteApi,
    Logic,
    MalformedRecord,
    Transport,
    Local,
}

impl Error {
    /// Build a remote API error from a status code and the raw response body
    pub fn remote(status: u16, message: impl Into<String>, body: &str) -> Self {
        Error::RemoteApi {
            status,
            message: message.into(),
            detail: parse_server_detail(body),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::RemoteApi { .. } => ErrorKind::RemoteApi,
            Error::Logic(_) => ErrorKind::Logic,
            Error::MalformedRecord(_) => ErrorKind::MalformedRecord,
            Error::Transport(_) => ErrorKind::Transport,
            Error::Io(_) | Error::Config(_) => ErrorKind::Local,
        }
    }

    /// HTTP status for remote errors
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::RemoteApi { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

#[derive(Deserialize)]
struct ServerError {
    error: String,
    #[serde(default)]
    meta: Option<serde_json::Value>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ServerErrorBody {
    Single(ServerError),
    Many(Vec<ServerError>),
}

/// Extract the server's error message(s) from a response body
///
/// The server answers either `{"error": ".."}` or a list of
/// `{"error": "..", "meta": ".."}` objects. Anything else yields `None`.
fn parse_server_detail(body: &str) -> Option<String> {
    let parsed: ServerErrorBody = serde_json::from_str(body).ok()?;
    let lines: Vec<String> = match parsed {
        ServerErrorBody::Single(err) => vec![err.error],
        ServerErrorBody::Many(errs) => errs
            .into_iter()
            .flat_map(|err| {
                let meta = match err.meta {
                    Some(serde_json::Value::String(s)) => Some(s),
                    Some(serde_json::Value::Null) | None => None,
                    Some(other) => Some(other.to_string()),
                };
                std::iter::once(err.error).chain(meta)
            })
            .collect(),
    };
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}
