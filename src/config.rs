// src/config.rs
//! Client configuration
//!
//! Defaults are read from a TOML file (`~/.raptly/config` unless another path
//! is given) and overridden field by field from the command line:
//!
//! ```toml
//! [default]
//! url = "https://repo.example.com/api"
//! cert = "~/.raptly/client.crt"
//! key = "~/.raptly/client.key"
//! user = "name:password"
//! local_user = "alice"
//! gpg_key = "ABCDEF01"
//! skip_ssl = false
//! ```

use crate::error::{Error, Result};
use crate::gateway::ClientConfig;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// TOML configuration file structure
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub default: DefaultSection,
}

/// The `[default]` section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct DefaultSection {
    pub url: Option<String>,
    pub cert: Option<String>,
    pub key: Option<String>,
    /// Basic auth credentials, `name:password`
    pub user: Option<String>,
    /// Name used to tag snapshots and namespace check repos
    pub local_user: Option<String>,
    /// GPG key the server signs publications with
    pub gpg_key: Option<String>,
    pub skip_ssl: Option<bool>,
}

/// Values given on the command line
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub url: Option<String>,
    pub cert: Option<String>,
    pub key: Option<String>,
    pub user: Option<String>,
    pub local_user: Option<String>,
    pub skip_ssl: bool,
}

/// Fully resolved settings for one invocation
#[derive(Debug, Clone)]
pub struct Settings {
    pub client: ClientConfig,
    pub local_user: String,
    pub gpg_key: Option<String>,
}

/// Default config file location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".raptly").join("config"))
}

/// Load the config file; a missing file yields empty defaults
pub fn load_config(path: &Path) -> Result<ConfigFile> {
    if !path.exists() {
        return Ok(ConfigFile::default());
    }
    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read {}: {e}", path.display())))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {e}", path.display())))
}

/// Expand a leading `~` to the home directory
pub fn expand_tilde(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => PathBuf::from(path),
        },
        None if path == "~" => dirs::home_dir().unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}

/// Split `name:password` into basic auth credentials
///
/// An empty name means no authentication.
pub fn parse_basic_auth(user: &str) -> Option<(String, String)> {
    let (name, password) = user.split_once(':').unwrap_or((user, ""));
    if name.is_empty() {
        None
    } else {
        Some((name.to_string(), password.to_string()))
    }
}

fn existing_file(kind: &str, path: &str) -> Result<PathBuf> {
    let expanded = expand_tilde(path);
    if !expanded.exists() {
        return Err(Error::Config(format!(
            "{kind} file {} does not exist",
            expanded.display()
        )));
    }
    Ok(expanded)
}

/// Merge file defaults with command-line overrides
///
/// `env_user` is the login name of the invoking user, used when no
/// `local_user` is configured.
pub fn resolve(file: &ConfigFile, overrides: &Overrides, env_user: Option<String>) -> Result<Settings> {
    let defaults = &file.default;
    let pick = |cli: &Option<String>, cfg: &Option<String>| cli.clone().or_else(|| cfg.clone());

    let url = pick(&overrides.url, &defaults.url).ok_or_else(|| {
        Error::Config(
            "Please set the server URL in the config file ~/.raptly/config or by using --url"
                .to_string(),
        )
    })?;

    let (cert, key) = match (pick(&overrides.cert, &defaults.cert), pick(&overrides.key, &defaults.key)) {
        (Some(cert), Some(key)) => (
            Some(existing_file("Cert", &cert)?),
            Some(existing_file("Key", &key)?),
        ),
        (None, None) => (None, None),
        _ => {
            return Err(Error::Config(
                "--cert and --key are both required together".to_string(),
            ));
        }
    };

    let basic_auth = pick(&overrides.user, &defaults.user)
        .as_deref()
        .and_then(parse_basic_auth);

    let local_user = overrides
        .local_user
        .clone()
        .or_else(|| defaults.local_user.clone())
        .or(env_user)
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| "unknown".to_string());

    let mut client = ClientConfig::new(url.trim_end_matches('/'));
    client.basic_auth = basic_auth;
    client.cert = cert;
    client.key = key;
    client.skip_ssl = overrides.skip_ssl || defaults.skip_ssl.unwrap_or(false);

    Ok(Settings {
        client,
        local_user,
        gpg_key: defaults.gpg_key.clone(),
    })
}
