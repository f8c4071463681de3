// src/engine/config.rs
//! Engine configuration

/// Names of the distributions a package set moves through
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Distributions {
    pub unstable: String,
    pub testing: String,
    pub staging: String,
    pub stable: String,
    /// Distribution published in per-user check repos
    pub check: String,
}

impl Default for Distributions {
    fn default() -> Self {
        Self {
            unstable: "unstable".to_string(),
            testing: "testing".to_string(),
            staging: "staging".to_string(),
            stable: "stable".to_string(),
            check: "check".to_string(),
        }
    }
}

/// Settings that shape every engine operation
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Tags snapshot names and namespaces check repos
    pub local_user: String,
    /// Server-side upload directory; defaults to `local_user`
    pub upload_dir: Option<String>,
    /// GPG key publications are signed with
    pub gpg_key: Option<String>,
    pub architectures: Vec<String>,
    pub distributions: Distributions,
}

impl EngineConfig {
    pub fn new(local_user: impl Into<String>) -> Self {
        Self {
            local_user: local_user.into(),
            upload_dir: None,
            gpg_key: None,
            architectures: vec!["amd64".to_string(), "all".to_string()],
            distributions: Distributions::default(),
        }
    }

    pub fn with_gpg_key(mut self, gpg_key: Option<String>) -> Self {
        self.gpg_key = gpg_key;
        self
    }

    pub fn upload_dir(&self) -> &str {
        self.upload_dir.as_deref().unwrap_or(&self.local_user)
    }
}
