// src/gateway/client.rs

//! HTTP client for the Aptly REST API
//!
//! Wraps a blocking reqwest client with basic auth, an optional TLS client
//! identity and the status-code to error mapping the engine relies on.
//! Names are placed into request paths as percent-encoded segments.

use super::{
    LocalRepoInfo, PublishRequest, Publication, RepositoryGateway, ServerVersion, SnapshotInfo,
};
use crate::error::{Error, Result};
use crate::package_ref::PackageRef;
use reqwest::blocking::{multipart, Client, RequestBuilder, Response};
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default timeout for HTTP requests (30 seconds)
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for [`AptlyClient`]
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the API, e.g. `https://repo.example.com/api`
    pub url: String,
    /// Basic auth username and password
    pub basic_auth: Option<(String, String)>,
    /// PEM client certificate, used together with `key`
    pub cert: Option<PathBuf>,
    /// PEM private key for `cert`
    pub key: Option<PathBuf>,
    /// Accept invalid server certificates
    pub skip_ssl: bool,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            basic_auth: None,
            cert: None,
            key: None,
            skip_ssl: false,
            timeout: HTTP_TIMEOUT,
        }
    }
}

/// Blocking Aptly API client
pub struct AptlyClient {
    client: Client,
    base_url: String,
    api: Url,
    basic_auth: Option<(String, String)>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct CreateRepoBody<'a> {
    name: &'a str,
    comment: &'a str,
    default_distribution: &'a str,
    default_component: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct SnapshotFromRepoBody<'a> {
    name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct SnapshotFromRefsBody<'a> {
    name: &'a str,
    source_snapshots: &'a [String],
    description: &'a str,
    package_refs: &'a [PackageRef],
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct PublishSource<'a> {
    name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct Signing<'a> {
    gpg_key: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct PublishBody<'a> {
    source_kind: &'a str,
    sources: Vec<PublishSource<'a>>,
    architectures: &'a [String],
    distribution: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    signing: Option<Signing<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct RepublishSnapshot<'a> {
    component: &'a str,
    name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct RepublishBody<'a> {
    snapshots: Vec<RepublishSnapshot<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct PackageRefsBody<'a> {
    package_refs: &'a [PackageRef],
}

/// Read the PEM client identity (certificate followed by key)
fn load_identity(cert: &Path, key: &Path) -> Result<reqwest::Identity> {
    let mut pem = fs::read(cert)
        .map_err(|e| Error::Config(format!("Cert file {} is unreadable: {e}", cert.display())))?;
    let key_pem = fs::read(key)
        .map_err(|e| Error::Config(format!("Key file {} is unreadable: {e}", key.display())))?;
    pem.push(b'\n');
    pem.extend_from_slice(&key_pem);
    reqwest::Identity::from_pem(&pem)
        .map_err(|e| Error::Config(format!("Invalid client certificate or key: {e}")))
}

impl AptlyClient {
    /// Create a client for the API at `config.url`
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut builder = Client::builder().timeout(config.timeout);

        if config.skip_ssl {
            warn!("Server certificate verification is disabled");
            builder = builder.danger_accept_invalid_certs(true);
        }

        match (&config.cert, &config.key) {
            (Some(cert), Some(key)) => {
                builder = builder.identity(load_identity(cert, key)?);
            }
            (None, None) => {}
            _ => {
                return Err(Error::Config(
                    "--cert and --key are both required together".to_string(),
                ));
            }
        }

        let base_url = config.url.trim_end_matches('/').to_string();
        let api = Url::parse(&base_url)
            .map_err(|e| Error::Config(format!("Invalid API URL '{}': {e}", config.url)))?;
        if api.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "Invalid API URL '{}': not a base URL",
                config.url
            )));
        }

        let client = builder
            .build()
            .map_err(|e| Error::Transport(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            api,
            basic_auth: config.basic_auth.clone(),
        })
    }

    /// Base URL requests are made against
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// API URL with `segments` appended, each one percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.api.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let url = self.endpoint(segments);
        debug!("{} {}", method, url);
        let builder = self.client.request(method, url);
        match &self.basic_auth {
            Some((user, password)) => builder.basic_auth(user, Some(password)),
            None => builder,
        }
    }

    /// Send a request, turning any non-2xx status into [`Error::RemoteApi`]
    fn send(&self, builder: RequestBuilder, what: &str) -> Result<Response> {
        let response = builder
            .send()
            .map_err(|e| Error::Transport(format!("{what}: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().unwrap_or_default();
        Err(Error::remote(
            status.as_u16(),
            format!("[HTTP {}] - {}", status.as_u16(), what),
            &body,
        ))
    }

    fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder, what: &str) -> Result<T> {
        let body = self
            .send(builder, what)?
            .text()
            .map_err(|e| Error::Transport(format!("{what}: failed to read response: {e}")))?;
        serde_json::from_str(&body)
            .map_err(|e| Error::Transport(format!("{what}: unexpected response body: {e}")))
    }

    fn fetch_package_refs(&self, builder: RequestBuilder, what: &str) -> Result<Vec<PackageRef>> {
        let raw: Vec<String> = self.send_json(builder, what)?;
        raw.iter().map(|r| PackageRef::decode(r)).collect()
    }
}

impl RepositoryGateway for AptlyClient {
    fn create_local_repo(&self, local_repo: &str) -> Result<()> {
        let body = CreateRepoBody {
            name: local_repo,
            comment: "",
            default_distribution: "",
            default_component: "",
        };
        self.send(
            self.request(Method::POST, &["repos"]).json(&body),
            &format!("Failed to create repo {local_repo}"),
        )?;
        info!("Created local repo {}", local_repo);
        Ok(())
    }

    fn delete_local_repo(&self, local_repo: &str) -> Result<()> {
        self.send(
            self.request(Method::DELETE, &["repos", local_repo])
                .query(&[("force", "1")]),
            &format!("Failed to delete local repo: {local_repo}"),
        )?;
        info!("Deleted local repo {}", local_repo);
        Ok(())
    }

    fn list_local_repos(&self) -> Result<Vec<LocalRepoInfo>> {
        self.send_json(self.request(Method::GET, &["repos"]), "Failed to list repos")
    }

    fn create_snapshot_from_repo(&self, local_repo: &str, snapshot: &str) -> Result<()> {
        self.send(
            self.request(Method::POST, &["repos", local_repo, "snapshots"])
                .json(&SnapshotFromRepoBody { name: snapshot }),
            &format!("Failed to create snapshot {snapshot} of repo {local_repo}"),
        )?;
        Ok(())
    }

    fn create_snapshot_from_refs(
        &self,
        snapshot: &str,
        source_snapshots: &[String],
        refs: &[PackageRef],
    ) -> Result<()> {
        let body = SnapshotFromRefsBody {
            name: snapshot,
            source_snapshots,
            description: snapshot,
            package_refs: refs,
        };
        self.send(
            self.request(Method::POST, &["snapshots"]).json(&body),
            &format!("Failed to create snapshot: {snapshot}"),
        )?;
        Ok(())
    }

    fn drop_snapshot(&self, snapshot: &str) -> Result<()> {
        let result = self.send(
            self.request(Method::DELETE, &["snapshots", snapshot])
                .query(&[("force", "1")]),
            &format!("Failed to delete snapshot: {snapshot}"),
        );
        match result {
            Ok(_) => Ok(()),
            Err(e) if e.status() == Some(StatusCode::NOT_FOUND.as_u16()) => {
                debug!("Snapshot {} did not exist", snapshot);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn list_snapshots(&self) -> Result<Vec<SnapshotInfo>> {
        self.send_json(
            self.request(Method::GET, &["snapshots"]).query(&[("sort", "time")]),
            "Failed to list snapshots",
        )
    }

    fn snapshot_packages(&self, snapshot: &str) -> Result<Vec<PackageRef>> {
        self.fetch_package_refs(
            self.request(Method::GET, &["snapshots", snapshot, "packages"]),
            &format!("Failed to list packages of snapshot {snapshot}"),
        )
    }

    fn local_repo_packages(&self, local_repo: &str) -> Result<Vec<PackageRef>> {
        self.fetch_package_refs(
            self.request(Method::GET, &["repos", local_repo, "packages"]),
            &format!("Failed to list packages of repo {local_repo}"),
        )
    }

    fn filter_snapshot_packages(&self, snapshot: &str, query: &str) -> Result<Vec<PackageRef>> {
        self.fetch_package_refs(
            self.request(Method::GET, &["snapshots", snapshot, "packages"])
                .query(&[("q", query)]),
            &format!("Failed to filter package: {query} in snapshot: {snapshot}"),
        )
    }

    fn list_publications(&self) -> Result<Vec<Publication>> {
        self.send_json(self.request(Method::GET, &["publish"]), "Failed to list publications")
    }

    fn publish(&self, request: &PublishRequest<'_>) -> Result<()> {
        let body = PublishBody {
            source_kind: "snapshot",
            sources: vec![PublishSource {
                name: request.snapshot,
            }],
            architectures: request.architectures,
            distribution: request.distribution,
            signing: request.gpg_key.map(|gpg_key| Signing { gpg_key }),
        };
        self.send(
            self.request(Method::POST, &["publish", request.local_repo])
                .json(&body),
            &format!("Failed to publish to {}", request.distribution),
        )?;
        info!(
            "Published {} {} from {}",
            request.local_repo, request.distribution, request.snapshot
        );
        Ok(())
    }

    fn republish(&self, local_repo: &str, distribution: &str, snapshot: &str) -> Result<()> {
        let body = RepublishBody {
            snapshots: vec![RepublishSnapshot {
                component: "main",
                name: snapshot,
            }],
        };
        self.send(
            self.request(Method::PUT, &["publish", local_repo, distribution])
                .json(&body),
            &format!("Failed to promote to {distribution}"),
        )?;
        info!("Re-published {} {} from {}", local_repo, distribution, snapshot);
        Ok(())
    }

    fn drop_publication(&self, local_repo: &str, distribution: &str) -> Result<()> {
        self.send(
            self.request(Method::DELETE, &["publish", local_repo, distribution]),
            &format!("Failed to drop published distribution: {distribution} from: {local_repo}"),
        )?;
        info!("Dropped publication {} {}", local_repo, distribution);
        Ok(())
    }

    fn upload_files(&self, upload_dir: &str, files: &[PathBuf]) -> Result<Vec<String>> {
        let mut form = multipart::Form::new();
        for file in files {
            form = form
                .file("file", file)
                .map_err(|e| Error::Io(format!("Failed to read {}: {e}", file.display())))?;
        }

        let paths: Vec<String> = self.send_json(
            self.request(Method::POST, &["files", upload_dir])
                .multipart(form),
            "Failed to upload file",
        )?;
        for path in &paths {
            debug!("Uploaded {}", path);
        }
        Ok(paths)
    }

    fn add_uploaded_file(&self, local_repo: &str, server_path: &str) -> Result<()> {
        let mut segments = vec!["repos", local_repo, "file"];
        segments.extend(server_path.split('/'));
        self.send(
            self.request(Method::POST, &segments),
            &format!("Failed to add uploaded file to repo: {local_repo}"),
        )?;
        Ok(())
    }

    fn delete_package_refs(&self, local_repo: &str, refs: &[PackageRef]) -> Result<()> {
        self.send(
            self.request(Method::DELETE, &["repos", local_repo, "packages"])
                .json(&PackageRefsBody { package_refs: refs }),
            &format!("Failed to remove {} package(s) from {local_repo}", refs.len()),
        )?;
        Ok(())
    }

    fn server_version(&self) -> Result<ServerVersion> {
        self.send_json(self.request(Method::GET, &["version"]), "Failed to get server version")
    }
}
