// tests/aptly_client.rs

//! Aptly REST client tests against a mock HTTP server.

use httpmock::Method::{DELETE, GET, POST, PUT};
use httpmock::MockServer;
use raptly::gateway::{AptlyClient, ClientConfig, PublishRequest, RepositoryGateway, SourceKind};
use raptly::{Error, ErrorKind, PackageRef};
use serde_json::json;
use std::net::TcpListener;
use std::path::PathBuf;

fn can_bind_localhost() -> bool {
    TcpListener::bind("127.0.0.1:0").is_ok()
}

fn client_for(server: &MockServer) -> AptlyClient {
    AptlyClient::new(&ClientConfig::new(server.base_url())).unwrap()
}

#[test]
fn test_basic_auth_and_repo_listing() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/repos")
            .header("authorization", "Basic Ym9iOnB3");
        then.status(200)
            .json_body(json!([{"Name": "team_r1", "Comment": ""}, {"Name": "r2"}]));
    });

    let mut config = ClientConfig::new(format!("{}/", server.base_url()));
    config.basic_auth = Some(("bob".to_string(), "pw".to_string()));
    let client = AptlyClient::new(&config).unwrap();
    assert_eq!(client.base_url(), server.base_url());

    let repos = client.list_local_repos().unwrap();
    mock.assert();
    assert_eq!(repos.len(), 2);
    assert_eq!(repos[0].name, "team_r1");
    assert_eq!(repos[1].comment, "");
}

#[test]
fn test_snapshot_from_refs_request_shape() {
    if !can_bind_localhost() {
        return;
    }
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/snapshots").json_body(json!({
            "Name": "r1.test.X.100.alice",
            "SourceSnapshots": ["r1-snap-temp-new-pkgs"],
            "Description": "r1.test.X.100.alice",
            "PackageRefs": ["Pall pizza 1.0 abc123"]
        }));
        then.status(201).json_body(json!({"Name": "r1.test.X.100.alice"}));
    });

    let refs = vec![PackageRef::new("all", "pizza", "1.0", "abc123")];
    client_for(&server)
        .create_snapshot_from_refs(
            "r1.test.X.100.alice",
            &["r1-snap-temp-new-pkgs".to_string()],
            &refs,
        )
        .unwrap();
    mock.assert();
}

#[test]
fn test_publish_and_republish_bodies() {
    if !can_bind_localhost() {
        return;
    }
    let server = MockServer::start();
    let publish = server.mock(|when, then| {
        when.method(POST).path("/publish/team_r1").json_body(json!({
            "SourceKind": "snapshot",
            "Sources": [{"Name": "snap1"}],
            "Architectures": ["amd64", "all"],
            "Distribution": "testing",
            "Signing": {"GpgKey": "ABCDEF01"}
        }));
        then.status(201).json_body(json!({}));
    });
    let republish = server.mock(|when, then| {
        when.method(PUT)
            .path("/publish/team_r1/staging")
            .json_body(json!({"Snapshots": [{"Component": "main", "Name": "snap1"}]}));
        then.status(200).json_body(json!({}));
    });

    let client = client_for(&server);
    let architectures = vec!["amd64".to_string(), "all".to_string()];
    client
        .publish(&PublishRequest {
            local_repo: "team_r1",
            distribution: "testing",
            snapshot: "snap1",
            architectures: &architectures,
            gpg_key: Some("ABCDEF01"),
        })
        .unwrap();
    client.republish("team_r1", "staging", "snap1").unwrap();
    publish.assert();
    republish.assert();
}

#[test]
fn test_list_publications() {
    if !can_bind_localhost() {
        return;
    }
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/publish");
        then.status(200).json_body(json!([{
            "Prefix": "team/r1",
            "Distribution": "unstable",
            "SourceKind": "snapshot",
            "Sources": [{"Component": "main", "Name": "team_r1.create.abcd1234.1.bob"}],
            "Architectures": ["amd64"]
        }]));
    });

    let publications = client_for(&server).list_publications().unwrap();
    assert_eq!(publications.len(), 1);
    assert_eq!(publications[0].prefix, "team/r1");
    assert_eq!(publications[0].source_kind, SourceKind::Snapshot);
}

#[test]
fn test_drop_missing_snapshot_is_ignored() {
    if !can_bind_localhost() {
        return;
    }
    let server = MockServer::start();
    let missing = server.mock(|when, then| {
        when.method(DELETE)
            .path("/snapshots/gone")
            .query_param("force", "1");
        then.status(404).json_body(json!({"error": "snapshot not found"}));
    });
    let locked = server.mock(|when, then| {
        when.method(DELETE).path("/snapshots/locked");
        then.status(409).json_body(json!({"error": "snapshot is published"}));
    });

    let client = client_for(&server);
    client.drop_snapshot("gone").unwrap();
    missing.assert();

    let err = client.drop_snapshot("locked").unwrap_err();
    locked.assert();
    assert_eq!(err.status(), Some(409));
    match err {
        Error::RemoteApi { detail, .. } => {
            assert_eq!(detail.as_deref(), Some("snapshot is published"));
        }
        other => panic!("expected remote error, got {other:?}"),
    }
}

#[test]
fn test_unauthorized_is_remote_error() {
    if !can_bind_localhost() {
        return;
    }
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/publish");
        then.status(401).body("Unauthorized");
    });

    let err = client_for(&server).list_publications().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RemoteApi);
    assert_eq!(err.status(), Some(401));
    assert_eq!(err.to_string(), "[HTTP 401] - Failed to list publications");
}

#[test]
fn test_server_error_list_detail() {
    if !can_bind_localhost() {
        return;
    }
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/repos/r1/snapshots");
        then.status(400).json_body(json!([
            {"error": "unable to create snapshot", "meta": "snapshot exists"}
        ]));
    });

    let err = client_for(&server)
        .create_snapshot_from_repo("r1", "r1.deploy.abcd1234.1.bob")
        .unwrap_err();
    match err {
        Error::RemoteApi { status, detail, .. } => {
            assert_eq!(status, 400);
            assert_eq!(
                detail.as_deref(),
                Some("unable to create snapshot\nsnapshot exists")
            );
        }
        other => panic!("expected remote error, got {other:?}"),
    }
}

#[test]
fn test_filter_packages_and_malformed_refs() {
    if !can_bind_localhost() {
        return;
    }
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET)
            .path("/snapshots/snap1/packages")
            .query_param("q", "Name (= pizza)");
        then.status(200)
            .json_body(json!(["Pamd64 pizza 1.0 aaa", "Pall pizza 1.1 bbb"]));
    });
    server.mock(|when, then| {
        when.method(GET).path("/snapshots/broken/packages");
        then.status(200).json_body(json!(["Pamd64 pizza"]));
    });

    let client = client_for(&server);
    let refs = client
        .filter_snapshot_packages("snap1", "Name (= pizza)")
        .unwrap();
    assert_eq!(refs.len(), 2);
    assert_eq!(refs[0].architecture, "amd64");
    assert_eq!(refs[1].version, "1.1");

    let err = client.snapshot_packages("broken").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedRecord);
}

#[test]
fn test_upload_and_add_files() {
    if !can_bind_localhost() {
        return;
    }
    let temp_dir = tempfile::tempdir().unwrap();
    let deb = temp_dir.path().join("pizza_1.0_all.deb");
    std::fs::write(&deb, b"!<arch>\n").unwrap();

    let server = MockServer::start();
    let upload = server.mock(|when, then| {
        when.method(POST)
            .path("/files/alice")
            .body_contains("pizza_1.0_all.deb");
        then.status(200)
            .json_body(json!(["alice/pizza_1.0_all.deb"]));
    });
    let add = server.mock(|when, then| {
        when.method(POST).path("/repos/r1/file/alice/pizza_1.0_all.deb");
        then.status(200).json_body(json!({"Report": {}}));
    });

    let client = client_for(&server);
    let paths = client.upload_files("alice", &[deb]).unwrap();
    assert_eq!(paths, ["alice/pizza_1.0_all.deb"]);
    client.add_uploaded_file("r1", &paths[0]).unwrap();
    upload.assert();
    add.assert();

    let err = client
        .upload_files("alice", &[PathBuf::from("/nonexistent/x_1_all.deb")])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Local);
}

#[test]
fn test_delete_refs_and_version() {
    if !can_bind_localhost() {
        return;
    }
    let server = MockServer::start();
    let delete = server.mock(|when, then| {
        when.method(DELETE)
            .path("/repos/r1/packages")
            .json_body(json!({"PackageRefs": ["Pall pizza 1.0 abc"]}));
        then.status(200).json_body(json!({}));
    });
    server.mock(|when, then| {
        when.method(GET).path("/version");
        then.status(200).json_body(json!({"Version": "1.5.0"}));
    });

    let client = client_for(&server);
    client
        .delete_package_refs("r1", &[PackageRef::new("all", "pizza", "1.0", "abc")])
        .unwrap();
    delete.assert();
    assert_eq!(client.server_version().unwrap().version, "1.5.0");
}

#[test]
fn test_unreachable_server_is_transport_error() {
    let client = AptlyClient::new(&ClientConfig::new("http://127.0.0.1:1/api")).unwrap();
    let err = client.server_version().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
}

#[test]
fn test_cert_without_key_is_rejected() {
    let mut config = ClientConfig::new("https://repo.example.com/api");
    config.cert = Some(PathBuf::from("/tmp/client.crt"));
    assert!(matches!(AptlyClient::new(&config), Err(Error::Config(_))));
}
