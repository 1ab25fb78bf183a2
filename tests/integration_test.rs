use assert_cmd::Command;
use assert_cmd::cargo;
use mockito::{Matcher, Server};
use predicates::prelude::*;
use std::path::Path;
use tempfile::tempdir;

fn pkgmirror(root: &Path, registry: &str) -> Command {
    let mut cmd = Command::new(cargo::cargo_bin!("pkgmirror"));
    cmd.env_remove("PKGMIRROR_UPSTREAM_TOKEN")
        .env_remove("PKGMIRROR_SYNC_BY_INSTALL")
        .arg("--root")
        .arg(root)
        .arg("--registry")
        .arg(registry);
    cmd
}

fn manifest_body(name: &str, dependencies: &str) -> String {
    format!(
        r#"{{
            "_id": "{name}",
            "name": "{name}",
            "description": "{name} package",
            "dist-tags": {{ "latest": "1.0.0" }},
            "versions": {{
                "0.0.1": {{
                    "name": "{name}",
                    "version": "0.0.1",
                    "dependencies": {{}},
                    "dist": {{ "tarball": "https://registry.npmjs.org/{name}/-/{name}-0.0.1.tgz", "shasum": "aaa" }}
                }},
                "1.0.0": {{
                    "name": "{name}",
                    "version": "1.0.0",
                    "dependencies": {dependencies},
                    "dist": {{ "tarball": "https://registry.npmjs.org/{name}/-/{name}-1.0.0.tgz", "shasum": "bbb" }}
                }}
            }},
            "maintainers": [{{ "name": "fengmk2", "email": "fengmk2@gmail.com" }}],
            "time": {{
                "created": "2013-01-01T00:00:00.000Z",
                "modified": "2014-01-01T00:00:00.000Z",
                "0.0.1": "2013-01-01T00:00:00.000Z",
                "1.0.0": "2014-01-01T00:00:00.000Z"
            }}
        }}"#
    )
}

fn etag_from(stderr: &[u8]) -> String {
    String::from_utf8_lossy(stderr)
        .lines()
        .find_map(|line| line.strip_prefix("etag: "))
        .map(str::to_string)
        .unwrap()
}

#[test]
fn test_sync_then_show() {
    let mut server = Server::new();
    let url = server.url();

    let pedding = server
        .mock("GET", "/pedding")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(manifest_body("pedding", r#"{ "dep-a": "^1.0.0" }"#))
        .expect(1)
        .create();
    let dep = server
        .mock("GET", "/dep-a")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(manifest_body("dep-a", "{}"))
        .expect(1)
        .create();

    let root = tempdir().unwrap();

    pkgmirror(root.path(), &url)
        .arg("sync")
        .arg("pedding")
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""name": "pedding""#))
        .stdout(predicate::str::contains(r#""dep-a": {"#))
        .stdout(predicate::str::contains(r#""result": "synced""#));

    pedding.assert();
    dep.assert();
    assert!(root.path().join("packages/pedding.json").exists());
    assert!(root.path().join("packages/dep-a.json").exists());

    let output = pkgmirror(root.path(), &url)
        .arg("show")
        .arg("pedding")
        .assert()
        .success()
        .get_output()
        .clone();

    let body: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(body["_id"], "pedding");
    let versions: Vec<&String> = body["versions"].as_object().unwrap().keys().collect();
    assert_eq!(versions, vec!["1.0.0", "0.0.1"]);
    assert_eq!(body["time"]["modified"], "2014-01-01T00:00:00.000Z");

    // A conditional read with the returned validator has no body.
    let etag = etag_from(&output.stderr);
    pkgmirror(root.path(), &url)
        .arg("show")
        .arg("pedding")
        .arg("--if-none-match")
        .arg(&etag)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_show_missing_without_sync_by_install() {
    let mut server = Server::new();
    let url = server.url();
    let upstream = server.mock("GET", Matcher::Any).expect(0).create();

    let root = tempdir().unwrap();
    pkgmirror(root.path(), &url)
        .arg("show")
        .arg("pedding")
        .assert()
        .failure()
        .stdout(predicate::str::contains(
            r#"{"error":"not_found","reason":"document not found"}"#,
        ));

    upstream.assert();
}

#[test]
fn test_show_syncs_on_miss() {
    let mut server = Server::new();
    let url = server.url();
    let pedding = server
        .mock("GET", "/pedding")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(manifest_body("pedding", "{}"))
        .expect(1)
        .create();

    let root = tempdir().unwrap();
    pkgmirror(root.path(), &url)
        .arg("--sync-by-install")
        .arg("show")
        .arg("pedding")
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""name": "pedding""#))
        .stderr(predicate::str::contains("etag: \""));

    pedding.assert();
}

#[test]
fn test_scoped_package_is_never_synced_on_miss() {
    let mut server = Server::new();
    let url = server.url();
    let upstream = server.mock("GET", Matcher::Any).expect(0).create();

    let root = tempdir().unwrap();
    pkgmirror(root.path(), &url)
        .arg("--sync-by-install")
        .arg("show")
        .arg("@scope/pedding")
        .assert()
        .failure()
        .stdout(predicate::str::contains("not_found"));

    upstream.assert();
}

#[test]
fn test_upstream_failure_reads_as_not_found() {
    let mut server = Server::new();
    let url = server.url();
    let _missing = server.mock("GET", "/ghost").with_status(404).create();

    let root = tempdir().unwrap();
    pkgmirror(root.path(), &url)
        .arg("--sync-by-install")
        .arg("show")
        .arg("ghost")
        .assert()
        .failure()
        .stdout(predicate::str::contains("not_found"));

    pkgmirror(root.path(), &url)
        .arg("sync")
        .arg("ghost")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found upstream"));
}

#[test]
fn test_unpublished_package() {
    let mut server = Server::new();
    let url = server.url();
    let _tfs = server
        .mock("GET", "/tfs")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
                "_id": "tfs",
                "name": "tfs",
                "time": {
                    "created": "2013-12-01T00:00:00.000Z",
                    "modified": "2014-01-01T00:00:00.000Z",
                    "unpublished": {
                        "name": "fengmk2",
                        "time": "2014-01-01T00:00:00.000Z",
                        "description": "tfs",
                        "versions": ["0.0.1"],
                        "tags": { "latest": "0.0.1" }
                    }
                }
            }"#,
        )
        .create();

    let root = tempdir().unwrap();
    pkgmirror(root.path(), &url)
        .arg("sync")
        .arg("tfs")
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""unpublished": true"#));

    let output = pkgmirror(root.path(), &url)
        .arg("show")
        .arg("tfs")
        .assert()
        .failure()
        .get_output()
        .clone();
    let body: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(body["time"]["unpublished"]["name"], "fengmk2");
    assert_eq!(body["time"]["unpublished"]["description"], "tfs");
    assert!(body.get("versions").is_none());
}

#[test]
fn test_publish_tag_and_star() {
    let mut server = Server::new();
    let url = server.url();
    let upstream = server.mock("GET", Matcher::Any).expect(0).create();

    let root = tempdir().unwrap();
    let manifests = tempdir().unwrap();
    for version in ["0.0.1", "1.0.0"] {
        let path = manifests.path().join(format!("{version}.json"));
        std::fs::write(
            &path,
            format!(
                r#"{{
                    "name": "@cnpm/testmodule",
                    "version": "{version}",
                    "dist": {{ "tarball": "http://localhost/testmodule-{version}.tgz", "shasum": "abc" }},
                    "maintainers": [{{ "name": "cnpmjstest10", "email": "cnpmjstest10@cnpmjs.org" }}]
                }}"#
            ),
        )
        .unwrap();

        pkgmirror(root.path(), &url)
            .arg("publish")
            .arg(&path)
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""ok":true"#));
    }

    let output = pkgmirror(root.path(), &url)
        .arg("tag")
        .arg("@cnpm/testmodule")
        .arg("old")
        .arg("0.0.1")
        .assert()
        .success()
        .get_output()
        .clone();
    let tagged: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();

    pkgmirror(root.path(), &url)
        .arg("tag")
        .arg("@cnpm/testmodule")
        .arg("beta")
        .arg("9.9.9")
        .assert()
        .failure();

    pkgmirror(root.path(), &url)
        .arg("star")
        .arg("@cnpm/testmodule")
        .arg("fengmk2")
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""changed":true"#));

    let output = pkgmirror(root.path(), &url)
        .arg("show")
        .arg("@cnpm/testmodule")
        .assert()
        .success()
        .get_output()
        .clone();
    let body: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let versions: Vec<&String> = body["versions"].as_object().unwrap().keys().collect();
    assert_eq!(versions, vec!["1.0.0", "0.0.1"]);
    assert_eq!(body["dist-tags"]["old"], "0.0.1");
    assert_eq!(body["dist-tags"]["latest"], "1.0.0");
    assert_eq!(body["time"]["modified"], body["time"]["0.0.1"]);
    assert_eq!(body["time"]["modified"], tagged["modified"]);
    assert_eq!(body["users"]["fengmk2"], true);

    upstream.assert();
}
