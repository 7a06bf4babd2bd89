use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

fn vessel() -> assert_cmd::Command {
    cargo_bin_cmd!("vessel")
}

fn nuxt_project(package_json: &str) -> TempDir {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("package.json"), package_json).unwrap();
    std::fs::write(tmp.path().join("nuxt.config.js"), "module.exports = {}").unwrap();
    tmp
}

// ── Help / Version ──

#[test]
fn shows_help() {
    vessel()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serverless functions"));
}

#[test]
fn shows_version() {
    vessel()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("vessel"));
}

// ── Inspect ──

#[test]
fn inspect_reports_paths_and_framework() {
    let tmp = nuxt_project(
        r#"{"dependencies":{"nuxt-edge":"2.16.0"},"scripts":{"now-build":"node x.js"}}"#,
    );

    vessel()
        .args(["inspect", "--work-path"])
        .arg(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("installer:     yarn"))
        .stdout(predicate::str::contains("nuxt-edge 2.16.0 (edge, core package @nuxt/core-edge)"))
        .stdout(predicate::str::contains("config:        nuxt.config.js"))
        .stdout(predicate::str::contains("build hook:    now-build"))
        .stdout(predicate::str::contains(
            "prepare → install-dev → pre-build → framework-build → install-prod → collect-artifacts",
        ));
}

#[test]
fn inspect_detects_npm_from_lockfile() {
    let tmp = nuxt_project(r#"{"dependencies":{"nuxt":"^2.15.8"}}"#);
    std::fs::write(tmp.path().join("package-lock.json"), "{}").unwrap();

    vessel()
        .args(["inspect", "--work-path"])
        .arg(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("installer:     npm"))
        .stdout(predicate::str::contains("build hook:    none"))
        .stdout(predicate::str::contains("pre-build").not());
}

#[test]
fn inspect_rejects_escaping_entrypoint() {
    let tmp = nuxt_project("{}");

    vessel()
        .args(["inspect", "--entrypoint", "../package.json", "--work-path"])
        .arg(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("entrypoint"));
}

#[test]
fn inspect_without_manifest_fails() {
    let tmp = TempDir::new().unwrap();

    vessel()
        .args(["inspect", "--work-path"])
        .arg(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("package.json"));
}

// ── Build ──

#[test]
fn build_requires_input() {
    vessel()
        .arg("build")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--input"));
}

#[test]
fn build_rejects_malformed_request() {
    let tmp = TempDir::new().unwrap();
    let request = tmp.path().join("build.json");
    std::fs::write(&request, r#"{"entrypoint": 42}"#).unwrap();

    vessel()
        .args(["build", "--input"])
        .arg(&request)
        .assert()
        .failure();
}

#[test]
fn build_rejects_invalid_entrypoint_before_any_stage() {
    let tmp = TempDir::new().unwrap();
    let request = tmp.path().join("build.json");
    let body = serde_json::json!({
        "entrypoint": "server.js",
        "workPath": tmp.path().join("work"),
    });
    std::fs::write(&request, body.to_string()).unwrap();

    vessel()
        .args(["build", "--input"])
        .arg(&request)
        .assert()
        .failure()
        .stderr(predicate::str::contains("server.js"));
    assert!(!tmp.path().join("work").exists());
}
