use std::path::Path;

use semver::Version;
use tempfile::TempDir;
use vessel_build::launcher::{BRIDGE_FILE, HANDLER, LAUNCHER_FILE};
use vessel_build::package::{
    FrameworkCheckError, PackageInputs, ResourceLimits, assemble, check_framework_version,
};
use vessel_build::{LauncherParams, LauncherTemplate};
use vessel_core::manifest::DependencySection;
use vessel_core::{FileRef, FileSet, FrameworkDependency};

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "package.json", r#"{"dependencies":{"@nuxt/core":"2.15.8"}}"#);
    write(tmp.path(), "nuxt.config.js", "module.exports = {}");
    write(tmp.path(), "secrets.json", r#"{"key":"value"}"#);
    write(tmp.path(), "server/api.js", "module.exports = () => {}");
    tmp
}

fn inputs<'a>(
    entry: &'a Path,
    template: &'a LauncherTemplate,
    extra_patterns: &[&str],
) -> PackageInputs<'a> {
    PackageInputs {
        runtime: "nodejs22.x".to_owned(),
        launcher: LauncherParams {
            framework_suffix: String::new(),
            config_path: "./nuxt.config.js".to_owned(),
            internal_server: false,
        },
        template,
        config_file: (
            "nuxt.config.js".to_owned(),
            FileRef::fs(entry.join("nuxt.config.js")),
        ),
        server_dist: FileSet::new().with(
            ".nuxt/dist/server/server.js",
            FileRef::blob("module.exports = {}"),
        ),
        compiled_typescript: FileSet::new(),
        node_modules: FileSet::new().with(
            "node_modules/@nuxt/core/package.json",
            FileRef::blob(r#"{"version":"2.15.8"}"#),
        ),
        entry_path: entry,
        extra_patterns: extra_patterns.iter().map(|p| (*p).to_owned()).collect(),
        limits: ResourceLimits {
            max_duration: Some(30),
            memory: None,
        },
    }
}

fn framework(suffix: &str) -> FrameworkDependency {
    FrameworkDependency {
        name: format!("nuxt{suffix}"),
        version: "^2.15.0".to_owned(),
        suffix: suffix.to_owned(),
        section: DependencySection::Dependencies,
    }
}

// ── Assembly ──

#[test]
fn package_contains_glue_runtime_and_manifest() {
    let tmp = project();
    let template = LauncherTemplate::default();
    let package = assemble(inputs(tmp.path(), &template, &[])).unwrap();

    for key in [
        LAUNCHER_FILE,
        BRIDGE_FILE,
        "nuxt.config.js",
        ".nuxt/dist/server/server.js",
        "node_modules/@nuxt/core/package.json",
        "package.json",
    ] {
        assert!(package.files.contains(key), "missing {key}");
    }
    assert_eq!(package.handler, HANDLER);
    assert_eq!(package.runtime, "nodejs22.x");
    assert_eq!(package.environment["NODE_ENV"], "production");
    assert_eq!(package.limits.max_duration, Some(30));
    assert_eq!(package.limits.memory, None);
}

#[test]
fn included_file_keeps_its_logical_path() {
    let tmp = project();
    let template = LauncherTemplate::default();
    let package = assemble(inputs(tmp.path(), &template, &["secrets.json", "server/**"])).unwrap();

    assert_eq!(
        package.files.get("secrets.json").unwrap().fs_path(),
        Some(tmp.path().join("secrets.json").as_path())
    );
    assert!(package.files.contains("server/api.js"));
}

#[test]
fn missing_include_pattern_contributes_nothing() {
    let tmp = project();
    let template = LauncherTemplate::default();
    let without = assemble(inputs(tmp.path(), &template, &[])).unwrap();
    let with_missing = assemble(inputs(tmp.path(), &template, &["does-not-exist.json"])).unwrap();
    assert_eq!(without.files, with_missing.files);
}

#[test]
fn launcher_is_rendered_into_the_package() {
    let tmp = project();
    let template = LauncherTemplate::default();
    let package = assemble(inputs(tmp.path(), &template, &[])).unwrap();

    let launcher = package.files.get(LAUNCHER_FILE).unwrap().contents().unwrap();
    let launcher = String::from_utf8_lossy(&launcher);
    assert!(launcher.contains("require('@nuxt/core')"));
    assert!(!launcher.contains("__NUXT_"));
}

#[test]
fn broken_launcher_template_fails_packaging() {
    let tmp = project();
    let template = LauncherTemplate::from_source("module.exports = {}");
    let err = assemble(inputs(tmp.path(), &template, &[])).unwrap_err();
    assert!(err.to_string().contains("placeholder"), "got: {err}");
}

#[test]
fn serialized_package_omits_unset_limits() {
    let tmp = project();
    let template = LauncherTemplate::default();
    let package = assemble(inputs(tmp.path(), &template, &[])).unwrap();
    let json = serde_json::to_value(&package).unwrap();

    assert_eq!(json["handler"], HANDLER);
    assert_eq!(json["maxDuration"], 30);
    assert!(json.get("memory").is_none());
    assert_eq!(json["files"]["vercel__bridge.js"]["type"], "FileBlob");
}

// ── Digest ──

#[test]
fn digest_is_reproducible() {
    let tmp = project();
    let template = LauncherTemplate::default();
    let a = assemble(inputs(tmp.path(), &template, &["secrets.json"])).unwrap();
    let b = assemble(inputs(tmp.path(), &template, &["secrets.json"])).unwrap();

    let digest = a.digest().unwrap();
    assert_eq!(digest, b.digest().unwrap());
    assert_eq!(digest.len(), 64);
}

#[test]
fn digest_tracks_file_content() {
    let tmp = project();
    let template = LauncherTemplate::default();
    let before = assemble(inputs(tmp.path(), &template, &["secrets.json"]))
        .unwrap()
        .digest()
        .unwrap();

    write(tmp.path(), "secrets.json", r#"{"key":"rotated"}"#);
    let after = assemble(inputs(tmp.path(), &template, &["secrets.json"]))
        .unwrap()
        .digest()
        .unwrap();

    assert_ne!(before, after);
}

// ── Framework version ──

fn installed(version: &str, suffix: &str) -> TempDir {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        &format!("@nuxt/core{suffix}/package.json"),
        &format!(r#"{{"name":"@nuxt/core{suffix}","version":"{version}"}}"#),
    );
    tmp
}

#[test]
fn supported_version_is_accepted() {
    let modules = installed("2.15.8", "");
    let version = check_framework_version(modules.path(), &framework("")).unwrap();
    assert_eq!(version, Version::new(2, 15, 8));
}

#[test]
fn version_below_minimum_is_rejected() {
    let modules = installed("2.3.0", "");
    let err = check_framework_version(modules.path(), &framework("")).unwrap_err();
    match err {
        FrameworkCheckError::Unsupported {
            detected, minimum, ..
        } => {
            assert_eq!(detected, Version::new(2, 3, 0));
            assert_eq!(minimum, Version::new(2, 4, 0));
        }
        other => panic!("expected unsupported version, got {other:?}"),
    }
}

#[test]
fn version_above_ceiling_only_warns() {
    let modules = installed("3.1.0", "-edge");
    let version = check_framework_version(modules.path(), &framework("-edge")).unwrap();
    assert_eq!(version, Version::new(3, 1, 0));
}

#[test]
fn missing_core_package_is_not_resolvable() {
    let modules = installed("2.15.8", "");
    let err = check_framework_version(modules.path(), &framework("-edge")).unwrap_err();
    match err {
        FrameworkCheckError::NotResolvable { package, path, .. } => {
            assert_eq!(package, "@nuxt/core-edge");
            assert!(path.ends_with("@nuxt/core-edge/package.json"));
        }
        other => panic!("expected not resolvable, got {other:?}"),
    }
}
