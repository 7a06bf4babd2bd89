use std::path::Path;

use proptest::prelude::*;
use tempfile::TempDir;
use vessel_build::collect::{collect_and_prefix, glob};
use vessel_core::file::normalize_prefix;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn client_dist() -> TempDir {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "app.3f2a.js", "app");
    write(tmp.path(), "vendors/commons.9c1d.js", "vendors");
    write(tmp.path(), "img/logo.png", "png");
    write(tmp.path(), "LICENSES", "mit");
    tmp
}

#[test]
fn glob_matches_recursively_with_relative_keys() {
    let tmp = client_dist();
    let files = glob("**", tmp.path()).unwrap();
    let keys: Vec<&str> = files.paths().collect();
    assert_eq!(
        keys,
        ["LICENSES", "app.3f2a.js", "img/logo.png", "vendors/commons.9c1d.js"]
    );
    assert_eq!(
        files.get("img/logo.png").unwrap().fs_path(),
        Some(tmp.path().join("img/logo.png").as_path())
    );
}

#[test]
fn star_does_not_cross_directories() {
    let tmp = client_dist();
    let files = glob("*.js", tmp.path()).unwrap();
    assert_eq!(files.paths().collect::<Vec<_>>(), ["app.3f2a.js"]);

    let files = glob("**/*.js", tmp.path()).unwrap();
    assert_eq!(files.len(), 2);
}

#[test]
fn plain_directory_pattern_selects_contents() {
    let tmp = client_dist();
    let files = glob("vendors", tmp.path()).unwrap();
    assert_eq!(files.paths().collect::<Vec<_>>(), ["vendors/commons.9c1d.js"]);
}

#[test]
fn missing_source_dir_is_empty() {
    let tmp = TempDir::new().unwrap();
    let files = glob("**", &tmp.path().join("does-not-exist")).unwrap();
    assert!(files.is_empty());
}

#[test]
fn invalid_pattern_is_an_error() {
    let tmp = client_dist();
    let err = glob("[", tmp.path()).unwrap_err();
    assert!(err.to_string().contains("invalid glob pattern"), "got: {err}");
}

#[test]
fn prefix_is_normalized() {
    let tmp = client_dist();
    let files = collect_and_prefix("*.js", tmp.path(), "/_nuxt").unwrap();
    assert_eq!(files.paths().collect::<Vec<_>>(), ["_nuxt/app.3f2a.js"]);

    let files = collect_and_prefix("*.js", tmp.path(), "./").unwrap();
    assert_eq!(files.paths().collect::<Vec<_>>(), ["app.3f2a.js"]);
}

#[cfg(unix)]
#[test]
fn symlinks_are_collected_with_link_mode() {
    let tmp = client_dist();
    std::os::unix::fs::symlink("app.3f2a.js", tmp.path().join("app.js")).unwrap();
    let files = glob("app.js", tmp.path()).unwrap();
    assert_eq!(files.get("app.js").unwrap().mode() & 0o170000, 0o120000);
}

fn segment() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,6}"
}

proptest! {
    #[test]
    fn collect_and_prefix_preserves_glob_keys(
        files in prop::collection::btree_set(
            prop::collection::vec(segment(), 1..4).prop_map(|s| s.join("/")),
            1..8,
        ),
        prefix in prop::collection::vec(segment(), 0..3).prop_map(|s| s.join("/")),
    ) {
        let tmp = TempDir::new().unwrap();
        for rel in &files {
            // Skip paths that would need an existing file to be a directory.
            let path = tmp.path().join(rel);
            if path.exists() || path.ancestors().skip(1).any(|a| a.is_file()) {
                continue;
            }
            if std::fs::create_dir_all(path.parent().unwrap()).is_err() {
                continue;
            }
            std::fs::write(&path, rel).unwrap();
        }

        let plain = glob("**", tmp.path()).unwrap();
        let prefixed = collect_and_prefix("**", tmp.path(), &prefix).unwrap();
        let normalized = normalize_prefix(&prefix);

        prop_assert_eq!(plain.len(), prefixed.len());
        for key in prefixed.paths() {
            prop_assert!(key.starts_with(&normalized));
            prop_assert!(plain.contains(&key[normalized.len()..]));
        }
    }
}
