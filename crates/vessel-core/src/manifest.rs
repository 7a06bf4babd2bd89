//! `package.json` reading, pruning and writing.
//!
//! The manifest is threaded through the pipeline as a value: read once in
//! `prepare`, left untouched for the development install, then pruned and
//! written back right before the production install.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const MANIFEST_FILE: &str = "package.json";

/// Distribution names of the framework, probed in this order.
const FRAMEWORK_DISTROS: &[&str] = &["nuxt", "nuxt-start", "@nuxt/core"];

/// Variant suffixes, probed in this order (edge builds win over stable ones).
const VARIANT_SUFFIXES: &[&str] = &["-edge", ""];

/// Core package kept in the production manifest.
const CORE_PACKAGE: &str = "@nuxt/core";

/// Scripts run by the `pre-build` stage, first declared wins.
pub const BUILD_HOOK_SCRIPTS: &[&str] = &["vercel-build", "now-build"];

/// Dependency section a declaration was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencySection {
    Dependencies,
    DevDependencies,
}

/// The project's dependency declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub scripts: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dev_dependencies: BTreeMap<String, String>,
    /// Every other field, preserved verbatim.
    #[serde(flatten)]
    pub rest: serde_json::Map<String, serde_json::Value>,
}

/// The framework dependency found by probing the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameworkDependency {
    /// Declared package name, e.g. `nuxt-edge`
    pub name: String,
    /// Declared version range
    pub version: String,
    /// Variant suffix (`-edge` or empty)
    pub suffix: String,
    pub section: DependencySection,
}

impl FrameworkDependency {
    /// Name of the core runtime package for this variant, e.g. `@nuxt/core-edge`.
    pub fn core_package(&self) -> String {
        format!("{CORE_PACKAGE}{}", self.suffix)
    }
}

impl Manifest {
    /// Read `package.json` from `dir`.
    ///
    /// # Errors
    ///
    /// [`Error::ManifestNotFound`](crate::Error::ManifestNotFound) if the file
    /// is missing, [`Error::ManifestParse`](crate::Error::ManifestParse) if it
    /// is not a JSON object.
    pub fn read(dir: &Path) -> crate::Result<Self> {
        let path = dir.join(MANIFEST_FILE);
        let content =
            std::fs::read_to_string(&path).map_err(|e| crate::Error::ManifestNotFound {
                dir: dir.to_path_buf(),
                source: e,
            })?;
        serde_json::from_str(&content).map_err(|e| crate::Error::ManifestParse { path, source: e })
    }

    /// Overwrite `package.json` in `dir`. Writing the same value twice yields
    /// the same bytes.
    pub fn write(&self, dir: &Path) -> crate::Result<PathBuf> {
        let path = dir.join(MANIFEST_FILE);
        let mut content = serde_json::to_string_pretty(self).map_err(|e| {
            crate::Error::ManifestWrite {
                path: path.clone(),
                source: std::io::Error::other(e),
            }
        })?;
        content.push('\n');
        std::fs::write(&path, content).map_err(|e| crate::Error::ManifestWrite {
            path: path.clone(),
            source: e,
        })?;
        tracing::debug!(path = %path.display(), "package.json written");
        Ok(path)
    }

    /// Probe the declared framework dependency.
    ///
    /// Runtime dependencies are searched before dev dependencies; within a
    /// section the edge variant wins over the stable one.
    pub fn framework_dependency(&self) -> Option<FrameworkDependency> {
        let sections = [
            (DependencySection::Dependencies, &self.dependencies),
            (DependencySection::DevDependencies, &self.dev_dependencies),
        ];
        for (section, deps) in sections {
            for suffix in VARIANT_SUFFIXES {
                for distro in FRAMEWORK_DISTROS {
                    let name = format!("{distro}{suffix}");
                    if let Some(version) = deps.get(&name) {
                        return Some(FrameworkDependency {
                            name,
                            version: version.clone(),
                            suffix: (*suffix).to_owned(),
                            section,
                        });
                    }
                }
            }
        }
        None
    }

    /// Production variant of the manifest.
    ///
    /// Drops every dev dependency, removes all framework distributions and
    /// declares the core runtime package of the detected variant under the
    /// declared version range. Pruning an already pruned manifest is a no-op.
    ///
    /// # Errors
    ///
    /// [`Error::NoFrameworkDependency`](crate::Error::NoFrameworkDependency)
    /// when no framework distribution is declared.
    pub fn prune(&self) -> crate::Result<(Manifest, FrameworkDependency)> {
        let framework = self.require_framework()?;

        let mut pruned = self.clone();
        pruned.dev_dependencies.clear();
        for candidate in framework_candidates() {
            pruned.dependencies.remove(&candidate);
        }
        pruned
            .dependencies
            .insert(framework.core_package(), framework.version.clone());

        Ok((pruned, framework))
    }

    /// Like [`framework_dependency`](Self::framework_dependency), but a missing
    /// framework is an error.
    pub fn require_framework(&self) -> crate::Result<FrameworkDependency> {
        self.framework_dependency()
            .ok_or_else(|| crate::Error::NoFrameworkDependency {
                candidates: framework_candidates(),
            })
    }

    /// Returns the manifest without the runtime dependency `name`.
    #[must_use]
    pub fn without_dependency(&self, name: &str) -> Manifest {
        let mut manifest = self.clone();
        manifest.dependencies.remove(name);
        manifest
    }

    pub fn has_dev_dependency(&self, name: &str) -> bool {
        self.dev_dependencies.contains_key(name)
    }

    /// The first declared build-hook script, if any.
    pub fn build_hook(&self) -> Option<&'static str> {
        BUILD_HOOK_SCRIPTS
            .iter()
            .copied()
            .find(|script| self.scripts.contains_key(*script))
    }

    /// `engines.node`, when declared.
    pub fn node_engine(&self) -> Option<&str> {
        self.rest
            .get("engines")
            .and_then(|engines| engines.get("node"))
            .and_then(serde_json::Value::as_str)
    }
}

fn framework_candidates() -> Vec<String> {
    VARIANT_SUFFIXES
        .iter()
        .flat_map(|suffix| {
            FRAMEWORK_DISTROS
                .iter()
                .map(move |distro| format!("{distro}{suffix}"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(json: &str) -> Manifest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn detects_stable_nuxt() {
        let m = manifest(r#"{"dependencies":{"nuxt":"^2.15.8","axios":"^1"}}"#);
        let dep = m.framework_dependency().unwrap();
        assert_eq!(dep.name, "nuxt");
        assert_eq!(dep.suffix, "");
        assert_eq!(dep.core_package(), "@nuxt/core");
    }

    #[test]
    fn edge_variant_wins_within_section() {
        let m = manifest(r#"{"dependencies":{"nuxt":"2.15.0","nuxt-edge":"2.16.0-1"}}"#);
        let dep = m.framework_dependency().unwrap();
        assert_eq!(dep.name, "nuxt-edge");
        assert_eq!(dep.suffix, "-edge");
    }

    #[test]
    fn dev_dependency_is_found() {
        let m = manifest(r#"{"devDependencies":{"nuxt-start":"2.15.0"}}"#);
        let dep = m.framework_dependency().unwrap();
        assert_eq!(dep.section, DependencySection::DevDependencies);
    }

    #[test]
    fn prune_keeps_core_and_runtime_dependencies() {
        let m = manifest(
            r#"{
                "name": "site",
                "dependencies": {"nuxt": "^2.15.8", "axios": "^1.0.0"},
                "devDependencies": {"eslint": "^8", "nuxt-edge": "latest"}
            }"#,
        );
        let (pruned, dep) = m.prune().unwrap();
        assert_eq!(dep.suffix, "");
        assert!(pruned.dev_dependencies.is_empty());
        assert!(!pruned.dependencies.contains_key("nuxt"));
        assert_eq!(pruned.dependencies["@nuxt/core"], "^2.15.8");
        assert_eq!(pruned.dependencies["axios"], "^1.0.0");
        assert_eq!(pruned.name.as_deref(), Some("site"));
    }

    #[test]
    fn prune_without_framework_errors() {
        let m = manifest(r#"{"dependencies":{"vue":"^2"}}"#);
        let err = m.prune().unwrap_err();
        assert!(err.to_string().contains("nuxt"), "got: {err}");
    }

    #[test]
    fn unknown_fields_survive_round_trip() {
        let m = manifest(r#"{"name":"x","private":true,"engines":{"node":"20.x"}}"#);
        assert_eq!(m.node_engine(), Some("20.x"));
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["private"], serde_json::Value::Bool(true));
    }

    #[test]
    fn build_hook_prefers_vercel_build() {
        let m = manifest(r#"{"scripts":{"now-build":"a","vercel-build":"b"}}"#);
        assert_eq!(m.build_hook(), Some("vercel-build"));
        assert_eq!(Manifest::default().build_hook(), None);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn package_name() -> impl Strategy<Value = String> {
            "[a-z][a-z0-9-]{0,10}"
        }

        fn deps() -> impl Strategy<Value = BTreeMap<String, String>> {
            proptest::collection::btree_map(package_name(), "\\^[0-9]\\.[0-9]", 0..5)
        }

        proptest! {
            #[test]
            fn prune_is_idempotent(
                runtime in deps(),
                dev in deps(),
                distro in proptest::sample::select(vec!["nuxt", "nuxt-start", "nuxt-edge", "nuxt-start-edge"]),
                in_dev in any::<bool>(),
            ) {
                let mut m = Manifest {
                    dependencies: runtime,
                    dev_dependencies: dev,
                    ..Manifest::default()
                };
                let target = if in_dev { &mut m.dev_dependencies } else { &mut m.dependencies };
                target.insert(distro.to_owned(), "^2.15.0".to_owned());

                let (once, dep_once) = m.prune().unwrap();
                let (twice, dep_twice) = once.prune().unwrap();

                prop_assert_eq!(dep_once.core_package(), dep_twice.core_package());
                prop_assert_eq!(
                    once.dependencies.get(&dep_once.core_package()),
                    twice.dependencies.get(&dep_twice.core_package())
                );
                prop_assert_eq!(once, twice);
            }
        }
    }
}
