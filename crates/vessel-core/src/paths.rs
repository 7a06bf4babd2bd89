//! Working directories derived from the work path and the entrypoint.

use std::path::{Component, Path, PathBuf};

/// Entrypoint file names accepted by the builder.
pub const ENTRYPOINT_FILE_NAMES: &[&str] = &["package.json", "nuxt.config.js", "nuxt.config.ts"];

/// Module-install directory, relative to the entry path.
pub const MODULES_DIR: &str = "node_modules";

/// Installer cache directory, relative to the entry path.
pub const CACHE_DIR: &str = ".vercel_cache";

/// Directories resolved for one build run.
///
/// Computed by [`BuildPaths::resolve`] without touching the filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPaths {
    /// Root the input files are materialized into
    pub work_path: PathBuf,
    /// Parent of the entrypoint, relative to `work_path` (`.` for the root)
    pub entry_dir: PathBuf,
    /// `work_path` joined with `entry_dir`
    pub entry_path: PathBuf,
    /// `entry_path/node_modules`
    pub modules_path: PathBuf,
    /// `entry_path/.vercel_cache`
    pub cache_path: PathBuf,
}

impl BuildPaths {
    /// Resolve the working directories for `entrypoint` under `work_path`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidEntrypoint`](crate::Error::InvalidEntrypoint) when the
    /// entrypoint is empty, absolute, escapes the work path, or does not name
    /// one of [`ENTRYPOINT_FILE_NAMES`].
    pub fn resolve(work_path: &Path, entrypoint: &str) -> crate::Result<Self> {
        let invalid = |reason| crate::Error::InvalidEntrypoint {
            entrypoint: entrypoint.to_owned(),
            reason,
        };

        if entrypoint.trim().is_empty() {
            return Err(invalid("entrypoint is empty"));
        }

        let entry = Path::new(entrypoint);
        if entry.has_root() || entrypoint.starts_with('/') {
            return Err(invalid("entrypoint must be relative to the work path"));
        }
        if entry.components().any(|c| matches!(c, Component::ParentDir)) {
            return Err(invalid("entrypoint must not leave the work path"));
        }

        let file_name = entry
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| invalid("entrypoint has no file name"))?;
        if !ENTRYPOINT_FILE_NAMES.contains(&file_name) {
            return Err(invalid(
                "entrypoint must be package.json, nuxt.config.js or nuxt.config.ts",
            ));
        }

        let entry_dir: PathBuf = entry
            .parent()
            .map(|p| {
                p.components()
                    .filter(|c| matches!(c, Component::Normal(_)))
                    .collect::<PathBuf>()
            })
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| PathBuf::from("."));

        let entry_path = if entry_dir == Path::new(".") {
            work_path.to_path_buf()
        } else {
            work_path.join(&entry_dir)
        };

        Ok(Self {
            work_path: work_path.to_path_buf(),
            modules_path: entry_path.join(MODULES_DIR),
            cache_path: entry_path.join(CACHE_DIR),
            entry_dir,
            entry_path,
        })
    }

    /// Directory one install pass writes into (`node_modules_dev`, `node_modules_prod`).
    pub fn modules_flavor_path(&self, flavor: &str) -> PathBuf {
        self.entry_path.join(format!("{MODULES_DIR}_{flavor}"))
    }

    /// Per-installer cache directory under [`cache_path`](Self::cache_path).
    pub fn installer_cache_path(&self, installer: &str) -> PathBuf {
        self.cache_path.join(installer)
    }

    /// Output directory of the TypeScript precompilation.
    pub fn tsc_out_path(&self) -> PathBuf {
        self.cache_path.join("tsc")
    }
}
