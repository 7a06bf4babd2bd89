//! Workspace preparation: materializing input files, installer support
//! files, registry credentials and the isolated module directories.

use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use vessel_core::{BuildPaths, FileRef, FileSet};

use crate::collect::{self, CollectError};

/// Registry host the auth token is scoped to.
const REGISTRY_HOST: &str = "//registry.npmjs.org/";

const YARNCLEAN: &str = include_str!("../assets/yarnclean");

/// Directories excluded from TypeScript compilation.
const TS_EXCLUDES: &[&str] = &["node_modules_dev", "node_modules_prod"];

/// Registry credentials for the installer.
///
/// Both variants are wrapped in [`SecretString`] so they never reach logs or
/// debug output.
#[derive(Clone, Debug, Default)]
pub enum RegistryAuth {
    #[default]
    None,
    /// Complete `.npmrc` content
    Npmrc(SecretString),
    /// Auth token for the public registry
    Token(SecretString),
}

impl RegistryAuth {
    /// Read `NPM_RC`, then `NPM_AUTH_TOKEN`, then `NPM_TOKEN` from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| match std::env::var(key) {
            Ok(value) => Some(value),
            Err(std::env::VarError::NotPresent) => None,
            Err(e) => {
                tracing::warn!(key, error = %e, "ignoring unreadable registry variable");
                None
            }
        })
    }

    /// Same precedence as [`from_env`](Self::from_env) over an arbitrary lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key| lookup(key).filter(|v: &String| !v.trim().is_empty());
        if let Some(npmrc) = non_empty("NPM_RC") {
            Self::Npmrc(SecretString::from(npmrc))
        } else if let Some(token) = non_empty("NPM_AUTH_TOKEN").or_else(|| non_empty("NPM_TOKEN"))
        {
            Self::Token(SecretString::from(token))
        } else {
            Self::None
        }
    }

    fn npmrc_content(&self) -> Option<String> {
        match self {
            Self::None => None,
            Self::Npmrc(content) => Some(content.expose_secret().to_owned()),
            Self::Token(token) => Some(format!(
                "{REGISTRY_HOST}:_authToken={}\n",
                token.expose_secret()
            )),
        }
    }
}

/// A written `.npmrc`. [`restore`](Self::restore) puts back whatever was there
/// before; dropping an unrestored guard does the same on a best-effort basis
/// so credentials do not outlive an aborted run.
#[derive(Debug)]
pub struct NpmrcGuard {
    path: PathBuf,
    previous: Option<Vec<u8>>,
    restored: bool,
}

impl NpmrcGuard {
    /// Write `.npmrc` into `dir` when `auth` carries credentials.
    pub fn install(dir: &Path, auth: &RegistryAuth) -> Result<Option<Self>, WorkspaceError> {
        let Some(content) = auth.npmrc_content() else {
            return Ok(None);
        };
        let path = dir.join(".npmrc");
        let previous = match std::fs::read(&path) {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(WorkspaceError::Io { path, source: e }),
        };
        std::fs::write(&path, content).map_err(|e| WorkspaceError::Io {
            path: path.clone(),
            source: e,
        })?;
        tracing::info!(path = %path.display(), "registry credentials found; .npmrc written");
        Ok(Some(Self {
            path,
            previous,
            restored: false,
        }))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn restore(mut self) -> Result<(), WorkspaceError> {
        self.restored = true;
        self.put_back()
    }

    fn put_back(&self) -> Result<(), WorkspaceError> {
        let result = match &self.previous {
            Some(bytes) => std::fs::write(&self.path, bytes),
            None => std::fs::remove_file(&self.path),
        };
        result.map_err(|e| WorkspaceError::Io {
            path: self.path.clone(),
            source: e,
        })
    }
}

impl Drop for NpmrcGuard {
    fn drop(&mut self) {
        if self.restored {
            return;
        }
        if let Err(e) = self.put_back() {
            tracing::warn!(error = %e, "failed to remove registry credentials");
        }
    }
}

/// Materialize `files` under `dest`.
pub fn download(files: &FileSet, dest: &Path) -> Result<(), WorkspaceError> {
    for (logical, file) in files.iter() {
        let target = dest.join(logical);
        if file.fs_path() == Some(target.as_path()) {
            continue;
        }
        if let Some(parent) = target.parent() {
            create_dir_all(parent)?;
        }
        match file {
            FileRef::Fs { fs_path, .. } => {
                std::fs::copy(fs_path, &target).map_err(|e| WorkspaceError::Copy {
                    from: fs_path.clone(),
                    to: target.clone(),
                    source: e,
                })?;
            }
            FileRef::Blob { data, .. } => {
                std::fs::write(&target, data).map_err(|e| WorkspaceError::Io {
                    path: target.clone(),
                    source: e,
                })?;
            }
        }
        set_mode(&target, file.mode())?;
    }
    tracing::info!(files = files.len(), dest = %dest.display(), "input files materialized");
    Ok(())
}

/// Copy every file matched by `patterns` (relative to the work path) into
/// the entry path, preserving relative paths.
pub fn copy_build_files(paths: &BuildPaths, patterns: &[String]) -> Result<usize, WorkspaceError> {
    let mut copied = 0;
    for pattern in patterns {
        let files = collect::glob(pattern, &paths.work_path)?;
        if files.is_empty() {
            tracing::warn!(pattern = %pattern, "buildFiles pattern matched no files");
        }
        copied += files.len();
        download(&files, &paths.entry_path)?;
    }
    Ok(copied)
}

/// Write the default `.yarnclean` unless the entry directory or its parent
/// already has one.
pub fn write_yarnclean(entry_path: &Path) -> Result<bool, WorkspaceError> {
    let existing = entry_path.join(".yarnclean").exists()
        || entry_path
            .parent()
            .is_some_and(|p| p.join(".yarnclean").exists());
    if existing {
        return Ok(false);
    }
    let path = entry_path.join(".yarnclean");
    std::fs::write(&path, YARNCLEAN).map_err(|e| WorkspaceError::Io { path, source: e })?;
    Ok(true)
}

/// Point `node_modules` at `node_modules_<flavor>`, creating the latter.
pub fn activate_modules_dir(paths: &BuildPaths, flavor: &str) -> Result<PathBuf, WorkspaceError> {
    let target = paths.modules_flavor_path(flavor);
    create_dir_all(&target)?;

    let link = &paths.modules_path;
    match std::fs::symlink_metadata(link) {
        Ok(meta) if meta.file_type().is_symlink() => remove_link(link)?,
        Ok(meta) if meta.is_dir() => {
            // A checked-in or stale node_modules would shadow the isolated install.
            std::fs::remove_dir_all(link).map_err(|e| WorkspaceError::Io {
                path: link.clone(),
                source: e,
            })?;
        }
        Ok(_) => remove_link(link)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            return Err(WorkspaceError::Io {
                path: link.clone(),
                source: e,
            });
        }
    }

    symlink_dir(&target, link)?;
    tracing::debug!(link = %link.display(), target = %target.display(), "modules directory activated");
    Ok(target)
}

/// Add the isolated module directories to `tsconfig.json`'s `exclude`.
pub fn exclude_modules_from_tsconfig(entry_path: &Path) -> Result<bool, WorkspaceError> {
    let path = entry_path.join("tsconfig.json");
    let content = match std::fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(WorkspaceError::Io { path, source: e }),
    };
    let mut config: serde_json::Value =
        serde_json::from_str(&content).map_err(|e| WorkspaceError::TsConfig {
            path: path.clone(),
            source: e,
        })?;
    let Some(object) = config.as_object_mut() else {
        return Ok(false);
    };

    let exclude = object
        .entry("exclude")
        .or_insert_with(|| serde_json::Value::Array(Vec::new()));
    if let Some(list) = exclude.as_array_mut() {
        for dir in TS_EXCLUDES {
            if !list.iter().any(|v| v.as_str() == Some(dir)) {
                list.push(serde_json::Value::String((*dir).to_owned()));
            }
        }
    }

    let rendered = serde_json::to_string_pretty(&config).map_err(|e| WorkspaceError::TsConfig {
        path: path.clone(),
        source: e,
    })?;
    std::fs::write(&path, rendered).map_err(|e| WorkspaceError::Io { path, source: e })?;
    Ok(true)
}

/// Create a directory and its parents.
pub fn create_dir_all(path: &Path) -> Result<(), WorkspaceError> {
    std::fs::create_dir_all(path).map_err(|e| WorkspaceError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

fn remove_link(link: &Path) -> Result<(), WorkspaceError> {
    std::fs::remove_file(link).map_err(|e| WorkspaceError::Io {
        path: link.to_path_buf(),
        source: e,
    })
}

#[cfg(unix)]
fn symlink_dir(target: &Path, link: &Path) -> Result<(), WorkspaceError> {
    std::os::unix::fs::symlink(target, link).map_err(|e| WorkspaceError::Io {
        path: link.to_path_buf(),
        source: e,
    })
}

#[cfg(windows)]
fn symlink_dir(target: &Path, link: &Path) -> Result<(), WorkspaceError> {
    std::os::windows::fs::symlink_dir(target, link).map_err(|e| WorkspaceError::Io {
        path: link.to_path_buf(),
        source: e,
    })
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<(), WorkspaceError> {
    use std::os::unix::fs::PermissionsExt;
    let permissions = std::fs::Permissions::from_mode(mode & 0o7777);
    std::fs::set_permissions(path, permissions).map_err(|e| WorkspaceError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<(), WorkspaceError> {
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error("filesystem operation failed at {path}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to copy {from} to {to}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
    #[error("tsconfig.json at {path} is not valid JSON")]
    TsConfig {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error(transparent)]
    Collect(#[from] CollectError),
}
