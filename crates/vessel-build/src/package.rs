//! Function packaging: one self-contained serverless function per logical
//! entrypoint.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use semver::Version;
use serde::Serialize;
use sha2::{Digest, Sha256};
use vessel_core::manifest::MANIFEST_FILE;
use vessel_core::{FileRef, FileSet, FrameworkDependency};

use crate::collect::{self, CollectError};
use crate::launcher::{
    self, BRIDGE_FILE, HANDLER, LAUNCHER_FILE, LauncherError, LauncherParams, LauncherTemplate,
};

/// Oldest framework release the launcher works with.
pub const MIN_FRAMEWORK_VERSION: Version = Version::new(2, 4, 0);

/// Newest framework line the launcher has been tested against.
pub const TESTED_FRAMEWORK_CEILING: Version = Version::new(3, 0, 0);

const SYMLINK_MODE: u32 = 0o120000;
const FILE_TYPE_MASK: u32 = 0o170000;

/// Resource limits of a function; `None` means the platform default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceLimits {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_duration: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<u32>,
}

/// A bundled, independently deployable function.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionPackage {
    pub files: FileSet,
    pub handler: String,
    pub runtime: String,
    pub environment: BTreeMap<String, String>,
    #[serde(flatten)]
    pub limits: ResourceLimits,
}

impl FunctionPackage {
    /// SHA-256 over handler, runtime, environment, limits and every member's
    /// path, mode and content, in path order. Identical inputs always give
    /// identical digests.
    pub fn digest(&self) -> Result<String, PackageError> {
        let mut hasher = Sha256::new();
        hasher.update(format!("H:{}\nR:{}\n", self.handler, self.runtime).as_bytes());
        for (key, value) in &self.environment {
            hasher.update(format!("E:{key}={value}\n").as_bytes());
        }
        hasher.update(
            format!(
                "M:{:?}:{:?}\n",
                self.limits.max_duration, self.limits.memory
            )
            .as_bytes(),
        );

        for (path, file) in self.files.iter() {
            let kind = if file.mode() & FILE_TYPE_MASK == SYMLINK_MODE {
                'L'
            } else {
                'F'
            };
            hasher.update(format!("{kind}:{path}:{:o}:", file.mode()).as_bytes());
            let content_hash = member_hash(file)?;
            hasher.update(content_hash.as_bytes());
            hasher.update(b"\n");
        }

        Ok(hex::encode(hasher.finalize()))
    }
}

fn member_hash(file: &FileRef) -> Result<String, PackageError> {
    let read_err = |path: &Path, e| PackageError::Read {
        path: path.to_path_buf(),
        source: e,
    };
    let bytes: Vec<u8> = match file {
        FileRef::Fs { fs_path, mode } if mode & FILE_TYPE_MASK == SYMLINK_MODE => {
            let target = std::fs::read_link(fs_path).map_err(|e| read_err(fs_path, e))?;
            target.to_string_lossy().into_owned().into_bytes()
        }
        FileRef::Fs { fs_path, .. } => std::fs::read(fs_path).map_err(|e| read_err(fs_path, e))?,
        FileRef::Blob { data, .. } => data.as_bytes().to_vec(),
    };
    Ok(hex::encode(Sha256::digest(&bytes)))
}

/// Everything needed to assemble one function package.
#[derive(Debug, Clone)]
pub struct PackageInputs<'a> {
    pub runtime: String,
    pub launcher: LauncherParams,
    pub template: &'a LauncherTemplate,
    /// Logical name and reference of the framework runtime config file
    pub config_file: (String, FileRef),
    pub server_dist: FileSet,
    pub compiled_typescript: FileSet,
    pub node_modules: FileSet,
    /// Directory extra patterns are globbed in
    pub entry_path: &'a Path,
    pub extra_patterns: Vec<String>,
    pub limits: ResourceLimits,
}

/// Assemble a function package.
///
/// Merge order (later entries win): launcher, bridge, runtime config, server
/// dist, compiled TypeScript, production modules, extra patterns, manifest.
/// Patterns matching nothing contribute nothing and are reported as warnings.
pub fn assemble(inputs: PackageInputs<'_>) -> Result<FunctionPackage, PackageError> {
    let launcher_src = inputs.template.render(&inputs.launcher)?;
    let (config_name, config_ref) = inputs.config_file;

    let mut files = FileSet::new()
        .with(LAUNCHER_FILE, FileRef::blob(launcher_src))
        .with(BRIDGE_FILE, FileRef::blob(launcher::bridge_source()))
        .with(config_name, config_ref)
        .merge(inputs.server_dist)
        .merge(inputs.compiled_typescript)
        .merge(inputs.node_modules);

    for pattern in &inputs.extra_patterns {
        let matched = collect::glob(pattern, inputs.entry_path)?;
        if matched.is_empty() {
            tracing::warn!(pattern = %pattern, "include pattern matched no files");
        }
        files = files.merge(matched);
    }
    files = files.merge(collect::glob(MANIFEST_FILE, inputs.entry_path)?);

    Ok(FunctionPackage {
        files,
        handler: HANDLER.to_owned(),
        runtime: inputs.runtime,
        environment: BTreeMap::from([("NODE_ENV".to_owned(), "production".to_owned())]),
        limits: inputs.limits,
    })
}

/// Read the installed core framework version and check it is supported.
///
/// Versions above [`TESTED_FRAMEWORK_CEILING`] are accepted with a warning.
pub fn check_framework_version(
    modules_path: &Path,
    framework: &FrameworkDependency,
) -> Result<Version, FrameworkCheckError> {
    let package = framework.core_package();
    let manifest_path = modules_path.join(&package).join(MANIFEST_FILE);
    let not_resolvable = |detail: String| FrameworkCheckError::NotResolvable {
        package: package.clone(),
        path: manifest_path.clone(),
        detail,
    };

    let content = std::fs::read_to_string(&manifest_path).map_err(|e| not_resolvable(e.to_string()))?;
    let manifest: serde_json::Value =
        serde_json::from_str(&content).map_err(|e| not_resolvable(e.to_string()))?;
    let raw = manifest
        .get("version")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| not_resolvable("package.json declares no version".to_owned()))?;
    let version = Version::parse(raw.trim().trim_start_matches('v'))
        .map_err(|e| not_resolvable(format!("invalid version {raw:?}: {e}")))?;

    if version < MIN_FRAMEWORK_VERSION {
        return Err(FrameworkCheckError::Unsupported {
            package,
            detected: version,
            minimum: MIN_FRAMEWORK_VERSION,
        });
    }
    if version > TESTED_FRAMEWORK_CEILING {
        tracing::warn!(
            package = %package,
            version = %version,
            ceiling = %TESTED_FRAMEWORK_CEILING,
            "framework version is newer than any release tested with this builder"
        );
    }
    tracing::info!(package = %package, version = %version, "framework version accepted");
    Ok(version)
}

#[derive(Debug, thiserror::Error)]
pub enum PackageError {
    #[error(transparent)]
    Launcher(#[from] LauncherError),
    #[error(transparent)]
    Collect(#[from] CollectError),
    #[error("failed to read package member {path}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum FrameworkCheckError {
    #[error("cannot resolve {package} at {path}: {detail}")]
    NotResolvable {
        package: String,
        path: PathBuf,
        detail: String,
    },
    #[error("{package} >= {minimum} is required, detected version {detected}")]
    Unsupported {
        package: String,
        detected: Version,
        minimum: Version,
    },
}
