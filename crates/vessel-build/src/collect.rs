//! Artifact collection: globbing build output and re-rooting it into the
//! output namespace.

use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher};
use vessel_core::{FileRef, FileSet};
use walkdir::WalkDir;

/// Glob `dir` for `pattern`, keyed by `/`-separated paths relative to `dir`.
///
/// A missing `dir` yields an empty set. Directories never appear as entries;
/// symlinks do, with their own mode. A pattern naming an existing directory
/// (no glob metacharacters) selects everything beneath it.
pub fn glob(pattern: &str, dir: &Path) -> Result<FileSet, CollectError> {
    if !dir.exists() {
        tracing::debug!(dir = %dir.display(), pattern, "glob root missing; nothing collected");
        return Ok(FileSet::new());
    }

    let pattern = pattern.trim_start_matches("./");
    let effective = if !has_meta(pattern) && dir.join(pattern).is_dir() {
        format!("{}/**", pattern.trim_end_matches('/'))
    } else {
        pattern.to_owned()
    };
    let matcher = compile(&effective)?;

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name().min_depth(1) {
        let entry = entry.map_err(|e| CollectError::Walk {
            dir: dir.to_path_buf(),
            source: e,
        })?;
        if entry.file_type().is_dir() {
            continue;
        }
        let logical = logical_path(dir, entry.path()).map_err(|e| CollectError::Outside {
            path: entry.path().to_path_buf(),
            source: e,
        })?;
        if !matcher.is_match(&logical) {
            continue;
        }
        let mode = file_mode(&entry).map_err(|e| CollectError::Metadata {
            path: entry.path().to_path_buf(),
            source: e,
        })?;
        files.push((logical, FileRef::fs_with_mode(entry.path(), mode)));
    }

    tracing::debug!(dir = %dir.display(), pattern = %effective, files = files.len(), "globbed");
    Ok(files.into_iter().collect())
}

/// Glob `dir` for `pattern` and prepend `prefix` to every matched path.
///
/// Every key of the result starts with the normalized prefix (see
/// [`vessel_core::file::normalize_prefix`]) followed by a key [`glob`] would
/// have produced.
pub fn collect_and_prefix(
    pattern: &str,
    dir: &Path,
    prefix: &str,
) -> Result<FileSet, CollectError> {
    Ok(glob(pattern, dir)?.prefixed(prefix))
}

fn compile(pattern: &str) -> Result<GlobMatcher, CollectError> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map(|g| g.compile_matcher())
        .map_err(|e| CollectError::Pattern {
            pattern: pattern.to_owned(),
            source: e,
        })
}

fn has_meta(pattern: &str) -> bool {
    pattern.contains(['*', '?', '[', '{'])
}

fn logical_path(root: &Path, path: &Path) -> Result<String, std::path::StripPrefixError> {
    let parts: Vec<String> = path
        .strip_prefix(root)?
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Ok(parts.join("/"))
}

#[cfg(unix)]
fn file_mode(entry: &walkdir::DirEntry) -> std::io::Result<u32> {
    use std::os::unix::fs::MetadataExt;
    // Symlinks keep their own mode so they are recreated as links.
    Ok(std::fs::symlink_metadata(entry.path())?.mode())
}

#[cfg(not(unix))]
fn file_mode(entry: &walkdir::DirEntry) -> std::io::Result<u32> {
    let metadata = std::fs::symlink_metadata(entry.path())?;
    Ok(if metadata.file_type().is_symlink() {
        0o120777
    } else {
        vessel_core::file::DEFAULT_FILE_MODE
    })
}

#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    #[error("invalid glob pattern {pattern:?}")]
    Pattern {
        pattern: String,
        source: globset::Error,
    },
    #[error("failed to walk {dir}")]
    Walk {
        dir: PathBuf,
        source: walkdir::Error,
    },
    #[error("{path} is outside the glob root")]
    Outside {
        path: PathBuf,
        source: std::path::StripPrefixError,
    },
    #[error("failed to read metadata of {path}")]
    Metadata {
        path: PathBuf,
        source: std::io::Error,
    },
}
