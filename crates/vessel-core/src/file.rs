//! File references and file sets.
//!
//! A [`FileSet`] maps logical paths (always `/`-separated, never starting
//! with `/`) to [`FileRef`]s. Both are immutable values: every operation on
//! a set consumes it and returns a new one, so a set handed to one stage can
//! never be changed behind another stage's back.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Default mode for regular files.
pub const DEFAULT_FILE_MODE: u32 = 0o100644;

/// Reference to the content of a single file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FileRef {
    /// Content lives on the local filesystem.
    #[serde(rename = "FileFsRef", rename_all = "camelCase")]
    Fs {
        fs_path: PathBuf,
        #[serde(default = "default_mode")]
        mode: u32,
    },
    /// Content is held inline.
    #[serde(rename = "FileBlob")]
    Blob {
        data: String,
        #[serde(default = "default_mode")]
        mode: u32,
    },
}

impl FileRef {
    pub fn fs(fs_path: impl Into<PathBuf>) -> Self {
        Self::Fs {
            fs_path: fs_path.into(),
            mode: DEFAULT_FILE_MODE,
        }
    }

    pub fn fs_with_mode(fs_path: impl Into<PathBuf>, mode: u32) -> Self {
        Self::Fs {
            fs_path: fs_path.into(),
            mode,
        }
    }

    pub fn blob(data: impl Into<String>) -> Self {
        Self::Blob {
            data: data.into(),
            mode: DEFAULT_FILE_MODE,
        }
    }

    pub fn mode(&self) -> u32 {
        match self {
            Self::Fs { mode, .. } | Self::Blob { mode, .. } => *mode,
        }
    }

    /// Filesystem location, if the content is not inline.
    pub fn fs_path(&self) -> Option<&Path> {
        match self {
            Self::Fs { fs_path, .. } => Some(fs_path),
            Self::Blob { .. } => None,
        }
    }

    /// Read the referenced content.
    pub fn contents(&self) -> std::io::Result<Cow<'_, [u8]>> {
        match self {
            Self::Fs { fs_path, .. } => std::fs::read(fs_path).map(Cow::Owned),
            Self::Blob { data, .. } => Ok(Cow::Borrowed(data.as_bytes())),
        }
    }
}

fn default_mode() -> u32 {
    DEFAULT_FILE_MODE
}

/// Mapping from logical path to [`FileRef`].
///
/// Backed by an ordered map so that iteration, serialization and package
/// digests are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileSet(BTreeMap<String, FileRef>);

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a set with `file` added under `path`, replacing any previous entry.
    #[must_use]
    pub fn with(mut self, path: impl Into<String>, file: FileRef) -> Self {
        self.0.insert(path.into(), file);
        self
    }

    /// Merges `other` into this set; entries of `other` win on key collisions.
    #[must_use]
    pub fn merge(mut self, other: FileSet) -> Self {
        self.0.extend(other.0);
        self
    }

    /// Re-roots every key under `prefix` (see [`normalize_prefix`]).
    #[must_use]
    pub fn prefixed(self, prefix: &str) -> Self {
        let prefix = normalize_prefix(prefix);
        if prefix.is_empty() {
            return self;
        }
        self.0
            .into_iter()
            .map(|(path, file)| (format!("{prefix}{path}"), file))
            .collect()
    }

    pub fn get(&self, path: &str) -> Option<&FileRef> {
        self.0.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.0.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FileRef)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, FileRef)> for FileSet {
    fn from_iter<T: IntoIterator<Item = (String, FileRef)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for FileSet {
    type Item = (String, FileRef);
    type IntoIter = std::collections::btree_map::IntoIter<String, FileRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Normalizes a destination prefix for logical paths.
///
/// Leading `/` and `./` segments are dropped and a non-empty result always
/// ends with exactly one `/`, so `prefix + key` is a well-formed logical path.
///
/// ```
/// use vessel_core::file::normalize_prefix;
///
/// assert_eq!(normalize_prefix("./"), "");
/// assert_eq!(normalize_prefix("/_nuxt"), "_nuxt/");
/// assert_eq!(normalize_prefix(".nuxt/dist/server/"), ".nuxt/dist/server/");
/// ```
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/");
    if trimmed.is_empty() {
        trimmed
    } else {
        format!("{trimmed}/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_prefers_later_entries() {
        let a = FileSet::new().with("a.js", FileRef::blob("one"));
        let b = FileSet::new().with("a.js", FileRef::blob("two"));
        let merged = a.merge(b);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged.get("a.js"), Some(&FileRef::blob("two")));
    }

    #[test]
    fn prefixed_with_dot_slash_keeps_keys() {
        let set = FileSet::new().with("index.html", FileRef::blob(""));
        let set = set.prefixed("./");
        assert!(set.contains("index.html"));
    }

    #[test]
    fn prefixed_adds_separator() {
        let set = FileSet::new().with("app.js", FileRef::blob(""));
        let set = set.prefixed(".nuxt/dist/server");
        assert!(set.contains(".nuxt/dist/server/app.js"));
    }

    #[test]
    fn file_ref_deserializes_platform_shape() {
        let json = r#"{"type":"FileFsRef","fsPath":"/tmp/x/package.json"}"#;
        let file: FileRef = serde_json::from_str(json).unwrap();
        assert_eq!(file.fs_path(), Some(Path::new("/tmp/x/package.json")));
        assert_eq!(file.mode(), DEFAULT_FILE_MODE);
    }

    #[test]
    fn blob_contents_are_inline() {
        let file = FileRef::blob("hello");
        assert_eq!(file.contents().unwrap().as_ref(), b"hello");
    }
}
