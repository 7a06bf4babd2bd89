use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

use crate::file::FileSet;

/// Everything the hosting platform hands to a build.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInput {
    /// Input files, keyed by logical path relative to `work_path`.
    #[serde(default)]
    pub files: FileSet,
    /// Logical path of the entrypoint (`package.json` or `nuxt.config.{js,ts}`).
    pub entrypoint: String,
    /// Directory the input files are materialized into.
    pub work_path: PathBuf,
    #[serde(default)]
    pub config: BuildConfig,
    #[serde(default)]
    pub meta: BuildMeta,
}

/// Builder options from the platform configuration. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildConfig {
    /// Logical app identifier
    pub app: Option<String>,
    /// Function timeout in seconds (platform default when absent)
    pub max_duration: Option<u32>,
    /// Function memory in MB (platform default when absent)
    pub memory: Option<u32>,
    /// Extra paths bundled into the function; accepts a single string or a list.
    #[serde(default, deserialize_with = "one_or_many")]
    pub include_files: Vec<String>,
    /// Extra server paths bundled into the function
    #[serde(default)]
    pub server_files: Vec<String>,
    /// Run the static generation pass after the framework build
    #[serde(default)]
    pub generate_static_routes: bool,
    /// Overrides whether the launcher embeds the framework's middleware server
    pub internal_server: Option<bool>,
    /// Paths (relative to the work path) copied into the entry directory before install
    #[serde(default)]
    pub build_files: Vec<String>,
    /// Extra compiler flags for the TypeScript precompilation, e.g. `{"strict": true}`
    #[serde(default)]
    pub tsc_options: BTreeMap<String, serde_json::Value>,
}

/// Platform metadata for the run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildMeta {
    /// Ambient timeout applied to every external process
    pub timeout_secs: Option<u64>,
}

impl BuildMeta {
    pub fn process_timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl BuildConfig {
    /// Patterns bundled into the function besides the compiled output:
    /// `includeFiles`, then `serverFiles`.
    pub fn extra_file_patterns(&self) -> impl Iterator<Item = &str> {
        self.include_files
            .iter()
            .chain(self.server_files.iter())
            .map(String::as_str)
    }
}

impl BuildInput {
    /// Load a build input document from a JSON file.
    pub fn load(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| crate::Error::InputRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(|e| crate::Error::InputParse {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(s)) => vec![s],
        Some(OneOrMany::Many(v)) => v,
    })
}
