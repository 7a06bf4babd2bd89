use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    // ── Build input ──
    #[error("invalid entrypoint {entrypoint:?}: {reason}")]
    InvalidEntrypoint {
        entrypoint: String,
        reason: &'static str,
    },

    #[error("failed to read build input from {path}")]
    InputRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse build input at {path}")]
    InputParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    // ── Manifest ──
    #[error("can not read package.json from {dir}")]
    ManifestNotFound {
        dir: PathBuf,
        source: std::io::Error,
    },

    #[error("package.json at {path} is not valid JSON")]
    ManifestParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to write package.json at {path}")]
    ManifestWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(
        "no framework dependency found in package.json; declare one of: {}",
        candidates.join(", ")
    )]
    NoFrameworkDependency { candidates: Vec<String> },

    // ── Framework configuration ──
    #[error("no nuxt.config.ts or nuxt.config.js found in {dir}")]
    FrameworkConfigNotFound { dir: PathBuf },

    // ── Node runtime ──
    #[error("engines.node range {range:?} is not a valid semver range")]
    InvalidNodeEngine {
        range: String,
        source: semver::Error,
    },

    #[error(
        "engines.node range {range:?} matches no supported Node.js major (supported: {})",
        format_majors(supported)
    )]
    UnsupportedNodeVersion {
        range: String,
        supported: Vec<u64>,
    },
}

fn format_majors(majors: &[u64]) -> String {
    majors
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
