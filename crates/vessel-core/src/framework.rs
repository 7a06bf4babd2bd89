//! Framework configuration: which config file the project uses and the
//! handful of options the builder reads from it.

use std::path::Path;

use serde::Deserialize;

/// Name the framework compiler is always pointed at. TypeScript projects
/// get this file from the precompilation step.
pub const COMPILED_CONFIG_FILE: &str = "nuxt.config.js";

const DEFAULT_STATIC_DIR: &str = "static";
const DEFAULT_PUBLIC_PATH: &str = "_nuxt/";
const DEFAULT_BUILD_DIR: &str = ".nuxt";
const DEFAULT_LAMBDA_NAME: &str = "index";

/// The framework configuration file present in the entry directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameworkConfigFile {
    JavaScript,
    TypeScript,
}

impl FrameworkConfigFile {
    /// Detect the configuration file in `dir`; `nuxt.config.ts` wins when both exist.
    pub fn detect(dir: &Path) -> crate::Result<Self> {
        if dir.join(Self::TypeScript.file_name()).is_file() {
            Ok(Self::TypeScript)
        } else if dir.join(Self::JavaScript.file_name()).is_file() {
            Ok(Self::JavaScript)
        } else {
            Err(crate::Error::FrameworkConfigNotFound {
                dir: dir.to_path_buf(),
            })
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            Self::JavaScript => "nuxt.config.js",
            Self::TypeScript => "nuxt.config.ts",
        }
    }

    pub fn needs_precompile(self) -> bool {
        matches!(self, Self::TypeScript)
    }
}

/// Options read from the evaluated framework configuration.
///
/// Unknown keys are ignored; every accessor falls back to the framework's
/// own default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameworkOptions {
    #[serde(default)]
    dir: Option<DirOptions>,
    #[serde(default)]
    build: Option<CompilerOptions>,
    build_dir: Option<String>,
    src_dir: Option<String>,
    lambda_name: Option<String>,
    #[serde(default)]
    server_middleware: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct DirOptions {
    #[serde(rename = "static")]
    static_dir: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompilerOptions {
    public_path: Option<String>,
}

impl FrameworkOptions {
    pub fn static_dir(&self) -> &str {
        self.dir
            .as_ref()
            .and_then(|d| d.static_dir.as_deref())
            .unwrap_or(DEFAULT_STATIC_DIR)
    }

    /// Public asset prefix without a leading `/`.
    ///
    /// A CDN URL (anything carrying a scheme or starting with `//`) is served
    /// from elsewhere, so the assets fall back to the default prefix.
    pub fn public_path(&self) -> String {
        let configured = self
            .build
            .as_ref()
            .and_then(|b| b.public_path.as_deref())
            .unwrap_or(DEFAULT_PUBLIC_PATH);
        if has_protocol(configured) {
            return DEFAULT_PUBLIC_PATH.to_owned();
        }
        configured.trim_start_matches('/').to_owned()
    }

    /// Build directory relative to `entry_path`.
    pub fn build_dir(&self, entry_path: &Path) -> String {
        self.build_dir
            .as_deref()
            .map_or_else(|| DEFAULT_BUILD_DIR.to_owned(), |d| relative_to(entry_path, d))
    }

    /// Source directory relative to `entry_path`.
    pub fn src_dir(&self, entry_path: &Path) -> String {
        self.src_dir
            .as_deref()
            .map_or_else(|| ".".to_owned(), |d| relative_to(entry_path, d))
    }

    pub fn lambda_name(&self) -> &str {
        self.lambda_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(DEFAULT_LAMBDA_NAME)
    }

    /// Whether the configuration declares server middleware, using JavaScript
    /// truthiness (an empty list still counts).
    pub fn declares_server_middleware(&self) -> bool {
        match &self.server_middleware {
            None | Some(serde_json::Value::Null) => false,
            Some(serde_json::Value::Bool(b)) => *b,
            Some(serde_json::Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
            Some(serde_json::Value::String(s)) => !s.is_empty(),
            Some(serde_json::Value::Array(_) | serde_json::Value::Object(_)) => true,
        }
    }
}

fn has_protocol(path: &str) -> bool {
    if path.starts_with("//") {
        return true;
    }
    path.split_once(':').is_some_and(|(scheme, _)| {
        !scheme.is_empty()
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    })
}

fn relative_to(base: &Path, dir: &str) -> String {
    let path = Path::new(dir);
    let relative = if path.is_absolute() {
        path.strip_prefix(base).unwrap_or(path)
    } else {
        path
    };
    let rendered = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .filter(|s| s != ".")
        .collect::<Vec<_>>()
        .join("/");
    if rendered.is_empty() {
        ".".to_owned()
    } else {
        rendered
    }
}
