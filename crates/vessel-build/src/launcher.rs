//! Runtime glue shipped inside every function package.
//!
//! The launcher is an opaque JavaScript template with three placeholders.
//! Every placeholder must be present before substitution; a template missing
//! one is rejected instead of silently emitting broken glue.

/// File name of the launcher inside the package.
pub const LAUNCHER_FILE: &str = "vercel__launcher.js";

/// File name of the runtime bridge inside the package.
pub const BRIDGE_FILE: &str = "vercel__bridge.js";

/// Exported entry function of the launcher.
pub const HANDLER: &str = "vercel__launcher.launcher";

const DEFAULT_TEMPLATE: &str = include_str!("../assets/launcher.js");
const BRIDGE_SOURCE: &str = include_str!("../assets/bridge.js");

const SUFFIX_PLACEHOLDER: &str = "__NUXT_SUFFIX__";
const CONFIG_PLACEHOLDER: &str = "__NUXT_CONFIG__";
const INTERNAL_SERVER_PLACEHOLDER: &str = "/* __ENABLE_INTERNAL_SERVER__ */ true";

/// Values substituted into the launcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LauncherParams {
    /// Framework variant suffix (`-edge` or empty)
    pub framework_suffix: String,
    /// Path of the runtime config file relative to the launcher, e.g. `./nuxt.config.js`
    pub config_path: String,
    /// Whether the embedded middleware server is active
    pub internal_server: bool,
}

#[derive(Debug, Clone)]
pub struct LauncherTemplate {
    source: String,
}

impl Default for LauncherTemplate {
    fn default() -> Self {
        Self {
            source: DEFAULT_TEMPLATE.to_owned(),
        }
    }
}

impl LauncherTemplate {
    pub fn from_source(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// Substitute `params` into the template.
    ///
    /// # Errors
    ///
    /// [`LauncherError::MissingPlaceholder`] if any placeholder is absent.
    pub fn render(&self, params: &LauncherParams) -> Result<String, LauncherError> {
        for placeholder in [
            SUFFIX_PLACEHOLDER,
            CONFIG_PLACEHOLDER,
            INTERNAL_SERVER_PLACEHOLDER,
        ] {
            if !self.source.contains(placeholder) {
                return Err(LauncherError::MissingPlaceholder { placeholder });
            }
        }

        Ok(self
            .source
            .replace(SUFFIX_PLACEHOLDER, &params.framework_suffix)
            .replace(CONFIG_PLACEHOLDER, &params.config_path)
            .replace(
                INTERNAL_SERVER_PLACEHOLDER,
                if params.internal_server { "true" } else { "false" },
            ))
    }
}

/// Source of the runtime bridge.
pub fn bridge_source() -> &'static str {
    BRIDGE_SOURCE
}

#[derive(Debug, thiserror::Error)]
pub enum LauncherError {
    #[error("launcher template is missing placeholder {placeholder:?}")]
    MissingPlaceholder { placeholder: &'static str },
}
