//! Dependency installer selection and flags.

use std::fmt;
use std::path::Path;

use vessel_core::BuildPaths;

use crate::command::CommandSpec;

/// Package manager driving the installs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Yarn,
    Npm,
}

/// Which dependency set an install pass materializes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallPass {
    /// Every dependency, including dev-only ones, for the framework build.
    Development,
    /// Only the pruned production manifest, for the function bundle.
    Production,
}

impl PackageManager {
    /// `npm` when the project ships a `package-lock.json`, `yarn` otherwise.
    pub fn detect(entry_path: &Path) -> Self {
        if entry_path.join("package-lock.json").is_file() {
            Self::Npm
        } else {
            Self::Yarn
        }
    }

    pub fn program(self) -> &'static str {
        match self {
            Self::Yarn => "yarn",
            Self::Npm => "npm",
        }
    }

    /// Install command for `pass`, writing into `paths.modules_path` and
    /// caching under `paths.cache_path`.
    pub fn install_command(self, paths: &BuildPaths, pass: InstallPass) -> CommandSpec {
        let cache = paths.installer_cache_path(self.program());
        let cmd = CommandSpec::new(self.program(), &paths.entry_path).arg("install");

        match (self, pass) {
            (Self::Yarn, InstallPass::Development) => cmd
                .args([
                    "--prefer-offline",
                    "--frozen-lockfile",
                    "--non-interactive",
                    "--production=false",
                ])
                .arg(format!("--modules-folder={}", paths.modules_path.display()))
                .arg(format!("--cache-folder={}", cache.display()))
                .env("NODE_ENV", "development"),
            // The pruned manifest no longer matches the lockfile, so the
            // lockfile is honoured but never rewritten.
            (Self::Yarn, InstallPass::Production) => cmd
                .args([
                    "--prefer-offline",
                    "--pure-lockfile",
                    "--non-interactive",
                    "--production=true",
                ])
                .arg(format!("--modules-folder={}", paths.modules_path.display()))
                .arg(format!("--cache-folder={}", cache.display()))
                .env("NPM_ONLY_PRODUCTION", "true"),
            (Self::Npm, InstallPass::Development) => cmd
                .args(["--prefer-offline", "--no-audit", "--no-fund", "--include=dev"])
                .arg(format!("--cache={}", cache.display()))
                .env("NODE_ENV", "development"),
            (Self::Npm, InstallPass::Production) => cmd
                .args([
                    "--prefer-offline",
                    "--no-audit",
                    "--no-fund",
                    "--omit=dev",
                    "--no-package-lock",
                ])
                .arg(format!("--cache={}", cache.display()))
                .env("NODE_ENV", "production")
                .env("NPM_ONLY_PRODUCTION", "true"),
        }
    }

    /// Command running a `package.json` script.
    pub fn run_script_command(self, entry_path: &Path, script: &str) -> CommandSpec {
        CommandSpec::new(self.program(), entry_path).args(["run", script])
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.program())
    }
}

impl fmt::Display for InstallPass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Development => "development",
            Self::Production => "production",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths() -> BuildPaths {
        BuildPaths::resolve(Path::new("/work"), "app/package.json").unwrap()
    }

    #[test]
    fn detect_prefers_yarn_without_lockfile() {
        let tmp = tempfile::TempDir::new().unwrap();
        assert_eq!(PackageManager::detect(tmp.path()), PackageManager::Yarn);
        std::fs::write(tmp.path().join("package-lock.json"), "{}").unwrap();
        assert_eq!(PackageManager::detect(tmp.path()), PackageManager::Npm);
    }

    #[test]
    fn yarn_dev_install_is_frozen_and_isolated() {
        let cmd = PackageManager::Yarn.install_command(&paths(), InstallPass::Development);
        assert_eq!(cmd.cwd, Path::new("/work/app"));
        assert!(cmd.args.contains(&"--frozen-lockfile".to_owned()));
        assert!(cmd.args.contains(&"--production=false".to_owned()));
        assert!(cmd.args.contains(&"--modules-folder=/work/app/node_modules".to_owned()));
        assert!(cmd.args.contains(&"--cache-folder=/work/app/.vercel_cache/yarn".to_owned()));
        assert_eq!(cmd.env["NODE_ENV"], "development");
    }

    #[test]
    fn yarn_prod_install_does_not_rewrite_lockfile() {
        let cmd = PackageManager::Yarn.install_command(&paths(), InstallPass::Production);
        assert!(cmd.args.contains(&"--pure-lockfile".to_owned()));
        assert!(cmd.args.contains(&"--production=true".to_owned()));
        assert_eq!(cmd.env["NPM_ONLY_PRODUCTION"], "true");
    }

    #[test]
    fn npm_prod_install_omits_dev() {
        let cmd = PackageManager::Npm.install_command(&paths(), InstallPass::Production);
        assert_eq!(cmd.program_name(), "npm");
        assert!(cmd.args.contains(&"--omit=dev".to_owned()));
        assert!(cmd.args.contains(&"--cache=/work/app/.vercel_cache/npm".to_owned()));
    }
}
