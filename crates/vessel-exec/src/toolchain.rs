use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use vessel_core::framework::COMPILED_CONFIG_FILE;
use vessel_core::{BuildPaths, FrameworkOptions};

use crate::command::{CommandOutput, CommandSpec, ExecError};
use crate::executor::{CommandExecutor, RealExecutor};
use crate::installer::{InstallPass, PackageManager};

/// Evaluates a framework config file and prints its options as JSON.
/// Handles CommonJS, transpiled ES modules and function-style configs.
const PROBE_SCRIPT: &str = r#"
const mod = require(require('path').resolve(process.argv[1]));
const value = mod && mod.__esModule ? mod.default : (mod.default || mod);
Promise.resolve(typeof value === 'function' ? value() : value)
  .then((options) => process.stdout.write(JSON.stringify(options || {})))
  .catch((err) => { console.error(err); process.exit(1); });
"#;

/// Baseline flags for compiling the TypeScript framework config.
const TSC_BASE_FLAGS: &[&str] = &[
    "--module",
    "commonjs",
    "--target",
    "es2018",
    "--esModuleInterop",
    "--skipLibCheck",
    "--resolveJsonModule",
];

/// External tools of a build, parameterized over the executor for testability.
pub struct Toolchain<E: CommandExecutor = RealExecutor> {
    executor: E,
    timeout: Option<Duration>,
}

impl Toolchain<RealExecutor> {
    pub fn new() -> Self {
        Self::with_executor(RealExecutor)
    }
}

impl Default for Toolchain<RealExecutor> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: CommandExecutor> Toolchain<E> {
    pub fn with_executor(executor: E) -> Self {
        Self {
            executor,
            timeout: None,
        }
    }

    /// Apply the platform's ambient timeout to every subsequent invocation.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    async fn run(&self, command: CommandSpec) -> Result<CommandOutput, ExecError> {
        let command = command.timeout(self.timeout);
        tracing::debug!(command = %command.display(), "invoking");
        self.executor.run(&command).await
    }

    // ── Installer ──

    pub async fn install(
        &self,
        manager: PackageManager,
        paths: &BuildPaths,
        pass: InstallPass,
    ) -> Result<CommandOutput, ExecError> {
        tracing::info!(manager = %manager, pass = %pass, "installing dependencies");
        self.run(manager.install_command(paths, pass)).await
    }

    pub async fn run_script(
        &self,
        manager: PackageManager,
        entry_path: &Path,
        script: &str,
    ) -> Result<CommandOutput, ExecError> {
        tracing::info!(manager = %manager, script, "running package script");
        self.run(manager.run_script_command(entry_path, script))
            .await
    }

    // ── Framework compiler ──

    /// `nuxt build --standalone --no-lock --config-file nuxt.config.js <entry>`
    pub async fn framework_build(&self, paths: &BuildPaths) -> Result<CommandOutput, ExecError> {
        self.run(
            framework_command(paths)
                .args(["build", "--standalone", "--no-lock", "--config-file"])
                .arg(COMPILED_CONFIG_FILE)
                .arg(paths.entry_path.display().to_string()),
        )
        .await
    }

    /// Static generation reusing the output of [`framework_build`](Self::framework_build).
    pub async fn framework_generate(
        &self,
        paths: &BuildPaths,
    ) -> Result<CommandOutput, ExecError> {
        self.run(
            framework_command(paths)
                .args(["generate", "--no-build", "--no-lock", "--config-file"])
                .arg(COMPILED_CONFIG_FILE)
                .arg(paths.entry_path.display().to_string()),
        )
        .await
    }

    /// Evaluate the compiled framework config with `node` and decode its options.
    pub async fn probe_framework_options(
        &self,
        paths: &BuildPaths,
    ) -> Result<FrameworkOptions, ExecError> {
        let command = CommandSpec::new("node", &paths.entry_path)
            .args(["-e", PROBE_SCRIPT, COMPILED_CONFIG_FILE])
            .env("NODE_ENV", "production");
        let rendered = format!("node -e <probe> {COMPILED_CONFIG_FILE}");
        let output = self.run(command).await?;
        serde_json::from_str(output.stdout.trim()).map_err(|e| ExecError::Decode {
            command: rendered,
            source: e,
        })
    }

    // ── TypeScript ──

    /// Compile `source` (relative to the entry path) into `paths.tsc_out_path()`.
    ///
    /// `extra` flags come from the build configuration; `true` renders as a
    /// bare flag, `false`/`null` are skipped, anything else is passed as value.
    pub async fn compile_typescript(
        &self,
        paths: &BuildPaths,
        source: &str,
        extra: &BTreeMap<String, serde_json::Value>,
    ) -> Result<CommandOutput, ExecError> {
        let mut command = CommandSpec::new(
            paths.modules_path.join(".bin").join("tsc"),
            &paths.entry_path,
        )
        .args(TSC_BASE_FLAGS.iter().copied())
        .arg("--outDir")
        .arg(paths.tsc_out_path().display().to_string())
        .env("NODE_PRESERVE_SYMLINKS", "1");

        for (flag, value) in extra {
            match value {
                serde_json::Value::Bool(true) => command = command.arg(format!("--{flag}")),
                serde_json::Value::Bool(false) | serde_json::Value::Null => {}
                serde_json::Value::String(s) => {
                    command = command.arg(format!("--{flag}")).arg(s.clone());
                }
                other => command = command.arg(format!("--{flag}")).arg(other.to_string()),
            }
        }

        self.run(command.arg(source)).await
    }
}

fn framework_command(paths: &BuildPaths) -> CommandSpec {
    CommandSpec::new(
        paths.modules_path.join(".bin").join("nuxt"),
        &paths.entry_path,
    )
    .env("NODE_ENV", "production")
}
