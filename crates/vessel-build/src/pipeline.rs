//! The build pipeline orchestrator.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::task::JoinHandle;
use vessel_core::framework::COMPILED_CONFIG_FILE;
use vessel_core::{
    BuildInput, BuildPaths, FileRef, FileSet, FrameworkConfigFile, FrameworkDependency,
    FrameworkOptions, Manifest, NodeRuntime,
};
use vessel_exec::{CommandExecutor, InstallPass, PackageManager, RealExecutor, Toolchain};

use crate::collect::{self, CollectError};
use crate::error::{PipelineError, StageCause};
use crate::launcher::{LauncherParams, LauncherTemplate};
use crate::package::{self, FunctionPackage, PackageInputs, ResourceLimits};
use crate::routes::{self, Route};
use crate::stage::{Stage, StageRunner};
use crate::workspace::{self, NpmrcGuard, RegistryAuth, WorkspaceError};

/// Dev dependency marking a TypeScript project.
const TYPESCRIPT_BUILD_PACKAGE: &str = "@nuxt/typescript-build";

/// Runtime-only TypeScript loader, not needed once the config is compiled.
const TYPESCRIPT_RUNTIME_PACKAGE: &str = "@nuxt/typescript-runtime";

/// Output of the static generation pass, relative to the entry path.
const GENERATED_DIR: &str = "dist";

/// One entry of the output namespace.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OutputEntry {
    File(FileRef),
    Function(Box<FunctionPackage>),
}

impl OutputEntry {
    pub fn as_function(&self) -> Option<&FunctionPackage> {
        match self {
            Self::Function(f) => Some(f),
            Self::File(_) => None,
        }
    }
}

/// The pipeline's sole return value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildResult {
    pub output: BTreeMap<String, OutputEntry>,
    pub routes: Vec<Route>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watch: Option<BTreeSet<String>>,
}

impl BuildResult {
    /// Function packages by output name.
    pub fn functions(&self) -> impl Iterator<Item = (&str, &FunctionPackage)> {
        self.output
            .iter()
            .filter_map(|(name, entry)| entry.as_function().map(|f| (name.as_str(), f)))
    }
}

/// State established by `prepare` and consumed by later stages.
#[derive(Debug)]
struct Prepared {
    manifest: Manifest,
    manager: PackageManager,
    runtime: NodeRuntime,
    config_file: FrameworkConfigFile,
    typescript: bool,
    npmrc: Option<NpmrcGuard>,
}

/// Artifact classes gathered by `collect-artifacts`.
struct Artifacts {
    static_files: FileSet,
    client: FileSet,
    server: FileSet,
    generated: FileSet,
    node_modules: FileSet,
    compiled_typescript: FileSet,
}

/// Runs the stages of one build against a freshly materialized workspace.
///
/// A pipeline is consumed by [`run`](Self::run); the workspace it mutates
/// cannot be built twice.
pub struct Pipeline<E: CommandExecutor = RealExecutor> {
    toolchain: Toolchain<E>,
    auth: RegistryAuth,
    launcher: LauncherTemplate,
}

impl Pipeline<RealExecutor> {
    pub fn new() -> Self {
        Self::with_toolchain(Toolchain::new())
    }
}

impl Default for Pipeline<RealExecutor> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: CommandExecutor> Pipeline<E> {
    pub fn with_toolchain(toolchain: Toolchain<E>) -> Self {
        Self {
            toolchain,
            auth: RegistryAuth::None,
            launcher: LauncherTemplate::default(),
        }
    }

    #[must_use]
    pub fn with_registry_auth(mut self, auth: RegistryAuth) -> Self {
        self.auth = auth;
        self
    }

    #[must_use]
    pub fn with_launcher(mut self, launcher: LauncherTemplate) -> Self {
        self.launcher = launcher;
        self
    }

    /// Build `input` into a [`BuildResult`].
    ///
    /// # Errors
    ///
    /// Returns on the first failing stage; no partial result is produced.
    pub async fn run(mut self, input: &BuildInput) -> Result<BuildResult, PipelineError> {
        let paths = BuildPaths::resolve(&input.work_path, &input.entrypoint)?;
        if let Some(timeout) = input.meta.process_timeout() {
            self.toolchain = self.toolchain.with_timeout(Some(timeout));
        }
        tracing::info!(
            entrypoint = %input.entrypoint,
            entry_path = %paths.entry_path.display(),
            "starting build"
        );

        let mut runner = StageRunner::new();

        let mut prepared = runner
            .run(Stage::Prepare, self.prepare(input, &paths))
            .await?;
        let build_hook = prepared.manifest.build_hook();
        tracing::debug!(
            stages = ?Stage::plan(build_hook.is_some()),
            manager = %prepared.manager,
            runtime = %prepared.runtime.identifier(),
            "stage plan"
        );

        runner
            .run(Stage::InstallDev, async {
                workspace::activate_modules_dir(&paths, "dev")?;
                self.toolchain
                    .install(prepared.manager, &paths, InstallPass::Development)
                    .await?;
                Ok::<_, StageCause>(())
            })
            .await?;

        if let Some(script) = build_hook {
            runner
                .run(Stage::PreBuild, async {
                    self.toolchain
                        .run_script(prepared.manager, &paths.entry_path, script)
                        .await?;
                    Ok::<_, StageCause>(())
                })
                .await?;
        }

        let options = runner
            .run(
                Stage::FrameworkBuild,
                self.framework_build(input, &paths, prepared.config_file),
            )
            .await?;

        let npmrc = prepared.npmrc.take();
        let framework = runner
            .run(
                Stage::InstallProd,
                self.install_prod(&paths, &prepared, npmrc),
            )
            .await?;

        let result = runner
            .run(
                Stage::CollectArtifacts,
                self.collect_artifacts(input, &paths, &prepared, &options, &framework),
            )
            .await?;

        tracing::info!(
            outputs = result.output.len(),
            routes = result.routes.len(),
            "build finished"
        );
        Ok(result)
    }

    async fn prepare(&self, input: &BuildInput, paths: &BuildPaths) -> Result<Prepared, StageCause> {
        workspace::download(&input.files, &paths.work_path)?;
        if !input.config.build_files.is_empty() {
            let copied = workspace::copy_build_files(paths, &input.config.build_files)?;
            tracing::info!(files = copied, "build files copied");
        }

        let manifest = Manifest::read(&paths.entry_path)?;
        let framework = manifest.require_framework()?;
        let manager = PackageManager::detect(&paths.entry_path);
        let runtime = NodeRuntime::resolve(manifest.node_engine())?;
        let config_file = FrameworkConfigFile::detect(&paths.entry_path)?;
        tracing::info!(
            framework = %framework.name,
            manager = %manager,
            runtime = %runtime.identifier(),
            config = config_file.file_name(),
            "project detected"
        );

        let typescript =
            manifest.has_dev_dependency(TYPESCRIPT_BUILD_PACKAGE) || config_file.needs_precompile();
        if typescript && workspace::exclude_modules_from_tsconfig(&paths.entry_path)? {
            tracing::debug!("isolated module directories excluded from tsconfig.json");
        }

        if manager == PackageManager::Yarn && workspace::write_yarnclean(&paths.entry_path)? {
            tracing::debug!("default .yarnclean written");
        }

        let npmrc = NpmrcGuard::install(&paths.entry_path, &self.auth)?;
        workspace::create_dir_all(&paths.installer_cache_path(manager.program()))?;

        Ok(Prepared {
            manifest,
            manager,
            runtime,
            config_file,
            typescript,
            npmrc,
        })
    }

    async fn framework_build(
        &self,
        input: &BuildInput,
        paths: &BuildPaths,
        config_file: FrameworkConfigFile,
    ) -> Result<FrameworkOptions, StageCause> {
        if config_file.needs_precompile() {
            tracing::info!("compiling TypeScript framework config");
            self.toolchain
                .compile_typescript(paths, config_file.file_name(), &input.config.tsc_options)
                .await?;
            copy_compiled_config(paths)?;
        }

        let options = self.toolchain.probe_framework_options(paths).await?;
        tracing::info!(
            lambda = options.lambda_name(),
            public_path = %options.public_path(),
            "framework options loaded"
        );

        self.toolchain.framework_build(paths).await?;

        if input.config.generate_static_routes {
            tracing::info!("generating static routes");
            self.toolchain.framework_generate(paths).await?;
        }
        Ok(options)
    }

    async fn install_prod(
        &self,
        paths: &BuildPaths,
        prepared: &Prepared,
        npmrc: Option<NpmrcGuard>,
    ) -> Result<FrameworkDependency, StageCause> {
        let (mut manifest, framework) = prepared.manifest.prune()?;
        if prepared.typescript {
            manifest = manifest.without_dependency(TYPESCRIPT_RUNTIME_PACKAGE);
        }
        let written = manifest.write(&paths.entry_path)?;
        tracing::info!(
            path = %written.display(),
            framework = %framework.core_package(),
            "production manifest written"
        );

        workspace::activate_modules_dir(paths, "prod")?;
        self.toolchain
            .install(prepared.manager, paths, InstallPass::Production)
            .await?;

        if let Some(guard) = npmrc {
            guard.restore()?;
            tracing::debug!("registry credentials removed");
        }
        Ok(framework)
    }

    async fn collect_artifacts(
        &self,
        input: &BuildInput,
        paths: &BuildPaths,
        prepared: &Prepared,
        options: &FrameworkOptions,
        framework: &FrameworkDependency,
    ) -> Result<BuildResult, StageCause> {
        package::check_framework_version(&paths.modules_path, framework)?;

        let artifacts = collect(
            paths,
            options,
            input.config.generate_static_routes,
            prepared.typescript,
        )
        .await?;

        let public_path = options.public_path();
        let lambda_name = options.lambda_name();
        let config_ref = FileRef::fs(paths.entry_path.join(COMPILED_CONFIG_FILE));
        let function = package::assemble(PackageInputs {
            runtime: prepared.runtime.identifier(),
            launcher: LauncherParams {
                framework_suffix: framework.suffix.clone(),
                config_path: format!("./{COMPILED_CONFIG_FILE}"),
                internal_server: input
                    .config
                    .internal_server
                    .unwrap_or_else(|| options.declares_server_middleware()),
            },
            template: &self.launcher,
            config_file: (COMPILED_CONFIG_FILE.to_owned(), config_ref),
            server_dist: artifacts.server,
            compiled_typescript: artifacts.compiled_typescript,
            node_modules: artifacts.node_modules,
            entry_path: &paths.entry_path,
            extra_patterns: input
                .config
                .extra_file_patterns()
                .map(str::to_owned)
                .collect(),
            limits: ResourceLimits {
                max_duration: input.config.max_duration,
                memory: input.config.memory,
            },
        })?;
        tracing::info!(
            function = lambda_name,
            files = function.files.len(),
            "function packaged"
        );

        let routes = routes::synthesize(&public_path, artifacts.static_files.paths(), lambda_name);

        let mut output = BTreeMap::new();
        output.insert(
            lambda_name.to_owned(),
            OutputEntry::Function(Box::new(function)),
        );
        for (class, files) in [
            ("client", artifacts.client),
            ("static", artifacts.static_files),
            ("generated", artifacts.generated),
        ] {
            merge_output(&mut output, class, files);
        }

        Ok(BuildResult {
            output,
            routes,
            watch: None,
        })
    }
}

/// Glob every artifact class concurrently. Destinations are disjoint by prefix.
async fn collect(
    paths: &BuildPaths,
    options: &FrameworkOptions,
    generate_static_routes: bool,
    typescript: bool,
) -> Result<Artifacts, StageCause> {
    let entry = &paths.entry_path;
    let build_dir = options.build_dir(entry);
    let dist = entry.join(&build_dir).join("dist");
    let static_dir = entry
        .join(options.src_dir(entry))
        .join(options.static_dir());

    let static_files = spawn_collect("**", static_dir, "");
    let client = spawn_collect("**", dist.join("client"), &options.public_path());
    let server = spawn_collect(
        "**",
        dist.join("server"),
        &format!("{build_dir}/dist/server"),
    );
    let generated = if generate_static_routes {
        spawn_collect("**/*.html", entry.join(GENERATED_DIR), "./")
    } else {
        tokio::spawn(async { Ok(FileSet::new()) })
    };
    let node_modules = spawn_collect("**", paths.modules_flavor_path("prod"), "node_modules");
    let compiled_typescript = if typescript {
        spawn_collect("**/*.js", paths.tsc_out_path(), "")
    } else {
        tokio::spawn(async { Ok(FileSet::new()) })
    };

    let (static_files, client, server, generated, node_modules, compiled_typescript) = tokio::try_join!(
        static_files,
        client,
        server,
        generated,
        node_modules,
        compiled_typescript
    )?;

    let artifacts = Artifacts {
        static_files: static_files?,
        client: client?,
        server: server?,
        generated: generated?,
        node_modules: node_modules?,
        compiled_typescript: compiled_typescript?,
    };
    tracing::info!(
        static_files = artifacts.static_files.len(),
        client = artifacts.client.len(),
        server = artifacts.server.len(),
        generated = artifacts.generated.len(),
        node_modules = artifacts.node_modules.len(),
        compiled = artifacts.compiled_typescript.len(),
        "artifacts collected"
    );
    Ok(artifacts)
}

fn spawn_collect(
    pattern: &'static str,
    dir: PathBuf,
    prefix: &str,
) -> JoinHandle<Result<FileSet, CollectError>> {
    let prefix = prefix.to_owned();
    tokio::task::spawn_blocking(move || collect::collect_and_prefix(pattern, &dir, &prefix))
}

/// Later classes win over earlier files; the function entry is never replaced.
fn merge_output(output: &mut BTreeMap<String, OutputEntry>, class: &str, files: FileSet) {
    for (path, file) in files {
        match output.entry(path) {
            Entry::Occupied(entry) if entry.get().as_function().is_some() => {
                tracing::warn!(
                    path = %entry.key(),
                    class,
                    "file skipped; its path is taken by the function"
                );
            }
            Entry::Occupied(mut entry) => {
                tracing::warn!(
                    path = %entry.key(),
                    class,
                    "output path overridden by a later artifact class"
                );
                entry.insert(OutputEntry::File(file));
            }
            Entry::Vacant(entry) => {
                entry.insert(OutputEntry::File(file));
            }
        }
    }
}

/// Place the compiled config next to its TypeScript source.
fn copy_compiled_config(paths: &BuildPaths) -> Result<(), WorkspaceError> {
    let from = paths.tsc_out_path().join(COMPILED_CONFIG_FILE);
    let to = paths.entry_path.join(COMPILED_CONFIG_FILE);
    copy_file(&from, &to)
}

fn copy_file(from: &Path, to: &Path) -> Result<(), WorkspaceError> {
    std::fs::copy(from, to)
        .map(|_| ())
        .map_err(|e| WorkspaceError::Copy {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            source: e,
        })
}
