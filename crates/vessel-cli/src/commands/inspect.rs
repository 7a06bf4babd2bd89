use std::path::Path;

use vessel_build::Stage;
use vessel_core::{BuildPaths, FrameworkConfigFile, Manifest, NodeRuntime};
use vessel_exec::PackageManager;

/// Report path resolution and project detection without touching the workspace.
pub fn inspect(work_path: &Path, entrypoint: &str) -> anyhow::Result<()> {
    let paths = BuildPaths::resolve(work_path, entrypoint)?;
    let manifest = Manifest::read(&paths.entry_path)?;
    let manager = PackageManager::detect(&paths.entry_path);
    let runtime = NodeRuntime::resolve(manifest.node_engine())?;

    println!("Paths");
    println!("  entry dir:     {}", paths.entry_dir.display());
    println!("  entry path:    {}", paths.entry_path.display());
    println!("  node_modules:  {}", paths.modules_path.display());
    println!("  cache:         {}", paths.cache_path.display());

    println!("Project");
    println!("  installer:     {manager}");
    println!("  runtime:       {}", runtime.identifier());
    match manifest.framework_dependency() {
        Some(framework) => {
            let variant = if framework.suffix.is_empty() {
                "stable"
            } else {
                framework.suffix.trim_start_matches('-')
            };
            println!(
                "  framework:     {} {} ({variant}, core package {})",
                framework.name,
                framework.version,
                framework.core_package()
            );
        }
        None => println!("  framework:     not declared"),
    }
    match FrameworkConfigFile::detect(&paths.entry_path) {
        Ok(config) => println!("  config:        {}", config.file_name()),
        Err(e) => println!("  config:        {e}"),
    }
    println!(
        "  build hook:    {}",
        manifest.build_hook().unwrap_or("none")
    );

    let stages: Vec<&str> = Stage::plan(manifest.build_hook().is_some())
        .into_iter()
        .map(Stage::name)
        .collect();
    println!("Stages");
    println!("  {}", stages.join(" → "));

    Ok(())
}
