use std::path::Path;

use anyhow::Context;
use vessel_build::{Pipeline, RegistryAuth};
use vessel_core::BuildInput;

pub async fn build(input: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    let request = BuildInput::load(input)?;

    let result = Pipeline::new()
        .with_registry_auth(RegistryAuth::from_env())
        .run(&request)
        .await?;

    for (name, function) in result.functions() {
        let digest = function
            .digest()
            .with_context(|| format!("failed to digest function {name}"))?;
        tracing::info!(
            function = name,
            files = function.files.len(),
            sha256 = %digest,
            "function ready"
        );
    }

    let rendered = serde_json::to_string_pretty(&result)?;
    match output {
        Some(path) => {
            std::fs::write(path, format!("{rendered}\n"))
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Build result written to {}", path.display());
        }
        None => println!("{rendered}"),
    }

    Ok(())
}
