//! Named pipeline stages and the runner that enforces their order.

use std::future::Future;
use std::time::Instant;

use tracing::Instrument;

use crate::error::{PipelineError, StageCause};

/// One ordered, non-reentrant unit of the build pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Prepare,
    InstallDev,
    PreBuild,
    FrameworkBuild,
    InstallProd,
    CollectArtifacts,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Self::Prepare => "prepare",
            Self::InstallDev => "install-dev",
            Self::PreBuild => "pre-build",
            Self::FrameworkBuild => "framework-build",
            Self::InstallProd => "install-prod",
            Self::CollectArtifacts => "collect-artifacts",
        }
    }

    /// Stages that must have completed before this one may start.
    ///
    /// `pre-build` is conditional, so `framework-build` only requires the
    /// dev install; the runner additionally enforces that planned stages run
    /// in plan order.
    pub fn predecessors(self) -> &'static [Stage] {
        match self {
            Self::Prepare => &[],
            Self::InstallDev => &[Self::Prepare],
            Self::PreBuild => &[Self::InstallDev],
            Self::FrameworkBuild => &[Self::InstallDev],
            // The production pass rewrites the manifest the dev pass consumed.
            Self::InstallProd => &[Self::InstallDev, Self::FrameworkBuild],
            Self::CollectArtifacts => &[Self::FrameworkBuild, Self::InstallProd],
        }
    }

    /// Ordered stage list for a run; `pre-build` only when a build hook exists.
    pub fn plan(has_build_hook: bool) -> Vec<Stage> {
        [
            Self::Prepare,
            Self::InstallDev,
            Self::PreBuild,
            Self::FrameworkBuild,
            Self::InstallProd,
            Self::CollectArtifacts,
        ]
        .into_iter()
        .filter(|s| *s != Self::PreBuild || has_build_hook)
        .collect()
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Runs stages strictly sequentially and records which completed.
#[derive(Debug, Default)]
pub struct StageRunner {
    completed: Vec<Stage>,
}

impl StageRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn completed(&self) -> &[Stage] {
        &self.completed
    }

    /// Run `work` as `stage`.
    ///
    /// Fails with [`PipelineError::StageOrder`] if a predecessor has not
    /// completed or the stage already ran. Failures of `work` are converted
    /// through [`PipelineError::from_stage`].
    pub async fn run<T, F>(&mut self, stage: Stage, work: F) -> Result<T, PipelineError>
    where
        F: Future<Output = Result<T, StageCause>>,
    {
        if self.completed.contains(&stage) {
            return Err(PipelineError::StageOrder {
                stage,
                detail: "stage already ran".to_owned(),
            });
        }
        if let Some(missing) = stage
            .predecessors()
            .iter()
            .find(|p| !self.completed.contains(p))
        {
            return Err(PipelineError::StageOrder {
                stage,
                detail: format!("predecessor {missing} has not completed"),
            });
        }

        let span = tracing::info_span!("stage", name = %stage);
        let started = Instant::now();
        async {
            tracing::info!("stage started");
            let outcome = work.await;
            let elapsed_ms = started.elapsed().as_millis() as u64;
            match &outcome {
                Ok(_) => tracing::info!(elapsed_ms, "stage completed"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "stage failed"),
            }
            outcome
        }
        .instrument(span)
        .await
        .map_err(|cause| PipelineError::from_stage(stage, cause))
        .map(|value| {
            self.completed.push(stage);
            value
        })
    }
}
