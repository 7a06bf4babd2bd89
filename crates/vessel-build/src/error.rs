use std::path::PathBuf;

use semver::Version;
use vessel_exec::ExecError;

use crate::collect::CollectError;
use crate::launcher::LauncherError;
use crate::package::{FrameworkCheckError, PackageError};
use crate::stage::Stage;
use crate::workspace::WorkspaceError;

/// Everything that can abort a build. No partial result accompanies an error.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Input contract violations (`InvalidEntrypoint`, `ManifestNotFound`)
    #[error(transparent)]
    Core(#[from] vessel_core::Error),

    #[error("stage {stage} failed: {summary}")]
    StageFailure {
        stage: Stage,
        summary: String,
        source: StageCause,
    },

    #[error("cannot resolve framework package {package} at {path}: {detail}")]
    FrameworkNotResolvable {
        package: String,
        path: PathBuf,
        detail: String,
    },

    #[error("{package} {detected} is not supported (>= {minimum} required)")]
    UnsupportedFrameworkVersion {
        package: String,
        detected: Version,
        minimum: Version,
    },

    #[error("stage {stage} cannot run: {detail}")]
    StageOrder { stage: Stage, detail: String },
}

impl PipelineError {
    /// Attach stage context to a failure raised while `stage` was running.
    ///
    /// A missing entrypoint manifest and framework compatibility errors
    /// surface unchanged; everything else becomes [`PipelineError::StageFailure`].
    pub fn from_stage(stage: Stage, cause: StageCause) -> Self {
        match cause {
            StageCause::Core(
                e @ (vessel_core::Error::InvalidEntrypoint { .. }
                | vessel_core::Error::ManifestNotFound { .. }),
            ) => Self::Core(e),
            StageCause::Framework(FrameworkCheckError::NotResolvable {
                package,
                path,
                detail,
            }) => Self::FrameworkNotResolvable {
                package,
                path,
                detail,
            },
            StageCause::Framework(FrameworkCheckError::Unsupported {
                package,
                detected,
                minimum,
            }) => Self::UnsupportedFrameworkVersion {
                package,
                detected,
                minimum,
            },
            cause => Self::StageFailure {
                stage,
                summary: cause.summary(),
                source: cause,
            },
        }
    }

    /// Name of the failed stage, when the error is stage-scoped.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::StageFailure { stage, .. } | Self::StageOrder { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Underlying failure of a stage body.
#[derive(Debug, thiserror::Error)]
pub enum StageCause {
    #[error(transparent)]
    Core(#[from] vessel_core::Error),
    #[error(transparent)]
    Exec(#[from] ExecError),
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
    #[error(transparent)]
    Collect(#[from] CollectError),
    #[error(transparent)]
    Launcher(#[from] LauncherError),
    #[error(transparent)]
    Package(#[from] PackageError),
    #[error(transparent)]
    Framework(#[from] FrameworkCheckError),
    #[error("background collection task failed")]
    Join(#[from] tokio::task::JoinError),
}

impl StageCause {
    /// Command output tail for process failures, the error chain otherwise.
    pub fn summary(&self) -> String {
        match self {
            Self::Exec(e) => e.output_summary(),
            other => {
                let mut message = other.to_string();
                let mut source = std::error::Error::source(other);
                while let Some(inner) = source {
                    message.push_str(": ");
                    message.push_str(&inner.to_string());
                    source = inner.source();
                }
                message
            }
        }
    }
}
