//! Build pipeline, artifact collection, function packaging and routing for vessel.
//!
//! # Pipeline
//!
//! ```text
//! vessel build
//!   1. prepare            ── materialize files, read package.json, .npmrc, caches
//!   2. install-dev        ── node_modules -> node_modules_dev, full install
//!   3. pre-build          ── `vercel-build` / `now-build` script (only if declared)
//!   4. framework-build    ── [tsc nuxt.config.ts] → probe options → nuxt build [→ generate]
//!   5. install-prod       ── prune package.json, node_modules -> node_modules_prod
//!   6. collect-artifacts  ── version check, glob outputs, package function, routes
//! ```
//!
//! # Output namespace
//!
//! | class            | source                       | prefix                   |
//! |------------------|------------------------------|--------------------------|
//! | static files     | `<srcDir>/<dir.static>`      | (root)                   |
//! | client dist      | `<buildDir>/dist/client`     | `build.publicPath`       |
//! | server dist      | `<buildDir>/dist/server`     | `<buildDir>/dist/server` |
//! | generated pages  | `dist/**/*.html`             | (root)                   |
//!
//! Server dist, production modules and extra files end up inside the
//! function package, which is keyed by `lambdaName` (default `index`).

pub mod collect;
pub mod error;
pub mod launcher;
pub mod package;
pub mod pipeline;
pub mod routes;
pub mod stage;
pub mod workspace;

pub use error::{PipelineError, StageCause};
pub use launcher::{LauncherParams, LauncherTemplate};
pub use package::{FunctionPackage, ResourceLimits};
pub use pipeline::{BuildResult, OutputEntry, Pipeline};
pub use routes::Route;
pub use stage::{Stage, StageRunner};
pub use workspace::RegistryAuth;
