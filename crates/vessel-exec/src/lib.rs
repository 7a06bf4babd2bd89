//! External tools invoked by a vessel build.
//!
//! Every invocation goes through [`CommandExecutor`], so the pipeline can be
//! exercised end to end with a mock that simulates installer and compiler
//! side effects.

pub mod command;
pub mod executor;
pub mod installer;
pub mod toolchain;

pub use command::{CommandOutput, CommandSpec, ExecError};
pub use executor::{CommandExecutor, RealExecutor};
pub use installer::{InstallPass, PackageManager};
pub use toolchain::Toolchain;
