//! Core types for vessel.
//!
//! This crate defines the platform build contract ([`BuildInput`],
//! [`BuildConfig`]), file references ([`FileRef`], [`FileSet`]), working
//! directory resolution ([`BuildPaths`]), `package.json` editing
//! ([`Manifest`]), framework options and the shared error type.

pub mod config;
pub mod error;
pub mod file;
pub mod framework;
pub mod manifest;
pub mod paths;
pub mod runtime;

pub use config::{BuildConfig, BuildInput, BuildMeta};
pub use error::{Error, Result};
pub use file::{FileRef, FileSet};
pub use framework::{FrameworkConfigFile, FrameworkOptions};
pub use manifest::{FrameworkDependency, Manifest};
pub use paths::BuildPaths;
pub use runtime::NodeRuntime;
