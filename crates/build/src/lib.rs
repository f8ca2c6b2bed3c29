//! Lux build: turns per-target configuration into bundler invocations and
//! writes the compiled module plus its source map for every target.

#![forbid(unsafe_code)]

use std::path::PathBuf;

mod bundler;
mod config;
mod runner;
mod target;

pub use bundler::{BundleOutput, BundleRequest, Bundler, CommandBundler};
pub use config::{BuildConfig, DEFAULT_BUNDLER, DEFAULT_DEST};
pub use runner::{
    build_all, build_target, update_manifest, ArtifactInfo, BuildSummary, Manifest, TargetOutcome,
    TargetReport, MANIFEST_FILE,
};
pub use target::{
    default_targets, map_filename, FieldValue, ModuleFormat, Target, TargetConfig, TargetField,
    TargetOverride, DEFAULT_ENTRY, DEFAULT_FILENAME,
};

/// Errors surfaced by config loading and target builds.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("config: {0}")]
    Config(String),
    #[error("unknown target: {0}")]
    UnknownTarget(String),
    #[error("bundler failed for {target}: {message}")]
    Bundler { target: String, message: String },
    #[error("io at {}: {source}", .path.display())]
    Io { path: PathBuf, source: std::io::Error },
    #[error("json at {}: {source}", .path.display())]
    Json { path: PathBuf, source: serde_json::Error },
}

impl BuildError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BuildError::Io { path: path.into(), source }
    }
}

pub type BuildResult<T> = Result<T, BuildError>;
