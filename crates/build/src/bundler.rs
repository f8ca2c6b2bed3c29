//! The external bundler seam.

use std::path::PathBuf;
use std::process::Stdio;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::target::{ModuleFormat, Target};
use crate::{BuildError, BuildResult};

/// What one target asks of the bundler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleRequest {
    pub target: String,
    pub entry: PathBuf,
    pub format: ModuleFormat,
    pub minify: bool,
    pub filename: String,
    pub global: bool,
}

impl BundleRequest {
    pub fn for_target(t: &Target) -> Self {
        Self {
            target: t.name.clone(),
            entry: t.config.entry.clone(),
            format: t.config.format,
            minify: t.config.minify,
            filename: t.config.filename.clone(),
            global: t.config.global,
        }
    }
}

/// Compiled module and source map bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleOutput {
    pub code: Vec<u8>,
    pub map: Vec<u8>,
}

#[async_trait::async_trait]
pub trait Bundler: Send + Sync {
    async fn bundle(&self, req: &BundleRequest) -> BuildResult<BundleOutput>;
}

/// Runs an external program per request and reads `{"code": .., "map": ..}` from its stdout.
#[derive(Debug, Clone)]
pub struct CommandBundler {
    program: String,
    leading_args: Vec<String>,
}

#[derive(Deserialize)]
struct WireOutput {
    code: String,
    map: String,
}

impl CommandBundler {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into(), leading_args: Vec::new() }
    }

    /// Arguments placed before the per-request flags.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.leading_args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &str { &self.program }

    fn request_args(req: &BundleRequest) -> Vec<String> {
        let mut args = vec![
            "--entry".to_string(),
            req.entry.to_string_lossy().to_string(),
            "--format".to_string(),
            req.format.as_str().to_string(),
            "--name".to_string(),
            req.filename.clone(),
        ];
        if req.minify { args.push("--minify".to_string()); }
        if req.global { args.push("--global".to_string()); }
        args
    }
}

#[async_trait::async_trait]
impl Bundler for CommandBundler {
    async fn bundle(&self, req: &BundleRequest) -> BuildResult<BundleOutput> {
        let args = Self::request_args(req);
        debug!(target_name = %req.target, program = %self.program, ?args, "spawning bundler");
        let out = tokio::process::Command::new(&self.program)
            .args(&self.leading_args)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| BuildError::io(&self.program, e))?;

        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr).trim().to_string();
            warn!(target_name = %req.target, status = %out.status, "bundler exited unsuccessfully");
            let message = if stderr.is_empty() {
                format!("exited with {}", out.status)
            } else {
                format!("exited with {}: {}", out.status, stderr)
            };
            return Err(BuildError::Bundler { target: req.target.clone(), message });
        }

        let wire: WireOutput = serde_json::from_slice(&out.stdout).map_err(|e| BuildError::Bundler {
            target: req.target.clone(),
            message: format!("malformed output: {}", e),
        })?;
        Ok(BundleOutput { code: wire.code.into_bytes(), map: wire.map.into_bytes() })
    }
}
