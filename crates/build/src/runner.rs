//! Target runner: bundle, write artifacts, record a manifest.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use lux_core::best_by;
use metrics::{counter, histogram};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::bundler::{BundleOutput, BundleRequest, Bundler};
use crate::target::Target;
use crate::{BuildError, BuildResult};

pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactInfo {
    pub path: PathBuf,
    pub bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetReport {
    pub target: String,
    pub code: ArtifactInfo,
    pub map: ArtifactInfo,
    pub elapsed_ms: u64,
}

#[derive(Debug)]
pub struct TargetOutcome {
    pub target: String,
    pub result: BuildResult<TargetReport>,
}

/// Contents of `<dest>/manifest.json`: successful targets only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub built_at: DateTime<Utc>,
    pub targets: Vec<TargetReport>,
}

#[derive(Debug)]
pub struct BuildSummary {
    pub dest: PathBuf,
    /// One entry per requested target, in request order.
    pub outcomes: Vec<TargetOutcome>,
    pub manifest_path: Option<PathBuf>,
}

impl BuildSummary {
    pub fn succeeded(&self) -> impl Iterator<Item = &TargetReport> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = (&str, &BuildError)> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().err().map(|e| (o.target.as_str(), e)))
    }

    pub fn failed_count(&self) -> usize { self.failed().count() }

    /// Target with the largest compiled module; the earliest wins on equal sizes.
    pub fn largest(&self) -> Option<&TargetReport> {
        best_by(self.succeeded(), |r| r.code.bytes, |a, b| a.cmp(b))
    }
}

static MANIFEST_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));
static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Sibling path unique to this process and call, e.g. `.luxon.js.4711.3.tmp`.
fn tmp_path(path: &Path) -> PathBuf {
    let name = path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
    let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);
    path.with_file_name(format!(".{}.{}.{}.tmp", name, std::process::id(), seq))
}

async fn write_tmp(path: &Path, bytes: &[u8]) -> BuildResult<PathBuf> {
    let tmp = tmp_path(path);
    if let Err(e) = tokio::fs::write(&tmp, bytes).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(BuildError::io(&tmp, e));
    }
    Ok(tmp)
}

/// Write `bytes` to `path` through a temp file and a rename, so readers never see a partial file.
async fn write_atomic(path: &Path, bytes: &[u8]) -> BuildResult<()> {
    let tmp = write_tmp(path, bytes).await?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(BuildError::io(path, e));
    }
    Ok(())
}

/// Write code and map so that either both land or neither does.
async fn write_artifacts(
    code_path: &Path,
    map_path: &Path,
    out: &BundleOutput,
) -> BuildResult<(ArtifactInfo, ArtifactInfo)> {
    let code_tmp = write_tmp(code_path, &out.code).await?;
    let map_tmp = match write_tmp(map_path, &out.map).await {
        Ok(t) => t,
        Err(e) => {
            let _ = tokio::fs::remove_file(&code_tmp).await;
            return Err(e);
        }
    };
    if let Err(e) = tokio::fs::rename(&map_tmp, map_path).await {
        let _ = tokio::fs::remove_file(&map_tmp).await;
        let _ = tokio::fs::remove_file(&code_tmp).await;
        return Err(BuildError::io(map_path, e));
    }
    if let Err(e) = tokio::fs::rename(&code_tmp, code_path).await {
        let _ = tokio::fs::remove_file(&code_tmp).await;
        let _ = tokio::fs::remove_file(map_path).await;
        return Err(BuildError::io(code_path, e));
    }
    let code = ArtifactInfo { path: code_path.to_path_buf(), bytes: out.code.len() as u64 };
    let map = ArtifactInfo { path: map_path.to_path_buf(), bytes: out.map.len() as u64 };
    Ok((code, map))
}

/// Bundle one target and write `<dest>/<name>/<filename>` plus its source map.
pub async fn build_target(
    bundler: &dyn Bundler,
    dest: &Path,
    target: &Target,
) -> BuildResult<TargetReport> {
    let started = Instant::now();
    let req = BundleRequest::for_target(target);
    let out = bundler.bundle(&req).await?;

    let dir = dest.join(&target.name);
    tokio::fs::create_dir_all(&dir).await.map_err(|e| BuildError::io(&dir, e))?;
    let code_path = dir.join(&target.config.filename);
    let map_path = dir.join(target.config.map_filename());
    let (code, map) = write_artifacts(&code_path, &map_path, &out).await?;

    let elapsed = started.elapsed();
    histogram!("build_target_ms", elapsed.as_secs_f64() * 1000.0);
    histogram!("build_artifact_bytes", code.bytes as f64);
    Ok(TargetReport {
        target: target.name.clone(),
        code,
        map,
        elapsed_ms: elapsed.as_millis() as u64,
    })
}

/// Fold `reports` into `<dest>/manifest.json`, keeping entries for other targets.
///
/// Updates are serialized within the process; a newer report replaces an older
/// one for the same target.
pub async fn update_manifest(dest: &Path, reports: Vec<TargetReport>) -> BuildResult<PathBuf> {
    let path = dest.join(MANIFEST_FILE);
    let _guard = MANIFEST_LOCK.lock().await;

    let mut targets: Vec<TargetReport> = match tokio::fs::read(&path).await {
        Ok(bytes) => match serde_json::from_slice::<Manifest>(&bytes) {
            Ok(m) => m.targets,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "discarding unreadable manifest");
                Vec::new()
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(e) => return Err(BuildError::io(&path, e)),
    };
    for r in reports {
        match targets.iter_mut().find(|t| t.target == r.target) {
            Some(slot) => *slot = r,
            None => targets.push(r),
        }
    }

    let manifest = Manifest { built_at: Utc::now(), targets };
    let bytes = serde_json::to_vec_pretty(&manifest)
        .map_err(|source| BuildError::Json { path: path.clone(), source })?;
    write_atomic(&path, &bytes).await?;
    debug!(path = %path.display(), targets = manifest.targets.len(), "manifest updated");
    Ok(path)
}

/// Build every target concurrently. A failing target does not stop the others;
/// only a failure to create `dest` or write the manifest fails the whole call.
pub async fn build_all(
    bundler: Arc<dyn Bundler>,
    dest: &Path,
    targets: &[Target],
) -> BuildResult<BuildSummary> {
    tokio::fs::create_dir_all(dest).await.map_err(|e| BuildError::io(dest, e))?;
    info!(dest = %dest.display(), targets = targets.len(), "build started");

    let runs = targets.iter().map(|t| {
        let bundler = Arc::clone(&bundler);
        async move {
            let result = build_target(bundler.as_ref(), dest, t).await;
            match &result {
                Ok(r) => {
                    counter!("build_targets_total", 1u64, "status" => "ok");
                    info!(
                        target_name = %t.name,
                        bytes = r.code.bytes,
                        elapsed_ms = r.elapsed_ms,
                        "target built"
                    );
                }
                Err(e) => {
                    counter!("build_targets_total", 1u64, "status" => "error");
                    error!(target_name = %t.name, error = %e, "target failed");
                }
            }
            TargetOutcome { target: t.name.clone(), result }
        }
    });
    let outcomes = futures::future::join_all(runs).await;

    let mut summary = BuildSummary { dest: dest.to_path_buf(), outcomes, manifest_path: None };
    let reports: Vec<TargetReport> = summary.succeeded().cloned().collect();
    if !reports.is_empty() {
        summary.manifest_path = Some(update_manifest(dest, reports).await?);
    }
    info!(failed = summary.failed_count(), "build finished");
    Ok(summary)
}
