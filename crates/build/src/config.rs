//! Build config file: output dir, bundler program, target selection and overrides.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use lux_core::{maybe_array, OneOrMany};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::target::{default_targets, Target, TargetConfig, TargetOverride};
use crate::{BuildError, BuildResult};

pub const DEFAULT_DEST: &str = "build";
pub const DEFAULT_BUNDLER: &str = "lux-bundle";

/// On-disk config, e.g.
/// `{"dest": "dist", "targets": ["esm", "global"], "overrides": {"global": {"minify": true}}}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    pub dest: Option<PathBuf>,
    pub bundler: Option<String>,
    /// Targets built when none are named on the command line.
    pub targets: Option<OneOrMany<String>>,
    pub overrides: BTreeMap<String, TargetOverride>,
}

impl BuildConfig {
    pub fn load(path: &Path) -> BuildResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| BuildError::io(path, e))?;
        let cfg: BuildConfig = serde_json::from_slice(&bytes)
            .map_err(|source| BuildError::Json { path: path.to_path_buf(), source })?;
        debug!(path = %path.display(), overrides = cfg.overrides.len(), "loaded build config");
        Ok(cfg)
    }

    /// Load `path` when given, else the empty config.
    pub fn load_opt(path: Option<&Path>) -> BuildResult<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    /// Built-in targets with overrides merged in; override-only names are appended.
    pub fn target_table(&self) -> Vec<Target> {
        let mut table = default_targets();
        for t in table.iter_mut() {
            if let Some(o) = self.overrides.get(&t.name) {
                t.config = o.apply(t.config.clone());
            }
        }
        for (name, o) in self.overrides.iter() {
            if !table.iter().any(|t| &t.name == name) {
                table.push(Target::new(name.clone(), o.apply(TargetConfig::default())));
            }
        }
        table
    }

    /// Resolve the targets to build: `requested` if non-empty, else the config's
    /// `targets`, else the whole table. Duplicates are dropped, order is kept.
    pub fn resolve_targets(&self, requested: &[String]) -> BuildResult<Vec<Target>> {
        let table = self.target_table();
        let names: Vec<String> = if !requested.is_empty() {
            requested.to_vec()
        } else if let Some(sel) = self.targets.clone() {
            maybe_array(sel)
        } else {
            table.iter().map(|t| t.name.clone()).collect()
        };
        if names.is_empty() {
            return Err(BuildError::Config("no targets selected".to_string()));
        }

        let mut seen: FxHashSet<String> = FxHashSet::default();
        let mut out = Vec::with_capacity(names.len());
        for name in names {
            if !seen.insert(name.clone()) {
                continue;
            }
            match table.iter().find(|t| t.name == name) {
                Some(t) => out.push(t.clone()),
                None => return Err(BuildError::UnknownTarget(name)),
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::ModuleFormat;

    fn parse(s: &str) -> BuildConfig { serde_json::from_str(s).unwrap() }

    fn names(ts: &[Target]) -> Vec<&str> { ts.iter().map(|t| t.name.as_str()).collect() }

    #[test]
    fn empty_config_builds_everything() {
        let cfg = BuildConfig::default();
        let ts = cfg.resolve_targets(&[]).unwrap();
        assert_eq!(names(&ts), vec!["esm", "es6", "mjs", "commonjs", "global"]);
    }

    #[test]
    fn targets_accepts_bare_string_or_list() {
        let one = parse(r#"{"targets": "global"}"#);
        assert_eq!(names(&one.resolve_targets(&[]).unwrap()), vec!["global"]);
        let many = parse(r#"{"targets": ["mjs", "esm", "mjs"]}"#);
        assert_eq!(names(&many.resolve_targets(&[]).unwrap()), vec!["mjs", "esm"]);
    }

    #[test]
    fn requested_names_win_over_config() {
        let cfg = parse(r#"{"targets": "global"}"#);
        let ts = cfg.resolve_targets(&["commonjs".to_string()]).unwrap();
        assert_eq!(names(&ts), vec!["commonjs"]);
    }

    #[test]
    fn unknown_target_is_rejected() {
        let err = BuildConfig::default().resolve_targets(&["umd".to_string()]).unwrap_err();
        assert!(matches!(err, BuildError::UnknownTarget(ref n) if n == "umd"));
        let empty = parse(r#"{"targets": []}"#);
        assert!(matches!(empty.resolve_targets(&[]), Err(BuildError::Config(_))));
    }

    #[test]
    fn overrides_merge_and_extend() {
        let cfg = parse(r#"{
            "overrides": {
                "global": {"minify": true, "filename": "luxon.min.js"},
                "amd": {"format": "amd"}
            }
        }"#);
        let table = cfg.target_table();
        let global = table.iter().find(|t| t.name == "global").unwrap();
        assert!(global.config.minify && global.config.global);
        assert_eq!(global.config.filename, "luxon.min.js");
        let amd = table.last().unwrap();
        assert_eq!(amd.name, "amd");
        assert_eq!(amd.config.format, ModuleFormat::Amd);
        assert_eq!(amd.config.filename, "luxon.js");
    }

    #[test]
    fn unknown_keys_fail_to_parse() {
        assert!(serde_json::from_str::<BuildConfig>(r#"{"outdir": "x"}"#).is_err());
        let typo = r#"{"overrides": {"esm": {"minified": true}}}"#;
        assert!(serde_json::from_str::<BuildConfig>(typo).is_err());
    }

    #[test]
    fn load_reports_path_on_error() {
        let path = std::env::temp_dir().join(format!(
            "lux-config-{}.json",
            std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap().as_nanos()
        ));
        assert!(matches!(BuildConfig::load(&path), Err(BuildError::Io { .. })));
        std::fs::write(&path, b"{not json").unwrap();
        let err = BuildConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains(&*path.to_string_lossy()));
        std::fs::write(&path, br#"{"dest": "dist", "bundler": "rollup-wrap"}"#).unwrap();
        let cfg = BuildConfig::load(&path).unwrap();
        assert_eq!(cfg.dest.as_deref(), Some(Path::new("dist")));
        assert_eq!(cfg.bundler.as_deref(), Some("rollup-wrap"));
        let _ = std::fs::remove_file(&path);
    }
}
