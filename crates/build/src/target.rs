//! Build targets and their configuration records.

use std::fmt;
use std::path::{Path, PathBuf};

use lux_core::Record;
use serde::{Deserialize, Serialize};

pub const DEFAULT_ENTRY: &str = "src/luxon.js";
pub const DEFAULT_FILENAME: &str = "luxon.js";

/// Module format handed to the bundler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleFormat {
    Es6,
    Commonjs,
    Amd,
}

impl ModuleFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleFormat::Es6 => "es6",
            ModuleFormat::Commonjs => "commonjs",
            ModuleFormat::Amd => "amd",
        }
    }
}

impl fmt::Display for ModuleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetConfig {
    pub entry: PathBuf,
    pub format: ModuleFormat,
    #[serde(default)]
    pub minify: bool,
    #[serde(default = "default_filename")]
    pub filename: String,
    /// Expose the module as a browser global.
    #[serde(default)]
    pub global: bool,
}

fn default_filename() -> String { DEFAULT_FILENAME.to_string() }

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            entry: PathBuf::from(DEFAULT_ENTRY),
            format: ModuleFormat::Es6,
            minify: false,
            filename: default_filename(),
            global: false,
        }
    }
}

impl TargetConfig {
    pub fn map_filename(&self) -> String { map_filename(&self.filename) }
}

/// Partial target config from a config file; set fields win over the base.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TargetOverride {
    pub entry: Option<PathBuf>,
    pub format: Option<ModuleFormat>,
    pub minify: Option<bool>,
    pub filename: Option<String>,
    pub global: Option<bool>,
}

impl TargetOverride {
    pub fn apply(&self, mut base: TargetConfig) -> TargetConfig {
        if let Some(entry) = &self.entry { base.entry = entry.clone(); }
        if let Some(format) = self.format { base.format = format; }
        if let Some(minify) = self.minify { base.minify = minify; }
        if let Some(filename) = &self.filename { base.filename = filename.clone(); }
        if let Some(global) = self.global { base.global = global; }
        base
    }
}

/// A named build target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub name: String,
    #[serde(flatten)]
    pub config: TargetConfig,
}

impl Target {
    pub fn new(name: impl Into<String>, config: TargetConfig) -> Self {
        Self { name: name.into(), config }
    }
}

/// Built-in target table, in build order.
pub fn default_targets() -> Vec<Target> {
    let base = TargetConfig::default();
    vec![
        Target::new("esm", base.clone()),
        Target::new("es6", base.clone()),
        Target::new("mjs", TargetConfig { filename: "luxon.mjs".to_string(), ..base.clone() }),
        Target::new("commonjs", TargetConfig { format: ModuleFormat::Commonjs, ..base.clone() }),
        Target::new("global", TargetConfig { format: ModuleFormat::Amd, global: true, ..base }),
    ]
}

/// Source map name for a module file: `luxon.js` -> `luxon.map.js`.
pub fn map_filename(filename: &str) -> String {
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{}.map.{}", stem, ext),
        _ => format!("{}.map", filename),
    }
}

/// Names of the fields of [`TargetConfig`], for [`lux_core::pick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetField {
    Entry,
    Format,
    Minify,
    Filename,
    Global,
}

impl TargetField {
    pub const ALL: [TargetField; 5] = [
        TargetField::Entry,
        TargetField::Format,
        TargetField::Minify,
        TargetField::Filename,
        TargetField::Global,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue<'a> {
    Path(&'a Path),
    Format(ModuleFormat),
    Flag(bool),
    Text(&'a str),
}

impl fmt::Display for FieldValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Path(p) => write!(f, "{}", p.display()),
            FieldValue::Format(m) => write!(f, "{}", m),
            FieldValue::Flag(b) => write!(f, "{}", b),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

impl Record for TargetConfig {
    type Field = TargetField;
    type Value<'a> = FieldValue<'a>;

    fn field(&self, field: TargetField) -> FieldValue<'_> {
        match field {
            TargetField::Entry => FieldValue::Path(&self.entry),
            TargetField::Format => FieldValue::Format(self.format),
            TargetField::Minify => FieldValue::Flag(self.minify),
            TargetField::Filename => FieldValue::Text(&self.filename),
            TargetField::Global => FieldValue::Flag(self.global),
        }
    }

    fn field_name(field: TargetField) -> &'static str {
        match field {
            TargetField::Entry => "entry",
            TargetField::Format => "format",
            TargetField::Minify => "minify",
            TargetField::Filename => "filename",
            TargetField::Global => "global",
        }
    }
}
