use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use lux_build::{
    build_all, BuildConfig, Bundler, CommandBundler, TargetField, DEFAULT_BUNDLER, DEFAULT_DEST,
};
use lux_core::{best_by, maybe_array, pick, pick_json, OneOrMany};
use metrics_exporter_prometheus::PrometheusBuilder;
use serde_json::Value;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "LUX_LOG";
const METRICS_ENV: &str = "LUX_METRICS_ADDR";

#[derive(Parser, Debug)]
#[command(name = "luxbuild", version, about = "Lux bundle build tool")]
struct Cli {
    /// Output format
    #[arg(
        short = 'o',
        long = "output",
        value_enum,
        global = true,
        default_value_t = Output::Human
    )]
    output: Output,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output { Human, Json }

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum FieldArg { Entry, Format, Minify, Filename, Global }

impl From<FieldArg> for TargetField {
    fn from(f: FieldArg) -> Self {
        match f {
            FieldArg::Entry => TargetField::Entry,
            FieldArg::Format => TargetField::Format,
            FieldArg::Minify => TargetField::Minify,
            FieldArg::Filename => TargetField::Filename,
            FieldArg::Global => TargetField::Global,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build targets (all configured targets when none are named)
    Build {
        /// Target names, e.g. "esm" "global"
        targets: Vec<String>,
        /// Output directory
        #[arg(long = "dest", env = "LUX_DEST")]
        dest: Option<PathBuf>,
        /// JSON build config
        #[arg(long = "config")]
        config: Option<PathBuf>,
        /// Bundler program
        #[arg(long = "bundler", env = "LUX_BUNDLER")]
        bundler: Option<String>,
    },
    /// List configured targets
    Targets {
        /// JSON build config
        #[arg(long = "config")]
        config: Option<PathBuf>,
        /// Only show these fields
        #[arg(long = "fields", value_enum, value_delimiter = ',')]
        fields: Vec<FieldArg>,
    },
    /// Read a JSON object from stdin and keep only the given keys
    Pick {
        #[arg(long = "keys", value_delimiter = ',', required = true)]
        keys: Vec<String>,
    },
    /// Print the stdin element (value or array) with the greatest numeric key
    Best {
        /// Select the least key instead
        #[arg(long = "min", action = ArgAction::SetTrue)]
        min: bool,
        /// Object field holding the key (default: the element itself)
        #[arg(long = "by")]
        by: Option<String>,
    },
}

/// Logs go to stderr; stdout carries only command output.
fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

/// Listener address for the metrics exporter; `None` when unset.
fn metrics_listener(raw: Option<&str>) -> Result<Option<SocketAddr>> {
    raw.map(|s| {
        s.trim()
            .parse::<SocketAddr>()
            .with_context(|| format!("{} must be host:port, got {:?}", METRICS_ENV, s))
    })
    .transpose()
}

fn init_metrics() {
    let raw = std::env::var(METRICS_ENV).ok();
    let addr = match metrics_listener(raw.as_deref()) {
        Ok(Some(addr)) => addr,
        Ok(None) => return,
        Err(e) => {
            warn!(error = %e, "metrics exporter disabled");
            return;
        }
    };
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => info!(%addr, "serving build metrics"),
        Err(e) => warn!(error = %e, %addr, "metrics exporter failed to start"),
    }
}

fn read_stdin_json() -> Result<Value> {
    let input = std::io::read_to_string(std::io::stdin()).context("reading stdin")?;
    serde_json::from_str(&input).context("parsing stdin as JSON")
}

fn numeric_key(v: &Value, by: Option<&str>) -> Option<f64> {
    match by {
        Some(field) => v.get(field).and_then(Value::as_f64),
        None => v.as_f64(),
    }
}

/// Element with the greatest (or least) numeric key; elements without one are skipped.
fn best_value<'a>(items: &'a [Value], by: Option<&str>, min: bool) -> Option<&'a Value> {
    let keyed: Vec<(f64, &Value)> =
        items.iter().filter_map(|v| numeric_key(v, by).map(|k| (k, v))).collect();
    let best = if min {
        best_by(keyed, |(k, _)| *k, |a, b| b.total_cmp(a))
    } else {
        best_by(keyed, |(k, _)| *k, |a, b| a.total_cmp(b))
    };
    best.map(|(_, v)| v)
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    init_metrics();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { targets, dest, config, bundler } => {
            let cfg = BuildConfig::load_opt(config.as_deref()).context("loading build config")?;
            let dest = dest
                .or_else(|| cfg.dest.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DEST));
            let program = bundler
                .or_else(|| cfg.bundler.clone())
                .unwrap_or_else(|| DEFAULT_BUNDLER.to_string());
            let selected = cfg.resolve_targets(&targets)?;
            info!(
                dest = %dest.display(),
                bundler = %program,
                targets = selected.len(),
                "build invoked"
            );

            let bundler: Arc<dyn Bundler> = Arc::new(CommandBundler::new(program));
            let summary = build_all(bundler, &dest, &selected).await?;

            match cli.output {
                Output::Human => {
                    println!("TARGET     STATUS  BYTES     FILE");
                    for o in summary.outcomes.iter() {
                        match &o.result {
                            Ok(r) => println!(
                                "{:<10} {:<7} {:<9} {}",
                                o.target,
                                "ok",
                                r.code.bytes,
                                r.code.path.display()
                            ),
                            Err(e) => {
                                println!("{:<10} {:<7} {:<9} {}", o.target, "failed", "-", e)
                            }
                        }
                    }
                    if let Some(r) = summary.largest() {
                        println!("largest: {} ({} bytes)", r.target, r.code.bytes);
                    }
                }
                Output::Json => {
                    #[derive(serde::Serialize)]
                    struct Row<'a> {
                        target: &'a str,
                        ok: bool,
                        bytes: Option<u64>,
                        error: Option<String>,
                    }
                    let rows: Vec<_> = summary
                        .outcomes
                        .iter()
                        .map(|o| Row {
                            target: &o.target,
                            ok: o.result.is_ok(),
                            bytes: o.result.as_ref().ok().map(|r| r.code.bytes),
                            error: o.result.as_ref().err().map(|e| e.to_string()),
                        })
                        .collect();
                    println!("{}", serde_json::to_string_pretty(&rows)?);
                }
            }

            let failed = summary.failed_count();
            if failed > 0 {
                warn!(failed, "some targets failed");
                bail!("{} of {} target(s) failed", failed, summary.outcomes.len());
            }
        }
        Commands::Targets { config, fields } => {
            let cfg = BuildConfig::load_opt(config.as_deref()).context("loading build config")?;
            let fields: Vec<TargetField> = if fields.is_empty() {
                TargetField::ALL.to_vec()
            } else {
                fields.into_iter().map(TargetField::from).collect()
            };
            let table = cfg.target_table();
            match cli.output {
                Output::Human => {
                    for t in table.iter() {
                        let picked = pick(&t.config, fields.as_slice());
                        let cols: Vec<String> = picked
                            .iter()
                            .map(|(f, v)| format!("{}={}", field_label(*f), v))
                            .collect();
                        println!("{:<10} {}", t.name, cols.join(" "));
                    }
                }
                Output::Json => {
                    #[derive(serde::Serialize)]
                    struct Row<'a, P: serde::Serialize> {
                        name: &'a str,
                        #[serde(flatten)]
                        fields: P,
                    }
                    let rows: Vec<_> = table
                        .iter()
                        .map(|t| Row { name: &t.name, fields: pick(&t.config, fields.as_slice()) })
                        .collect();
                    println!("{}", serde_json::to_string_pretty(&rows)?);
                }
            }
        }
        Commands::Pick { keys } => {
            let input = read_stdin_json()?;
            let obj = input.as_object().ok_or_else(|| anyhow!("expected a JSON object on stdin"))?;
            let out = Value::Object(pick_json(obj, &keys));
            match cli.output {
                Output::Human => println!("{}", out),
                Output::Json => println!("{}", serde_json::to_string_pretty(&out)?),
            }
        }
        Commands::Best { min, by } => {
            let input: OneOrMany<Value> =
                serde_json::from_value(read_stdin_json()?).context("reading elements")?;
            let items = maybe_array(input);
            match best_value(&items, by.as_deref(), min) {
                Some(v) => match cli.output {
                    Output::Human => println!("{}", v),
                    Output::Json => println!("{}", serde_json::to_string_pretty(v)?),
                },
                None => {
                    eprintln!("no element with a numeric key");
                }
            }
        }
    }

    Ok(())
}

fn field_label(f: TargetField) -> &'static str {
    <lux_build::TargetConfig as lux_core::Record>::field_name(f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn best_value_max_min_and_by() {
        let items: Vec<Value> = [3, 1, 4, 1, 5, 9, 2, 6].into_iter().map(|n| json!(n)).collect();
        assert_eq!(best_value(&items, None, false), Some(&json!(9)));
        assert_eq!(best_value(&items, None, true), Some(&json!(1)));

        let objs = vec![json!({"k": 1, "id": "a"}), json!({"k": 1, "id": "b"}), json!({"id": "c"})];
        assert_eq!(best_value(&objs, Some("k"), true), Some(&json!({"k": 1, "id": "a"})));
        assert_eq!(best_value(&objs, Some("k"), false), Some(&json!({"k": 1, "id": "a"})));
        assert_eq!(best_value(&[], None, false), None);
    }

    #[test]
    fn field_args_map_to_target_fields() {
        assert_eq!(TargetField::from(FieldArg::Global), TargetField::Global);
        assert_eq!(field_label(TargetField::Filename), "filename");
    }

    #[test]
    fn cli_parses_fields_list() {
        let cli = Cli::try_parse_from(["luxbuild", "targets", "--fields", "entry,format"]).unwrap();
        match cli.command {
            Commands::Targets { fields, .. } => {
                assert_eq!(fields, vec![FieldArg::Entry, FieldArg::Format])
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(Cli::try_parse_from(["luxbuild", "targets", "--fields", "entry,outdir"]).is_err());
    }

    #[test]
    fn metrics_listener_parses_or_rejects() {
        assert!(metrics_listener(None).unwrap().is_none());
        let addr = metrics_listener(Some(" 127.0.0.1:9464 ")).unwrap();
        assert_eq!(addr, Some(SocketAddr::from(([127, 0, 0, 1], 9464))));
        let err = metrics_listener(Some("localhost")).unwrap_err();
        assert!(err.to_string().contains(METRICS_ENV));
    }
}
