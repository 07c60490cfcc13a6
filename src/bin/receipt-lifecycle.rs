//! Operator tool for the receipt classifier lifecycle.

use std::path::PathBuf;

use receipt_classifier::config::{self, LifecycleConfig};
use receipt_classifier::lifecycle::{RunStatus, VersionId, VersionStore, run_lifecycle};
use receipt_classifier::{logging, serving};
use serde::Serialize;

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}

enum Command {
    Run { force: bool },
    History,
    Predict(Vec<String>),
    Rollback(String),
    ConfigPath,
    Help,
}

struct CliOptions {
    command: Command,
    config_path: Option<PathBuf>,
    models_dir: Option<PathBuf>,
}

#[derive(Serialize)]
struct HistoryEntry<'a> {
    version_id: &'a VersionId,
    active: bool,
    accuracy: f64,
    f1: f64,
    sample_count: usize,
    trained_at: String,
}

fn run() -> Result<i32, String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    if let Command::Help = options.command {
        println!("{}", help_text());
        return Ok(0);
    }
    if let Command::ConfigPath = options.command {
        let path = match options.config_path {
            Some(path) => path,
            None => config::config_path().map_err(|err| err.to_string())?,
        };
        println!("{}", path.display());
        return Ok(0);
    }

    let log_path = logging::init().map_err(|err| err.to_string())?;
    tracing::debug!(path = %log_path.display(), "Logging initialised");
    let mut cfg = load_config(options.config_path.as_deref())?;
    if let Some(dir) = options.models_dir {
        cfg.storage.models_dir = Some(dir);
    }
    if let Command::Run { force } = options.command {
        let outcome = run_lifecycle(&cfg, force);
        print_json(&outcome)?;
        return Ok(if outcome.status == RunStatus::Aborted { 1 } else { 0 });
    }
    let models_dir = config::resolve_models_dir(&cfg).map_err(|err| err.to_string())?;
    let store = VersionStore::open_dir(models_dir).map_err(|err| err.to_string())?;

    match options.command {
        Command::History => {
            let active = store.active_version_id().map_err(|err| err.to_string())?;
            let history = store.list_history().map_err(|err| err.to_string())?;
            let entries: Vec<HistoryEntry<'_>> = history
                .iter()
                .map(|version| HistoryEntry {
                    version_id: &version.version_id,
                    active: active.as_ref() == Some(&version.version_id),
                    accuracy: version.metrics.accuracy,
                    f1: version.metrics.f1,
                    sample_count: version.metrics.sample_count,
                    trained_at: version
                        .metrics
                        .trained_at
                        .format(&time::format_description::well_known::Rfc3339)
                        .unwrap_or_default(),
                })
                .collect();
            print_json(&entries)?;
            Ok(0)
        }
        Command::Predict(texts) => {
            let predictions = serving::predict(&store, &texts).map_err(|err| err.to_string())?;
            print_json(&predictions)?;
            Ok(0)
        }
        Command::Rollback(raw) => {
            let version_id = VersionId::parse(&raw)
                .ok_or_else(|| format!("Not a version id: {raw}"))?;
            store
                .rollback(&version_id)
                .map_err(|err| err.to_string())?;
            println!("Active model is now {version_id}");
            Ok(0)
        }
        Command::Run { .. } | Command::ConfigPath | Command::Help => Ok(0),
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<LifecycleConfig, String> {
    let loaded = match path {
        Some(path) => config::load_from_path(path),
        None => config::load_or_default(),
    };
    loaded.map_err(|err| err.to_string())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value).map_err(|err| err.to_string())?;
    println!("{json}");
    Ok(())
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut command: Option<Command> = None;
    let mut config_path: Option<PathBuf> = None;
    let mut models_dir: Option<PathBuf> = None;
    let mut force = false;
    let mut positional: Vec<String> = Vec::new();

    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => command = Some(Command::Help),
            "--force" => force = true,
            "--config" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--config requires a value".to_string())?;
                config_path = Some(PathBuf::from(value));
            }
            "--models" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--models requires a value".to_string())?;
                models_dir = Some(PathBuf::from(value));
            }
            other if other.starts_with("--") => {
                return Err(format!("Unknown option: {other}\n\n{}", help_text()));
            }
            other => positional.push(other.to_string()),
        }
        idx += 1;
    }

    let command = match command {
        Some(command) => command,
        None => {
            let mut positional = positional.into_iter();
            match positional.next().as_deref() {
                Some("run") => Command::Run { force },
                Some("history") => Command::History,
                Some("predict") => {
                    let texts: Vec<String> = positional.collect();
                    if texts.is_empty() {
                        return Err("predict requires at least one text".to_string());
                    }
                    Command::Predict(texts)
                }
                Some("rollback") => {
                    let id = positional
                        .next()
                        .ok_or_else(|| "rollback requires a version id".to_string())?;
                    Command::Rollback(id)
                }
                Some("config-path") => Command::ConfigPath,
                Some(other) => return Err(format!("Unknown command: {other}\n\n{}", help_text())),
                None => Command::Help,
            }
        }
    };
    if force && !matches!(command, Command::Run { .. } | Command::Help) {
        return Err("--force only applies to `run`".to_string());
    }
    Ok(CliOptions {
        command,
        config_path,
        models_dir,
    })
}

fn help_text() -> String {
    [
        "receipt-lifecycle",
        "",
        "Monitors, retrains, validates and deploys the receipt label classifier.",
        "",
        "Usage:",
        "  receipt-lifecycle run [--force]",
        "  receipt-lifecycle history",
        "  receipt-lifecycle predict <text>...",
        "  receipt-lifecycle rollback <version_id>",
        "  receipt-lifecycle config-path",
        "",
        "Options:",
        "  --config <file>   Lifecycle TOML file (default: <app root>/lifecycle.toml).",
        "  --models <dir>    Model store directory (overrides [storage].models_dir).",
        "  --force           Retrain even when the active model is stable.",
        "",
        "Environment:",
        "  RECEIPT_CLASSIFIER_HOME   Override the application root directory.",
        "  RUST_LOG                  Log filter (default: info).",
    ]
    .join("\n")
}
