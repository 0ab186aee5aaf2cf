use crate::{
    answers::{self, RunManifest},
    config::Config,
    model::{ProcessModel, VisionModel},
    tasks::{self, TaskKind},
    util::{ensure_dir, now_rfc3339, sha256_hex},
};
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser, Debug)]
#[command(name = "vlm-harness")]
#[command(about = "Dataset iteration and answer collection for vision-language benchmarks")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./vlm-harness.toml if present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Doctor {},
    Tasks {},
    Inspect {
        #[arg(long)]
        task: Option<String>,
    },
    Run {
        #[arg(long)]
        task: Option<String>,
        #[arg(long)]
        answers_dir: Option<PathBuf>,
    },
}

pub fn dispatch(args: Args) -> Result<()> {
    let cfg_path = resolve_config_path(args.config.as_deref())?;
    let cfg = Config::load(&cfg_path)?;

    match &args.cmd {
        Command::Doctor {} => {
            let log_path = resolve_log_path(&cfg);
            let _guard = init_logging(&args, &cfg, log_path.as_deref())?;
            doctor(&cfg)
        }
        Command::Tasks {} => list_tasks(),
        Command::Inspect { task } => {
            let kind = TaskKind::parse(task.as_deref().unwrap_or(&cfg.run.task))?;
            let log_path = resolve_log_path(&cfg);
            let _guard = init_logging(&args, &cfg, log_path.as_deref())?;
            inspect(&cfg, kind)
        }
        Command::Run { task, answers_dir } => {
            run(&args, cfg, task.as_deref(), answers_dir.as_deref())
        }
    }
}

fn resolve_config_path(user: Option<&Path>) -> Result<PathBuf> {
    if let Some(p) = user {
        return Ok(p.to_path_buf());
    }
    let default = PathBuf::from("vlm-harness.toml");
    if default.exists() {
        Ok(default)
    } else {
        Ok(PathBuf::from("vlm-harness.example.toml"))
    }
}

fn init_logging(args: &Args, cfg: &Config, file_path: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let stdout_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .boxed()
    };

    let (file_layer, guard) = if let Some(path) = file_path {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        ensure_dir(parent)?;
        let file = std::fs::File::create(path)
            .with_context(|| format!("create log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

fn doctor(cfg: &Config) -> Result<()> {
    let model = ProcessModel::from_config(cfg)?;
    let diag = model.doctor()?;
    println!("{}", serde_json::to_string_pretty(&diag)?);
    Ok(())
}

fn list_tasks() -> Result<()> {
    let entries: Vec<_> = TaskKind::ALL
        .iter()
        .map(|kind| {
            serde_json::json!({
                "name": kind.name(),
                "task": kind.task_label(),
                "stage": kind.stage(),
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&entries)?);
    Ok(())
}

fn inspect(cfg: &Config, kind: TaskKind) -> Result<()> {
    let summary = tasks::inspect(cfg, kind)?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn run(
    args: &Args,
    mut cfg: Config,
    task_override: Option<&str>,
    answers_override: Option<&Path>,
) -> Result<()> {
    if let Some(dir) = answers_override {
        cfg.paths.answers_dir = dir.display().to_string();
    }
    // Reject unknown tasks before any directory or log file gets created.
    let kind = TaskKind::parse(task_override.unwrap_or(&cfg.run.task))?;

    let log_path = resolve_log_path(&cfg);
    let _guard = init_logging(args, &cfg, log_path.as_deref())?;

    info!(
        "task '{}' over dataset '{}'",
        kind.name(),
        cfg.run.dataset_name
    );

    let model = ProcessModel::from_config(&cfg)?;
    let model_name = model.model_name().to_string();
    let framework = model.framework().to_string();

    let started = now_rfc3339();
    let mut runner = tasks::build_runner(&cfg, kind, model)?;
    runner.run()?;
    let saved = runner.save_answers()?;
    let finished = now_rfc3339();

    if cfg.output.write_manifest {
        if let Some(path) = &saved {
            let manifest = RunManifest {
                task: kind.name(),
                dataset: runner.dataset_name().to_string(),
                model_name: model_name.clone(),
                framework: framework.clone(),
                answers_file: path.display().to_string(),
                answer_count: runner.answer_count(),
                started,
                finished,
                config_sha256: sha256_hex(cfg.normalized_for_hash().as_bytes()),
            };
            let manifest_path = answers::write_manifest(&manifest, path)?;
            info!("manifest written to {}", manifest_path.display());
        }
    }

    if cfg.output.print_summary {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "task": kind.name(),
                "dataset": runner.dataset_name(),
                "model": model_name,
                "framework": framework,
                "answers": runner.answer_count(),
                "saved_to": saved.as_ref().map(|p| p.display().to_string()),
            }))?
        );
    }

    Ok(())
}

fn resolve_log_path(cfg: &Config) -> Option<PathBuf> {
    if !cfg.logging.write_to_file {
        return None;
    }

    if !cfg.logging.file_path.is_empty() {
        return Some(PathBuf::from(&cfg.logging.file_path));
    }

    Some(PathBuf::from(&cfg.paths.answers_dir).join("vlm-harness.log"))
}
