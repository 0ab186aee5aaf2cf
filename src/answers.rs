use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::Config;
use crate::tasks::TaskKind;
use crate::util::{ensure_dir, file_timestamp};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VqaAnswer {
    pub sample_id: u64,
    pub answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationAnswer {
    pub sample_id: u64,
    pub model_answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortingAnswer {
    pub sample_id: u64,
    pub answer: String,
}

/// File name for one run's answer table:
/// `<dataset>_<framework>_<model>_<task>[_<stage>]_answers_<YYYYMMDD_HHMMSS>.csv`.
pub fn answer_file_name(
    task: TaskKind,
    dataset: &str,
    framework: &str,
    model: &str,
    timestamp: &str,
) -> String {
    let label = task.task_label();
    match task.stage() {
        Some(stage) => {
            format!("{dataset}_{framework}_{model}_{label}_{stage}_answers_{timestamp}.csv")
        }
        None => format!("{dataset}_{framework}_{model}_{label}_answers_{timestamp}.csv"),
    }
}

/// Write the collected answers, or nothing at all when there are none.
/// Returns the path written, `None` for an empty run.
pub fn save_answers<T: Serialize>(
    cfg: &Config,
    task: TaskKind,
    dataset: &str,
    framework: &str,
    model: &str,
    records: &[T],
) -> Result<Option<PathBuf>> {
    if records.is_empty() {
        warn!("no answers collected for task '{}'; nothing to save", task.name());
        return Ok(None);
    }

    let delimiter = cfg.output_delimiter()?;
    let answers_dir = Path::new(&cfg.paths.answers_dir);
    ensure_dir(answers_dir)?;
    let path = answers_dir.join(answer_file_name(
        task,
        dataset,
        framework,
        model,
        &file_timestamp(),
    ));

    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_path(&path)
        .with_context(|| format!("creating answer file {}", path.display()))?;
    for record in records {
        writer
            .serialize(record)
            .with_context(|| format!("writing answer row to {}", path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("flushing {}", path.display()))?;

    info!("saved {} answers to {}", records.len(), path.display());
    Ok(Some(path))
}

/// Classification answers keyed by sample id, as the sorting stage consumes
/// them. A sample id listed twice keeps the later row.
pub fn load_classification_map(cfg: &Config, path: &Path) -> Result<BTreeMap<u64, String>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(cfg.output_delimiter()?)
        .from_path(path)
        .with_context(|| format!("opening classification answers {}", path.display()))?;

    let mut map = BTreeMap::new();
    for (idx, row) in reader.deserialize::<ClassificationAnswer>().enumerate() {
        let row = row.with_context(|| {
            format!(
                "parsing classification answer row {} of {}",
                idx + 1,
                path.display()
            )
        })?;
        map.insert(row.sample_id, row.model_answer);
    }
    Ok(map)
}

#[derive(Debug, Clone, Serialize)]
pub struct RunManifest {
    pub task: &'static str,
    pub dataset: String,
    pub model_name: String,
    pub framework: String,
    pub answers_file: String,
    pub answer_count: usize,
    pub started: String,
    pub finished: String,
    pub config_sha256: String,
}

/// Drop a manifest next to the answer table so a run's provenance survives
/// file shuffling.
pub fn write_manifest(manifest: &RunManifest, answers_path: &Path) -> Result<PathBuf> {
    let path = answers_path.with_extension("manifest.json");
    let body = serde_json::to_string_pretty(manifest)?;
    std::fs::write(&path, body).with_context(|| format!("writing manifest {}", path.display()))?;
    Ok(path)
}
