use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::path::Path;

use crate::answers;
use crate::config::Config;
use crate::dataset::{BundleIterator, SampleSource, VqaIterator};
use crate::model::VisionModel;
use crate::runner::{ClassificationRunner, Runner, SortingRunner, VqaRunner};

/// Every task the harness knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskKind {
    Vqa,
    RpoClassification,
    RpoSorting,
}

impl TaskKind {
    pub const ALL: [TaskKind; 3] = [
        TaskKind::Vqa,
        TaskKind::RpoClassification,
        TaskKind::RpoSorting,
    ];

    pub fn parse(name: &str) -> Result<TaskKind> {
        let wanted = name.trim().to_ascii_lowercase();
        for kind in TaskKind::ALL {
            if kind.name() == wanted {
                return Ok(kind);
            }
        }
        bail!(
            "unknown task '{name}' (known tasks: {})",
            TaskKind::ALL.map(TaskKind::name).join(", ")
        )
    }

    pub const fn name(self) -> &'static str {
        match self {
            TaskKind::Vqa => "vqa",
            TaskKind::RpoClassification => "rpo-classification",
            TaskKind::RpoSorting => "rpo-sorting",
        }
    }

    /// The task family label used in answer file names.
    pub const fn task_label(self) -> &'static str {
        match self {
            TaskKind::Vqa => "VQA",
            TaskKind::RpoClassification | TaskKind::RpoSorting => "RPO",
        }
    }

    /// The stage suffix for tasks that are one leg of a two-stage pipeline.
    pub const fn stage(self) -> Option<&'static str> {
        match self {
            TaskKind::Vqa => None,
            TaskKind::RpoClassification => Some("classification"),
            TaskKind::RpoSorting => Some("sorting"),
        }
    }
}

/// Build the iterator/runner pair for `kind`. Every task the CLI accepts goes
/// through here, so a kind parsed by [`TaskKind::parse`] always has a runner.
pub fn build_runner<M>(cfg: &Config, kind: TaskKind, model: M) -> Result<Box<dyn Runner>>
where
    M: VisionModel + 'static,
{
    match kind {
        TaskKind::Vqa => {
            let source = VqaIterator::from_config(cfg)?;
            Ok(Box::new(VqaRunner::new(cfg, source, model)))
        }
        TaskKind::RpoClassification => {
            let source = BundleIterator::from_config(cfg, kind)?;
            Ok(Box::new(ClassificationRunner::new(cfg, source, model)))
        }
        TaskKind::RpoSorting => {
            let source = BundleIterator::from_config(cfg, kind)?;
            if cfg.sorting.classification_answers.is_empty() {
                bail!("task 'rpo-sorting' requires sorting.classification_answers");
            }
            let labels = answers::load_classification_map(
                cfg,
                Path::new(&cfg.sorting.classification_answers),
            )
            .with_context(|| "loading classification answers for sorting")?;
            Ok(Box::new(SortingRunner::new(cfg, source, model, labels)))
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexSummary {
    pub task: &'static str,
    pub stage: Option<&'static str>,
    pub dataset: String,
    pub samples: usize,
}

/// Load the dataset index for `kind` without touching the model.
pub fn inspect(cfg: &Config, kind: TaskKind) -> Result<IndexSummary> {
    let (dataset, samples) = match kind {
        TaskKind::Vqa => {
            let it = VqaIterator::from_config(cfg)?;
            (it.dataset_name().to_string(), it.remaining())
        }
        TaskKind::RpoClassification | TaskKind::RpoSorting => {
            let it = BundleIterator::from_config(cfg, kind)?;
            (it.dataset_name().to_string(), it.remaining())
        }
    };
    Ok(IndexSummary {
        task: kind.name(),
        stage: kind.stage(),
        dataset,
        samples,
    })
}
