use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{debug, info};

use super::Runner;
use crate::answers::{self, ClassificationAnswer};
use crate::config::Config;
use crate::dataset::{BundleSample, SampleSource};
use crate::model::VisionModel;
use crate::postprocess;
use crate::tasks::TaskKind;

/// Sends every page of a bundle to the model in one call and records the
/// normalized label string it answers with.
pub struct ClassificationRunner<S, M> {
    cfg: Config,
    source: S,
    model: M,
    answers: Vec<ClassificationAnswer>,
}

impl<S, M> ClassificationRunner<S, M>
where
    S: SampleSource<Sample = BundleSample>,
    M: VisionModel,
{
    pub fn new(cfg: &Config, source: S, model: M) -> Self {
        Self {
            cfg: cfg.clone(),
            source,
            model,
            answers: Vec::new(),
        }
    }

    pub fn answers(&self) -> &[ClassificationAnswer] {
        &self.answers
    }
}

impl<S, M> Runner for ClassificationRunner<S, M>
where
    S: SampleSource<Sample = BundleSample>,
    M: VisionModel,
{
    fn task(&self) -> TaskKind {
        self.source.task()
    }

    fn dataset_name(&self) -> &str {
        self.source.dataset_name()
    }

    fn answer_count(&self) -> usize {
        self.answers.len()
    }

    fn run(&mut self) -> Result<()> {
        info!(
            "classification run over '{}': {} bundles pending",
            self.source.dataset_name(),
            self.source.remaining()
        );

        while let Some(sample) = self.source.next_sample() {
            let raw = self
                .model
                .predict_on_images(&sample.images, &sample.prompt)
                .with_context(|| format!("classification failed for bundle {}", sample.id))?;
            let labels = postprocess::normalize_label_answer(&self.cfg, &raw);
            debug!("bundle {} classified as '{}'", sample.id, labels);
            self.answers.push(ClassificationAnswer {
                sample_id: sample.id,
                model_answer: labels,
            });
        }

        info!(
            "classification run finished with {} answers",
            self.answers.len()
        );
        Ok(())
    }

    fn save_answers(&self) -> Result<Option<PathBuf>> {
        answers::save_answers(
            &self.cfg,
            self.task(),
            self.dataset_name(),
            self.model.framework(),
            self.model.model_name(),
            &self.answers,
        )
    }
}
