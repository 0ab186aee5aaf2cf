use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{debug, info};

use super::Runner;
use crate::answers::{self, VqaAnswer};
use crate::config::Config;
use crate::dataset::{SampleSource, VqaSample};
use crate::model::VisionModel;
use crate::postprocess;
use crate::tasks::TaskKind;

/// Asks the model one question per image and keeps the raw answers.
pub struct VqaRunner<S, M> {
    cfg: Config,
    source: S,
    model: M,
    answers: Vec<VqaAnswer>,
}

impl<S, M> VqaRunner<S, M>
where
    S: SampleSource<Sample = VqaSample>,
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

    pub fn answers(&self) -> &[VqaAnswer] {
        &self.answers
    }
}

impl<S, M> Runner for VqaRunner<S, M>
where
    S: SampleSource<Sample = VqaSample>,
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
            "vqa run over '{}': {} samples pending",
            self.source.dataset_name(),
            self.source.remaining()
        );

        while let Some(sample) = self.source.next_sample() {
            let answer = self
                .model
                .predict_on_image(&sample.image_path, &sample.question)
                .with_context(|| format!("prediction failed for sample {}", sample.id))?;
            let answer = postprocess::normalize_text_answer(&self.cfg, &answer);
            debug!("sample {} answered", sample.id);
            self.answers.push(VqaAnswer {
                sample_id: sample.id,
                answer,
            });
        }

        info!("vqa run finished with {} answers", self.answers.len());
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
