use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use super::Runner;
use crate::answers::{self, SortingAnswer};
use crate::config::Config;
use crate::dataset::{BundleSample, SampleSource};
use crate::model::VisionModel;
use crate::postprocess;
use crate::tasks::TaskKind;

/// Orders the pages inside each label group of an earlier classification run.
///
/// A bundle whose classification answer is "22553" has two pages labeled 2
/// and two labeled 5; only those groups are ambiguous, so only those pages go
/// back to the model. Pages whose label occurs once are already placed.
pub struct SortingRunner<S, M> {
    cfg: Config,
    source: S,
    model: M,
    labels: BTreeMap<u64, String>,
    answers: Vec<SortingAnswer>,
}

impl<S, M> SortingRunner<S, M>
where
    S: SampleSource<Sample = BundleSample>,
    M: VisionModel,
{
    pub fn new(cfg: &Config, source: S, model: M, labels: BTreeMap<u64, String>) -> Self {
        Self {
            cfg: cfg.clone(),
            source,
            model,
            labels,
            answers: Vec::new(),
        }
    }

    pub fn answers(&self) -> &[SortingAnswer] {
        &self.answers
    }
}

impl<S, M> Runner for SortingRunner<S, M>
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
            "sorting run over '{}': {} bundles pending, {} classified",
            self.source.dataset_name(),
            self.source.remaining(),
            self.labels.len()
        );

        while let Some(sample) = self.source.next_sample() {
            let Some(label_string) = self.labels.get(&sample.id).cloned() else {
                debug!("bundle {} has no classification answer; skipping", sample.id);
                continue;
            };

            for (label, positions) in group_repeated_labels(&label_string) {
                let pages: Vec<PathBuf> = positions
                    .iter()
                    .filter_map(|&idx| sample.images.get(idx).cloned())
                    .collect();
                if pages.len() < positions.len() {
                    warn!(
                        "bundle {}: label '{}' points past the {} pages on disk; extra positions dropped",
                        sample.id,
                        label,
                        sample.images.len()
                    );
                }
                if pages.is_empty() {
                    continue;
                }

                let raw = self
                    .model
                    .predict_on_images(&pages, &sample.prompt)
                    .with_context(|| {
                        format!("page ordering failed for bundle {} label '{label}'", sample.id)
                    })?;
                let order = postprocess::normalize_label_answer(&self.cfg, &raw);
                debug!(
                    "bundle {} label '{}': {} pages ordered as '{}'",
                    sample.id,
                    label,
                    pages.len(),
                    order
                );
                self.answers.push(SortingAnswer {
                    sample_id: sample.id,
                    answer: order,
                });
            }
        }

        info!("sorting run finished with {} answers", self.answers.len());
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

/// Labels that occur more than once in `labels`, each with the positions
/// where it occurs, in order of first appearance.
pub fn group_repeated_labels(labels: &str) -> Vec<(char, Vec<usize>)> {
    let mut groups: Vec<(char, Vec<usize>)> = Vec::new();
    for (idx, label) in labels.chars().enumerate() {
        match groups.iter_mut().find(|(l, _)| *l == label) {
            Some((_, positions)) => positions.push(idx),
            None => groups.push((label, vec![idx])),
        }
    }
    groups.retain(|(_, positions)| positions.len() > 1);
    groups
}
