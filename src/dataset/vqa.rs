use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::SampleSource;
use crate::config::Config;
use crate::prompt::PromptCollection;
use crate::tasks::TaskKind;

/// One row of work for the VQA task.
#[derive(Debug, Clone)]
pub struct VqaSample {
    /// Absolute position of the row in the annotation table, stable across
    /// offsets and filters.
    pub id: u64,
    pub image_path: PathBuf,
    pub question: String,
    pub answer: String,
    pub doc_class: String,
    pub question_type: String,
}

#[derive(Debug, Clone, Deserialize)]
struct AnnotationRow {
    image_path: String,
    question: String,
    answer: String,
    doc_class: String,
    question_type: String,
}

#[derive(Debug)]
pub struct VqaIterator {
    dataset_name: String,
    dataset_dir: PathBuf,
    prompts: Option<PromptCollection>,
    rows: VecDeque<(u64, AnnotationRow)>,
}

impl VqaIterator {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let dataset_dir = PathBuf::from(&cfg.paths.dataset_dir);
        let annotation_path = dataset_dir.join(&cfg.paths.annotation_file);

        let prompts = if cfg.prompts.collection_file.is_empty() {
            None
        } else {
            Some(PromptCollection::load(Path::new(
                &cfg.prompts.collection_file,
            ))?)
        };

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b';')
            .from_path(&annotation_path)
            .with_context(|| format!("opening annotation table {}", annotation_path.display()))?;

        let filter = cfg.run.class_filter();
        let mut rows = VecDeque::new();
        for (idx, row) in reader.deserialize::<AnnotationRow>().enumerate() {
            let row = row.with_context(|| {
                format!(
                    "parsing annotation row {} of {}",
                    idx + 1,
                    annotation_path.display()
                )
            })?;
            if idx < cfg.run.start {
                continue;
            }
            if let Some((doc_class, question_type)) = filter {
                if row.doc_class != doc_class || row.question_type != question_type {
                    continue;
                }
            }
            rows.push_back((idx as u64, row));
        }

        debug!(
            "vqa index: {} rows selected from {}",
            rows.len(),
            annotation_path.display()
        );
        Ok(Self {
            dataset_name: cfg.run.dataset_name.clone(),
            dataset_dir,
            prompts,
            rows,
        })
    }
}

impl SampleSource for VqaIterator {
    type Sample = VqaSample;

    fn task(&self) -> TaskKind {
        TaskKind::Vqa
    }

    fn dataset_name(&self) -> &str {
        &self.dataset_name
    }

    fn remaining(&self) -> usize {
        self.rows.len()
    }

    fn next_sample(&mut self) -> Option<VqaSample> {
        let (id, row) = self.rows.pop_front()?;

        let mut question = row.question;
        if let Some(prompts) = &self.prompts {
            match prompts.prompt_for(&row.doc_class, &row.question_type) {
                Some(prompt) => question = prompt.to_string(),
                None => warn!(
                    "no prompt registered for ({}, {}); keeping the annotation question",
                    row.doc_class, row.question_type
                ),
            }
        }

        Some(VqaSample {
            id,
            image_path: self.dataset_dir.join(&row.image_path),
            question,
            answer: row.answer,
            doc_class: row.doc_class,
            question_type: row.question_type,
        })
    }
}
