use anyhow::{bail, Context, Result};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::SampleSource;
use crate::config::Config;
use crate::prompt;
use crate::tasks::TaskKind;

/// One page bundle: every page image of a document plus its ground truth.
#[derive(Debug, Clone)]
pub struct BundleSample {
    pub id: u64,
    /// Page images in name order.
    pub images: Vec<PathBuf>,
    /// Ground-truth JSON, kept opaque; evaluation happens elsewhere.
    pub answer: serde_json::Value,
    /// Task prompt, already prefixed with the page count.
    pub prompt: String,
}

/// Walks `<dataset_dir>/images/<id>/` directories and pairs each with
/// `<dataset_dir>/jsons/<id>.json`. Bundles without a ground-truth file are
/// silently skipped; a non-numeric directory name fails the whole index.
#[derive(Debug)]
pub struct BundleIterator {
    kind: TaskKind,
    dataset_name: String,
    bundles: VecDeque<BundleSample>,
}

impl BundleIterator {
    pub fn from_config(cfg: &Config, kind: TaskKind) -> Result<Self> {
        if cfg.prompts.bundle_template_file.is_empty() {
            bail!(
                "task '{}' requires prompts.bundle_template_file",
                kind.name()
            );
        }
        let template = prompt::load_bundle_template(Path::new(&cfg.prompts.bundle_template_file))?;

        let dataset_dir = Path::new(&cfg.paths.dataset_dir);
        let images_dir = dataset_dir.join("images");
        let jsons_dir = dataset_dir.join("jsons");

        let entries = std::fs::read_dir(&images_dir)
            .with_context(|| format!("reading bundle directory {}", images_dir.display()))?;

        let mut bundles = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let dir_name = entry.file_name();
            let dir_name = dir_name.to_string_lossy();
            let id: u64 = dir_name.parse().with_context(|| {
                format!("bundle directory '{dir_name}' is not an integer id")
            })?;

            let json_path = jsons_dir.join(format!("{dir_name}.json"));
            if !json_path.exists() {
                debug!("bundle {dir_name} has no ground-truth json; skipping");
                continue;
            }

            let images = collect_pages(&entry.path())?;
            let raw = std::fs::read_to_string(&json_path)
                .with_context(|| format!("reading {}", json_path.display()))?;
            let answer: serde_json::Value = serde_json::from_str(&raw)
                .with_context(|| format!("parsing {}", json_path.display()))?;
            let prompt = prompt::render_bundle_prompt(&template, images.len());

            bundles.push(BundleSample {
                id,
                images,
                answer,
                prompt,
            });
        }
        bundles.sort_by_key(|b| b.id);

        debug!(
            "bundle index: {} bundles under {}",
            bundles.len(),
            images_dir.display()
        );
        Ok(Self {
            kind,
            dataset_name: cfg.run.dataset_name.clone(),
            bundles: bundles.into(),
        })
    }
}

fn collect_pages(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut pages = Vec::new();
    for entry in
        std::fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))?
    {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("jpg") {
            pages.push(path);
        }
    }
    pages.sort();
    Ok(pages)
}

impl SampleSource for BundleIterator {
    type Sample = BundleSample;

    fn task(&self) -> TaskKind {
        self.kind
    }

    fn dataset_name(&self) -> &str {
        &self.dataset_name
    }

    fn remaining(&self) -> usize {
        self.bundles.len()
    }

    fn next_sample(&mut self) -> Option<BundleSample> {
        self.bundles.pop_front()
    }
}
