use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub run: Run,
    #[serde(default)]
    pub paths: Paths,
    #[serde(default)]
    pub prompts: Prompts,
    #[serde(default)]
    pub sorting: Sorting,
    #[serde(default)]
    pub model: Model,
    #[serde(default)]
    pub postprocess: Postprocess,
    #[serde(default)]
    pub output: Output,
    #[serde(default)]
    pub logging: Logging,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        Ok(cfg)
    }

    /// A stable, normalization-friendly string for hashing.
    pub fn normalized_for_hash(&self) -> String {
        toml::to_string(self).unwrap_or_default()
    }

    /// The answer-table delimiter as a single byte, as the CSV layer wants it.
    pub fn output_delimiter(&self) -> Result<u8> {
        let bytes = self.output.delimiter.as_bytes();
        if bytes.len() != 1 {
            bail!(
                "output.delimiter must be a single character, got {:?}",
                self.output.delimiter
            );
        }
        Ok(bytes[0])
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            run: Default::default(),
            paths: Default::default(),
            prompts: Default::default(),
            sorting: Default::default(),
            model: Default::default(),
            postprocess: Default::default(),
            output: Default::default(),
            logging: Default::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Run {
    pub task: String,
    pub dataset_name: String,
    pub start: usize,
    pub filter_doc_class: String,
    pub filter_question_type: String,
}
impl Default for Run {
    fn default() -> Self {
        Self {
            task: "vqa".into(),
            dataset_name: "dataset".into(),
            start: 0,
            filter_doc_class: "".into(),
            filter_question_type: "".into(),
        }
    }
}

impl Run {
    /// The (doc_class, question_type) pair to keep. `None` unless both halves
    /// are set; a lone filter half is ignored.
    pub fn class_filter(&self) -> Option<(&str, &str)> {
        if self.filter_doc_class.is_empty() || self.filter_question_type.is_empty() {
            None
        } else {
            Some((
                self.filter_doc_class.as_str(),
                self.filter_question_type.as_str(),
            ))
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Paths {
    pub dataset_dir: String,
    pub answers_dir: String,
    pub annotation_file: String,
}
impl Default for Paths {
    fn default() -> Self {
        Self {
            dataset_dir: "data".into(),
            answers_dir: "answers".into(),
            annotation_file: "annotation.csv".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Prompts {
    pub collection_file: String,
    pub bundle_template_file: String,
}
impl Default for Prompts {
    fn default() -> Self {
        Self {
            collection_file: "".into(),
            bundle_template_file: "".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Sorting {
    pub classification_answers: String,
}
impl Default for Sorting {
    fn default() -> Self {
        Self {
            classification_answers: "".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Model {
    pub command: String,
    pub args: Vec<String>,
    #[serde(default)]
    pub env: std::collections::BTreeMap<String, String>,
    pub name: String,
    pub framework: String,
    pub request_timeout_seconds: u64,
}
impl Default for Model {
    fn default() -> Self {
        Self {
            command: "python3".into(),
            args: vec!["scripts/dummy_model.py".into()],
            env: Default::default(),
            name: "dummy".into(),
            framework: "local".into(),
            request_timeout_seconds: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Postprocess {
    pub normalize_unicode: bool,
    pub strip_separators: String,
    pub trim_answers: bool,
}
impl Default for Postprocess {
    fn default() -> Self {
        Self {
            normalize_unicode: true,
            strip_separators: ",".into(),
            trim_answers: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Output {
    pub delimiter: String,
    pub write_manifest: bool,
    pub print_summary: bool,
}
impl Default for Output {
    fn default() -> Self {
        Self {
            delimiter: ";".into(),
            write_manifest: true,
            print_summary: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: true,
            file_path: "".into(),
        }
    }
}
