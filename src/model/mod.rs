pub mod process;

pub use process::ProcessModel;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The external vision-language collaborator the runners drive.
///
/// Implementations answer free-form questions about one image and ordering
/// or labeling questions about a set of images.
pub trait VisionModel {
    fn model_name(&self) -> &str;
    fn framework(&self) -> &str;

    fn predict_on_image(&self, image: &Path, prompt: &str) -> Result<String>;
    fn predict_on_images(&self, images: &[PathBuf], prompt: &str) -> Result<String>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictIn {
    pub images: Vec<String>,
    pub prompt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictOut {
    pub ok: bool,
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDiag {
    pub ok: bool,
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub framework: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}
