pub mod classification;
pub mod sorting;
pub mod vqa;

pub use classification::ClassificationRunner;
pub use sorting::SortingRunner;
pub use vqa::VqaRunner;

use anyhow::Result;
use std::fmt;
use std::path::PathBuf;

use crate::tasks::TaskKind;

/// Drives one sample source against the model and persists what came back.
pub trait Runner {
    fn task(&self) -> TaskKind;
    fn dataset_name(&self) -> &str;
    fn answer_count(&self) -> usize;

    /// Feed every remaining sample to the model, accumulating answers.
    fn run(&mut self) -> Result<()>;

    /// Write the accumulated answers; `None` when there was nothing to write.
    fn save_answers(&self) -> Result<Option<PathBuf>>;
}

impl fmt::Debug for dyn Runner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runner")
            .field("task", &self.task())
            .field("dataset", &self.dataset_name())
            .field("answers", &self.answer_count())
            .finish()
    }
}
