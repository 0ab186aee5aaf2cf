pub mod bundle;
pub mod vqa;

pub use bundle::{BundleIterator, BundleSample};
pub use vqa::{VqaIterator, VqaSample};

use crate::tasks::TaskKind;

/// One-way feed of samples for a single task over a single dataset.
///
/// Sources index the whole dataset up front so that bad annotations fail the
/// run before the model sees a single request.
pub trait SampleSource {
    type Sample;

    fn task(&self) -> TaskKind;
    fn dataset_name(&self) -> &str;

    /// Samples not yet handed out.
    fn remaining(&self) -> usize;

    /// The next sample, or `None` once the source is exhausted. Exhausted
    /// sources stay exhausted.
    fn next_sample(&mut self) -> Option<Self::Sample>;
}
