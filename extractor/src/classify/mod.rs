mod background;
mod scorer;

pub use background::{BackgroundClassifier, ClassifyError, ReferenceSet, Verdict};
pub use scorer::{NccScorer, SimilarityScorer};
