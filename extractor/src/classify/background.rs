use std::path::Path;

use frame_sieve_common::frame::Raster;
use image::imageops::FilterType;
use tracing::{debug, info, warn};

use super::scorer::SimilarityScorer;

/// Ordered, immutable set of background reference images.
///
/// Order is the lexicographic path order observed at load time; the classifier
/// depends on it for its first-qualifying-match rule. Guaranteed non-empty.
pub struct ReferenceSet {
    images: Vec<Raster>,
}

impl ReferenceSet {
    /// Load every decodable image under `dir`, normalized to `width`x`height`
    /// grayscale. Entries that fail to decode are skipped with a warning;
    /// zero usable images is a configuration error, not an empty set.
    pub fn load(dir: &Path, width: u32, height: u32) -> Result<Self, ClassifyError> {
        let entries = std::fs::read_dir(dir)
            .map_err(|e| ClassifyError::ReadDir(dir.display().to_string(), e))?;

        let mut paths: Vec<_> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file())
            .collect();
        paths.sort();

        let mut images = Vec::with_capacity(paths.len());
        for path in &paths {
            match image::open(path) {
                Ok(img) => {
                    let gray = img.resize_exact(width, height, FilterType::Triangle).to_luma8();
                    debug!(path = path.display().to_string(), "reference image loaded");
                    images.push(Raster::new(width, height, gray.into_raw()));
                }
                Err(e) => {
                    warn!(
                        path = path.display().to_string(),
                        error = %e,
                        "skipping unreadable reference image"
                    );
                }
            }
        }

        if images.is_empty() {
            return Err(ClassifyError::NoReferences(dir.display().to_string()));
        }
        info!(count = images.len(), dir = dir.display().to_string(), "reference set loaded");
        Ok(Self { images })
    }

    /// Build from already-normalized rasters, preserving their order.
    pub fn from_rasters(images: Vec<Raster>) -> Result<Self, ClassifyError> {
        if images.is_empty() {
            return Err(ClassifyError::NoReferences("<in-memory>".into()));
        }
        Ok(Self { images })
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Raster> {
        self.images.iter()
    }
}

/// Per-frame classification result.
///
/// For a background verdict, `matched_index`/`matched_score` describe the
/// first reference that cleared the threshold. For a foreground verdict they
/// describe the best score observed over the full scan.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub is_foreground: bool,
    pub matched_index: usize,
    pub matched_score: f32,
}

/// Decides whether a frame is explained by any reference background image.
pub struct BackgroundClassifier {
    references: ReferenceSet,
    threshold: f32,
    scorer: Box<dyn SimilarityScorer>,
}

impl BackgroundClassifier {
    pub fn new(references: ReferenceSet, threshold: f32, scorer: Box<dyn SimilarityScorer>) -> Self {
        debug!(
            references = references.len(),
            threshold,
            scorer = scorer.name(),
            "classifier ready"
        );
        Self {
            references,
            threshold,
            scorer,
        }
    }

    /// Score the frame against the references in stored order.
    ///
    /// The first reference scoring at or above the threshold ends the scan
    /// with a background verdict; later references are never evaluated, even
    /// if one of them would have scored higher. A frame no reference explains
    /// is foreground, reported with the best score seen.
    pub fn classify(&self, frame: &Raster) -> Verdict {
        let mut max_score = f32::NEG_INFINITY;
        let mut max_index = 0;

        for (index, reference) in self.references.iter().enumerate() {
            let score = self.scorer.score(reference, frame);
            if score >= max_score {
                max_score = score;
                max_index = index;
            }
            if score >= self.threshold {
                debug!(
                    index,
                    score,
                    threshold = self.threshold,
                    scorer = self.scorer.name(),
                    "frame matched background reference"
                );
                return Verdict {
                    is_foreground: false,
                    matched_index: index,
                    matched_score: score,
                };
            }
        }

        Verdict {
            is_foreground: true,
            matched_index: max_index,
            matched_score: max_score,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error("failed to read reference directory {0}: {1}")]
    ReadDir(String, std::io::Error),
    #[error("no usable reference images in {0}")]
    NoReferences(String),
}
