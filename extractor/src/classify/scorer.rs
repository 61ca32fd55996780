use frame_sieve_common::frame::Raster;

/// Similarity metric between two equally-shaped rasters.
///
/// Implementations return a scalar where higher means more similar. The
/// classifier only compares scores against each other and the threshold; it
/// never interprets their absolute scale.
pub trait SimilarityScorer: Send + Sync {
    fn score(&self, reference: &Raster, frame: &Raster) -> f32;

    /// Human-readable name for logging.
    fn name(&self) -> &str {
        "unnamed"
    }
}

/// Zero-mean normalized cross-correlation.
///
/// Subtracts each image's mean, then correlates: 1.0 for identical content,
/// 0.0 for uncorrelated, -1.0 for inverted. Flat images have no variance to
/// normalize by; two flat images score 1.0, a flat against a non-flat 0.0.
pub struct NccScorer;

impl SimilarityScorer for NccScorer {
    fn score(&self, reference: &Raster, frame: &Raster) -> f32 {
        debug_assert!(
            reference.same_shape(frame),
            "scorer inputs must share one resolution"
        );

        let n = reference.data.len() as f64;
        let mean_a: f64 = reference.data.iter().map(|&p| p as f64).sum::<f64>() / n;
        let mean_b: f64 = frame.data.iter().map(|&p| p as f64).sum::<f64>() / n;

        let mut cross = 0.0f64;
        let mut var_a = 0.0f64;
        let mut var_b = 0.0f64;
        for (&a, &b) in reference.data.iter().zip(frame.data.iter()) {
            let da = a as f64 - mean_a;
            let db = b as f64 - mean_b;
            cross += da * db;
            var_a += da * da;
            var_b += db * db;
        }

        let denom = (var_a * var_b).sqrt();
        if denom < f64::EPSILON {
            if var_a < f64::EPSILON && var_b < f64::EPSILON {
                return 1.0;
            }
            return 0.0;
        }
        (cross / denom) as f32
    }

    fn name(&self) -> &str {
        "ncc"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(len: u8) -> Raster {
        Raster::new(len as u32, 1, (0..len).collect())
    }

    #[test]
    fn identical_images_score_one() {
        let a = gradient(16);
        let b = gradient(16);
        let s = NccScorer.score(&a, &b);
        assert!((s - 1.0).abs() < 1e-6, "got {s}");
    }

    #[test]
    fn inverted_images_score_minus_one() {
        let a = gradient(16);
        let data: Vec<u8> = (0..16u8).rev().collect();
        let b = Raster::new(16, 1, data);
        let s = NccScorer.score(&a, &b);
        assert!((s + 1.0).abs() < 1e-6, "got {s}");
    }

    #[test]
    fn flat_against_flat_scores_one() {
        let a = Raster::new(4, 1, vec![128; 4]);
        let b = Raster::new(4, 1, vec![10; 4]);
        assert_eq!(NccScorer.score(&a, &b), 1.0);
    }

    #[test]
    fn flat_against_textured_scores_zero() {
        let a = Raster::new(4, 1, vec![128; 4]);
        let b = Raster::new(4, 1, vec![0, 50, 100, 150]);
        assert_eq!(NccScorer.score(&a, &b), 0.0);
    }

    #[test]
    fn uncorrelated_patterns_score_near_zero() {
        // One image varies in the first half, the other in the second.
        let a = Raster::new(4, 1, vec![0, 255, 128, 128]);
        let b = Raster::new(4, 1, vec![128, 128, 0, 255]);
        let s = NccScorer.score(&a, &b);
        assert!(s.abs() < 0.5, "got {s}");
    }
}
