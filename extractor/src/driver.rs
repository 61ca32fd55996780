use frame_sieve_common::eta::{EtaEstimator, EtaError};
use tracing::{info, warn};

use crate::classify::BackgroundClassifier;
use crate::sink::{FrameSink, SinkError};
use crate::source::FrameSource;

/// Totals for one completed batch run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Frames pulled and classified.
    pub processed: u64,
    /// Frames persisted as foreground.
    pub foreground: u64,
}

/// Inclusive step bounds and reporting cadence for one run.
#[derive(Debug, Clone)]
pub struct RunBounds {
    /// 1-based first frame to classify.
    pub start_frame: u64,
    /// 1-based last frame to classify; `None` runs to end-of-stream.
    pub end_frame: Option<u64>,
    /// Frames between background status lines.
    pub report_every: u64,
}

/// Drive the batch: skip to the start offset, then pull, classify and persist
/// until the end bound or end-of-stream. Strictly sequential, one frame at a
/// time; each phase owns its own ETA estimator.
pub fn run(
    source: &mut dyn FrameSource,
    classifier: &BackgroundClassifier,
    sink: &mut dyn FrameSink,
    stem: &str,
    bounds: &RunBounds,
) -> Result<RunSummary, DriverError> {
    let end_frame = bounds.end_frame.or(source.frame_count());

    // Empty range: a hard stop before anything is pulled, scored or timed.
    if let Some(end) = end_frame {
        if end < bounds.start_frame {
            info!(
                start = bounds.start_frame,
                end, "empty frame range, nothing to process"
            );
            return Ok(RunSummary::default());
        }
    }

    if !skip_to_start(source, bounds)? {
        warn!(
            start = bounds.start_frame,
            "source ended before the start frame"
        );
        return Ok(RunSummary::default());
    }

    let total = end_frame.map(|end| end - bounds.start_frame + 1);
    let mut eta = match total {
        Some(total) => Some(EtaEstimator::new(total)?),
        None => None,
    };

    let mut summary = RunSummary::default();
    let mut index = bounds.start_frame;

    loop {
        if let Some(end) = end_frame {
            if index > end {
                break;
            }
        }
        let Some(frame) = source.next_frame() else {
            info!(frame = index, "end of stream");
            break;
        };

        let verdict = classifier.classify(&frame.raster);
        summary.processed += 1;

        let eta_display = eta
            .as_ref()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "?".into());
        if verdict.is_foreground {
            summary.foreground += 1;
            sink.store(&frame, stem, verdict.matched_score)?;
            info!(
                frame = frame.index,
                timecode = frame.timecode().unwrap_or_default(),
                max_sim = format!("{:.4}", verdict.matched_score),
                best_ref = verdict.matched_index,
                eta = eta_display,
                "foreground frame extracted"
            );
        } else if frame.index % bounds.report_every == 0 {
            info!(
                frame = frame.index,
                sim = format!("{:.4}", verdict.matched_score),
                matched_ref = verdict.matched_index,
                eta = eta_display,
                "background"
            );
        }

        if let Some(eta) = eta.as_mut() {
            eta.update()?;
        }
        index += 1;
    }

    Ok(summary)
}

/// Skip positions `1..start_frame` without decoding. Returns `false` if the
/// source ends first. The skip phase reports its own progress when it is long
/// enough to matter.
fn skip_to_start(source: &mut dyn FrameSource, bounds: &RunBounds) -> Result<bool, DriverError> {
    let to_skip = bounds.start_frame - 1;
    if to_skip == 0 {
        return Ok(true);
    }

    info!(frames = to_skip, "skipping to start frame");
    let mut eta = EtaEstimator::new(to_skip)?;
    for skipped in 1..=to_skip {
        if !source.skip_frame() {
            return Ok(false);
        }
        eta.update()?;
        if skipped % bounds.report_every == 0 {
            info!(skipped, remaining = to_skip - skipped, eta = %eta, "skip progress");
        }
    }
    Ok(true)
}

#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error(transparent)]
    Sink(#[from] SinkError),
    #[error(transparent)]
    Eta(#[from] EtaError),
}
