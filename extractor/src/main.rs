mod classify;
mod driver;
mod sink;
mod source;

use std::path::{Path, PathBuf};

use frame_sieve_common::config::Config;
use tracing::{error, info};

use classify::{BackgroundClassifier, ClassifyError, NccScorer, ReferenceSet};
use driver::{DriverError, RunBounds, RunSummary};
use sink::{DiskSink, SinkError};
use source::SourceError;

fn main() {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    let config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {e}", config_path.display());
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.parse().unwrap_or_default()),
        )
        .init();

    info!(
        input = config.input.path,
        references = config.references.path,
        output = config.output.path,
        threshold = config.classifier.threshold,
        start_frame = config.input.start_frame,
        end_frame = config.input.end_frame,
        "starting frame-sieve extractor"
    );

    match run(&config) {
        Ok(summary) => {
            info!(
                processed = summary.processed,
                foreground = summary.foreground,
                "extraction finished"
            );
        }
        Err(e) => {
            error!(error = %e, "extraction failed");
            std::process::exit(1);
        }
    }
}

fn run(config: &Config) -> Result<RunSummary, ExtractError> {
    let width = config.classifier.width;
    let height = config.classifier.height;

    let mut source = source::open_source(&config.input, width, height)?;
    let references = ReferenceSet::load(Path::new(&config.references.path), width, height)?;
    let classifier =
        BackgroundClassifier::new(references, config.classifier.threshold, Box::new(NccScorer));
    let mut sink = DiskSink::create(Path::new(&config.output.path))?;

    let bounds = RunBounds {
        start_frame: config.input.start_frame,
        end_frame: config.input.end_frame,
        report_every: config.progress.report_every,
    };
    let stem = source_stem(&config.input.path);

    let summary = driver::run(source.as_mut(), &classifier, &mut sink, &stem, &bounds)?;
    Ok(summary)
}

/// Output-name stem derived from the input path, e.g. "captures/cam01" and
/// "captures/cam01.mjpeg" both yield "cam01".
fn source_stem(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("frames")
        .to_string()
}

#[derive(Debug, thiserror::Error)]
enum ExtractError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Classify(#[from] ClassifyError),
    #[error(transparent)]
    Sink(#[from] SinkError),
    #[error(transparent)]
    Driver(#[from] DriverError),
}
