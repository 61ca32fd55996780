mod directory;
mod mjpeg;

use std::path::Path;

use frame_sieve_common::config::InputConfig;
use frame_sieve_common::frame::Frame;

pub use directory::DirectorySource;
pub use mjpeg::MjpegSource;

/// Ordered pull-based frame supplier.
///
/// Both variants (directory of stills, raw MJPEG stream) expose the same
/// contract: frames arrive in strictly increasing 1-based index order, one per
/// pull. A read or decode failure is logged and reported as end-of-stream;
/// nothing downstream ever sees a broken frame and nothing is retried.
pub trait FrameSource {
    /// Next normalized frame, or `None` at end-of-stream.
    fn next_frame(&mut self) -> Option<Frame>;

    /// Advance one position without decoding. Returns `false` at end-of-stream.
    fn skip_frame(&mut self) -> bool;

    /// Total frame count, when the source can enumerate it up front.
    fn frame_count(&self) -> Option<u64>;

    /// Human-readable name for logging.
    fn name(&self) -> &str {
        "unnamed"
    }
}

/// Open the source described by the input config, resolving `auto` mode by
/// path kind: a directory of stills, anything else a raw MJPEG stream file.
pub fn open_source(
    input: &InputConfig,
    width: u32,
    height: u32,
) -> Result<Box<dyn FrameSource>, SourceError> {
    let path = Path::new(&input.path);
    if !path.exists() {
        return Err(SourceError::Missing(input.path.clone()));
    }

    let mode = match input.mode.as_str() {
        "auto" => {
            if path.is_dir() {
                "directory"
            } else {
                "mjpeg"
            }
        }
        other => other,
    };

    match mode {
        "directory" => Ok(Box::new(DirectorySource::open(path, width, height)?)),
        "mjpeg" => Ok(Box::new(MjpegSource::open(path, width, height, input.fps)?)),
        other => Err(SourceError::UnknownMode(other.to_string())),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("input path {0} does not exist")]
    Missing(String),
    #[error("failed to read input directory {0}: {1}")]
    ReadDir(String, std::io::Error),
    #[error("no frames found in {0}")]
    Empty(String),
    #[error("failed to open stream {0}: {1}")]
    OpenStream(String, std::io::Error),
    #[error("unknown input mode {0:?}")]
    UnknownMode(String),
}
