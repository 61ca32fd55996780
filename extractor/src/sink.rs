use std::path::{Path, PathBuf};

use frame_sieve_common::frame::Frame;
use tracing::debug;

/// Destination for extracted foreground frames.
pub trait FrameSink {
    fn store(&mut self, frame: &Frame, stem: &str, score: f32) -> Result<(), SinkError>;
}

/// Writes foreground frames as PNG files under a destination directory.
pub struct DiskSink {
    dir: PathBuf,
}

impl DiskSink {
    /// Creates the destination directory if it does not exist.
    pub fn create(dir: &Path) -> Result<Self, SinkError> {
        std::fs::create_dir_all(dir)
            .map_err(|e| SinkError::CreateDir(dir.display().to_string(), e))?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }
}

impl FrameSink for DiskSink {
    fn store(&mut self, frame: &Frame, stem: &str, score: f32) -> Result<(), SinkError> {
        let name = frame.output_name(stem, Some(score));
        let path = self.dir.join(&name);
        image::save_buffer(
            &path,
            &frame.raster.data,
            frame.raster.width,
            frame.raster.height,
            image::ExtendedColorType::L8,
        )
        .map_err(|e| SinkError::Write(path.display().to_string(), e))?;
        debug!(
            path = path.display().to_string(),
            frame = frame.index,
            "stored foreground frame"
        );
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("failed to create output directory {0}: {1}")]
    CreateDir(String, std::io::Error),
    #[error("failed to write frame {0}: {1}")]
    Write(String, image::ImageError),
}
