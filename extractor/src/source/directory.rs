use std::path::{Path, PathBuf};

use frame_sieve_common::frame::{Frame, Raster};
use image::imageops::FilterType;
use tracing::{info, warn};

use super::{FrameSource, SourceError};

/// Frame source backed by a directory of still images.
///
/// The listing is taken once at open time and sorted lexicographically; that
/// order defines the frame indices for the whole job. Skipping is a cursor
/// advance, no decode.
pub struct DirectorySource {
    paths: Vec<PathBuf>,
    cursor: usize,
    width: u32,
    height: u32,
    /// Set once a decode fails; the source stays ended from then on.
    failed: bool,
}

impl DirectorySource {
    pub fn open(dir: &Path, width: u32, height: u32) -> Result<Self, SourceError> {
        let entries = std::fs::read_dir(dir)
            .map_err(|e| SourceError::ReadDir(dir.display().to_string(), e))?;

        let mut paths: Vec<_> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file())
            .collect();
        paths.sort();

        if paths.is_empty() {
            return Err(SourceError::Empty(dir.display().to_string()));
        }
        info!(
            dir = dir.display().to_string(),
            frames = paths.len(),
            "directory source opened"
        );
        Ok(Self {
            paths,
            cursor: 0,
            width,
            height,
            failed: false,
        })
    }
}

impl FrameSource for DirectorySource {
    fn next_frame(&mut self) -> Option<Frame> {
        if self.failed {
            return None;
        }
        let path = self.paths.get(self.cursor)?.clone();
        self.cursor += 1;
        let index = self.cursor as u64;

        match image::open(&path) {
            Ok(img) => {
                let gray = img
                    .resize_exact(self.width, self.height, FilterType::Triangle)
                    .to_luma8();
                let raster = Raster::new(self.width, self.height, gray.into_raw());
                Some(Frame::new(raster, index, None))
            }
            Err(e) => {
                // Acquisition failure ends iteration; it is not retried.
                warn!(
                    path = path.display().to_string(),
                    frame = index,
                    error = %e,
                    "failed to decode frame, ending source"
                );
                self.failed = true;
                None
            }
        }
    }

    fn skip_frame(&mut self) -> bool {
        if self.cursor < self.paths.len() {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    fn frame_count(&self) -> Option<u64> {
        Some(self.paths.len() as u64)
    }

    fn name(&self) -> &str {
        "directory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Unique scratch directory under the system temp dir.
    fn scratch(label: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "frame-sieve-{label}-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_png(path: &Path, value: u8) {
        image::GrayImage::from_pixel(4, 4, image::Luma([value]))
            .save(path)
            .unwrap();
    }

    #[test]
    fn empty_directory_rejected() {
        let dir = scratch("empty");
        let result = DirectorySource::open(&dir, 2, 2);
        assert!(matches!(result, Err(SourceError::Empty(_))));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn frames_arrive_in_lexicographic_order() {
        let dir = scratch("order");
        // Written out of order on purpose.
        write_png(&dir.join("frame_b.png"), 20);
        write_png(&dir.join("frame_a.png"), 10);
        write_png(&dir.join("frame_c.png"), 30);

        let mut source = DirectorySource::open(&dir, 2, 2).unwrap();
        assert_eq!(source.frame_count(), Some(3));

        let values: Vec<u8> = std::iter::from_fn(|| source.next_frame())
            .map(|f| f.raster.data[0])
            .collect();
        assert_eq!(values, vec![10, 20, 30]);
        assert!(source.next_frame().is_none());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn frames_are_normalized_and_indexed() {
        let dir = scratch("normalize");
        write_png(&dir.join("only.png"), 77);

        let mut source = DirectorySource::open(&dir, 3, 2).unwrap();
        let frame = source.next_frame().unwrap();
        assert_eq!(frame.index, 1);
        assert_eq!(frame.timestamp_ms, None);
        assert_eq!(frame.raster.width, 3);
        assert_eq!(frame.raster.height, 2);
        assert_eq!(frame.raster.data.len(), 6);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn skip_advances_without_decoding() {
        let dir = scratch("skip");
        write_png(&dir.join("a.png"), 1);
        write_png(&dir.join("b.png"), 2);

        let mut source = DirectorySource::open(&dir, 2, 2).unwrap();
        assert!(source.skip_frame());
        let frame = source.next_frame().unwrap();
        assert_eq!(frame.index, 2);
        assert_eq!(frame.raster.data[0], 2);
        assert!(!source.skip_frame());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn undecodable_frame_ends_the_source() {
        let dir = scratch("broken");
        write_png(&dir.join("a.png"), 1);
        fs::write(dir.join("b.png"), b"not an image").unwrap();
        write_png(&dir.join("c.png"), 3);

        let mut source = DirectorySource::open(&dir, 2, 2).unwrap();
        assert!(source.next_frame().is_some());
        // The broken entry ends iteration; frame c is never reached.
        assert!(source.next_frame().is_none());
        assert!(source.next_frame().is_none());
        fs::remove_dir_all(&dir).unwrap();
    }
}
