use std::fs::File;
use std::io::Read;
use std::path::Path;

use bytes::BytesMut;
use frame_sieve_common::frame::{Frame, Raster};
use image::imageops::FilterType;
use tracing::{info, warn};

use super::{FrameSource, SourceError};

/// JPEG start-of-image marker followed by the first segment marker byte.
const SOI: &[u8] = &[0xFF, 0xD8, 0xFF];
/// JPEG end-of-image marker.
const EOI: &[u8] = &[0xFF, 0xD9];

const READ_CHUNK: usize = 64 * 1024;

/// Frame source backed by a raw MJPEG stream: concatenated JPEG images with
/// optional garbage between them.
///
/// The stream is scanned incrementally; each pull extracts the bytes between
/// the next SOI and EOI markers and decodes them. Skipping extracts without
/// decoding. The total frame count is unknown up front.
pub struct MjpegSource {
    reader: Box<dyn Read>,
    buffer: BytesMut,
    width: u32,
    height: u32,
    fps: f64,
    next_index: u64,
    eof: bool,
    failed: bool,
}

impl MjpegSource {
    pub fn open(path: &Path, width: u32, height: u32, fps: f64) -> Result<Self, SourceError> {
        let file = File::open(path)
            .map_err(|e| SourceError::OpenStream(path.display().to_string(), e))?;
        info!(
            path = path.display().to_string(),
            fps, "mjpeg stream source opened"
        );
        Ok(Self::from_reader(Box::new(file), width, height, fps))
    }

    pub fn from_reader(reader: Box<dyn Read>, width: u32, height: u32, fps: f64) -> Self {
        Self {
            reader,
            buffer: BytesMut::with_capacity(READ_CHUNK),
            width,
            height,
            fps,
            next_index: 1,
            eof: false,
            failed: false,
        }
    }

    /// Pull more bytes into the buffer. Returns `false` once the stream is
    /// exhausted or unreadable.
    fn fill(&mut self) -> bool {
        if self.eof {
            return false;
        }
        let mut chunk = [0u8; READ_CHUNK];
        match self.reader.read(&mut chunk) {
            Ok(0) => {
                self.eof = true;
                false
            }
            Ok(n) => {
                self.buffer.extend_from_slice(&chunk[..n]);
                true
            }
            Err(e) => {
                warn!(error = %e, "stream read failed, ending source");
                self.eof = true;
                false
            }
        }
    }

    /// Extract the next complete JPEG from the stream, refilling as needed.
    fn next_jpeg(&mut self) -> Option<Vec<u8>> {
        loop {
            if let Some(start) = find_subsequence(&self.buffer, SOI) {
                if let Some(rel) = find_subsequence(&self.buffer[start..], EOI) {
                    let end = start + rel + EOI.len();
                    let jpeg = self.buffer[start..end].to_vec();
                    let _ = self.buffer.split_to(end);
                    return Some(jpeg);
                }
                // SOI seen but the image is still incomplete; keep everything
                // from the marker onward and read more.
                if start > 0 {
                    let _ = self.buffer.split_to(start);
                }
            } else if self.buffer.len() > SOI.len() {
                // No marker in the buffer; keep the tail in case one spans
                // the chunk boundary.
                let keep = self.buffer.len() - SOI.len();
                let _ = self.buffer.split_to(keep);
            }

            if !self.fill() {
                return None;
            }
        }
    }

    fn timestamp_ms(&self, index: u64) -> i64 {
        (((index - 1) as f64 / self.fps) * 1000.0) as i64
    }
}

impl FrameSource for MjpegSource {
    fn next_frame(&mut self) -> Option<Frame> {
        if self.failed {
            return None;
        }
        let jpeg = self.next_jpeg()?;
        let index = self.next_index;
        self.next_index += 1;

        match image::load_from_memory(&jpeg) {
            Ok(img) => {
                let gray = img
                    .resize_exact(self.width, self.height, FilterType::Triangle)
                    .to_luma8();
                let raster = Raster::new(self.width, self.height, gray.into_raw());
                Some(Frame::new(raster, index, Some(self.timestamp_ms(index))))
            }
            Err(e) => {
                // Acquisition failure ends iteration; it is not retried.
                warn!(frame = index, error = %e, "failed to decode frame, ending source");
                self.failed = true;
                None
            }
        }
    }

    fn skip_frame(&mut self) -> bool {
        if self.failed {
            return false;
        }
        if self.next_jpeg().is_some() {
            self.next_index += 1;
            true
        } else {
            false
        }
    }

    fn frame_count(&self) -> Option<u64> {
        None
    }

    fn name(&self) -> &str {
        "mjpeg"
    }
}

/// Find the position of `needle` in `haystack`.
fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
