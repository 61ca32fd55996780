/// A normalized grayscale pixel grid, row-major luma8.
///
/// Every raster flowing through the pipeline shares one resolution: frame
/// sources and the reference loader both resize to the configured size before
/// anything downstream sees the pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl Raster {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        assert_eq!(
            data.len(),
            (width as usize) * (height as usize),
            "raster data length must match {width}x{height}"
        );
        Self {
            width,
            height,
            data,
        }
    }

    pub fn same_shape(&self, other: &Raster) -> bool {
        self.width == other.width && self.height == other.height
    }
}

/// One frame pulled from a source: pixels plus its 1-based position and,
/// for stream-backed sources, an offset timestamp into the stream.
#[derive(Debug, Clone)]
pub struct Frame {
    pub raster: Raster,
    pub index: u64,
    pub timestamp_ms: Option<i64>,
}

impl Frame {
    pub fn new(raster: Raster, index: u64, timestamp_ms: Option<i64>) -> Self {
        Self {
            raster,
            index,
            timestamp_ms,
        }
    }

    /// Stream offset as `HH:MM:SS`, for log lines.
    pub fn timecode(&self) -> Option<String> {
        self.timestamp_ms.map(|ms| fmt_offset(ms, "%H:%M:%S"))
    }

    /// Output file name for an extracted foreground frame.
    /// e.g. "cam01_f000284-t000132-ms0.6213.png"
    pub fn output_name(&self, stem: &str, score: Option<f32>) -> String {
        let mut name = format!("{stem}_f{index:06}", index = self.index);
        if let Some(ms) = self.timestamp_ms {
            name.push_str(&format!("-t{}", fmt_offset(ms, "%H%M%S")));
        }
        if let Some(s) = score {
            name.push_str(&format!("-ms{s:.4}"));
        }
        name.push_str(".png");
        name
    }
}

fn fmt_offset(ms: i64, format: &str) -> String {
    let dt = chrono::DateTime::from_timestamp_millis(ms.max(0)).unwrap_or_default();
    dt.format(format).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raster_1x1(value: u8) -> Raster {
        Raster::new(1, 1, vec![value])
    }

    #[test]
    fn output_name_without_timestamp_or_score() {
        let frame = Frame::new(raster_1x1(0), 7, None);
        assert_eq!(frame.output_name("cam01", None), "cam01_f000007.png");
    }

    #[test]
    fn output_name_with_timestamp_and_score() {
        // 92_000 ms = 00:01:32 into the stream
        let frame = Frame::new(raster_1x1(0), 284, Some(92_000));
        assert_eq!(
            frame.output_name("cam01", Some(0.6213)),
            "cam01_f000284-t000132-ms0.6213.png"
        );
    }

    #[test]
    fn timecode_formatting() {
        let frame = Frame::new(raster_1x1(0), 1, Some(3_661_000));
        assert_eq!(frame.timecode().as_deref(), Some("01:01:01"));
        let frame = Frame::new(raster_1x1(0), 1, None);
        assert_eq!(frame.timecode(), None);
    }

    #[test]
    fn raster_shape_check() {
        let a = raster_1x1(0);
        let b = raster_1x1(255);
        let c = Raster::new(2, 1, vec![0, 0]);
        assert!(a.same_shape(&b));
        assert!(!a.same_shape(&c));
    }

    #[test]
    #[should_panic(expected = "raster data length")]
    fn raster_rejects_mismatched_data() {
        let _ = Raster::new(2, 2, vec![0; 3]);
    }
}
