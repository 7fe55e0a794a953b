//! # Edge map pipeline
//!
//! Converts a colour camera frame into a binary top-down edge map in which lane markings appear
//! as roughly vertical lines.
//!
//! The stages, in order, are:
//!     1. Luminance conversion
//!     2. Gaussian smoothing
//!     3. Canny edge detection
//!     4. Birdview perspective warp
//!
//! Each stage is a pure function of the previous stage's output. The intermediate images can be
//! observed through a [`DebugSink`], which has no influence on the result.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod birdview;
pub mod filters;
mod params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::cam::{Frame, FrameSize};
use image::GrayImage;
use log::trace;

use crate::debug_img::{DebugSink, NullSink, Topic};
pub use params::*;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The edge map pipeline.
#[derive(Debug, Clone, Default)]
pub struct EdgeMapPipeline {
    params: EdgeMapParams,
}

/// Binary top-down edge map. Any nonzero pixel is evidence of a lane boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeMap {
    image: GrayImage,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors raised by the edge map pipeline.
#[derive(Debug, thiserror::Error)]
pub enum EdgeMapError {
    #[error("Expected a {expected} frame, found {found}")]
    InvalidFrameSize { expected: FrameSize, found: FrameSize },

    #[error("The blur kernel size must be odd and positive, found {0}")]
    InvalidKernelSize(usize),

    #[error("The birdview control points do not define a valid perspective transform")]
    DegenerateWarp,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl EdgeMapPipeline {
    pub fn new(params: EdgeMapParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &EdgeMapParams {
        &self.params
    }

    /// Run the pipeline on a frame.
    pub fn transform(&self, frame: &Frame) -> Result<EdgeMap, EdgeMapError> {
        self.transform_observed(frame, &mut NullSink)
    }

    /// Run the pipeline on a frame, handing each intermediate image to the sink.
    pub fn transform_observed(
        &self,
        frame: &Frame,
        sink: &mut dyn DebugSink,
    ) -> Result<EdgeMap, EdgeMapError> {
        let found = FrameSize::of(frame);
        if found != self.params.frame_size {
            return Err(EdgeMapError::InvalidFrameSize {
                expected: self.params.frame_size,
                found,
            });
        }

        let ksize = self.params.blur_kernel_size;
        if ksize == 0 || ksize % 2 == 0 {
            return Err(EdgeMapError::InvalidKernelSize(ksize));
        }

        let gray = filters::grayscale(frame);
        sink.put(Topic::Grayscale, &gray);

        let blurred = filters::gaussian_blur(&gray, ksize);
        sink.put(Topic::GaussianBlur, &blurred);

        let edges = filters::canny(
            &blurred,
            self.params.canny_low_threshold,
            self.params.canny_high_threshold,
        );
        sink.put(Topic::Canny, &edges);

        // The transform is rebuilt on every call from the control points
        let (src, dst) = birdview::control_points(found, &self.params.birdview);
        let transform = birdview::perspective_transform(&src, &dst)?;
        let warped =
            birdview::warp_perspective(&edges, &transform, self.params.birdview.output_size)?;
        sink.put(Topic::Birdview, &warped);

        trace!(
            "Edge map: {} canny pixels, {} birdview pixels",
            count_nonzero(&edges),
            count_nonzero(&warped)
        );

        Ok(EdgeMap { image: warped })
    }
}

impl EdgeMap {
    /// Wrap an existing image as an edge map.
    pub fn from_image(image: GrayImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Returns true if the pixel holds boundary evidence.
    ///
    /// # Panics
    /// - If the pixel is outside the map.
    pub fn is_evidence(&self, x: u32, y: u32) -> bool {
        self.image.get_pixel(x, y).0[0] != 0
    }

    pub fn as_image(&self) -> &GrayImage {
        &self.image
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn count_nonzero(image: &GrayImage) -> usize {
    image.as_raw().iter().filter(|&&p| p != 0).count()
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use image::Rgb;

    /// A dark frame with bright vertical lane markings covering the given column ranges.
    pub(crate) fn lane_frame(stripes: &[(u32, u32)]) -> Frame {
        Frame::from_fn(320, 160, |x, _| {
            if stripes.iter().any(|&(a, b)| x >= a && x < b) {
                Rgb([255, 255, 255])
            } else {
                Rgb([20, 20, 20])
            }
        })
    }

    /// Sink which remembers which topics it saw.
    #[derive(Default)]
    struct RecordingSink {
        topics: Vec<Topic>,
    }

    impl DebugSink for RecordingSink {
        fn put(&mut self, topic: Topic, _image: &GrayImage) {
            self.topics.push(topic);
        }
    }

    #[test]
    fn test_frame_size_check() {
        let pipeline = EdgeMapPipeline::default();
        let frame = Frame::new(640, 480);

        match pipeline.transform(&frame) {
            Err(EdgeMapError::InvalidFrameSize { expected, found }) => {
                assert_eq!(expected, FrameSize::new(320, 160));
                assert_eq!(found, FrameSize::new(640, 480));
            }
            r => panic!("Expected a frame size error, got {:?}", r),
        }
    }

    #[test]
    fn test_kernel_size_check() {
        let pipeline = EdgeMapPipeline::new(EdgeMapParams {
            blur_kernel_size: 10,
            ..Default::default()
        });

        assert!(matches!(
            pipeline.transform(&lane_frame(&[])),
            Err(EdgeMapError::InvalidKernelSize(10))
        ));
    }

    #[test]
    fn test_blank_frame() {
        let map = EdgeMapPipeline::default().transform(&lane_frame(&[])).unwrap();
        assert_eq!((map.width(), map.height()), (320, 160));
        assert!(map.as_image().pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn test_sink_does_not_change_result() {
        let pipeline = EdgeMapPipeline::default();
        let frame = lane_frame(&[(100, 106), (240, 246)]);

        let mut sink = RecordingSink::default();
        let observed = pipeline.transform_observed(&frame, &mut sink).unwrap();
        let plain = pipeline.transform(&frame).unwrap();

        assert_eq!(observed, plain);
        assert_eq!(
            sink.topics,
            vec![Topic::Grayscale, Topic::GaussianBlur, Topic::Canny, Topic::Birdview]
        );
    }

    #[test]
    fn test_lane_markings_reach_scan_row() {
        let map = EdgeMapPipeline::default()
            .transform(&lane_frame(&[(100, 106), (240, 246)]))
            .unwrap();

        // Row 112 of the birdview samples source row ~105, where source column X lands on
        // output column 160 + (X - 160) / 1.6
        let lit: Vec<u32> = (0..map.width()).filter(|&x| map.is_evidence(x, 112)).collect();

        assert!(lit.iter().any(|&x| x > 115 && x < 130), "{:?}", lit);
        assert!(lit.iter().any(|&x| x > 200 && x < 220), "{:?}", lit);
        assert!(lit.iter().all(|&x| x > 115 && x < 220), "{:?}", lit);
    }
}
