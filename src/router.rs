//! Stream-type dispatch.
//!
//! The router owns the backend registry and turns one frame into one
//! detection list in the frame's own coordinate space. Composite frames are
//! split, each half goes to its backend, and second-half boxes are shifted
//! back into composite coordinates.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::detect::{
    BackendRegistry, BackendRole, Channel, CoordinateSpace, Detection, LocalDetections,
};
use crate::error::DetectError;
use crate::frame::{normalize_tag, split, Frame, SplitLayout};

/// Which backend(s) receive a frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StreamType {
    /// Visible-light frame, general detector only.
    #[default]
    Color,
    /// Thermal frame, thermal backend only.
    Thermal,
    /// Color and thermal images concatenated into one frame.
    Split,
}

impl StreamType {
    pub fn as_str(self) -> &'static str {
        match self {
            StreamType::Color => "COLOR",
            StreamType::Thermal => "THERMAL",
            StreamType::Split => "SPLIT",
        }
    }

    /// Resolve a caller-supplied tag, falling back to `Color` for anything
    /// unrecognized.
    pub fn resolve(tag: Option<&str>) -> Self {
        match tag {
            None => StreamType::Color,
            Some(tag) => tag.parse().unwrap_or_else(|_| {
                log::warn!("unknown stream type '{}', treating as COLOR", tag);
                StreamType::Color
            }),
        }
    }
}

impl fmt::Display for StreamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StreamType {
    type Err = DetectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_tag(s).as_str() {
            "COLOR" => Ok(StreamType::Color),
            "THERMAL" => Ok(StreamType::Thermal),
            "SPLIT" => Ok(StreamType::Split),
            _ => Err(DetectError::InvalidRequest(format!(
                "unknown stream type '{}'",
                s
            ))),
        }
    }
}

pub struct Router {
    backends: BackendRegistry,
    default_layout: SplitLayout,
}

impl Router {
    pub fn new(backends: BackendRegistry) -> Self {
        Self {
            backends,
            default_layout: SplitLayout::default(),
        }
    }

    /// Layout used for `Split` frames that arrive without one.
    pub fn with_default_layout(mut self, layout: SplitLayout) -> Self {
        self.default_layout = layout;
        self
    }

    pub fn backends(&self) -> &BackendRegistry {
        &self.backends
    }

    pub fn default_layout(&self) -> SplitLayout {
        self.default_layout
    }

    /// Route one frame.
    ///
    /// `layout` only matters for `Split`. Backends filter on `threshold`
    /// themselves; the router does no filtering of its own.
    pub fn route(
        &self,
        frame: &Frame,
        stream: StreamType,
        layout: Option<SplitLayout>,
        threshold: f32,
    ) -> Result<Vec<Detection>, DetectError> {
        if frame.width() == 0 || frame.height() == 0 {
            return Err(DetectError::InvalidFrame(format!(
                "frame has zero dimension ({}x{})",
                frame.width(),
                frame.height()
            )));
        }

        let role = match stream {
            StreamType::Color => BackendRole::Color,
            StreamType::Thermal => BackendRole::Thermal,
            StreamType::Split => {
                let layout = layout.unwrap_or_else(|| {
                    log::debug!("split frame without layout, using {}", self.default_layout);
                    self.default_layout
                });
                return self.route_split(frame, layout, threshold);
            }
        };
        let hits = self.backends.backend(role)?.detect(frame, threshold, None)?;
        Ok(LocalDetections::new(CoordinateSpace::Original, hits).into_original(frame.shape()))
    }

    /// Route with free-text stream type and layout, as they arrive from a
    /// transport. Unknown values select the documented defaults.
    pub fn route_tagged(
        &self,
        frame: &Frame,
        stream: Option<&str>,
        layout: Option<&str>,
        threshold: f32,
    ) -> Result<Vec<Detection>, DetectError> {
        let stream = StreamType::resolve(stream);
        let layout = layout.and_then(|tag| match tag.parse::<SplitLayout>() {
            Ok(layout) => Some(layout),
            Err(_) => {
                log::warn!(
                    "unknown split layout '{}', using {}",
                    tag,
                    self.default_layout
                );
                None
            }
        });
        self.route(frame, stream, layout, threshold)
    }

    fn route_split(
        &self,
        frame: &Frame,
        layout: SplitLayout,
        threshold: f32,
    ) -> Result<Vec<Detection>, DetectError> {
        // Both halves must be servable before either backend runs.
        let color = self.backends.backend(BackendRole::Color)?;
        let thermal = self.backends.backend(BackendRole::Thermal)?;

        let shape = frame.shape();
        let (first, second) = split(frame, layout);

        let color_hits = LocalDetections::new(
            CoordinateSpace::Half {
                layout,
                is_second_half: false,
            },
            color.detect(&first, threshold, Some(Channel::Color))?,
        );
        let thermal_hits = LocalDetections::new(
            CoordinateSpace::Half {
                layout,
                is_second_half: true,
            },
            thermal.detect(&second, threshold, Some(Channel::Thermal))?,
        );
        let (color_count, thermal_count) = (color_hits.len(), thermal_hits.len());

        let mut detections = color_hits.into_original(shape);
        detections.extend(thermal_hits.into_original(shape));

        log::debug!(
            "split {} frame {}x{}: {} color + {} thermal detections",
            layout,
            shape.width,
            shape.height,
            color_count,
            thermal_count
        );
        Ok(detections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::backends::{ModelDetector, StubModel, ThermalHeuristic};
    use crate::detect::{BoundingBox, DetectionCategory, RawCandidate};
    use crate::frame::PixelFormat;

    fn paint(frame: &mut Frame, x0: u32, y0: u32, w: u32, h: u32, value: u8) {
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                frame.pixel_mut(x, y).fill(value);
            }
        }
    }

    fn color_model(candidates: Vec<RawCandidate>) -> ModelDetector<StubModel> {
        ModelDetector::new(StubModel::new("yolo", candidates)).ready()
    }

    fn router(candidates: Vec<RawCandidate>) -> Router {
        Router::new(
            BackendRegistry::new()
                .with(BackendRole::Color, color_model(candidates))
                .with(BackendRole::Thermal, ThermalHeuristic::default()),
        )
    }

    fn fire_box() -> RawCandidate {
        RawCandidate::new("fire", 0.8, [50.0, 50.0, 150.0, 150.0])
    }

    #[test]
    fn stream_type_parsing_is_case_insensitive() {
        assert_eq!("split".parse::<StreamType>().unwrap(), StreamType::Split);
        assert_eq!(" Thermal ".parse::<StreamType>().unwrap(), StreamType::Thermal);
        assert!("RADAR".parse::<StreamType>().is_err());
    }

    #[test]
    fn unknown_stream_type_resolves_to_color() {
        assert_eq!(StreamType::resolve(Some("RADAR")), StreamType::Color);
        assert_eq!(StreamType::resolve(None), StreamType::Color);
    }

    #[test]
    fn color_stream_uses_general_detector_without_channel() {
        let frame = Frame::zeros(640, 480, PixelFormat::Rgb24);
        let out = router(vec![fire_box()])
            .route(&frame, StreamType::Color, None, 0.25)
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].bounding_box, BoundingBox::new(50, 50, 100, 100));
        assert_eq!(out[0].channel, None);
    }

    #[test]
    fn thermal_stream_uses_thermal_backend() {
        let mut frame = Frame::zeros(640, 480, PixelFormat::Rgb24);
        paint(&mut frame, 100, 100, 40, 40, 255);
        let out = router(vec![fire_box()])
            .route(&frame, StreamType::Thermal, None, 0.5)
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].category, DetectionCategory::Hotspot);
        assert_eq!(out[0].channel, None);
    }

    #[test]
    fn split_left_right_remaps_thermal_half() {
        let mut frame = Frame::zeros(640, 480, PixelFormat::Rgb24);
        paint(&mut frame, 340, 20, 40, 40, 255);

        let out = router(vec![fire_box()])
            .route(&frame, StreamType::Split, Some(SplitLayout::LeftRight), 0.5)
            .unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].channel, Some(Channel::Color));
        assert_eq!(out[0].bounding_box, BoundingBox::new(50, 50, 100, 100));
        assert_eq!(out[1].channel, Some(Channel::Thermal));
        assert_eq!(out[1].bounding_box, BoundingBox::new(340, 20, 40, 40));
    }

    #[test]
    fn split_top_bottom_offsets_y() {
        let mut frame = Frame::zeros(640, 480, PixelFormat::Rgb24);
        paint(&mut frame, 10, 250, 30, 30, 255);

        let out = router(Vec::new())
            .route(&frame, StreamType::Split, Some(SplitLayout::TopBottom), 0.5)
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].bounding_box, BoundingBox::new(10, 250, 30, 30));
    }

    #[test]
    fn split_without_layout_uses_default() {
        let mut frame = Frame::zeros(640, 480, PixelFormat::Rgb24);
        paint(&mut frame, 400, 100, 20, 20, 255);
        let router = router(Vec::new());

        let implicit = router.route(&frame, StreamType::Split, None, 0.5).unwrap();
        let explicit = router
            .route(&frame, StreamType::Split, Some(SplitLayout::LeftRight), 0.5)
            .unwrap();
        assert_eq!(implicit, explicit);
    }

    #[test]
    fn configured_default_layout_applies() {
        let mut frame = Frame::zeros(640, 480, PixelFormat::Rgb24);
        paint(&mut frame, 10, 300, 20, 20, 255);
        let router = router(Vec::new()).with_default_layout(SplitLayout::TopBottom);

        let out = router.route(&frame, StreamType::Split, None, 0.5).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].bounding_box, BoundingBox::new(10, 300, 20, 20));
    }

    #[test]
    fn unknown_tags_fall_back() {
        let frame = Frame::zeros(640, 480, PixelFormat::Rgb24);
        let router = router(vec![fire_box()]);
        let tagged = router
            .route_tagged(&frame, Some("RADAR"), Some("DIAGONAL"), 0.25)
            .unwrap();
        let color = router.route(&frame, StreamType::Color, None, 0.25).unwrap();
        assert_eq!(tagged, color);
    }

    #[test]
    fn missing_color_backend_is_unavailable() {
        let router = Router::new(
            BackendRegistry::new().with(BackendRole::Thermal, ThermalHeuristic::default()),
        );
        let frame = Frame::zeros(640, 480, PixelFormat::Rgb24);

        for stream in [StreamType::Color, StreamType::Split] {
            let err = router.route(&frame, stream, None, 0.25).unwrap_err();
            assert!(matches!(err, DetectError::BackendUnavailable { .. }));
        }
        assert!(router.route(&frame, StreamType::Thermal, None, 0.25).is_ok());
    }

    #[test]
    fn cold_thermal_model_blocks_split_before_color_runs() {
        let router = Router::new(
            BackendRegistry::new()
                .with(
                    BackendRole::Color,
                    ModelDetector::new(StubModel::failing("yolo", "must not run")).ready(),
                )
                .with(
                    BackendRole::Thermal,
                    ModelDetector::new(StubModel::new("thermal-yolo", Vec::new())),
                ),
        );
        let frame = Frame::zeros(640, 480, PixelFormat::Rgb24);
        let err = router.route(&frame, StreamType::Split, None, 0.25).unwrap_err();
        match err {
            DetectError::BackendUnavailable { backend } => assert_eq!(backend, "thermal-yolo"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn zero_sized_frame_is_invalid() {
        let frame = Frame::zeros(0, 480, PixelFormat::Rgb24);
        let err = router(Vec::new())
            .route(&frame, StreamType::Color, None, 0.25)
            .unwrap_err();
        assert!(matches!(err, DetectError::InvalidFrame(_)));
    }

    #[test]
    fn runaway_model_boxes_do_not_panic() {
        let router = router(vec![RawCandidate::new("fire", 0.9, [-3e9, 0.0, 3e9, 10.0])]);
        let frame = Frame::zeros(640, 480, PixelFormat::Rgb24);

        let out = router.route(&frame, StreamType::Color, None, 0.25).unwrap();
        assert_eq!(out[0].bounding_box, BoundingBox::new(0, 0, 640, 10));

        let out = router
            .route(&frame, StreamType::Split, Some(SplitLayout::LeftRight), 0.25)
            .unwrap();
        assert_eq!(out[0].bounding_box, BoundingBox::new(0, 0, 320, 10));
    }

    #[test]
    fn inference_failure_propagates() {
        let router = Router::new(BackendRegistry::new().with(
            BackendRole::Color,
            ModelDetector::new(StubModel::failing("yolo", "cuda oom")).ready(),
        ));
        let frame = Frame::zeros(64, 64, PixelFormat::Rgb24);
        let err = router.route(&frame, StreamType::Color, None, 0.25).unwrap_err();
        assert!(matches!(err, DetectError::BackendInferenceFailure { .. }));
    }
}
