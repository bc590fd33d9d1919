use std::sync::atomic::{AtomicBool, Ordering};

use crate::detect::backend::{DetectorBackend, ObjectModel};
use crate::detect::classify::classify;
use crate::detect::result::{BoundingBox, Channel, Detection, DetectionCategory};
use crate::error::DetectError;
use crate::frame::{Frame, PixelFormat};

/// Side length of the black frame used to warm a model up.
const WARM_UP_SIZE: u32 = 640;

/// Adapter from an `ObjectModel` to the detector backend capability.
///
/// Used for the general (color) detector and, with a category override, for a
/// learned thermal model whose outputs are always hotspots.
pub struct ModelDetector<M> {
    model: M,
    category_override: Option<DetectionCategory>,
    ready: AtomicBool,
}

impl<M: ObjectModel> ModelDetector<M> {
    /// Wrap a loaded model. It is not ready until `warm_up` succeeds.
    pub fn new(model: M) -> Self {
        Self {
            model,
            category_override: None,
            ready: AtomicBool::new(false),
        }
    }

    /// Force every detection to `category`, ignoring the label classifier.
    pub fn with_category(mut self, category: DetectionCategory) -> Self {
        self.category_override = Some(category);
        self
    }

    /// Wrap a model that needs no warm-up.
    pub fn ready(self) -> Self {
        self.ready.store(true, Ordering::Release);
        self
    }

    fn category_for(&self, label: &str) -> DetectionCategory {
        self.category_override.unwrap_or_else(|| classify(label))
    }
}

impl<M: ObjectModel> DetectorBackend for ModelDetector<M> {
    fn name(&self) -> &str {
        self.model.name()
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    fn warm_up(&self) -> Result<(), DetectError> {
        log::info!("warming up model backend '{}'", self.name());
        let dummy = Frame::zeros(WARM_UP_SIZE, WARM_UP_SIZE, PixelFormat::Rgb24);
        self.model
            .infer(&dummy, 1.0)
            .map_err(|e| DetectError::inference(self.name(), e))?;
        self.ready.store(true, Ordering::Release);
        Ok(())
    }

    fn detect(
        &self,
        frame: &Frame,
        threshold: f32,
        channel: Option<Channel>,
    ) -> Result<Vec<Detection>, DetectError> {
        if frame.is_empty() {
            return Ok(Vec::new());
        }
        let candidates = self
            .model
            .infer(frame, threshold)
            .map_err(|e| DetectError::inference(self.name(), e))?;

        let (width, height) = (frame.width() as f32, frame.height() as f32);
        let detections: Vec<Detection> = candidates
            .into_iter()
            .filter(|c| c.confidence >= threshold)
            .map(|c| {
                // corners outside the frame are pulled onto its edges
                let bbox = BoundingBox::from_corners(
                    c.x1.clamp(0.0, width),
                    c.y1.clamp(0.0, height),
                    c.x2.clamp(0.0, width),
                    c.y2.clamp(0.0, height),
                );
                let category = self.category_for(&c.label);
                Detection::new(c.label, c.confidence, bbox, category, channel)
            })
            .collect();

        log::debug!(
            "backend '{}' kept {} detections at threshold {:.2}",
            self.name(),
            detections.len(),
            threshold
        );
        Ok(detections)
    }
}
