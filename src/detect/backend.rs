use anyhow::Result;

use crate::error::DetectError;
use crate::frame::Frame;

use super::result::{Channel, Detection};

/// Detector backend capability.
///
/// Every backend kind (learned model, intensity heuristic) is reached through
/// this trait; the router never inspects which kind it holds.
///
/// Backends are loaded once and shared across request threads. `detect` takes
/// `&self` and must not mutate internal state per call.
pub trait DetectorBackend: Send + Sync {
    /// Backend identifier, used in logs and errors.
    fn name(&self) -> &str;

    /// Whether the backend is loaded and warmed up. The router refuses to
    /// invoke a backend that is not ready.
    fn is_ready(&self) -> bool {
        true
    }

    /// Optional warm-up hook, run once after loading.
    fn warm_up(&self) -> Result<(), DetectError> {
        Ok(())
    }

    /// Run detection on a frame.
    ///
    /// Returned boxes are in `frame`'s local pixel space. Every returned
    /// detection has `confidence >= threshold` and carries `channel`.
    fn detect(
        &self,
        frame: &Frame,
        threshold: f32,
        channel: Option<Channel>,
    ) -> Result<Vec<Detection>, DetectError>;
}

/// Raw box proposed by a learned model, in input-frame pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct RawCandidate {
    pub label: String,
    pub confidence: f32,
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl RawCandidate {
    pub fn new(label: impl Into<String>, confidence: f32, xyxy: [f32; 4]) -> Self {
        let [x1, y1, x2, y2] = xyxy;
        Self {
            label: label.into(),
            confidence,
            x1,
            y1,
            x2,
            y2,
        }
    }
}

/// Opaque pretrained multi-class detector.
///
/// Implementations may pre-filter on `threshold`, but the adapter filters
/// again, so returning extra low-confidence candidates is harmless.
pub trait ObjectModel: Send + Sync {
    fn name(&self) -> &str;

    fn infer(&self, frame: &Frame, threshold: f32) -> Result<Vec<RawCandidate>>;
}
