use std::fmt;

use serde::{Deserialize, Serialize};

/// Axis-aligned box in integer pixels. `x`/`y` is the top-left corner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingBox {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build from `(x1, y1, x2, y2)` corners, truncating toward zero.
    ///
    /// Corners outside the `i32` range saturate rather than overflow.
    pub fn from_corners(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        let (x1, y1, x2, y2) = (x1 as i32, y1 as i32, x2 as i32, y2 as i32);
        Self::new(x1, y1, x2.saturating_sub(x1), y2.saturating_sub(y1))
    }

    /// Same box shifted by `(dx, dy)`; width and height are untouched.
    pub fn translated(&self, dx: i32, dy: i32) -> Self {
        Self::new(
            self.x.saturating_add(dx),
            self.y.saturating_add(dy),
            self.width,
            self.height,
        )
    }
}

/// Closed set of categories a detection can carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DetectionCategory {
    Fire,
    Smoke,
    Hotspot,
}

impl DetectionCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            DetectionCategory::Fire => "FIRE",
            DetectionCategory::Smoke => "SMOKE",
            DetectionCategory::Hotspot => "HOTSPOT",
        }
    }
}

impl fmt::Display for DetectionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sub-pipeline of a split frame that produced a detection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Color,
    Thermal,
}

impl Channel {
    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Color => "color",
            Channel::Thermal => "thermal",
        }
    }
}

/// A single detection.
///
/// Backends construct detections fully formed (category and channel are
/// decided up front). The router only ever produces translated copies.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    pub label: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
    pub bounding_box: BoundingBox,
    #[serde(rename = "detectionType")]
    pub category: DetectionCategory,
    pub channel: Option<Channel>,
}

impl Detection {
    pub fn new(
        label: impl Into<String>,
        confidence: f32,
        bounding_box: BoundingBox,
        category: DetectionCategory,
        channel: Option<Channel>,
    ) -> Self {
        Self {
            label: label.into(),
            confidence,
            bounding_box,
            category,
            channel,
        }
    }

    /// Copy of this detection with its box shifted by `(dx, dy)`.
    pub fn translated(&self, dx: i32, dy: i32) -> Self {
        Self {
            bounding_box: self.bounding_box.translated(dx, dy),
            ..self.clone()
        }
    }
}
