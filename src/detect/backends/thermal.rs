use image::{GrayImage, Luma};
use imageproc::region_labelling::{connected_components, Connectivity};

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{BoundingBox, Channel, Detection, DetectionCategory};
use crate::error::DetectError;
use crate::frame::Frame;

/// Default binarization threshold on the 0-255 intensity scale.
pub const DEFAULT_THERMAL_THRESHOLD: f32 = 200.0;

/// Regions smaller than this many pixels are treated as sensor noise.
pub const MIN_HOTSPOT_AREA: u32 = 100;

const HOTSPOT_LABEL: &str = "hotspot";

/// Intensity-threshold hotspot detector for thermal imagery.
///
/// Needs no model and is always ready. Malformed or empty input yields zero
/// detections, never an error.
#[derive(Clone, Debug)]
pub struct ThermalHeuristic {
    threshold: f32,
}

impl ThermalHeuristic {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Outer regions of `gray` at or above the threshold.
    ///
    /// Holes are filled before labelling, so a region's area is the area
    /// enclosed by its outer boundary and anything nested inside it belongs
    /// to the enclosing region.
    fn regions(&self, gray: &GrayImage) -> Vec<Region> {
        let mut mask = GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
            if f32::from(gray.get_pixel(x, y)[0]) >= self.threshold {
                Luma([255u8])
            } else {
                Luma([0u8])
            }
        });
        fill_holes(&mut mask);
        let labels = connected_components(&mask, Connectivity::Eight, Luma([0u8]));

        let mut regions: Vec<Option<Region>> = Vec::new();
        for (x, y, label) in labels.enumerate_pixels() {
            let label = label[0];
            if label == 0 {
                continue;
            }
            let idx = (label - 1) as usize;
            if idx >= regions.len() {
                regions.resize(idx + 1, None);
            }
            regions[idx]
                .get_or_insert_with(|| Region::new(x, y))
                .add(x, y);
        }
        regions.into_iter().flatten().collect()
    }
}

impl Default for ThermalHeuristic {
    fn default() -> Self {
        Self::new(DEFAULT_THERMAL_THRESHOLD)
    }
}

impl DetectorBackend for ThermalHeuristic {
    fn name(&self) -> &str {
        "thermal-heuristic"
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
        let gray = frame.to_luma();

        let detections: Vec<Detection> = self
            .regions(&gray)
            .into_iter()
            .filter(|region| region.area >= MIN_HOTSPOT_AREA)
            .filter_map(|region| {
                let confidence = region.mean_intensity(&gray) / 255.0;
                let confidence = confidence.clamp(0.0, 1.0);
                (confidence >= threshold).then(|| {
                    Detection::new(
                        HOTSPOT_LABEL,
                        confidence,
                        region.bounding_box(),
                        DetectionCategory::Hotspot,
                        channel,
                    )
                })
            })
            .collect();

        log::debug!(
            "thermal heuristic found {} hotspots (intensity >= {})",
            detections.len(),
            self.threshold
        );
        Ok(detections)
    }
}

/// Mark every background pocket that cannot reach the image border as
/// foreground.
///
/// Background is labelled with 4-connectivity, the dual of the 8-connected
/// foreground, so a diagonal gap in a ring does not leak.
fn fill_holes(mask: &mut GrayImage) {
    let (width, height) = mask.dimensions();
    if width == 0 || height == 0 {
        return;
    }
    let background = GrayImage::from_fn(width, height, |x, y| {
        if mask.get_pixel(x, y)[0] == 0 {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    });
    let labels = connected_components(&background, Connectivity::Four, Luma([0u8]));

    let max_label = labels.pixels().map(|p| p[0]).max().unwrap_or(0) as usize;
    let mut reaches_border = vec![false; max_label + 1];
    for x in 0..width {
        reaches_border[labels.get_pixel(x, 0)[0] as usize] = true;
        reaches_border[labels.get_pixel(x, height - 1)[0] as usize] = true;
    }
    for y in 0..height {
        reaches_border[labels.get_pixel(0, y)[0] as usize] = true;
        reaches_border[labels.get_pixel(width - 1, y)[0] as usize] = true;
    }

    for (x, y, label) in labels.enumerate_pixels() {
        let label = label[0] as usize;
        if label != 0 && !reaches_border[label] {
            mask.put_pixel(x, y, Luma([255u8]));
        }
    }
}

/// Pixel count (holes included) and inclusive extent of one outer region.
#[derive(Clone, Copy, Debug)]
struct Region {
    area: u32,
    min_x: u32,
    max_x: u32,
    min_y: u32,
    max_y: u32,
}

impl Region {
    fn new(x: u32, y: u32) -> Self {
        Self {
            area: 0,
            min_x: x,
            max_x: x,
            min_y: y,
            max_y: y,
        }
    }

    fn add(&mut self, x: u32, y: u32) {
        self.area += 1;
        self.min_x = self.min_x.min(x);
        self.max_x = self.max_x.max(x);
        self.min_y = self.min_y.min(y);
        self.max_y = self.max_y.max(y);
    }

    fn bounding_box(&self) -> BoundingBox {
        BoundingBox::new(
            self.min_x as i32,
            self.min_y as i32,
            (self.max_x - self.min_x + 1) as i32,
            (self.max_y - self.min_y + 1) as i32,
        )
    }

    /// Mean intensity over the whole bounding box, background pixels included.
    fn mean_intensity(&self, gray: &GrayImage) -> f32 {
        let mut sum = 0u64;
        for y in self.min_y..=self.max_y {
            for x in self.min_x..=self.max_x {
                sum += u64::from(gray.get_pixel(x, y)[0]);
            }
        }
        let count = u64::from(self.max_x - self.min_x + 1) * u64::from(self.max_y - self.min_y + 1);
        sum as f32 / count as f32
    }
}
