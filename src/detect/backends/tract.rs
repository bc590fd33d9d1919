#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::imageops::{self, FilterType};
use tract_onnx::prelude::*;

use crate::detect::backend::{ObjectModel, RawCandidate};
use crate::frame::Frame;

/// Default IoU above which same-class boxes are suppressed.
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.45;

type YoloPlan = SimplePlan<TypedFact, Box<dyn TypedOp>, TypedModel>;

/// Tract-based YOLOv8 model.
///
/// Loads a local ONNX export and decodes its `[1, 4 + classes, anchors]`
/// output. Frames of any size are resized to the square model input and the
/// resulting boxes are scaled back to frame pixels.
pub struct TractYoloModel {
    name: String,
    model: YoloPlan,
    input_size: u32,
    iou_threshold: f32,
    labels: Vec<String>,
}

impl TractYoloModel {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn load<P: AsRef<Path>>(model_path: P, input_size: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        log::info!("loading YOLO model from {}", model_path.display());
        let size = input_size as usize;
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, size, size)),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        let name = model_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "yolo".to_string());

        Ok(Self {
            name,
            model,
            input_size,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            labels: Vec::new(),
        })
    }

    /// Class names for a custom model. COCO names are used when empty and the
    /// model has 80 classes.
    pub fn with_labels(mut self, labels: Vec<String>) -> Self {
        self.labels = labels;
        self
    }

    pub fn with_iou_threshold(mut self, iou_threshold: f32) -> Self {
        self.iou_threshold = iou_threshold;
        self
    }

    fn build_input(&self, frame: &Frame) -> Tensor {
        let size = self.input_size;
        let resized = imageops::resize(&frame.to_rgb(), size, size, FilterType::Triangle);
        let size = size as usize;
        tract_ndarray::Array4::from_shape_fn((1, 3, size, size), |(_, channel, y, x)| {
            f32::from(resized.get_pixel(x as u32, y as u32)[channel]) / 255.0
        })
        .into_tensor()
    }

    fn label(&self, class_id: usize, num_classes: usize) -> String {
        if let Some(label) = self.labels.get(class_id) {
            return label.clone();
        }
        if num_classes == COCO_CLASSES.len() {
            return COCO_CLASSES[class_id].to_string();
        }
        format!("class_{}", class_id)
    }

    fn decode(
        &self,
        outputs: TVec<TValue>,
        frame: &Frame,
        threshold: f32,
    ) -> Result<Vec<RawCandidate>> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let scores = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?
            .into_dimensionality::<tract_ndarray::Ix3>()
            .context("expected a [batch, features, anchors] output")?;
        // scores[[0, f, a]]: feature f (cx, cy, w, h, class scores...) of anchor a

        let (features, anchors) = (scores.shape()[1], scores.shape()[2]);
        if features <= 4 {
            return Err(anyhow!("model output has no class scores ({} features)", features));
        }
        let num_classes = features - 4;
        let scale_x = frame.width() as f32 / self.input_size as f32;
        let scale_y = frame.height() as f32 / self.input_size as f32;

        let mut proposals = Vec::new();
        for anchor in 0..anchors {
            let (class_id, confidence) = (0..num_classes)
                .map(|c| (c, scores[[0, 4 + c, anchor]]))
                .fold((0, f32::NEG_INFINITY), |best, cur| if cur.1 > best.1 { cur } else { best });
            if confidence < threshold {
                continue;
            }
            let cx = scores[[0, 0, anchor]];
            let cy = scores[[0, 1, anchor]];
            let w = scores[[0, 2, anchor]];
            let h = scores[[0, 3, anchor]];
            let xyxy = [
                ((cx - w / 2.0) * scale_x).max(0.0),
                ((cy - h / 2.0) * scale_y).max(0.0),
                ((cx + w / 2.0) * scale_x).min(frame.width() as f32),
                ((cy + h / 2.0) * scale_y).min(frame.height() as f32),
            ];
            proposals.push((
                class_id,
                RawCandidate::new(self.label(class_id, num_classes), confidence, xyxy),
            ));
        }

        Ok(non_max_suppression(proposals, self.iou_threshold))
    }
}

impl ObjectModel for TractYoloModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn infer(&self, frame: &Frame, threshold: f32) -> Result<Vec<RawCandidate>> {
        let input = self.build_input(frame);
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        self.decode(outputs, frame, threshold)
    }
}

/// Greedy per-class NMS, highest confidence first.
fn non_max_suppression(
    mut proposals: Vec<(usize, RawCandidate)>,
    iou_threshold: f32,
) -> Vec<RawCandidate> {
    proposals.sort_by(|a, b| {
        b.1.confidence
            .partial_cmp(&a.1.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<(usize, RawCandidate)> = Vec::with_capacity(proposals.len());
    for (class_id, candidate) in proposals {
        let suppressed = keep
            .iter()
            .any(|(kept_class, kept)| *kept_class == class_id && iou(kept, &candidate) > iou_threshold);
        if !suppressed {
            keep.push((class_id, candidate));
        }
    }
    keep.into_iter().map(|(_, candidate)| candidate).collect()
}

fn iou(a: &RawCandidate, b: &RawCandidate) -> f32 {
    let w = (a.x2.min(b.x2) - a.x1.max(b.x1)).max(0.0);
    let h = (a.y2.min(b.y2) - a.y1.max(b.y1)).max(0.0);
    let intersection = w * h;
    let area = |c: &RawCandidate| (c.x2 - c.x1) * (c.y2 - c.y1);
    let union = area(a) + area(b) - intersection;
    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}

/// 80 COCO object classes, in model output order.
pub const COCO_CLASSES: [&str; 80] = [
    "person",
    "bicycle",
    "car",
    "motorcycle",
    "airplane",
    "bus",
    "train",
    "truck",
    "boat",
    "traffic light",
    "fire hydrant",
    "stop sign",
    "parking meter",
    "bench",
    "bird",
    "cat",
    "dog",
    "horse",
    "sheep",
    "cow",
    "elephant",
    "bear",
    "zebra",
    "giraffe",
    "backpack",
    "umbrella",
    "handbag",
    "tie",
    "suitcase",
    "frisbee",
    "skis",
    "snowboard",
    "sports ball",
    "kite",
    "baseball bat",
    "baseball glove",
    "skateboard",
    "surfboard",
    "tennis racket",
    "bottle",
    "wine glass",
    "cup",
    "fork",
    "knife",
    "spoon",
    "bowl",
    "banana",
    "apple",
    "sandwich",
    "orange",
    "broccoli",
    "carrot",
    "hot dog",
    "pizza",
    "donut",
    "cake",
    "chair",
    "couch",
    "potted plant",
    "bed",
    "dining table",
    "toilet",
    "tv",
    "laptop",
    "mouse",
    "remote",
    "keyboard",
    "cell phone",
    "microwave",
    "oven",
    "toaster",
    "sink",
    "refrigerator",
    "book",
    "clock",
    "vase",
    "scissors",
    "teddy bear",
    "hair drier",
    "toothbrush",
];
