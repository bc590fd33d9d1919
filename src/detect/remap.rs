use crate::frame::{FrameShape, SplitLayout};

use super::result::Detection;

/// Translate detections found on one half of a split frame into the
/// coordinate space of the original composite frame.
///
/// First-half boxes already share the composite origin and pass through
/// unchanged. Second-half boxes are offset by the layout's midpoint along its
/// axis. The input slice is left untouched; a new list is returned.
pub fn remap(
    detections: &[Detection],
    layout: SplitLayout,
    is_second_half: bool,
    original: FrameShape,
) -> Vec<Detection> {
    if !is_second_half {
        return detections.to_vec();
    }
    let mid = layout.midpoint(original) as i32;
    let (dx, dy) = match layout {
        SplitLayout::LeftRight => (mid, 0),
        SplitLayout::TopBottom => (0, mid),
    };
    detections.iter().map(|d| d.translated(dx, dy)).collect()
}

/// Frame a set of boxes is addressed in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoordinateSpace {
    /// The frame handed to the router.
    Original,
    /// One half of a split frame.
    Half {
        layout: SplitLayout,
        is_second_half: bool,
    },
}

/// Backend output tagged with the space its boxes live in.
///
/// The only way back to a plain detection list is `into_original`, so boxes
/// cannot leave the router still in sub-frame coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct LocalDetections {
    space: CoordinateSpace,
    detections: Vec<Detection>,
}

impl LocalDetections {
    pub fn new(space: CoordinateSpace, detections: Vec<Detection>) -> Self {
        Self { space, detections }
    }

    pub fn space(&self) -> CoordinateSpace {
        self.space
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    /// Resolve into the coordinates of the `original` frame.
    pub fn into_original(self, original: FrameShape) -> Vec<Detection> {
        match self.space {
            CoordinateSpace::Original => self.detections,
            CoordinateSpace::Half {
                layout,
                is_second_half,
            } => remap(&self.detections, layout, is_second_half, original),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::result::{BoundingBox, Channel, DetectionCategory};

    const SHAPE: FrameShape = FrameShape {
        width: 640,
        height: 480,
    };

    fn det(x: i32, y: i32, w: i32, h: i32) -> Detection {
        Detection::new(
            "hotspot",
            0.9,
            BoundingBox::new(x, y, w, h),
            DetectionCategory::Hotspot,
            Some(Channel::Thermal),
        )
    }

    #[test]
    fn first_half_is_identity() {
        let input = vec![det(100, 150, 50, 60), det(0, 0, 1, 1)];
        for layout in [SplitLayout::LeftRight, SplitLayout::TopBottom] {
            assert_eq!(remap(&input, layout, false, SHAPE), input);
        }
    }

    #[test]
    fn left_right_second_half_shifts_x() {
        let out = remap(&[det(100, 150, 50, 60)], SplitLayout::LeftRight, true, SHAPE);
        assert_eq!(out[0].bounding_box, BoundingBox::new(420, 150, 50, 60));
    }

    #[test]
    fn top_bottom_second_half_shifts_y() {
        let out = remap(&[det(10, 10, 30, 30)], SplitLayout::TopBottom, true, SHAPE);
        assert_eq!(out[0].bounding_box, BoundingBox::new(10, 250, 30, 30));
    }

    #[test]
    fn other_fields_pass_through_and_input_is_kept() {
        let input = vec![det(20, 20, 40, 40)];
        let out = remap(&input, SplitLayout::LeftRight, true, SHAPE);

        assert_eq!(input[0].bounding_box.x, 20);
        assert_eq!(out[0].label, input[0].label);
        assert_eq!(out[0].confidence, input[0].confidence);
        assert_eq!(out[0].category, input[0].category);
        assert_eq!(out[0].channel, input[0].channel);
    }

    #[test]
    fn tagged_detections_resolve_by_space() {
        let second = LocalDetections::new(
            CoordinateSpace::Half {
                layout: SplitLayout::LeftRight,
                is_second_half: true,
            },
            vec![det(20, 20, 40, 40)],
        );
        assert_eq!(second.len(), 1);
        let out = second.into_original(SHAPE);
        assert_eq!(out[0].bounding_box, BoundingBox::new(340, 20, 40, 40));

        let whole = LocalDetections::new(CoordinateSpace::Original, vec![det(20, 20, 40, 40)]);
        assert_eq!(
            whole.into_original(SHAPE)[0].bounding_box,
            BoundingBox::new(20, 20, 40, 40)
        );
    }

    #[test]
    fn odd_width_uses_floor_midpoint() {
        let shape = FrameShape::new(641, 481);
        let out = remap(&[det(0, 0, 5, 5)], SplitLayout::LeftRight, true, shape);
        assert_eq!(out[0].bounding_box.x, 320);
        let out = remap(&[det(0, 0, 5, 5)], SplitLayout::TopBottom, true, shape);
        assert_eq!(out[0].bounding_box.y, 240);
    }
}
