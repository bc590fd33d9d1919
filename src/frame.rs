//! Decoded camera frames and composite-frame partitioning.
//!
//! - `Frame`: owned, interleaved 8-bit pixel grid (gray, RGB or RGBA).
//! - `SplitLayout`: axis along which a composite (color + thermal) frame is cut.
//! - `split`: partitions a composite frame into its first and second halves.
//!
//! The routing core never mutates a caller's frame. Halves are independent
//! copies, so backends may read them freely.

use std::fmt;
use std::str::FromStr;

use image::{GrayImage, Luma, Rgb, RgbImage, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::error::DetectError;

/// Interleaved pixel layout of a `Frame`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    Gray8,
    Rgb24,
    Rgba32,
}

impl PixelFormat {
    pub fn channels(self) -> usize {
        match self {
            PixelFormat::Gray8 => 1,
            PixelFormat::Rgb24 => 3,
            PixelFormat::Rgba32 => 4,
        }
    }
}

/// Width and height of a frame in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct FrameShape {
    pub width: u32,
    pub height: u32,
}

impl FrameShape {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// A decoded frame. Rows are stored top to bottom, pixels left to right.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    format: PixelFormat,
}

impl Frame {
    /// Wrap decoded pixels, validating the buffer length against the shape.
    pub fn new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> Result<Self, DetectError> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(format.channels()))
            .ok_or_else(|| DetectError::InvalidFrame("frame dimensions overflow".into()))?;
        if data.len() != expected {
            return Err(DetectError::InvalidFrame(format!(
                "expected {} bytes for {}x{} {:?}, received {}",
                expected,
                width,
                height,
                format,
                data.len()
            )));
        }
        Ok(Self {
            data,
            width,
            height,
            format,
        })
    }

    /// All-black frame of the given shape.
    pub fn zeros(width: u32, height: u32, format: PixelFormat) -> Self {
        let len = width as usize * height as usize * format.channels();
        Self {
            data: vec![0; len],
            width,
            height,
            format,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn shape(&self) -> FrameShape {
        FrameShape::new(self.width, self.height)
    }

    /// True when the frame holds no pixels (a degenerate split half).
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    /// Channel values of the pixel at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let c = self.format.channels();
        let start = (y as usize * self.width as usize + x as usize) * c;
        &self.data[start..start + c]
    }

    /// Mutable channel values of the pixel at `(x, y)`. Used to paint test
    /// fixtures and synthetic frames.
    pub fn pixel_mut(&mut self, x: u32, y: u32) -> &mut [u8] {
        let c = self.format.channels();
        let start = (y as usize * self.width as usize + x as usize) * c;
        &mut self.data[start..start + c]
    }

    /// Copy the rectangle `[x, x + width) x [y, y + height)`.
    ///
    /// The rectangle must lie inside the frame.
    fn crop(&self, x: u32, y: u32, width: u32, height: u32) -> Frame {
        let c = self.format.channels();
        let row_len = width as usize * c;
        let mut data = Vec::with_capacity(row_len * height as usize);
        for row in y..y + height {
            let start = (row as usize * self.width as usize + x as usize) * c;
            data.extend_from_slice(&self.data[start..start + row_len]);
        }
        Frame {
            data,
            width,
            height,
            format: self.format,
        }
    }

    /// Single-channel intensity image.
    ///
    /// Color pixels are reduced with the BT.601 luma weights; alpha is ignored.
    pub fn to_luma(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            let px = self.pixel(x, y);
            match self.format {
                PixelFormat::Gray8 => Luma([px[0]]),
                PixelFormat::Rgb24 | PixelFormat::Rgba32 => Luma([luma(px[0], px[1], px[2])]),
            }
        })
    }

    /// Three-channel RGB copy, as consumed by learned models.
    pub fn to_rgb(&self) -> RgbImage {
        RgbImage::from_fn(self.width, self.height, |x, y| {
            let px = self.pixel(x, y);
            match self.format {
                PixelFormat::Gray8 => Rgb([px[0], px[0], px[0]]),
                PixelFormat::Rgb24 | PixelFormat::Rgba32 => Rgb([px[0], px[1], px[2]]),
            }
        })
    }
}

fn luma(r: u8, g: u8, b: u8) -> u8 {
    let weighted = 299 * r as u32 + 587 * g as u32 + 114 * b as u32;
    ((weighted + 500) / 1000) as u8
}

impl From<RgbImage> for Frame {
    fn from(img: RgbImage) -> Self {
        let (width, height) = img.dimensions();
        Frame {
            data: img.into_raw(),
            width,
            height,
            format: PixelFormat::Rgb24,
        }
    }
}

impl From<RgbaImage> for Frame {
    fn from(img: RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Frame {
            data: img.into_raw(),
            width,
            height,
            format: PixelFormat::Rgba32,
        }
    }
}

impl From<GrayImage> for Frame {
    fn from(img: GrayImage) -> Self {
        let (width, height) = img.dimensions();
        Frame {
            data: img.into_raw(),
            width,
            height,
            format: PixelFormat::Gray8,
        }
    }
}

// ----------------------------------------------------------------------------
// Composite frames
// ----------------------------------------------------------------------------

/// How a composite frame is partitioned. The first half carries the color
/// image, the second half the thermal image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SplitLayout {
    #[default]
    LeftRight,
    TopBottom,
}

impl SplitLayout {
    /// Split coordinate along this layout's axis: `width / 2` or `height / 2`.
    pub fn midpoint(self, shape: FrameShape) -> u32 {
        match self {
            SplitLayout::LeftRight => shape.width / 2,
            SplitLayout::TopBottom => shape.height / 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SplitLayout::LeftRight => "LEFT_RIGHT",
            SplitLayout::TopBottom => "TOP_BOTTOM",
        }
    }
}

impl fmt::Display for SplitLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SplitLayout {
    type Err = DetectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_tag(s).as_str() {
            "LEFT_RIGHT" => Ok(SplitLayout::LeftRight),
            "TOP_BOTTOM" => Ok(SplitLayout::TopBottom),
            _ => Err(DetectError::InvalidRequest(format!(
                "unknown split layout '{}'",
                s
            ))),
        }
    }
}

/// Uppercase a free-text enum tag and treat `-` and spaces as `_`.
pub(crate) fn normalize_tag(tag: &str) -> String {
    tag.trim()
        .chars()
        .map(|c| match c {
            '-' | ' ' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect()
}

/// Partition a composite frame into `(first_half, second_half)`.
///
/// The split coordinate is floor-divided, so an odd remainder lands in the
/// second half. Degenerate frames yield empty halves rather than errors.
pub fn split(frame: &Frame, layout: SplitLayout) -> (Frame, Frame) {
    let (width, height) = (frame.width(), frame.height());
    let mid = layout.midpoint(frame.shape());
    match layout {
        SplitLayout::LeftRight => (
            frame.crop(0, 0, mid, height),
            frame.crop(mid, 0, width - mid, height),
        ),
        SplitLayout::TopBottom => (
            frame.crop(0, 0, width, mid),
            frame.crop(0, mid, width, height - mid),
        ),
    }
}
