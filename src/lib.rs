//! Fireline: fire, smoke and hotspot detection routing.
//!
//! This crate routes camera frames to detector backends and reconciles their
//! output into one detection list in the original frame's coordinates.
//!
//! # Pipeline
//!
//! - **Color** frames go to the general (learned) detector.
//! - **Thermal** frames go to the thermal backend: an intensity heuristic, or a
//!   learned model whose outputs are always hotspots.
//! - **Split** frames carry both images side by side or stacked. The frame is
//!   halved, each half goes to its backend, and second-half boxes are shifted
//!   back into composite coordinates.
//!
//! Every routed request updates rolling statistics (request counts, mean
//! latency over the last 100 requests, recent throughput).
//!
//! # Module Structure
//!
//! - `frame`: Decoded pixel buffers and composite-frame splitting
//! - `detect`: Detection types, label classification, backends, registry
//! - `router`: Stream-type dispatch
//! - `stats`: Rolling statistics
//! - `service`: Request facade (switches, timing, stats recording)
//! - `config`: File and environment configuration

pub mod config;
pub mod detect;
pub mod error;
pub mod frame;
pub mod router;
pub mod service;
pub mod stats;

pub use config::{FirelineConfig, ModelSettings, DEFAULT_CONFIDENCE_THRESHOLD};
pub use detect::{
    classify, remap, BackendRegistry, BackendRole, BoundingBox, Channel, CoordinateSpace,
    Detection, DetectionCategory, DetectorBackend, LocalDetections, ObjectModel, RawCandidate,
};
pub use error::DetectError;
pub use frame::{split, Frame, FrameShape, PixelFormat, SplitLayout};
pub use router::{Router, StreamType};
pub use service::{DetectionRequest, DetectionResponse, DetectionService, ModelInfo};
pub use stats::{RollingStats, StatsAggregator, LATENCY_WINDOW};
