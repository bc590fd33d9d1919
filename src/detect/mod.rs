mod backend;
pub mod backends;
mod classify;
mod registry;
mod remap;
mod result;

pub use backend::{DetectorBackend, ObjectModel, RawCandidate};
pub use classify::classify;
pub use registry::{BackendRegistry, BackendRole};
pub use remap::{remap, CoordinateSpace, LocalDetections};
pub use result::{BoundingBox, Channel, Detection, DetectionCategory};
