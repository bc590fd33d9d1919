pub mod model;
pub mod stub;
pub mod thermal;

#[cfg(feature = "backend-tract")]
pub mod tract;

pub use model::ModelDetector;
pub use stub::StubModel;
pub use thermal::{ThermalHeuristic, DEFAULT_THERMAL_THRESHOLD, MIN_HOTSPOT_AREA};

#[cfg(feature = "backend-tract")]
pub use tract::TractYoloModel;
