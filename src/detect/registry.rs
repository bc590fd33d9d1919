use std::fmt;
use std::sync::Arc;

use crate::config::FirelineConfig;
use crate::error::DetectError;

use super::backend::DetectorBackend;
use super::backends::ThermalHeuristic;

/// Which part of the pipeline a backend serves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BackendRole {
    /// General detector for visible-light frames and first halves.
    Color,
    /// Hotspot detector for thermal frames and second halves.
    Thermal,
}

impl BackendRole {
    pub fn as_str(self) -> &'static str {
        match self {
            BackendRole::Color => "color",
            BackendRole::Thermal => "thermal",
        }
    }
}

impl fmt::Display for BackendRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Thread-safe registry of detector backends, one slot per role.
///
/// Backends are shared behind `Arc` because `DetectorBackend::detect` takes
/// `&self`; concurrent routing calls need no lock here.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    color: Option<Arc<dyn DetectorBackend>>,
    thermal: Option<Arc<dyn DetectorBackend>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend for `role`, replacing any previous one.
    pub fn register<B: DetectorBackend + 'static>(&mut self, role: BackendRole, backend: B) {
        self.register_shared(role, Arc::new(backend));
    }

    pub fn register_shared(&mut self, role: BackendRole, backend: Arc<dyn DetectorBackend>) {
        log::info!("registered {} backend '{}'", role, backend.name());
        *self.slot_mut(role) = Some(backend);
    }

    /// Builder form of `register`.
    pub fn with<B: DetectorBackend + 'static>(mut self, role: BackendRole, backend: B) -> Self {
        self.register(role, backend);
        self
    }

    /// Get the backend registered for `role`, ready or not.
    pub fn get(&self, role: BackendRole) -> Option<&Arc<dyn DetectorBackend>> {
        match role {
            BackendRole::Color => self.color.as_ref(),
            BackendRole::Thermal => self.thermal.as_ref(),
        }
    }

    /// Get a backend that may be invoked now.
    ///
    /// Fails with `BackendUnavailable` when the slot is empty or the backend
    /// has not been warmed up.
    pub fn backend(&self, role: BackendRole) -> Result<&dyn DetectorBackend, DetectError> {
        match self.get(role) {
            Some(backend) if backend.is_ready() => Ok(backend.as_ref()),
            Some(backend) => Err(DetectError::unavailable(backend.name())),
            None => Err(DetectError::unavailable(role.as_str())),
        }
    }

    /// Name of the backend in `role`, if any.
    pub fn name(&self, role: BackendRole) -> Option<&str> {
        self.get(role).map(|backend| backend.name())
    }

    /// True when every registered role is ready and both roles are filled.
    pub fn all_ready(&self) -> bool {
        [BackendRole::Color, BackendRole::Thermal]
            .into_iter()
            .all(|role| self.get(role).is_some_and(|backend| backend.is_ready()))
    }

    /// Warm up every registered backend. Failures are logged, not returned;
    /// a backend that fails stays unavailable.
    pub fn warm_up_all(&self) {
        for role in [BackendRole::Color, BackendRole::Thermal] {
            let Some(backend) = self.get(role) else {
                continue;
            };
            match backend.warm_up() {
                Ok(()) => log::info!("{} backend '{}' ready", role, backend.name()),
                Err(e) => log::error!("{} backend '{}' failed warm-up: {}", role, backend.name(), e),
            }
        }
    }

    /// Build the registry described by `cfg`.
    ///
    /// The color slot is filled from `models.color_model_path`; the thermal
    /// slot from `models.thermal_model_path`, or the intensity heuristic when
    /// no thermal model is configured. A model that fails to load leaves its
    /// slot empty so requests needing it report `BackendUnavailable`.
    pub fn from_config(cfg: &FirelineConfig) -> Self {
        let mut registry = Self::new();

        match &cfg.models.color_model_path {
            Some(path) => {
                #[cfg(feature = "backend-tract")]
                match load_model(cfg, path) {
                    Ok(model) => registry.register(
                        BackendRole::Color,
                        super::backends::ModelDetector::new(model),
                    ),
                    Err(e) => log::error!("failed to load color model: {:#}", e),
                }
                #[cfg(not(feature = "backend-tract"))]
                log::error!(
                    "color model {} configured but fireline was built without backend-tract",
                    path.display()
                );
            }
            None => log::warn!("no color model configured; COLOR and SPLIT streams are unavailable"),
        }

        match &cfg.models.thermal_model_path {
            Some(path) => {
                #[cfg(feature = "backend-tract")]
                match load_model(cfg, path) {
                    Ok(model) => registry.register(
                        BackendRole::Thermal,
                        super::backends::ModelDetector::new(model)
                            .with_category(super::result::DetectionCategory::Hotspot),
                    ),
                    Err(e) => log::error!("failed to load thermal model: {:#}", e),
                }
                #[cfg(not(feature = "backend-tract"))]
                {
                    log::warn!(
                        "thermal model {} needs backend-tract; using intensity heuristic",
                        path.display()
                    );
                    registry.register(
                        BackendRole::Thermal,
                        ThermalHeuristic::new(cfg.thermal_threshold),
                    );
                }
            }
            None => registry.register(
                BackendRole::Thermal,
                ThermalHeuristic::new(cfg.thermal_threshold),
            ),
        }

        registry
    }

    fn slot_mut(&mut self, role: BackendRole) -> &mut Option<Arc<dyn DetectorBackend>> {
        match role {
            BackendRole::Color => &mut self.color,
            BackendRole::Thermal => &mut self.thermal,
        }
    }
}

#[cfg(feature = "backend-tract")]
fn load_model(
    cfg: &FirelineConfig,
    path: &std::path::Path,
) -> anyhow::Result<super::backends::TractYoloModel> {
    Ok(
        super::backends::TractYoloModel::load(path, cfg.models.input_size)?
            .with_labels(cfg.models.labels.clone())
            .with_iou_threshold(cfg.models.iou_threshold),
    )
}
