//! Request facade over the router.
//!
//! Applies the detection switches, resolves the effective threshold, times the
//! call and records statistics. Transports decode the image into a `Frame`,
//! deserialize a `DetectionRequest`, and serialize the `DetectionResponse`.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::config::FirelineConfig;
use crate::detect::{BackendRegistry, BackendRole, Detection};
use crate::error::DetectError;
use crate::frame::Frame;
use crate::router::Router;
use crate::stats::{RollingStats, StatsAggregator};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionRequest {
    #[serde(default)]
    pub stream_id: Option<String>,
    #[serde(default = "default_true")]
    pub enable_detection: bool,
    /// Overrides the configured default when set.
    #[serde(default)]
    pub confidence_threshold: Option<f32>,
    /// `COLOR`, `THERMAL` or `SPLIT`; anything else is treated as `COLOR`.
    #[serde(default)]
    pub stream_type: Option<String>,
    #[serde(default)]
    pub split_layout: Option<String>,
}

impl Default for DetectionRequest {
    fn default() -> Self {
        Self {
            stream_id: None,
            enable_detection: true,
            confidence_threshold: None,
            stream_type: None,
            split_layout: None,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub color_backend: Option<String>,
    pub thermal_backend: Option<String>,
    /// True when both backends are loaded and warmed up.
    pub warmed_up: bool,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionResponse {
    pub detections: Vec<Detection>,
    /// Wall-clock seconds spent handling the request.
    pub inference_time: f64,
    pub model_info: ModelInfo,
    pub stream_id: Option<String>,
    pub enabled: bool,
}

pub struct DetectionService {
    router: Router,
    stats: StatsAggregator,
    default_threshold: f32,
    detection_enabled: bool,
}

impl DetectionService {
    pub fn new(router: Router, cfg: &FirelineConfig) -> Self {
        Self {
            router,
            stats: StatsAggregator::new(),
            default_threshold: cfg.confidence_threshold,
            detection_enabled: cfg.enable_detection,
        }
    }

    /// Build the registry from `cfg`, warm it up and wrap it in a service.
    pub fn from_config(cfg: &FirelineConfig) -> Self {
        let registry = BackendRegistry::from_config(cfg);
        registry.warm_up_all();
        let router = Router::new(registry).with_default_layout(cfg.split_layout);
        Self::new(router, cfg)
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn model_info(&self) -> ModelInfo {
        let backends = self.router.backends();
        ModelInfo {
            color_backend: backends.name(BackendRole::Color).map(str::to_string),
            thermal_backend: backends.name(BackendRole::Thermal).map(str::to_string),
            warmed_up: backends.all_ready(),
        }
    }

    pub fn stats(&self) -> RollingStats {
        self.stats.snapshot()
    }

    /// Handle one request.
    ///
    /// Failed requests propagate their error and are not counted.
    pub fn detect(
        &self,
        frame: &Frame,
        request: &DetectionRequest,
    ) -> Result<DetectionResponse, DetectError> {
        let started = Instant::now();
        let enabled = request.enable_detection && self.detection_enabled;

        let detections = if enabled {
            let threshold = request.confidence_threshold.unwrap_or(self.default_threshold);
            if !(0.0..=1.0).contains(&threshold) {
                return Err(DetectError::InvalidRequest(format!(
                    "confidence threshold {} is outside [0, 1]",
                    threshold
                )));
            }
            self.router.route_tagged(
                frame,
                request.stream_type.as_deref(),
                request.split_layout.as_deref(),
                threshold,
            )?
        } else {
            Vec::new()
        };

        let inference_time = started.elapsed().as_secs_f64();
        self.stats.record(inference_time, detections.len(), enabled);

        log::debug!(
            "stream {}: {} detections in {:.3}s (enabled: {})",
            request.stream_id.as_deref().unwrap_or("-"),
            detections.len(),
            inference_time,
            enabled
        );

        Ok(DetectionResponse {
            detections,
            inference_time,
            model_info: self.model_info(),
            stream_id: request.stream_id.clone(),
            enabled,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::backends::{ModelDetector, StubModel, ThermalHeuristic};
    use crate::detect::RawCandidate;
    use crate::frame::PixelFormat;

    fn service(cfg: &FirelineConfig) -> DetectionService {
        let registry = BackendRegistry::new()
            .with(
                BackendRole::Color,
                ModelDetector::new(StubModel::new(
                    "yolo",
                    vec![
                        RawCandidate::new("fire", 0.8, [0.0, 0.0, 10.0, 10.0]),
                        RawCandidate::new("smoke", 0.3, [0.0, 0.0, 10.0, 10.0]),
                    ],
                )),
            )
            .with(BackendRole::Thermal, ThermalHeuristic::default());
        registry.warm_up_all();
        DetectionService::new(Router::new(registry), cfg)
    }

    fn frame() -> Frame {
        Frame::zeros(64, 64, PixelFormat::Rgb24)
    }

    #[test]
    fn request_defaults_from_json() {
        let req: DetectionRequest = serde_json::from_str(r#"{"streamId":"cam-1"}"#).unwrap();
        assert_eq!(req.stream_id.as_deref(), Some("cam-1"));
        assert!(req.enable_detection);
        assert!(req.confidence_threshold.is_none());
    }

    #[test]
    fn uses_configured_threshold_by_default() {
        let svc = service(&FirelineConfig::default());
        let resp = svc.detect(&frame(), &DetectionRequest::default()).unwrap();
        assert!(resp.enabled);
        assert_eq!(resp.detections.len(), 2);

        let strict = DetectionRequest {
            confidence_threshold: Some(0.5),
            ..DetectionRequest::default()
        };
        assert_eq!(svc.detect(&frame(), &strict).unwrap().detections.len(), 1);
    }

    #[test]
    fn disabled_request_skips_routing_but_counts() {
        let svc = service(&FirelineConfig::default());
        let req = DetectionRequest {
            stream_id: Some("cam-7".to_string()),
            enable_detection: false,
            ..DetectionRequest::default()
        };
        let resp = svc.detect(&frame(), &req).unwrap();
        assert!(!resp.enabled);
        assert!(resp.detections.is_empty());
        assert_eq!(resp.stream_id.as_deref(), Some("cam-7"));

        let stats = svc.stats();
        assert_eq!(stats.total_requests, 1);
        assert_eq!(stats.detection_enabled_requests, 0);
        assert_eq!(stats.window_len(), 0);
    }

    #[test]
    fn service_switch_overrides_request() {
        let cfg = FirelineConfig {
            enable_detection: false,
            ..FirelineConfig::default()
        };
        let resp = service(&cfg)
            .detect(&frame(), &DetectionRequest::default())
            .unwrap();
        assert!(!resp.enabled);
        assert!(resp.detections.is_empty());
    }

    #[test]
    fn bad_threshold_is_rejected_and_not_counted() {
        let svc = service(&FirelineConfig::default());
        let req = DetectionRequest {
            confidence_threshold: Some(1.5),
            ..DetectionRequest::default()
        };
        let err = svc.detect(&frame(), &req).unwrap_err();
        assert!(err.is_client_error());
        assert_eq!(svc.stats().total_requests, 0);
    }

    #[test]
    fn inference_failure_leaves_stats_untouched() {
        let registry = BackendRegistry::new()
            .with(
                BackendRole::Color,
                ModelDetector::new(StubModel::failing("yolo", "cuda oom")).ready(),
            )
            .with(BackendRole::Thermal, ThermalHeuristic::default());
        let svc = DetectionService::new(Router::new(registry), &FirelineConfig::default());

        let thermal = DetectionRequest {
            stream_type: Some("THERMAL".to_string()),
            ..DetectionRequest::default()
        };
        svc.detect(&frame(), &thermal).unwrap();
        let before = svc.stats();

        let err = svc.detect(&frame(), &DetectionRequest::default()).unwrap_err();
        assert!(matches!(err, DetectError::BackendInferenceFailure { .. }));
        assert_eq!(svc.stats(), before);
        assert_eq!(before.total_requests, 1);
    }

    #[test]
    fn model_info_reports_backends() {
        let info = service(&FirelineConfig::default()).model_info();
        assert_eq!(info.color_backend.as_deref(), Some("yolo"));
        assert_eq!(info.thermal_backend.as_deref(), Some("thermal-heuristic"));
        assert!(info.warmed_up);
    }

    #[test]
    fn response_serializes_camel_case() {
        let svc = service(&FirelineConfig::default());
        let resp = svc.detect(&frame(), &DetectionRequest::default()).unwrap();
        let json = serde_json::to_value(&resp).unwrap();
        assert!(json.get("inferenceTime").is_some());
        assert_eq!(json["modelInfo"]["colorBackend"], "yolo");
        assert_eq!(json["detections"][0]["detectionType"], "FIRE");
        assert_eq!(json["detections"][0]["boundingBox"]["width"], 10);
    }
}
