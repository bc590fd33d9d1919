use std::collections::VecDeque;
use std::sync::Mutex;

use serde::Serialize;

/// Latency samples kept for the rolling average.
pub const LATENCY_WINDOW: usize = 100;

/// Samples needed before `fps` is computed, and how many recent ones it uses.
const FPS_SAMPLES: usize = 10;

/// Rolling request and latency counters.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RollingStats {
    pub total_requests: u64,
    pub detection_enabled_requests: u64,
    pub total_detections: u64,
    /// Mean of the retained latency window, in seconds.
    pub avg_inference_time: f64,
    pub fps: f64,
    #[serde(skip)]
    window: VecDeque<f64>,
}

impl RollingStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of latency samples currently retained.
    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    /// Retained latencies, oldest first.
    pub fn latencies(&self) -> impl Iterator<Item = f64> + '_ {
        self.window.iter().copied()
    }

    /// Account for one request. Latency fields only move when detection ran;
    /// a disabled request leaves them at their last values.
    pub fn record(&mut self, inference_time: f64, detection_count: usize, enabled: bool) {
        self.total_requests += 1;
        if !enabled {
            return;
        }

        self.detection_enabled_requests += 1;
        self.total_detections += detection_count as u64;

        if self.window.len() == LATENCY_WINDOW {
            self.window.pop_front();
        }
        self.window.push_back(inference_time);

        self.avg_inference_time = self.window.iter().sum::<f64>() / self.window.len() as f64;

        if self.window.len() >= FPS_SAMPLES {
            let recent = self.window.iter().rev().take(FPS_SAMPLES).sum::<f64>() / FPS_SAMPLES as f64;
            self.fps = if recent > 0.0 { 1.0 / recent } else { 0.0 };
        }
    }
}

/// Shared, thread-safe owner of a `RollingStats`.
///
/// Every `record` happens under one lock so concurrent requests never lose
/// updates. Readers get point-in-time copies.
#[derive(Debug, Default)]
pub struct StatsAggregator {
    inner: Mutex<RollingStats>,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, inference_time: f64, detection_count: usize, enabled: bool) {
        let mut stats = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        stats.record(inference_time, detection_count, enabled);
    }

    pub fn snapshot(&self) -> RollingStats {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn first_record_updates_counters_but_not_fps() {
        let stats = StatsAggregator::new();
        stats.record(0.1, 3, true);

        let snap = stats.snapshot();
        assert_eq!(snap.total_requests, 1);
        assert_eq!(snap.detection_enabled_requests, 1);
        assert_eq!(snap.total_detections, 3);
        assert_eq!(snap.window_len(), 1);
        assert!((snap.avg_inference_time - 0.1).abs() < 1e-12);
        assert_eq!(snap.fps, 0.0);
    }

    #[test]
    fn fps_uses_last_ten_samples() {
        let mut stats = RollingStats::new();
        for _ in 0..5 {
            stats.record(1.0, 0, true);
        }
        for _ in 0..10 {
            stats.record(0.05, 0, true);
        }
        assert!((stats.fps - 20.0).abs() < 1e-9);
        assert!((stats.avg_inference_time - 5.5 / 15.0).abs() < 1e-9);
    }

    #[test]
    fn zero_latency_gives_zero_fps() {
        let mut stats = RollingStats::new();
        for _ in 0..10 {
            stats.record(0.0, 0, true);
        }
        assert_eq!(stats.fps, 0.0);
    }

    #[test]
    fn window_is_bounded_and_tracks_recent_samples() {
        let mut stats = RollingStats::new();
        for i in 0..150 {
            let latency = if i < 50 { 10.0 } else { 0.2 };
            stats.record(latency, 1, true);
        }
        assert_eq!(stats.window_len(), LATENCY_WINDOW);
        assert!((stats.avg_inference_time - 0.2).abs() < 1e-9);
        assert!(stats.latencies().all(|l| (l - 0.2).abs() < 1e-12));
        assert_eq!(stats.total_detections, 150);
    }

    #[test]
    fn disabled_requests_leave_latency_fields_stale() {
        let mut stats = RollingStats::new();
        for _ in 0..10 {
            stats.record(0.5, 2, true);
        }
        let before = stats.clone();

        stats.record(9.0, 7, false);
        assert_eq!(stats.total_requests, 11);
        assert_eq!(stats.detection_enabled_requests, 10);
        assert_eq!(stats.total_detections, 20);
        assert_eq!(stats.window_len(), 10);
        assert_eq!(stats.avg_inference_time, before.avg_inference_time);
        assert_eq!(stats.fps, before.fps);
    }

    #[test]
    fn concurrent_records_are_not_lost() {
        let stats = Arc::new(StatsAggregator::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let stats = Arc::clone(&stats);
                thread::spawn(move || {
                    for _ in 0..250 {
                        stats.record(0.01, 1, true);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snap = stats.snapshot();
        assert_eq!(snap.total_requests, 2000);
        assert_eq!(snap.total_detections, 2000);
        assert_eq!(snap.window_len(), LATENCY_WINDOW);
    }

    #[test]
    fn snapshot_is_a_copy() {
        let stats = StatsAggregator::new();
        stats.record(0.1, 1, true);
        let snap = stats.snapshot();
        stats.record(0.1, 1, true);
        assert_eq!(snap.total_requests, 1);
        assert_eq!(stats.snapshot().total_requests, 2);
    }

    #[test]
    fn serializes_camel_case_without_window() {
        let mut stats = RollingStats::new();
        stats.record(0.25, 2, true);
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["totalRequests"], 1);
        assert_eq!(json["detectionEnabledRequests"], 1);
        assert_eq!(json["totalDetections"], 2);
        assert_eq!(json["avgInferenceTime"], 0.25);
        assert!(json.get("window").is_none());
    }
}
