use std::fmt;

use serde::Serialize;

use super::model::Metrics;
use crate::config::MonitorSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorStatus {
    Stable,
    DegradationDetected,
}

impl fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Stable => "stable",
            Self::DegradationDetected => "degradation_detected",
        })
    }
}

/// Active metrics compared with the recent baseline.
///
/// Deltas are `baseline - active`; positive means the active model is worse.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MonitorReport {
    pub status: MonitorStatus,
    pub accuracy_delta: f64,
    pub f1_delta: f64,
    /// Number of historical versions in the baseline.
    pub baseline_versions: usize,
}

/// Rolling-window degradation detector.
#[derive(Debug, Clone, Default)]
pub struct PerformanceMonitor {
    settings: MonitorSettings,
}

impl PerformanceMonitor {
    pub fn new(settings: MonitorSettings) -> Self {
        Self { settings }
    }

    /// Compare `active` with the last `window` entries of `history`.
    ///
    /// `history` is ordered oldest first and must not contain the active
    /// version. An empty history is always stable.
    pub fn check(&self, active: &Metrics, history: &[&Metrics]) -> MonitorReport {
        let window = self.settings.window.max(1);
        let recent = &history[history.len().saturating_sub(window)..];
        if recent.is_empty() {
            return MonitorReport {
                status: MonitorStatus::Stable,
                accuracy_delta: 0.0,
                f1_delta: 0.0,
                baseline_versions: 0,
            };
        }
        let n = recent.len() as f64;
        let mean_accuracy = recent.iter().map(|m| m.accuracy).sum::<f64>() / n;
        let mean_f1 = recent.iter().map(|m| m.f1).sum::<f64>() / n;
        let accuracy_delta = mean_accuracy - active.accuracy;
        let f1_delta = mean_f1 - active.f1;
        let degraded = accuracy_delta > self.settings.accuracy_threshold
            || f1_delta > self.settings.f1_threshold;
        MonitorReport {
            status: if degraded {
                MonitorStatus::DegradationDetected
            } else {
                MonitorStatus::Stable
            },
            accuracy_delta,
            f1_delta,
            baseline_versions: recent.len(),
        }
    }
}
