//! Health verdict reduction
//!
//! Pure reduction of a detection list to a single status: `Unknown` when
//! nothing was detected, `Disease` when any detection is not "healthy"
//! (case-insensitive), `Healthy` otherwise.

use crate::classifier::Detection;

/// Reduced health classification for one cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Disease,
    Unknown,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Disease => "disease",
            HealthStatus::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verdict plus the verbatim label sequence it was derived from
#[derive(Debug, Clone, PartialEq)]
pub struct HealthVerdict {
    pub status: HealthStatus,
    /// Labels in detection return order, duplicates kept
    pub observed_classes: Vec<String>,
}

/// Evaluate the health verdict for a detection list. No side effects.
pub fn evaluate(detections: &[Detection]) -> HealthVerdict {
    if detections.is_empty() {
        return HealthVerdict {
            status: HealthStatus::Unknown,
            observed_classes: Vec::new(),
        };
    }

    let observed_classes: Vec<String> = detections
        .iter()
        .map(|d| d.class_label.clone())
        .collect();

    let all_healthy = observed_classes
        .iter()
        .all(|label| label.eq_ignore_ascii_case("healthy"));

    HealthVerdict {
        status: if all_healthy {
            HealthStatus::Healthy
        } else {
            HealthStatus::Disease
        },
        observed_classes,
    }
}
