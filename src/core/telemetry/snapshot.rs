use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::TelemetryError;

/// One complete reading for one GPU device at a point in time.
///
/// Optional fields cover sensors the driver may not expose; the parser maps
/// the report's absent-value sentinel to `None` rather than failing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GpuSnapshot {
    pub index: u32,
    pub name: String,
    pub utilization_percent: Option<f64>,
    pub memory_used_mib: Option<u64>,
    pub memory_total_mib: Option<u64>,
    pub temperature_celsius: Option<i64>,
    pub power_draw_watts: Option<f64>,
    pub power_limit_watts: Option<f64>,
    pub fan_speed_percent: Option<f64>,
    pub clock_graphics_mhz: Option<u64>,
    pub clock_memory_mhz: Option<u64>,
    pub processes: Vec<ProcessEntry>,
}

impl GpuSnapshot {
    /// Used memory as a percentage of total, when both sides are known.
    pub fn memory_percent(&self) -> Option<f64> {
        match (self.memory_used_mib, self.memory_total_mib) {
            (Some(used), Some(total)) if total > 0 => {
                Some(used as f64 / total as f64 * 100.0)
            }
            _ => None,
        }
    }

    /// Draw over limit. May exceed 1.0 transiently; that is not an error.
    pub fn power_ratio(&self) -> Option<f64> {
        match (self.power_draw_watts, self.power_limit_watts) {
            (Some(draw), Some(limit)) if limit > 0.0 => Some(draw / limit),
            _ => None,
        }
    }
}

/// One GPU-resident process, owned by the snapshot it was reported with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessEntry {
    pub pid: u32,
    pub name: String,
    pub memory_mib: Option<u64>,
}

/// The payload of a successful sampling cycle.
#[derive(Debug, Clone, Default)]
pub struct Sample {
    /// Unix timestamp taken when the cycle completed
    pub captured_at: i64,
    /// Devices ordered by ascending index
    pub snapshots: Vec<GpuSnapshot>,
    /// Non-fatal clamp/range warnings raised while parsing the report
    pub warnings: Vec<String>,
}

impl Sample {
    /// The lowest-index device, which owns the process table.
    pub fn primary(&self) -> Option<&GpuSnapshot> {
        self.snapshots.first()
    }
}

/// Outcome of one sampling attempt. Immutable; a new cycle replaces the
/// previous result wholesale, never partially.
#[derive(Debug)]
pub struct SampleResult {
    /// Monotonically increasing cycle counter
    pub cycle: u64,
    pub outcome: SampleOutcome,
}

#[derive(Debug)]
pub enum SampleOutcome {
    Snapshots(Sample),
    Failed {
        error: TelemetryError,
        detail: String,
    },
}

impl SampleResult {
    pub fn is_ok(&self) -> bool {
        matches!(self.outcome, SampleOutcome::Snapshots(_))
    }

    pub fn sample(&self) -> Option<&Sample> {
        match &self.outcome {
            SampleOutcome::Snapshots(sample) => Some(sample),
            SampleOutcome::Failed { .. } => None,
        }
    }
}

/// Shared handle to the latest published result.
pub type SharedResult = Arc<SampleResult>;
